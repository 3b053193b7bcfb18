//! Deterministic stand-in for the hosted model

use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use super::{ChatModel, ReplyStream};
use crate::models::ChatTurn;
use crate::{FinderError, Result};

enum Script {
    Reply(Vec<String>),
    BreakAfter(Vec<String>),
    Fail(Mutex<Option<FinderError>>),
}

pub(crate) struct ScriptedModel {
    script: Script,
    seen: Mutex<Vec<(usize, String)>>,
}

impl ScriptedModel {
    fn new(script: Script) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Streams `chunks` on every call
    pub(crate) fn replying(chunks: &[&str]) -> Self {
        Self::new(Script::Reply(chunks.iter().map(ToString::to_string).collect()))
    }

    /// Streams `chunks`, then fails mid-stream
    pub(crate) fn breaking_after(chunks: &[&str]) -> Self {
        Self::new(Script::BreakAfter(
            chunks.iter().map(ToString::to_string).collect(),
        ))
    }

    /// Refuses the first call with `error`
    pub(crate) fn failing(error: FinderError) -> Self {
        Self::new(Script::Fail(Mutex::new(Some(error))))
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub(crate) fn seen_history_lengths(&self) -> Vec<usize> {
        self.seen.lock().unwrap().iter().map(|(len, _)| *len).collect()
    }

    pub(crate) fn seen_prompts(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn stream_reply(&self, history: &[ChatTurn], prompt: &str) -> Result<ReplyStream> {
        self.seen
            .lock()
            .unwrap()
            .push((history.len(), prompt.to_string()));

        match &self.script {
            Script::Reply(chunks) => {
                let items: Vec<Result<String>> = chunks.iter().cloned().map(Ok).collect();
                Ok(futures::stream::iter(items).boxed())
            }
            Script::BreakAfter(chunks) => {
                let mut items: Vec<Result<String>> = chunks.iter().cloned().map(Ok).collect();
                items.push(Err(FinderError::api("connection reset")));
                Ok(futures::stream::iter(items).boxed())
            }
            Script::Fail(error) => Err(error
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| FinderError::api("scripted failure"))),
        }
    }
}
