//! Chat model access and conversation state
//!
//! [`ChatModel`] is the seam to the hosted model: it opens a streamed reply
//! for a prompt given the prior turns. [`ChatSession`] owns those turns and
//! only records an exchange once its reply has been fully received.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, instrument};

use crate::Result;
use crate::models::ChatTurn;

pub mod gemini;

#[cfg(test)]
pub(crate) mod testing;

pub use gemini::GeminiClient;

/// Reply text as it arrives, one fragment per item
pub type ReplyStream = BoxStream<'static, Result<String>>;

/// A hosted chat model that streams its replies
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a reply to `prompt` with `history` as context.
    async fn stream_reply(&self, history: &[ChatTurn], prompt: &str) -> Result<ReplyStream>;
}

/// Conversation context carried across submissions.
///
/// Holds whole prompt/reply exchanges only. With a non-zero cap the oldest
/// exchanges are dropped once more than `max_exchanges` are held.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
    max_exchanges: usize,
}

impl ChatSession {
    /// Session that keeps every exchange
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_exchanges(max_exchanges: usize) -> Self {
        Self {
            history: Vec::new(),
            max_exchanges,
        }
    }

    #[must_use]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Number of prompt/reply pairs held
    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.history.len() / 2
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Send `prompt`, drain the streamed reply and return it whole.
    ///
    /// Any failure, whether opening the stream or mid-stream, returns the
    /// error and leaves the history as it was.
    #[instrument(name = "send_message", level = "debug", skip_all, fields(prompt_len = prompt.len()))]
    pub async fn send_message(&mut self, model: &dyn ChatModel, prompt: &str) -> Result<String> {
        let mut stream = model.stream_reply(&self.history, prompt).await?;

        let mut reply = String::new();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            reply.push_str(&chunk?);
            chunks += 1;
        }
        debug!(chunks, reply_len = reply.len(), "Model reply complete");

        self.history.push(ChatTurn::user(prompt));
        self.history.push(ChatTurn::model(reply.clone()));
        self.enforce_cap();

        Ok(reply)
    }

    fn enforce_cap(&mut self) {
        if self.max_exchanges == 0 {
            return;
        }
        let excess = self.exchanges().saturating_sub(self.max_exchanges);
        if excess > 0 {
            self.history = self.history.split_off(excess * 2);
            debug!(dropped = excess, "Dropped oldest exchanges from session");
        }
    }
}
