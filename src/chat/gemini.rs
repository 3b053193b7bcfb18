//! Gemini `streamGenerateContent` client
//!
//! Replies are requested as Server-Sent Events (`alt=sse`). Each `data:`
//! payload is a `GenerateContentResponse` whose candidate parts carry the
//! next fragment of text.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{ChatModel, ReplyStream};
use crate::config::GeminiConfig;
use crate::models::{ChatRole, ChatTurn};
use crate::{FinderError, Result};

/// Longest wait between two retry attempts
pub(crate) const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(8);

/// Gemini REST client
pub struct GeminiClient {
    client: ClientWithMiddleware,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| FinderError::config("Gemini API key is missing"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("SoilLab/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), MAX_RETRY_BACKOFF)
            .build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            endpoint: Self::endpoint(&config.base_url, &config.model),
        })
    }

    fn endpoint(base_url: &str, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            base_url.trim_end_matches('/'),
            model
        )
    }

    fn request_body(history: &[ChatTurn], prompt: &str) -> Result<Vec<u8>> {
        let contents = history
            .iter()
            .map(|turn| Content {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                },
                parts: vec![Part { text: &turn.text }],
            })
            .chain(std::iter::once(Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }))
            .collect();

        serde_json::to_vec(&GenerateContentRequest { contents })
            .map_err(|e| FinderError::parse(format!("Failed to encode Gemini request: {e}")))
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    #[instrument(name = "gemini_stream", skip_all, fields(turns = history.len()))]
    async fn stream_reply(&self, history: &[ChatTurn], prompt: &str) -> Result<ReplyStream> {
        debug!("Gemini request URL: {}", self.endpoint);
        let body = Self::request_body(history, prompt)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| FinderError::api(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Gemini returned {}: {}", status, error_text);

            return match status.as_u16() {
                401 | 403 => Err(FinderError::authentication(
                    "Invalid or missing Gemini API key",
                )),
                429 => Err(FinderError::rate_limit("Gemini API quota exceeded")),
                _ => Err(FinderError::api(format!(
                    "Gemini API error {status}: {error_text}"
                ))),
            };
        }

        info!("Gemini reply stream opened");
        Ok(sse_text_stream(response.bytes_stream()))
    }
}

/// Turns a raw SSE byte stream into reply text fragments.
pub(crate) fn sse_text_stream<S, B, E>(bytes: S) -> ReplyStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    struct State<S> {
        bytes: S,
        decoder: SseDecoder,
        pending: VecDeque<String>,
        done: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                let item = text_from_payload(&payload);
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.push(chunk.as_ref())),
                Some(Err(e)) => {
                    state.done = true;
                    state.pending.clear();
                    return Some((
                        Err(FinderError::api(format!("Gemini reply stream interrupted: {e}"))),
                        state,
                    ));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

fn text_from_payload(payload: &str) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| FinderError::parse(format!("Malformed Gemini stream event: {e}")))?;

    if let Some(error) = response.error {
        return Err(match error.code {
            Some(401 | 403) => FinderError::authentication(error.message),
            Some(429) => FinderError::rate_limit(error.message),
            _ => FinderError::api(error.message),
        });
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(FinderError::api(format!("Prompt blocked by Gemini: {reason}")));
    }

    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default())
}

/// Incremental Server-Sent Events decoder that yields `data` payloads.
#[derive(Debug, Default)]
struct SseDecoder {
    line: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line);
                self.feed_line(&line, &mut events);
            } else {
                self.line.push(byte);
            }
        }
        events
    }

    fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.feed_line(&line, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn feed_line(&mut self, line: &[u8], events: &mut Vec<String>) {
        let line = String::from_utf8_lossy(line);
        let line = line.strip_suffix('\r').unwrap_or(&line);

        if line.is_empty() {
            self.dispatch(events);
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // comments, `event:`, `id:` and `retry:` carry nothing we use
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}
