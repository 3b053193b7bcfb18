//! `SoilLab` - find nearby soil testing labs with a hosted chat model
//!
//! A location typed by the user is wrapped in a fixed prompt, sent to the
//! model over a streamed chat session, and the JSON list in the reply is
//! rendered as an HTML list and, optionally, a map.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod web;

// Re-export core types for public API
pub use chat::{ChatModel, ChatSession, GeminiClient, ReplyStream};
pub use config::SoilLabConfig;
pub use error::FinderError;
pub use extract::extract_json;
pub use models::{ChatRole, ChatTurn, LabEntry, MappedLab, Variant};
pub use pipeline::LabFinder;
pub use prompt::build_prompt;
pub use render::{LabReport, MapView, RenderOutcome, render_reply};
pub use web::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, FinderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
