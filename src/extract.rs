//! Best-effort location of a JSON payload inside free-form model output.
//!
//! This is a textual scan, not a parser. It returns the span from the first
//! `{` or `[` that has a later closer of the same kind up to the *last* such
//! closer, across lines. Nesting is never checked, so prose around the
//! payload that itself contains brackets produces a wrong span; decoding is
//! what ultimately rejects those.

use std::sync::LazyLock;

use regex::Regex;

static JSON_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}|\[.*\]").expect("JSON span pattern is valid"));

/// First greedy brace/bracket span in `text`, or `None` when there is none.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    JSON_SPAN.find(text).map(|m| m.as_str())
}
