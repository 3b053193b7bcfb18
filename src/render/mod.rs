//! Result rendering
//!
//! Turns a model reply into a [`RenderOutcome`]: one of three user-visible
//! failures, or the decoded labs. Entries with missing or mistyped fields
//! are skipped and logged rather than failing the whole submission.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::extract::extract_json;
use crate::models::{LabEntry, MappedLab, Variant};

pub mod map;
pub mod page;

pub use map::{MapView, Marker};
pub use page::{escape_html, render_page};

/// Shown when the reply contains no brace/bracket span
pub const EXTRACTION_FAILURE_MESSAGE: &str =
    "No valid JSON found in the response. Please try again.";

/// Shown when the span is not valid JSON
pub const DECODE_FAILURE_MESSAGE: &str = "Error decoding the JSON data. Please try again.";

/// What one submission produced
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// No JSON-shaped span in the reply
    ExtractionFailure,
    /// A span was found but did not parse
    DecodeFailure,
    /// The model could not be reached or refused the request
    ServiceUnavailable { message: String },
    /// Decoded labs, in reply order
    Labs(LabReport),
}

/// Labs decoded from one reply
#[derive(Debug, Clone, PartialEq)]
pub struct LabReport {
    pub labs: Vec<LabEntry>,
    /// Elements dropped for missing or mistyped fields
    pub skipped: usize,
    /// Present for the map variant when at least one lab has coordinates
    pub map: Option<MapView>,
}

impl RenderOutcome {
    /// Inline error text, `None` for a successful outcome
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            RenderOutcome::ExtractionFailure => Some(EXTRACTION_FAILURE_MESSAGE),
            RenderOutcome::DecodeFailure => Some(DECODE_FAILURE_MESSAGE),
            RenderOutcome::ServiceUnavailable { message } => Some(message.as_str()),
            RenderOutcome::Labs(_) => None,
        }
    }

    /// Labs to list, empty for every failure
    #[must_use]
    pub fn labs(&self) -> &[LabEntry] {
        match self {
            RenderOutcome::Labs(report) => &report.labs,
            _ => &[],
        }
    }
}

/// Extract and decode a complete model reply
#[must_use]
pub fn render_reply(reply: &str, variant: Variant) -> RenderOutcome {
    match extract_json(reply) {
        Some(candidate) => decode(candidate, variant),
        None => {
            warn!(reply_len = reply.len(), "No JSON span found in model reply");
            RenderOutcome::ExtractionFailure
        }
    }
}

/// Decode an extracted span into labs for `variant`.
///
/// A top-level object counts as a single entry.
#[must_use]
pub fn decode(candidate: &str, variant: Variant) -> RenderOutcome {
    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Extracted span is not valid JSON");
            return RenderOutcome::DecodeFailure;
        }
    };

    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            warn!(kind = json_kind(&other), "Extracted JSON is neither an array nor an object");
            return RenderOutcome::DecodeFailure;
        }
    };

    let report = match variant {
        Variant::List => {
            let (labs, skipped) = collect_entries::<LabEntry>(items, |_| true);
            LabReport {
                labs,
                skipped,
                map: None,
            }
        }
        Variant::Map => {
            let (mapped, skipped) = collect_entries::<MappedLab>(items, has_valid_coordinates);
            let map = MapView::from_labs(&mapped);
            LabReport {
                labs: mapped.into_iter().map(LabEntry::from).collect(),
                skipped,
                map,
            }
        }
    };

    debug!(labs = report.labs.len(), skipped = report.skipped, "Decoded lab entries");
    RenderOutcome::Labs(report)
}

fn collect_entries<T: DeserializeOwned>(
    items: Vec<Value>,
    accept: impl Fn(&T) -> bool,
) -> (Vec<T>, usize) {
    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(entry) if accept(&entry) => entries.push(entry),
            Ok(_) => {
                warn!(index, "Skipping lab entry with out-of-range values");
                skipped += 1;
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping lab entry with missing or mistyped fields");
                skipped += 1;
            }
        }
    }

    (entries, skipped)
}

fn has_valid_coordinates(lab: &MappedLab) -> bool {
    (-90.0..=90.0).contains(&lab.latitude) && (-180.0..=180.0).contains(&lab.longitude)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn report(outcome: RenderOutcome) -> LabReport {
        match outcome {
            RenderOutcome::Labs(report) => report,
            other => panic!("expected labs, got {other:?}"),
        }
    }

    #[test]
    fn test_single_list_entry() {
        let reply = r#"[{"name": "A Lab", "link": "https://maps.google.com/1"}]"#;
        let report = report(render_reply(reply, Variant::List));
        assert_eq!(
            report.labs,
            vec![LabEntry {
                name: "A Lab".to_string(),
                link: "https://maps.google.com/1".to_string(),
            }]
        );
        assert_eq!(report.skipped, 0);
        assert!(report.map.is_none());
    }

    #[test]
    fn test_map_entry_produces_marker() {
        let reply =
            r#"[{"name":"B Lab","latitude":30.27,"longitude":-97.74,"link":"https://x"}]"#;
        let report = report(render_reply(reply, Variant::Map));

        assert_eq!(report.labs.len(), 1);
        assert_eq!(report.labs[0].name, "B Lab");
        let map = report.map.unwrap();
        assert_eq!(map.markers.len(), 1);
        assert_eq!(map.markers[0].latitude, 30.27);
        assert_eq!(map.markers[0].longitude, -97.74);
        assert_eq!(map.markers[0].label, "B Lab");
    }

    #[test]
    fn test_order_is_preserved() {
        let reply = r#"[{"name":"Z","link":"1"},{"name":"A","link":"2"},{"name":"M","link":"3"}]"#;
        let names: Vec<String> = report(render_reply(reply, Variant::List))
            .labs
            .into_iter()
            .map(|lab| lab.name)
            .collect();
        assert_eq!(names, vec!["Z", "A", "M"]);
    }

    #[rstest]
    #[case("I'm sorry, I cannot help.")]
    #[case("no brackets at all")]
    fn test_extraction_failure(#[case] reply: &str) {
        let outcome = render_reply(reply, Variant::List);
        assert_eq!(outcome, RenderOutcome::ExtractionFailure);
        assert!(outcome.labs().is_empty());
        assert_eq!(outcome.error_message(), Some(EXTRACTION_FAILURE_MESSAGE));
    }

    #[rstest]
    #[case::unquoted_key("[{name: Lab1}]")]
    #[case::trailing_comma(r#"[{"name": "A", "link": "x"},]"#)]
    #[case::bare_string_in_brackets("[not json]")]
    fn test_decode_failure(#[case] reply: &str) {
        let outcome = render_reply(reply, Variant::List);
        assert_eq!(outcome, RenderOutcome::DecodeFailure);
        assert!(outcome.labs().is_empty());
        assert_eq!(outcome.error_message(), Some(DECODE_FAILURE_MESSAGE));
    }

    #[test]
    fn test_incomplete_entries_are_skipped() {
        let reply = r#"[
            {"name": "Good", "link": "https://a"},
            {"name": "No link"},
            {"name": 42, "link": "https://b"},
            {"name": "Also good", "link": "https://c"}
        ]"#;
        let report = report(render_reply(reply, Variant::List));
        assert_eq!(report.labs.len(), 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.labs[1].name, "Also good");
    }

    #[test]
    fn test_map_variant_requires_coordinates() {
        let reply = r#"[
            {"name": "No coords", "link": "https://a"},
            {"name": "Text coords", "latitude": "30.1", "longitude": "-97.7", "link": "https://b"},
            {"name": "Off the globe", "latitude": 130.0, "longitude": 0.0, "link": "https://c"},
            {"name": "Fine", "latitude": 30.1, "longitude": -97.7, "link": "https://d"}
        ]"#;
        let report = report(render_reply(reply, Variant::Map));
        assert_eq!(report.skipped, 3);
        assert_eq!(report.labs.len(), 1);
        assert_eq!(report.map.unwrap().markers.len(), 1);
    }

    #[test]
    fn test_map_variant_without_valid_entries_has_no_map() {
        let reply = r#"[{"name": "No coords", "link": "https://a"}]"#;
        let report = report(render_reply(reply, Variant::Map));
        assert!(report.labs.is_empty());
        assert!(report.map.is_none());
    }

    #[test]
    fn test_object_is_a_single_entry() {
        let reply = r#"Sure: {"name": "Solo", "link": "https://solo"}"#;
        let report = report(render_reply(reply, Variant::List));
        assert_eq!(report.labs.len(), 1);
        assert_eq!(report.labs[0].name, "Solo");
    }

    #[test]
    fn test_scalar_json_is_a_decode_failure() {
        assert_eq!(decode("\"just text\"", Variant::List), RenderOutcome::DecodeFailure);
    }

    #[test]
    fn test_decode_round_trip() {
        let labs = vec![
            LabEntry {
                name: "One".to_string(),
                link: "https://one".to_string(),
            },
            LabEntry {
                name: "Two".to_string(),
                link: "https://two".to_string(),
            },
        ];
        let reply = format!("  {}\n", serde_json::to_string(&labs).unwrap());
        assert_eq!(report(render_reply(&reply, Variant::List)).labs, labs);
    }
}
