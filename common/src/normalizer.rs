// Event identifier extraction across scheduler response shapes

use crate::models::EventResponse;
use serde_json::{Map, Value};

type Fields = Map<String, Value>;

/// An extraction rule: a name for logs and a probe over the response fields
pub type ExtractionRule = (&'static str, fn(&Fields) -> Option<String>);

/// Probed in order; the first rule that yields an identifier wins
pub const EXTRACTION_RULES: &[ExtractionRule] = &[
    ("id", |f| identifier(f.get("id"))),
    ("eid", |f| identifier(f.get("eid"))),
    ("event.id", |f| nested_id(f, "event")),
    ("data.id", |f| nested_id(f, "data")),
];

/// Find the event identifier in a create-event response.
///
/// `None` is not an error: the event was most likely created, but its
/// identifier could not be located in this scheduler version's reply.
pub fn extract_event_id(response: &EventResponse) -> Option<String> {
    extract_with(EXTRACTION_RULES, response.fields())
}

/// Apply `rules` in order and return the first identifier found
pub fn extract_with(rules: &[ExtractionRule], fields: &Fields) -> Option<String> {
    rules.iter().find_map(|(name, probe)| {
        let id = probe(fields)?;
        tracing::debug!(rule = name, event_id = %id, "Event identifier located");
        Some(id)
    })
}

fn nested_id(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Object(inner) => identifier(inner.get("id")),
        _ => None,
    }
}

/// Non-empty strings and numbers count as identifiers
fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
