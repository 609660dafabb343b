use serde_json::{Map, Value};

/// Pull a JSON object out of model output.
///
/// Tries the whole text first, then the span from the first `{` to the last
/// `}` inclusive. Returns `None` if neither parses to an object.
///
/// This is a heuristic, not a balanced-brace scanner: prose after the object
/// that itself contains a `}` widens the span past the real end and the
/// second attempt fails.
///
/// A top-level value that parses but is not an object (an array, say) does
/// not end the search: the brace span inside it is tried next, so
/// `[{"summary":"a"}]` yields `{"summary":"a"}`.
pub fn extract_json(raw: &str) -> Option<Map<String, Value>> {
    if raw.trim().is_empty() {
        return None;
    }
    if let Some(obj) = parse_object(raw) {
        return Some(obj);
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&raw[start..=end])
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}
