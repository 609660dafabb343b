use lexdesk_core::{AnalysisResult, Clause};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extract::extract_json;

/// Summary used when the model returned no text at all. Whitespace-only
/// output is still text and becomes the summary as is.
pub const EMPTY_SUMMARY: &str = "No summary returned.";

/// Response body of the generate route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

/// Coerce model output into a fully populated [`AnalysisResult`]. Never fails.
///
/// Each field is taken from the extracted object independently; a missing or
/// wrongly typed field becomes its empty default. Output without any JSON
/// object becomes the summary verbatim.
pub fn normalize_analysis(raw: &str) -> AnalysisResult {
    match extract_json(raw) {
        Some(obj) => AnalysisResult {
            summary: string_field(&obj, "summary"),
            risks: string_list(obj.get("risks")),
            clauses: clause_list(obj.get("clauses")),
            recommendations: string_list(obj.get("recommendations")),
        },
        None => AnalysisResult {
            summary: if raw.is_empty() {
                EMPTY_SUMMARY.to_string()
            } else {
                raw.to_string()
            },
            ..Default::default()
        },
    }
}

/// Wrap raw generated text. Absent output becomes an empty string.
pub fn normalize_generation(raw: Option<&str>) -> Generation {
    Generation {
        text: raw.unwrap_or_default().to_string(),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Strings pass through; other scalars and nested values are rendered as
/// JSON text; nulls are dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect()
}

/// Objects map to `{name, excerpt}` (missing parts empty); a bare string is
/// taken as the clause name; anything else is dropped.
fn clause_list(value: Option<&Value>) -> Vec<Clause> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(Clause {
                name: string_field(obj, "name"),
                excerpt: string_field(obj, "excerpt"),
            }),
            Value::String(name) => Some(Clause {
                name: name.clone(),
                excerpt: String::new(),
            }),
            _ => None,
        })
        .collect()
}
