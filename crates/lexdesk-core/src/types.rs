use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::lenient::{amount, count, lenient, list};

/// Current schema version for the persisted application state.
pub const SCHEMA_VERSION: u32 = 1;

/// Document ID format: `doc_<ulid>`
pub type DocumentId = String;

/// Task ID format: `task_<ulid>`
pub type TaskId = String;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn schema_version<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let n = count(deserializer)?;
    Ok(u32::try_from(n)
        .ok()
        .filter(|v| *v > 0)
        .unwrap_or(SCHEMA_VERSION))
}

/// The single root record holding all persisted application data for one profile.
///
/// Field names are camelCase on disk. Every field is defaulted and tolerant:
/// a missing, `null` or wrongly typed field reads as its default, and list
/// elements that cannot be read are skipped. Only a blob that is not a JSON
/// object at all fails to load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default = "default_schema_version", deserialize_with = "schema_version")]
    pub schema_version: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub user: User,
    #[serde(default, deserialize_with = "lenient")]
    pub metrics: Metrics,
    /// Display order, newest first.
    #[serde(default, deserialize_with = "list")]
    pub documents: Vec<Document>,
    #[serde(default, deserialize_with = "list")]
    pub tasks: Vec<Task>,
    #[serde(default, deserialize_with = "list")]
    pub events: Vec<CalendarEvent>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            user: User::default(),
            metrics: Metrics::default(),
            documents: Vec::new(),
            tasks: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
}

/// Cached dashboard counters.
///
/// `total_documents` is derived from `AppState::documents`; the rest are
/// running tallies bumped by the operations that produce them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default, deserialize_with = "count")]
    pub total_documents: u64,
    #[serde(default, deserialize_with = "count")]
    pub case_analyses: u64,
    #[serde(default, deserialize_with = "count")]
    pub ai_generations: u64,
    #[serde(default, deserialize_with = "amount")]
    pub time_saved_hours: f64,
}

// ── Enums ──

/// Generates `as_str`, `Display` and a strict `FromStr` (with extra accepted
/// spellings) for a snake_case enum.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = StateError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name $(| $alias)* => Ok($ty::$variant),)+
                    _ => Err(StateError::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Contract,
    #[serde(alias = "NDA")]
    Nda,
    #[default]
    Agreement,
    #[serde(alias = "letter")]
    LegalLetter,
    PrivacyPolicy,
    Terms,
    /// Any type this build does not know about.
    #[serde(other)]
    Other,
}

string_enum!(DocumentType, "document type", {
    Contract => "contract",
    Nda => "nda",
    Agreement => "agreement",
    LegalLetter => "legal_letter" | "letter",
    PrivacyPolicy => "privacy_policy",
    Terms => "terms",
    Other => "other",
});

impl DocumentType {
    /// Human-readable label used in listings and default titles.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Contract => "Contract",
            DocumentType::Nda => "NDA",
            DocumentType::Agreement => "Agreement",
            DocumentType::LegalLetter => "Legal Letter",
            DocumentType::PrivacyPolicy => "Privacy Policy",
            DocumentType::Terms => "Terms of Service",
            DocumentType::Other => "Document",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Review,
    Final,
}

string_enum!(DocumentStatus, "document status", {
    Draft => "draft",
    Review => "review",
    Final => "final",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

string_enum!(TaskPriority, "task priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Persisted task status. `Overdue` is stored, not computed; see
/// [`Task::effective_status`] for the clock-derived view.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    Overdue,
    Done,
}

string_enum!(TaskStatus, "task status", {
    Open => "open",
    Overdue => "overdue",
    Done => "done",
});

// ── Records ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, deserialize_with = "lenient")]
    pub id: DocumentId,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub doc_type: DocumentType,
    #[serde(default, deserialize_with = "lenient")]
    pub status: DocumentStatus,
    #[serde(default, alias = "clientName", deserialize_with = "lenient")]
    pub client: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub matter: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub jurisdiction: String,
    /// `YYYY-MM-DD` or RFC 3339.
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, alias = "body", deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Open map; holds `lastAnalysis` / `lastAnalysisAt` once an analysis is attached.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "lenient")]
    pub id: TaskId,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient")]
    pub priority: TaskPriority,
    #[serde(default, deserialize_with = "lenient")]
    pub tag: String,
    #[serde(default, deserialize_with = "lenient")]
    pub client: String,
    #[serde(default, deserialize_with = "lenient")]
    pub due_at: String,
    #[serde(default, deserialize_with = "lenient")]
    pub status: TaskStatus,
}

/// A date-stamped calendar entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    /// `YYYY-MM-DD`, optionally followed by a time.
    #[serde(default, deserialize_with = "lenient")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub client: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

// ── Analysis ──

/// A named clause quoted from the analyzed text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clause {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub excerpt: String,
}

/// Strictly-shaped analysis of a document. Every field is always present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}
