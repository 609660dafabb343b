use thiserror::Error;

/// Errors raised by state operations. A rejected operation leaves the state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
}
