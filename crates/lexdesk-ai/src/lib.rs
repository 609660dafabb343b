//! Language-model integration.
//!
//! The upstream model is asked for a fixed JSON shape but may answer with
//! anything. [`normalize`] turns whatever came back into the strict shapes
//! the rest of lexdesk relies on; [`service`] wraps validation, the upstream
//! call and normalisation into the two operations the HTTP routes expose.

pub mod client;
pub mod config;
pub mod extract;
pub mod normalize;
pub mod prompts;
pub mod service;

pub use client::{CompletionClient, CompletionRequest, Message, OpenAiClient, Role, UpstreamError};
pub use config::AiConfig;
pub use extract::extract_json;
pub use normalize::{normalize_analysis, normalize_generation, Generation};
pub use service::{analyze, generate, AiError};
