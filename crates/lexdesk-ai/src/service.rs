use lexdesk_core::AnalysisResult;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{CompletionClient, CompletionRequest, UpstreamError};
use crate::normalize::{normalize_analysis, normalize_generation, Generation};
use crate::prompts::ANALYSIS_SYSTEM_PROMPT;

pub const MISSING_CREDENTIAL: &str = "Missing OPENAI_API_KEY";
pub const MISSING_PROMPT: &str = "Missing prompt";
pub const MISSING_TEXT: &str = "Missing text (string)";

#[derive(Error, Debug)]
pub enum AiError {
    /// The request itself was unusable.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// No upstream credential is configured.
    #[error("Missing OPENAI_API_KEY")]
    MissingCredential,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl AiError {
    /// Whether the caller, not the upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AiError::Upstream(_))
    }
}

/// Free-form generation. The credential is checked before the prompt, and
/// nothing is sent upstream unless both are present.
pub fn generate(
    client: Option<&dyn CompletionClient>,
    prompt: Option<&str>,
    system: Option<&str>,
) -> Result<Generation, AiError> {
    let client = client.ok_or(AiError::MissingCredential)?;
    let prompt = prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or(AiError::InvalidInput(MISSING_PROMPT))?;

    info!(model = client.model(), prompt_chars = prompt.len(), "generate");
    let out = client
        .complete(&CompletionRequest::new(system, prompt))
        .inspect_err(|e| warn!(error = %e, "generation failed upstream"))?;
    Ok(normalize_generation(Some(out.as_str())))
}

/// Structured analysis of `text`. Always yields a fully populated result
/// once the upstream call succeeds.
pub fn analyze(
    client: Option<&dyn CompletionClient>,
    text: Option<&str>,
) -> Result<AnalysisResult, AiError> {
    let client = client.ok_or(AiError::MissingCredential)?;
    let text = text
        .filter(|t| !t.trim().is_empty())
        .ok_or(AiError::InvalidInput(MISSING_TEXT))?;

    info!(model = client.model(), text_chars = text.len(), "analyze");
    let out = client
        .complete(&CompletionRequest::new(Some(ANALYSIS_SYSTEM_PROMPT), text))
        .inspect_err(|e| warn!(error = %e, "analysis failed upstream"))?;
    Ok(normalize_analysis(&out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Role;
    use std::sync::Mutex;

    struct FakeClient {
        reply: Result<String, (u16, String)>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeClient {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16, message: &str) -> Self {
            Self {
                reply: Err((status, message.to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CompletionClient for FakeClient {
        fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
            self.calls.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err((status, message)) => Err(UpstreamError::Status {
                    status: *status,
                    message: message.clone(),
                }),
            }
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    #[test]
    fn missing_credential_wins_over_missing_input() {
        let err = generate(None, None, None).unwrap_err();
        assert!(matches!(err, AiError::MissingCredential));
        assert!(err.is_client_error());
        let err = analyze(None, Some("text")).unwrap_err();
        assert_eq!(err.to_string(), MISSING_CREDENTIAL);
    }

    #[test]
    fn missing_input_never_calls_upstream() {
        let fake = FakeClient::replying("unused");
        let err = generate(Some(&fake), Some("  "), None).unwrap_err();
        assert_eq!(err.to_string(), MISSING_PROMPT);
        let err = analyze(Some(&fake), None).unwrap_err();
        assert_eq!(err.to_string(), MISSING_TEXT);
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn generate_passes_system_prompt_and_returns_text() {
        let fake = FakeClient::replying("Dear counsel,");
        let out = generate(Some(&fake), Some("write a letter"), Some("be formal")).unwrap();
        assert_eq!(out.text, "Dear counsel,");

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages[0].role, Role::System);
        assert_eq!(calls[0].messages[1].content, "write a letter");
    }

    #[test]
    fn analyze_normalizes_wrapped_json() {
        let fake = FakeClient::replying(
            "Here you go: {\"summary\":\"S\",\"risks\":[\"R1\"]} thanks",
        );
        let out = analyze(Some(&fake), Some("contract text")).unwrap();
        assert_eq!(out.summary, "S");
        assert_eq!(out.risks, vec!["R1".to_string()]);
        assert!(out.clauses.is_empty());
        assert!(out.recommendations.is_empty());

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0].messages[0].content, ANALYSIS_SYSTEM_PROMPT);
    }

    #[test]
    fn analyze_with_prose_only_uses_it_as_summary() {
        let fake = FakeClient::replying("The document looks fine.");
        let out = analyze(Some(&fake), Some("text")).unwrap();
        assert_eq!(out.summary, "The document looks fine.");
        assert!(out.risks.is_empty());
    }

    #[test]
    fn upstream_failure_passes_message_through() {
        let fake = FakeClient::failing(401, "Incorrect API key provided");
        let err = analyze(Some(&fake), Some("text")).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Incorrect API key provided");
    }
}
