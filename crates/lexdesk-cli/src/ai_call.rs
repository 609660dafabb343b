use lexdesk_ai::{AiConfig, AiError, CompletionClient, OpenAiClient};

/// Completion client from the environment, if a credential is configured.
pub fn client_from_env() -> Option<OpenAiClient> {
    AiConfig::from_env().client()
}

pub fn as_dyn(client: &Option<OpenAiClient>) -> Option<&dyn CompletionClient> {
    client.as_ref().map(|c| c as &dyn CompletionClient)
}

/// Run a blocking model call on a worker thread.
///
/// Ctrl-C abandons the call: the worker is left to finish or time out on its
/// own and its result is discarded.
pub fn interruptible<T, F>(label: &str, call: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AiError> + Send + 'static,
{
    let rt = tokio::runtime::Runtime::new()?;
    eprintln!("{label}... (Ctrl-C to abandon)");
    let outcome = rt.block_on(async {
        let task = tokio::task::spawn_blocking(call);
        tokio::select! {
            joined = task => match joined {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(e) => Err(anyhow::anyhow!("model call panicked: {e}")),
            },
            _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("{label} abandoned")),
        }
    });
    // Do not wait for an abandoned worker.
    rt.shutdown_background();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_call_result() {
        let out = interruptible("test", || Ok::<_, AiError>(41 + 1)).unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn surfaces_the_call_error() {
        let err = interruptible::<(), _>("test", || Err(AiError::MissingCredential)).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
