use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Longest upstream error body passed through verbatim.
const MAX_ERROR_BODY: usize = 500;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    /// Non-2xx from the completion endpoint; `message` is the upstream's own
    /// error message when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("unreadable upstream response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    /// An optional system message followed by one user message.
    pub fn new(system: Option<&str>, user: &str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            messages.push(Message {
                role: Role::System,
                content: system.to_string(),
            });
        }
        messages.push(Message {
            role: Role::User,
            content: user.to_string(),
        });
        Self { messages }
    }
}

/// A text-completion endpoint.
pub trait CompletionClient: Send + Sync {
    /// The model's output text, empty if it produced none.
    fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;

    fn model(&self) -> &str;
}

/// Client for the OpenAI Responses API (`POST {base_url}/responses`).
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let url = format!("{}/responses", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": request.messages,
        });

        debug!(url = %url, model = %self.model, messages = request.messages.len(), "calling completion endpoint");
        let mut resp = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(body.to_string())
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(UpstreamError::Status {
                status,
                message: error_message(&text, status),
            });
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(output_text(&value))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Concatenated text of a Responses API payload.
///
/// Prefers the `output_text` convenience field; otherwise joins every
/// `output[].content[]` part of type `output_text`.
pub fn output_text(response: &Value) -> String {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }
    let Some(output) = response.get("output").and_then(Value::as_array) else {
        return String::new();
    };
    output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

/// Best human-readable message from an error response body.
fn error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("upstream returned HTTP {status}")
    } else {
        body.chars().take(MAX_ERROR_BODY).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;

    /// Serve one canned HTTP response and hand back the request body.
    fn one_shot_server(status_line: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
            }
            let mut buf = vec![0u8; content_length];
            reader.read_exact(&mut buf).unwrap();
            tx.send(String::from_utf8(buf).unwrap()).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
        });
        (format!("http://{addr}/v1"), rx)
    }

    #[test]
    fn request_puts_system_first_and_skips_blank_system() {
        let req = CompletionRequest::new(Some("be careful"), "hello");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(CompletionRequest::new(Some("  "), "hello").messages.len(), 1);
        assert_eq!(CompletionRequest::new(None, "hello").messages[0].role, Role::User);
    }

    #[test]
    fn output_text_prefers_convenience_field() {
        assert_eq!(output_text(&json!({"output_text": "hi"})), "hi");
    }

    #[test]
    fn output_text_joins_content_parts() {
        let resp = json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Hello, "},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "world"}
                ]}
            ]
        });
        assert_eq!(output_text(&resp), "Hello, world");
        assert_eq!(output_text(&json!({})), "");
    }

    #[test]
    fn error_message_passes_upstream_text_through() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body, 401), "Incorrect API key provided");
        assert_eq!(error_message(r#"{"error":"flat"}"#, 500), "flat");
        assert_eq!(error_message("", 502), "upstream returned HTTP 502");
        assert_eq!(error_message("Bad Gateway", 502), "Bad Gateway");
    }

    #[test]
    fn client_posts_messages_and_reads_output() {
        let (base, rx) = one_shot_server("200 OK", r#"{"output_text":"Drafted."}"#);
        let client = OpenAiClient::new("sk-test", "test-model", &base, Duration::from_secs(5));
        let out = client
            .complete(&CompletionRequest::new(Some("sys"), "write"))
            .unwrap();
        assert_eq!(out, "Drafted.");

        let sent: Value = serde_json::from_str(&rx.recv().unwrap()).unwrap();
        assert_eq!(sent["model"], "test-model");
        assert_eq!(sent["input"][0]["role"], "system");
        assert_eq!(sent["input"][1]["content"], "write");
    }

    #[test]
    fn client_maps_error_status() {
        let (base, _rx) = one_shot_server(
            "429 Too Many Requests",
            r#"{"error":{"message":"Rate limit reached"}}"#,
        );
        let client = OpenAiClient::new("sk-test", "m", &base, Duration::from_secs(5));
        let err = client
            .complete(&CompletionRequest::new(None, "x"))
            .unwrap_err();
        match err {
            UpstreamError::Status { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = OpenAiClient::new(
            "sk-test",
            "m",
            &format!("http://{addr}"),
            Duration::from_secs(2),
        );
        let err = client
            .complete(&CompletionRequest::new(None, "x"))
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }
}
