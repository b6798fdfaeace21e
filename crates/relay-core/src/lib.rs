//! Core domain types and error definitions for the chat relay.
//!
//! This crate provides the types shared across the relay workspace:
//!
//! - [`RelayError`] - Error type for backend and streaming operations
//! - [`Message`] and [`MessageRole`] - Conversation message types
//! - [`ChatRequest`] and [`ChatParams`] - Inbound request before and after defaults
//! - [`StreamChunk`] and [`RelayEvent`] - Backend fragments and outbound events
//! - [`HealthReport`] and [`BackendStatus`] - Probe responses
//! - [`InferenceBackend`] - Trait implemented by inference server clients
//!
//! # Example
//!
//! ```rust
//! use relay_core::{ChatDefaults, ChatRequest};
//!
//! let body = serde_json::json!({
//!     "messages": [{ "role": "user", "content": "Hello!" }],
//!     "temperature": 0.2
//! });
//!
//! let defaults = ChatDefaults {
//!     system_prompt: "You are a helpful assistant.".to_string(),
//!     temperature: 0.7,
//!     max_tokens: 2000,
//! };
//!
//! let params = ChatRequest::from_value(&body).resolve(&defaults);
//! assert_eq!(params.temperature, 0.2);
//! assert_eq!(params.max_tokens, 2000);
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Terminal marker sent to the caller once the backend stream is exhausted.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Errors that can occur while talking to the inference backend.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Backend answered with a non-success status before streaming began.
    #[error("Ollama API error: {body}")]
    Upstream { status: u16, body: String },

    /// Backend could not be reached.
    #[error("Failed to connect to Ollama service: {0}")]
    Unreachable(String),

    /// Backend did not answer within the configured timeout.
    #[error("Ollama request timed out: {0}")]
    Timeout(String),

    /// Backend byte stream failed after streaming began.
    #[error("Ollama stream interrupted: {0}")]
    Stream(String),

    /// Backend response body could not be decoded.
    #[error("Failed to parse Ollama response: {0}")]
    Parse(String),
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the assistant/LLM.
    Assistant,
    /// Instruction message.
    System,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Values substituted for anything a [`ChatRequest`] leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDefaults {
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Chat request as received from the caller.
///
/// Parsing never fails: fields with the wrong shape are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Reads a request from an arbitrary JSON body.
    ///
    /// Message entries that are not `{role, content}` objects with a known
    /// role are dropped. An empty `systemPrompt` counts as absent.
    pub fn from_value(value: &Value) -> Self {
        let messages = value
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| Message::deserialize(item).ok())
                    .collect()
            })
            .unwrap_or_default();

        let system_prompt = value
            .get("systemPrompt")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let temperature = value.get("temperature").and_then(Value::as_f64);

        let max_tokens = value
            .get("max_tokens")
            .and_then(as_whole_number)
            .and_then(|n| u32::try_from(n).ok());

        Self { messages, system_prompt, temperature, max_tokens }
    }

    /// Applies defaults, producing the parameters sent to the backend.
    pub fn resolve(self, defaults: &ChatDefaults) -> ChatParams {
        ChatParams {
            messages: self.messages,
            system: self
                .system_prompt
                .unwrap_or_else(|| defaults.system_prompt.clone()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

/// Accepts non-negative integers and floats with no fractional part.
fn as_whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as u64)
}

/// A chat request with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatParams {
    pub messages: Vec<Message>,
    pub system: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Generation statistics reported by the backend's final chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationStats {
    pub prompt_eval_count: u32,
    pub eval_count: u32,
    pub eval_duration_ns: u64,
    pub total_duration_ns: u64,
}

impl GenerationStats {
    pub fn tokens_per_sec(&self) -> f64 {
        if self.eval_duration_ns == 0 {
            return 0.0;
        }
        self.eval_count as f64 / (self.eval_duration_ns as f64 / 1_000_000_000.0)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ns / 1_000_000
    }
}

/// A decoded item from the backend stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Text fragment found at `message.content`.
    Content(String),
    /// Backend signalled the end of generation.
    Finished(GenerationStats),
}

/// Stream of decoded backend chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, RelayError>> + Send>>;

/// One server-sent event delivered to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Text(String),
    Done,
}

#[derive(Serialize)]
struct TextPayload<'a> {
    text: &'a str,
}

impl RelayEvent {
    /// The `data:` field of the event.
    pub fn data(&self) -> String {
        match self {
            RelayEvent::Text(text) => serde_json::to_string(&TextPayload { text })
                .unwrap_or_else(|_| String::from("{\"text\":\"\"}")),
            RelayEvent::Done => DONE_SENTINEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
}

/// Response of the liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub timestamp: String,
}

impl HealthReport {
    pub fn healthy(timestamp: impl Into<String>) -> Self {
        Self { status: HealthState::Healthy, timestamp: timestamp.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    Online,
    Offline,
}

/// Response of the backend availability probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub status: BackendState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl BackendStatus {
    pub fn online(version: Option<String>, model: &str) -> Self {
        Self {
            status: BackendState::Online,
            message: "Ollama service is running".to_string(),
            version: Some(version.unwrap_or_else(|| "unknown".to_string())),
            model: Some(model.to_string()),
        }
    }

    pub fn offline(message: impl Into<String>) -> Self {
        Self {
            status: BackendState::Offline,
            message: message.into(),
            version: None,
            model: None,
        }
    }

    /// Folds the outcome of a version request into a report. Never fails.
    pub fn from_probe(result: Result<Option<String>, RelayError>, model: &str) -> Self {
        match result {
            Ok(version) => Self::online(version, model),
            Err(RelayError::Upstream { status, .. }) => {
                Self::offline(format!("Ollama service returned status code {}", status))
            }
            Err(e @ RelayError::Unreachable(_)) => Self::offline(e.to_string()),
            Err(e) => Self::offline(format!("Failed to connect to Ollama service: {}", e)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == BackendState::Online
    }
}

/// Client for an inference server able to stream chat completions.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Model name sent with every chat request.
    fn model(&self) -> &str;

    /// Opens a streaming chat call.
    ///
    /// Fails before any chunk is produced if the backend is unreachable or
    /// rejects the request.
    async fn chat_stream(&self, params: &ChatParams) -> Result<ChunkStream, RelayError>;

    /// Fetches the version reported by the backend, if any.
    async fn version(&self) -> Result<Option<String>, RelayError>;

    /// Probes the backend and reports its availability.
    async fn status(&self) -> BackendStatus {
        BackendStatus::from_probe(self.version().await, self.model())
    }
}
