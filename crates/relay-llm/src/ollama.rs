//! Ollama native API client with streaming support.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use relay_core::{
    ChatParams, ChunkStream, GenerationStats, InferenceBackend, Message, RelayError, StreamChunk,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Serialize)]
pub struct OllamaOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

/// Body of `POST /api/chat`.
#[derive(Serialize)]
pub struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub options: OllamaOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
}

impl<'a> OllamaChatRequest<'a> {
    pub fn streaming(model: &'a str, params: &'a ChatParams) -> Self {
        Self {
            model,
            messages: &params.messages,
            stream: true,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
            system: Some(params.system.as_str()),
        }
    }
}

#[derive(Deserialize)]
struct ChunkMessage {
    content: Option<String>,
}

/// One line of the `/api/chat` response body.
#[derive(Deserialize)]
struct BackendChunk {
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    eval_duration: Option<u64>,
    total_duration: Option<u64>,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(default)]
    version: Option<String>,
}

/// Decodes one transport chunk of the streamed response.
///
/// Each newline-separated line is parsed on its own; lines that are not a
/// valid chunk object are skipped. Nothing is carried over between calls.
pub fn parse_chunk(bytes: &[u8]) -> Vec<StreamChunk> {
    bytes
        .split(|b| *b == b'\n')
        .filter_map(|line| std::str::from_utf8(line).ok())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Vec<StreamChunk> {
    let chunk: BackendChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            debug!("Skipping malformed Ollama chunk: {} - {}", e, line);
            return vec![];
        }
    };

    let mut parsed = Vec::new();
    if let Some(content) = chunk.message.and_then(|m| m.content) {
        parsed.push(StreamChunk::Content(content));
    }
    if chunk.done {
        parsed.push(StreamChunk::Finished(GenerationStats {
            prompt_eval_count: chunk.prompt_eval_count.unwrap_or(0),
            eval_count: chunk.eval_count.unwrap_or(0),
            eval_duration_ns: chunk.eval_duration.unwrap_or(0),
            total_duration_ns: chunk.total_duration.unwrap_or(0),
        }));
    }
    parsed
}

/// Renders an error with its full source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn transport_error(err: reqwest::Error) -> RelayError {
    match err.is_timeout() {
        true => RelayError::Timeout(describe(&err)),
        false => RelayError::Unreachable(describe(&err)),
    }
}

/// Timeouts applied to backend calls.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Connect and read-inactivity limit for chat calls.
    pub chat_timeout: Duration,
    /// Total limit for the version probe.
    pub status_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            chat_timeout: Duration::from_secs(60),
            status_timeout: Duration::from_secs(3),
        }
    }
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    status_timeout: Duration,
}

impl OllamaClient {
    /// Creates a new Ollama client. The connection pool is shared by all calls.
    pub fn new(base_url: &str, model: &str, options: ClientOptions) -> Result<Self, RelayError> {
        let client = Client::builder()
            .connect_timeout(options.chat_timeout)
            .read_timeout(options.chat_timeout)
            .build()
            .map_err(|e| RelayError::Unreachable(describe(&e)))?;

        info!("OllamaClient: base_url={}, model={}", base_url, model);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            status_timeout: options.status_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_stream(&self, params: &ChatParams) -> Result<ChunkStream, RelayError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest::streaming(&self.model, params);

        debug!(
            "Ollama chat: {} messages, temperature={}, num_predict={}",
            params.messages.len(),
            params.temperature,
            params.max_tokens
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream { status: status.as_u16(), body });
        }

        let mapped = response
            .bytes_stream()
            .map(|result| match result {
                Ok(bytes) => parse_chunk(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(RelayError::Stream(describe(&e)))],
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(mapped))
    }

    async fn version(&self) -> Result<Option<String>, RelayError> {
        let url = format!("{}/api/version", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream { status: status.as_u16(), body });
        }

        let info: VersionResponse = response.json().await.map_err(|e| match e.is_decode() {
            true => RelayError::Parse(describe(&e)),
            false => transport_error(e),
        })?;

        Ok(info.version)
    }
}
