//! Inference backend clients for the chat relay.
//!
//! [`OllamaClient`] implements [`relay_core::InferenceBackend`] against
//! Ollama's native API: `POST /api/chat` for streamed completions and
//! `GET /api/version` for availability checks.

mod ollama;

pub use ollama::{parse_chunk, ClientOptions, OllamaChatRequest, OllamaClient, OllamaOptions};
