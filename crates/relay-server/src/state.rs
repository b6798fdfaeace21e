use std::sync::Arc;

use relay_config::RelayConfig;
use relay_core::{ChatDefaults, InferenceBackend, RelayError};
use relay_llm::{ClientOptions, OllamaClient};

/// Read-only state shared by every request.
pub struct ServerState {
    pub backend: Arc<dyn InferenceBackend>,
    pub defaults: ChatDefaults,
}

impl ServerState {
    pub fn new(backend: Arc<dyn InferenceBackend>, defaults: ChatDefaults) -> Self {
        Self { backend, defaults }
    }

    /// Builds the Ollama client and chat defaults from the relay config.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let options = ClientOptions {
            chat_timeout: config.chat_timeout(),
            status_timeout: config.status_timeout(),
        };
        let client = OllamaClient::new(&config.ollama_url, &config.model, options)?;

        Ok(Self::new(Arc::new(client), config.chat_defaults()))
    }
}
