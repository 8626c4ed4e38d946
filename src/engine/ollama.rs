//! Ollama-backed on-device engine.
//!
//! Talks to a local Ollama server over its REST API. Acquisition is a
//! health check against `/api/tags`; completion posts the conversation and
//! tool declarations to `/api/chat` and returns the assistant message
//! content as the raw blob. The HTTP session holds no server-side state,
//! so release on drop is a no-op — the handle exists to satisfy the
//! scoped-acquisition contract uniformly across backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::{EngineBackend, EngineError, EngineRequest, ModelHandle, ToolDeclaration};
use crate::config::LocalConfig;
use crate::generator::Message;

// ── Wire shapes ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclaration>>,
    /// "json" constrains output to JSON, the closest the API offers to
    /// forced tool-call shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    stop: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

// ── Backend ──────────────────────────────────────────────────────

/// On-device engine backed by a local Ollama server.
pub struct OllamaEngine {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEngine {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .connect_timeout(std::time::Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn from_config(config: &LocalConfig) -> Self {
        Self::new(&config.ollama_url, &config.model, config.timeout_secs)
    }
}

#[async_trait]
impl EngineBackend for OllamaEngine {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn acquire(&self) -> Result<Box<dyn ModelHandle>, EngineError> {
        // Ollama health check: GET /api/tags
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(Box::new(OllamaHandle {
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                client: self.client.clone(),
            })),
            Ok(resp) => Err(EngineError::Unavailable(format!(
                "Ollama returned status {}",
                resp.status()
            ))),
            Err(e) => Err(EngineError::Unavailable(e.to_string())),
        }
    }
}

struct OllamaHandle {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[async_trait]
impl ModelHandle for OllamaHandle {
    async fn complete(&mut self, request: &EngineRequest) -> Result<String, EngineError> {
        let body = OllamaChatRequest {
            model: self.model.clone(),
            messages: request.messages.clone(),
            tools: (!request.tools.is_empty()).then(|| request.tools.clone()),
            format: request.force_tools.then(|| "json".to_string()),
            stream: false,
            options: OllamaOptions {
                num_predict: request.max_tokens,
                stop: request.stop_sequences.clone(),
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Completion(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Completion(format!(
                "Ollama returned status {status}: {text}"
            )));
        }

        let chat: OllamaChatResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Completion(e.to_string()))?;

        // The blob may be anything, including empty or non-JSON text; what
        // to do with it is the adapter's call, not the backend's.
        Ok(chat.message.content)
    }
}

// ── Tests ────────────────────────────────────────────────────────
