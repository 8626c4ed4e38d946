//! On-device generator adapter.
//!
//! Wraps an [`EngineBackend`] and normalizes its raw text blob into the
//! canonical [`GenerationResult`]. Malformed output is deliberately NOT an
//! error: it downgrades to the empty/zero-confidence record so the
//! router's no-calls rule escalates to cloud naturally. Engine transport
//! faults, by contrast, do propagate.

use async_trait::async_trait;
use serde::Deserialize;

use super::{GenerationResult, Generator, Message};
use crate::config::LocalConfig;
use crate::engine::{create_engine, EngineBackend, EngineRequest};
use crate::tools::{FunctionCall, ToolSpec};

/// System preamble prepended before the caller's messages.
const SYSTEM_PREAMBLE: &str = "You are a helpful assistant that can use tools.";

// ── Engine output parsing ────────────────────────────────────────

/// Shape the engine's blob is expected to deserialize to. Every field is
/// optional; absent fields default so partially-shaped output still counts.
#[derive(Debug, Deserialize)]
struct RawEngineOutput {
    #[serde(default)]
    function_calls: Vec<FunctionCall>,
    #[serde(default)]
    total_time_ms: f64,
    #[serde(default)]
    confidence: f64,
}

/// The explicit parse step: blob in, parsed record or parse error out.
/// The caller decides what the error means — here, "treat as no-call".
fn parse_engine_output(raw: &str) -> Result<RawEngineOutput, serde_json::Error> {
    serde_json::from_str(raw)
}

// ── Adapter ──────────────────────────────────────────────────────

/// Generator backed by the on-device engine.
pub struct LocalGenerator {
    backend: Box<dyn EngineBackend>,
}

impl LocalGenerator {
    pub fn new(backend: Box<dyn EngineBackend>) -> Self {
        Self { backend }
    }

    /// Build from config via the engine factory.
    pub fn from_config(config: &LocalConfig) -> anyhow::Result<Self> {
        Ok(Self::new(create_engine(config)?))
    }
}

#[async_trait]
impl Generator for LocalGenerator {
    fn name(&self) -> &str {
        "on-device"
    }

    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<GenerationResult> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(Message::system(SYSTEM_PREAMBLE));
        full_messages.extend_from_slice(messages);

        let request = EngineRequest::function_call(full_messages, tools);

        // Acquire fresh per request; the handle's Drop releases the model
        // on every exit path below, including the error returns.
        let mut handle = self.backend.acquire().await?;
        let raw = handle.complete(&request).await;
        drop(handle);
        let raw = raw?;

        Ok(match parse_engine_output(&raw) {
            Ok(parsed) => GenerationResult {
                function_calls: parsed.function_calls,
                total_time_ms: parsed.total_time_ms,
                confidence: Some(parsed.confidence),
                source: None,
                local_confidence: None,
            },
            Err(e) => {
                tracing::debug!(error = %e, "malformed engine output — treating as no-call");
                GenerationResult::empty()
            }
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
