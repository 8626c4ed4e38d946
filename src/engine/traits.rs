//! Trait seam for the opaque on-device inference engine.
//!
//! The engine is a black box: it accepts a conversation plus tool
//! declarations and returns a single text blob. Backends implement
//! [`EngineBackend`]; a request acquires the model resource through
//! [`EngineBackend::acquire`] and holds it as a [`ModelHandle`] whose
//! `Drop` impl releases it — so release happens on every exit path,
//! success and failure alike.

use async_trait::async_trait;
use serde::Serialize;

use crate::generator::Message;
use crate::tools::ToolSpec;

// ── Generation parameters ────────────────────────────────────────

/// Hard cap on generated tokens per on-device completion.
pub const MAX_GENERATED_TOKENS: u32 = 256;

/// End-of-turn markers the engine must stop at.
pub const STOP_SEQUENCES: &[&str] = &["<|im_end|>", "<end_of_turn>"];

// ── Wire shapes ──────────────────────────────────────────────────

/// Tool declaration in the shape the on-device engine expects.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    #[serde(rename = "type")]
    pub decl_type: String,
    pub function: ToolSpec,
}

impl From<&ToolSpec> for ToolDeclaration {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            decl_type: "function".into(),
            function: spec.clone(),
        }
    }
}

/// One on-device completion request.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// Full conversation, system preamble included.
    pub messages: Vec<Message>,
    /// Declared tools, wrapped in the engine's `{type, function}` shape.
    pub tools: Vec<ToolDeclaration>,
    /// Generation cap.
    pub max_tokens: u32,
    /// Stop markers.
    pub stop_sequences: Vec<String>,
    /// Constrain generation to tool-call-shaped output.
    pub force_tools: bool,
}

impl EngineRequest {
    /// Build a function-calling request with the standard generation
    /// parameters (token cap, end-of-turn stops, forced tool output).
    pub fn function_call(messages: Vec<Message>, tools: &[ToolSpec]) -> Self {
        Self {
            messages,
            tools: tools.iter().map(ToolDeclaration::from).collect(),
            max_tokens: MAX_GENERATED_TOKENS,
            stop_sequences: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            force_tools: true,
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────

/// Faults at the engine boundary. Malformed *output* is not an engine
/// fault — the local adapter downgrades that case itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The backend is unreachable or the model could not be acquired.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// The completion call itself failed.
    #[error("engine completion failed: {0}")]
    Completion(String),
}

// ── Backend traits ───────────────────────────────────────────────

/// An on-device inference backend.
#[async_trait]
pub trait EngineBackend: Send + Sync {
    /// Short backend name for logs and factory diagnostics.
    fn name(&self) -> &str;

    /// Acquire the model resource for one request.
    ///
    /// The returned handle owns the resource; dropping it releases the
    /// resource. A handle must not be shared between in-flight requests —
    /// callers acquire fresh per request.
    async fn acquire(&self) -> Result<Box<dyn ModelHandle>, EngineError>;
}

/// An acquired model resource. Release happens on `Drop`.
#[async_trait]
pub trait ModelHandle: Send {
    /// Run one completion and return the engine's raw text blob.
    async fn complete(&mut self, request: &EngineRequest) -> Result<String, EngineError>;
}

// ── Tests ────────────────────────────────────────────────────────
