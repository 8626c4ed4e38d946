//! edgegate — on-device first function calling.
//!
//! Routes each function-calling request to a local small-model engine or a
//! cloud API, deciding per-request which to trust: confident, structurally
//! valid local output is accepted; anything risky escalates to cloud with
//! merged telemetry.

pub mod config;
pub mod engine;
pub mod generator;
pub mod present;
pub mod router;
pub mod tools;

pub use config::Config;
pub use generator::{CloudGenerator, GenerationResult, Generator, LocalGenerator, Message, Role};
pub use router::{FallbackReason, HybridRouter, DEFAULT_CONFIDENCE_THRESHOLD};
pub use tools::{validate_toolset, FunctionCall, ToolIndex, ToolSpec};
