//! Canonical generation types and the generator seam.
//!
//! Both generation paths — the on-device engine and the cloud API — sit
//! behind the [`Generator`] trait and produce the same canonical
//! [`GenerationResult`] record, so the router never knows which backend it
//! is talking to and tests can substitute deterministic mocks.

pub mod cloud;
pub mod local;

pub use cloud::CloudGenerator;
pub use local::LocalGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::{FunctionCall, ToolSpec};

// ── Conversation messages ────────────────────────────────────────

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of the ordered conversation supplied per request.
///
/// Only `user`-role contents are inspected by the router's complexity
/// heuristic and forwarded by the cloud adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Lower-cased, space-joined concatenation of all user-role contents.
///
/// This is the exact text the router's complexity heuristic scans; the
/// joining/casing details are part of the routing contract, so they live
/// next to the type instead of being re-derived ad hoc.
pub fn joined_user_text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ── Canonical result record ──────────────────────────────────────

/// Canonical outcome of one generation attempt.
///
/// Created by an adapter per call, optionally enriched exactly once by the
/// router (which adds `source`, `local_confidence` and accumulates
/// `total_time_ms` on fallback), then handed to the presenter. Never
/// mutated in place after being returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Proposed calls, in generation order. Possibly empty.
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
    /// Wall-clock cost of the attempt in milliseconds.
    #[serde(default)]
    pub total_time_ms: f64,
    /// Self-assessed reliability in [0, 1]. The cloud path never supplies
    /// one; the on-device path always does (0 on malformed output).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Which path produced the final record. Set by the router.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// The rejected local confidence, carried through on fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_confidence: Option<f64>,
}

impl GenerationResult {
    /// The canonical empty record: no calls, zero cost, zero confidence.
    ///
    /// This is what malformed on-device output downgrades to, so the
    /// router's no-calls rule triggers cloud fallback naturally.
    pub fn empty() -> Self {
        Self {
            function_calls: Vec::new(),
            total_time_ms: 0.0,
            confidence: Some(0.0),
            source: None,
            local_confidence: None,
        }
    }
}

// ── Generator seam ───────────────────────────────────────────────

/// A black-box function-call generator.
///
/// Implementations wrap a specific backend (on-device engine, cloud API)
/// and normalize its output into the canonical [`GenerationResult`].
/// Failure semantics differ per implementation and are documented there;
/// the router treats any `Err` as fatal to the request.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Run one generation attempt against the declared tools.
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<GenerationResult>;
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_user_text_filters_and_lowercases() {
        let messages = [
            Message::system("You are terse."),
            Message::user("What is the Weather"),
            Message::assistant("Let me check AND report."),
            Message::user("in Paris?"),
        ];
        assert_eq!(joined_user_text(&messages), "what is the weather in paris?");
    }

    #[test]
    fn joined_user_text_empty_without_user_messages() {
        let messages = [Message::system("preamble")];
        assert_eq!(joined_user_text(&messages), "");
    }

    #[test]
    fn empty_record_shape() {
        let r = GenerationResult::empty();
        assert!(r.function_calls.is_empty());
        assert_eq!(r.total_time_ms, 0.0);
        assert_eq!(r.confidence, Some(0.0));
        assert!(r.source.is_none());
        assert!(r.local_confidence.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Message::user("hi")).unwrap(),
            r#"{"role":"user","content":"hi"}"#
        );
    }
}
