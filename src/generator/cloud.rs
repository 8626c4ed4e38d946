//! Cloud generator adapter for the Gemini `generateContent` API.
//!
//! Converts declared tools into the provider's function-declaration schema
//! (primitive type tags upper-cased to the provider enum convention,
//! `required` passed through verbatim), forwards user-role message contents
//! only, and measures wall-clock latency around the network call. Network
//! and API errors propagate uncaught — this path has no local recovery and
//! no retry; resilience belongs around the call site, not in here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::{GenerationResult, Generator, Message, Role};
use crate::config::CloudConfig;
use crate::tools::{FunctionCall, ToolSpec};

// ── Request wire shapes ──────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<GeminiTool>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: GeminiSchema,
}

#[derive(Debug, Serialize)]
struct GeminiSchema {
    #[serde(rename = "type")]
    schema_type: String,
    properties: BTreeMap<String, GeminiParam>,
    required: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GeminiParam {
    #[serde(rename = "type")]
    param_type: String,
    description: String,
}

/// Convert one declared tool into the provider's declaration schema.
fn to_declaration(tool: &ToolSpec) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: GeminiSchema {
            schema_type: "OBJECT".into(),
            properties: tool
                .parameters
                .properties
                .iter()
                .map(|(name, spec)| {
                    (
                        name.clone(),
                        GeminiParam {
                            param_type: spec.param_type.to_uppercase(),
                            description: spec.description.clone(),
                        },
                    )
                })
                .collect(),
            required: tool.parameters.required.clone(),
        },
    }
}

// ── Response wire shapes ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "functionCall", default)]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Map<String, serde_json::Value>,
}

// ── Adapter ──────────────────────────────────────────────────────

/// Generator backed by the Gemini cloud API.
pub struct CloudGenerator {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl CloudGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .connect_timeout(std::time::Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Build from config, resolving the API key (config value or env).
    pub fn from_config(config: &CloudConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.resolve_api_key()?,
            &config.model,
            &config.endpoint,
            config.timeout_secs,
        ))
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[async_trait]
impl Generator for CloudGenerator {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<GenerationResult> {
        // Only user-role contents are forwarded; system/assistant context
        // is dropped on this path.
        let contents = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| Content {
                parts: vec![TextPart {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let payload = GenerateContentRequest {
            contents,
            tools: vec![GeminiTool {
                function_declarations: tools.iter().map(to_declaration).collect(),
            }],
        };

        let start = Instant::now();

        let resp = self
            .client
            .post(self.request_url())
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status, body);
        }

        let body: GenerateContentResponse = resp.json().await?;
        let total_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let function_calls = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.function_call)
            .map(|call| FunctionCall {
                name: call.name,
                arguments: call.args,
            })
            .collect();

        Ok(GenerationResult {
            function_calls,
            total_time_ms,
            confidence: None,
            source: None,
            local_confidence: None,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
