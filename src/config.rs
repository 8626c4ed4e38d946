//! Configuration for the hybrid function-calling pipeline.
//!
//! Loaded from a TOML file; every field has a default so a missing or
//! partial file still yields a working configuration. Secrets (the cloud
//! API key) may live in the environment instead of on disk.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable consulted when no cloud API key is configured.
pub const CLOUD_API_KEY_ENV: &str = "GEMINI_API_KEY";

// ── Local engine section ─────────────────────────────────────────

/// On-device engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Engine backend kind. Supported: "ollama".
    pub kind: String,
    /// Base URL of the local Ollama server.
    pub ollama_url: String,
    /// On-device model name.
    pub model: String,
    /// HTTP timeout for engine requests, in seconds.
    pub timeout_secs: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            kind: "ollama".into(),
            ollama_url: "http://127.0.0.1:11434".into(),
            model: "functiongemma:270m".into(),
            timeout_secs: 10,
        }
    }
}

// ── Cloud section ────────────────────────────────────────────────

/// Cloud generation API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Cloud model name.
    pub model: String,
    /// API base URL, without a trailing slash.
    pub endpoint: String,
    /// API key. Leave empty to read from `GEMINI_API_KEY` instead.
    pub api_key: String,
    /// HTTP timeout for cloud requests, in seconds.
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: String::new(),
            timeout_secs: 120,
        }
    }
}

impl CloudConfig {
    /// Resolve the API key: explicit config value first, then the
    /// `GEMINI_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        if !self.api_key.is_empty() {
            return Ok(self.api_key.clone());
        }
        match std::env::var(CLOUD_API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => anyhow::bail!(
                "No cloud API key available: set [cloud].api_key or the {CLOUD_API_KEY_ENV} environment variable"
            ),
        }
    }
}

// ── Router section ───────────────────────────────────────────────

/// Routing policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Local confidence below this value escalates to cloud.
    pub confidence_threshold: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
        }
    }
}

// ── Top-level config ─────────────────────────────────────────────

/// Full edgegate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub local: LocalConfig,
    pub cloud: CloudConfig,
    pub router: RouterConfig,
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults; a
    /// malformed file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
