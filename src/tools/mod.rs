//! Tool declarations and derived lookup structures.
//!
//! A [`ToolSpec`] describes one callable capability exposed to a generator:
//! a name, a description, and a JSON-Schema-like parameter block. The
//! [`ToolIndex`] derives the cheap lookup structures the router needs
//! (valid-name set, required-argument set per tool) once per request.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ── Tool declaration ─────────────────────────────────────────────

/// Declared type and description of a single tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// JSON-Schema primitive type tag (e.g. "string", "number").
    #[serde(rename = "type")]
    pub param_type: String,
    /// Human-readable description; providers tolerate an empty one.
    #[serde(default)]
    pub description: String,
}

/// JSON-Schema-like parameter block of a tool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Always "object" for function-calling schemas.
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,
    /// Parameter name → type/description. Ordered for stable serialization.
    #[serde(default)]
    pub properties: BTreeMap<String, ParamSpec>,
    /// Names of parameters a call must provide. Subset of `properties` keys.
    #[serde(default)]
    pub required: Vec<String>,
}

fn default_schema_type() -> String {
    "object".to_string()
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: default_schema_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A callable capability exposed to a generator.
///
/// Immutable once constructed; supplied once per request. Names must be
/// unique across a tool list and `required` must reference declared
/// properties — see [`ToolSpec::validate`] and [`validate_toolset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolSpec {
    /// Create a tool with an empty parameter block.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    /// Add an optional parameter.
    pub fn with_param(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.properties.insert(
            name.into(),
            ParamSpec {
                param_type: param_type.into(),
                description: description.into(),
            },
        );
        self
    }

    /// Add a required parameter.
    pub fn with_required_param(
        self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut spec = self.with_param(name.clone(), param_type, description);
        spec.parameters.required.push(name);
        spec
    }

    /// Check the declaration invariant: every required parameter is declared
    /// under `properties`.
    pub fn validate(&self) -> anyhow::Result<()> {
        for req in &self.parameters.required {
            if !self.parameters.properties.contains_key(req) {
                anyhow::bail!(
                    "tool '{}' requires parameter '{}' that is not declared in properties",
                    self.name,
                    req
                );
            }
        }
        Ok(())
    }
}

/// Validate a full tool list: non-empty, unique names, each spec valid.
///
/// The router itself tolerates malformed lists (set semantics, last write
/// wins); this is the strict boundary check for callers that want to fail
/// fast before any generation happens.
pub fn validate_toolset(tools: &[ToolSpec]) -> anyhow::Result<()> {
    if tools.is_empty() {
        anyhow::bail!("tool list cannot be empty");
    }
    let mut seen = HashSet::new();
    for tool in tools {
        if !seen.insert(tool.name.as_str()) {
            anyhow::bail!("duplicate tool name '{}' in tool list", tool.name);
        }
        tool.validate()?;
    }
    Ok(())
}

// ── Function call ────────────────────────────────────────────────

/// A generator's structured proposal to invoke a named tool.
///
/// The name is not guaranteed to reference a declared tool, and the
/// arguments are not guaranteed to satisfy the tool's required set —
/// checking both is the router's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl FunctionCall {
    /// Create a call with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: serde_json::Map::new(),
        }
    }

    /// Add one argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

// ── Derived lookup index ─────────────────────────────────────────

/// Lookup structures derived from a tool list, built once per request.
#[derive(Debug, Clone)]
pub struct ToolIndex {
    valid_names: HashSet<String>,
    required: HashMap<String, HashSet<String>>,
}

impl ToolIndex {
    /// Derive the index from a declared tool list.
    ///
    /// Mirrors plain set/map semantics: duplicate names collapse with the
    /// last declaration winning. Use [`validate_toolset`] for strictness.
    pub fn build(tools: &[ToolSpec]) -> Self {
        let valid_names = tools.iter().map(|t| t.name.clone()).collect();
        let required = tools
            .iter()
            .map(|t| {
                (
                    t.name.clone(),
                    t.parameters.required.iter().cloned().collect(),
                )
            })
            .collect();
        Self {
            valid_names,
            required,
        }
    }

    /// Whether `name` references a declared tool.
    pub fn is_declared(&self, name: &str) -> bool {
        self.valid_names.contains(name)
    }

    /// Required parameter names for `name`; empty for unknown tools.
    pub fn required_for(&self, name: &str) -> HashSet<String> {
        self.required.get(name).cloned().unwrap_or_default()
    }

    /// Whether a call provides every required parameter of its tool.
    /// Extra / undeclared arguments are tolerated.
    pub fn has_required_args(&self, call: &FunctionCall) -> bool {
        self.required_for(&call.name)
            .iter()
            .all(|req| call.arguments.contains_key(req))
    }
}

// ── Tests ────────────────────────────────────────────────────────
