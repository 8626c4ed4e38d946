pub mod ollama;
pub mod traits;

pub use ollama::OllamaEngine;
pub use traits::{
    EngineBackend, EngineError, EngineRequest, ModelHandle, ToolDeclaration, MAX_GENERATED_TOKENS,
    STOP_SEQUENCES,
};

use crate::config::LocalConfig;

/// Factory: create the right engine backend from config
pub fn create_engine(config: &LocalConfig) -> anyhow::Result<Box<dyn EngineBackend>> {
    match config.kind.as_str() {
        "ollama" => Ok(Box::new(OllamaEngine::from_config(config))),
        other if other.trim().is_empty() => {
            anyhow::bail!("local.kind cannot be empty. Supported values: ollama")
        }
        other => anyhow::bail!("Unknown engine kind '{other}'. Supported values: ollama"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_ollama() {
        let cfg = LocalConfig::default();
        let engine = create_engine(&cfg).unwrap();
        assert_eq!(engine.name(), "ollama");
    }

    #[test]
    fn factory_unknown_errors() {
        let cfg = LocalConfig {
            kind: "neural-dust".into(),
            ..LocalConfig::default()
        };
        match create_engine(&cfg) {
            Err(err) => assert!(err.to_string().contains("Unknown engine kind")),
            Ok(_) => panic!("unknown engine should error"),
        }
    }

    #[test]
    fn factory_empty_errors() {
        let cfg = LocalConfig {
            kind: String::new(),
            ..LocalConfig::default()
        };
        match create_engine(&cfg) {
            Err(err) => assert!(err.to_string().contains("cannot be empty")),
            Ok(_) => panic!("empty engine kind should error"),
        }
    }
}
