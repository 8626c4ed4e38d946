//! Demo entry point: routes a sample weather request through the
//! on-device, cloud, and hybrid paths and prints each result.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use edgegate::generator::{CloudGenerator, Generator, LocalGenerator};
use edgegate::{present, validate_toolset, Config, HybridRouter, Message, ToolSpec};

#[derive(Debug, Parser)]
#[command(name = "edgegate", version, about = "On-device first function calling")]
struct Cli {
    /// User prompt to route.
    #[arg(default_value = "What is the weather in San Francisco?")]
    prompt: String,

    /// Path to the TOML config file.
    #[arg(long, default_value = "edgegate.toml")]
    config: PathBuf,

    /// Override the routing confidence threshold.
    #[arg(long)]
    threshold: Option<f64>,

    /// Which generation paths to run.
    #[arg(long, value_enum, default_value = "all")]
    path: PathChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PathChoice {
    Local,
    Cloud,
    Hybrid,
    All,
}

/// The sample toolset: one weather lookup with a required location.
fn demo_tools() -> Vec<ToolSpec> {
    vec![ToolSpec::new("get_weather", "Get current weather for a location")
        .with_required_param("location", "string", "City name")]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let tools = demo_tools();
    validate_toolset(&tools)?;
    let messages = vec![Message::user(&cli.prompt)];

    if matches!(cli.path, PathChoice::Local | PathChoice::All) {
        let local = LocalGenerator::from_config(&config.local)?;
        let result = local
            .generate(&messages, &tools)
            .await
            .context("on-device generation failed")?;
        present::print("On-Device", &result);
    }

    if matches!(cli.path, PathChoice::Cloud | PathChoice::All) {
        let cloud = CloudGenerator::from_config(&config.cloud)?;
        let result = cloud
            .generate(&messages, &tools)
            .await
            .context("cloud generation failed")?;
        present::print("Cloud (Gemini)", &result);
    }

    if matches!(cli.path, PathChoice::Hybrid | PathChoice::All) {
        let router = HybridRouter::new(
            Box::new(LocalGenerator::from_config(&config.local)?),
            Box::new(CloudGenerator::from_config(&config.cloud)?),
        )
        .with_threshold(
            cli.threshold
                .unwrap_or(config.router.confidence_threshold),
        );

        let result = router
            .route(&messages, &tools)
            .await
            .context("hybrid routing failed")?;
        present::print("Hybrid (On-Device + Cloud Fallback)", &result);
    }

    Ok(())
}
