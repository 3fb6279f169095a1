//! Cortex CLI — boots the host in single-shot mode: load modules, run one
//! operation, print JSON, dispose.

mod cli;

use crate::cli::{Cli, Commands};
use clap::Parser;
use cortex_runtime::{config::load_config, FileBinarySource, Orchestrator};
use cortex_types::{ModelConfig, ModelType, SensoryInput};
use std::path::PathBuf;
use std::sync::Arc;

fn init_tracing_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Explicit path wins; otherwise ~/.cortex/cortex.toml when it exists.
fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let path = dirs::home_dir()?.join(".cortex").join("cortex.toml");
        path.exists().then_some(path)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing_stderr();
    let cli = Cli::parse();

    let mut config = load_config(resolve_config_path(cli.config).as_deref());
    if let Commands::Run {
        model: Some(ref model),
        ..
    } = cli.command
    {
        let model_type: ModelType = model.parse()?;
        config.default_model = ModelConfig {
            model_type,
            ..config.default_model
        };
    }

    let source = Arc::new(FileBinarySource::new(cli.modules_dir));
    let orchestrator = Orchestrator::new(config, source)?;
    orchestrator.initialize().await?;

    let result = run_command(&orchestrator, cli.command).await;
    orchestrator.dispose().await;
    result
}

async fn run_command(orchestrator: &Orchestrator, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run { text, session, .. } => {
            let outcome = orchestrator
                .process_sensory_input(SensoryInput::text(text, session))
                .await?;
            match outcome.into_completed() {
                Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                None => anyhow::bail!("call timed out; module call abandoned"),
            }
        }
        Commands::Tool { name, params } => {
            let params: serde_json::Value = serde_json::from_str(&params)?;
            let outcome = orchestrator
                .execute_tool(&name, params, serde_json::json!({}))
                .await?;
            match outcome.into_completed() {
                Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                None => anyhow::bail!("call timed out; module call abandoned"),
            }
        }
        Commands::Info => {
            let info = orchestrator.get_module_info();
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}
