//! Clap CLI definitions for Cortex.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cortex — WASM dual-module host for agent-core and model modules.
#[derive(Parser)]
#[command(
    name = "cortex",
    version,
    about = "Cortex \u{2014} WASM dual-module host",
    long_about = "Cortex \u{2014} WASM dual-module host.\n\n\
                  Boots an agent-core module and a model module, routes sensory\n\
                  input across the boundary, and prints the JSON responses."
)]
pub struct Cli {
    /// Path to config file (default: ~/.cortex/cortex.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing agent-core.wasm, model-<type>.wasm and
    /// model-<type>.weights files.
    #[arg(long, global = true, default_value = "modules")]
    pub modules_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route one text input through the agent-core and print the response.
    Run {
        /// The input text.
        text: String,
        /// Session identifier.
        #[arg(long, default_value = "cli")]
        session: String,
        /// Switch to this model before running (e.g. "phi-3-mini").
        #[arg(long)]
        model: Option<String>,
    },
    /// Invoke a named tool on the agent-core and print the payload.
    Tool {
        /// Tool name.
        name: String,
        /// Tool parameters as a JSON object.
        #[arg(default_value = "{}")]
        params: String,
    },
    /// Boot both modules and print the module info report.
    Info,
}
