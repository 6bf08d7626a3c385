//! Warden CLI - mediate tool calls from the terminal.
//!
//! Every call goes through the same path an embedding agent would use: the
//! approval engine decides, the executor runs the call inside the sandbox,
//! and the operation log records each step.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use warden_audit::ExportFormat;
use warden_config::Config;
use warden_runtime::Dispatcher;
use warden_telemetry::{LogConfig, setup_logging};

mod approval_prompt;
mod commands;
mod theme;

use approval_prompt::PromptMode;
use commands::{call, parse_params, policy};

/// Warden - tool-call mediation with approvals, sandboxing and rollback
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Load this config file over the built-in defaults instead of the user
    /// and workspace files
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Workspace root (defaults to the current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Operation log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: ExportFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the effective tool policy
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Mediate and run a single tool call
    Call {
        /// Tool name, e.g. `sandbox_write_file`
        #[arg(long)]
        tool: String,

        /// Call parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,

        /// Approve every confirmation prompt once without asking
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Print the policy for every tool
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a call against policy without running it or asking anyone
    Check {
        /// Tool name
        #[arg(long)]
        tool: String,

        /// Call parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };

    let resolved = match &cli.config {
        Some(path) => Config::load_file(path),
        None => Config::load(Some(workspace.as_path())),
    }
    .context("failed to load configuration")?;

    init_logging(&resolved.config, cli.verbose);
    debug!(files = ?resolved.loaded_files, "configuration loaded");

    let dispatcher = Dispatcher::from_config(&resolved.config, &workspace)
        .with_context(|| format!("cannot use workspace {}", workspace.display()))?;

    let succeeded = match cli.command {
        Commands::Policy { command } => handle_policy(&dispatcher, command).await?,
        Commands::Call { tool, params, yes } => {
            let mode = if yes {
                PromptMode::AssumeYes
            } else {
                PromptMode::Interactive
            };
            call::run_call(
                &dispatcher,
                &tool,
                parse_params(&params)?,
                mode,
                cli.log_format,
            )
            .await?
        },
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn handle_policy(dispatcher: &Dispatcher, command: PolicyCommands) -> Result<bool> {
    match command {
        PolicyCommands::Show { json } => {
            policy::show_policy(dispatcher.policy(), json)?;
            Ok(true)
        },
        PolicyCommands::Check { tool, params, json } => {
            policy::check_policy(dispatcher, &tool, parse_params(&params)?, json).await
        },
    }
}

/// Set up diagnostic logging from config, with `--verbose` forcing debug.
fn init_logging(config: &Config, verbose: bool) {
    let mut log_config = LogConfig::try_from(&config.logging).unwrap_or_else(|e| {
        eprintln!("Invalid logging config, using defaults: {e}");
        LogConfig::default()
    });
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}
