//! Command-line screening and process execution.
//!
//! Commands are never passed to a shell. The raw string is screened for
//! shell metacharacters and `..` traversal, split on whitespace, and the
//! first token is spawned directly with the remaining tokens as arguments.
//!
//! The metacharacter screen is a blocklist and therefore incomplete. It is a
//! guard against accidental shell syntax, not a security boundary; use
//! `allowed_binaries` to restrict what can run.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ToolError, ToolResult};
use crate::truncate::capture_output;

/// Sequences rejected anywhere in a command line, with a short name.
pub const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    (";", "command separator"),
    ("&", "background or logical operator"),
    ("|", "pipe"),
    ("`", "backtick substitution"),
    ("$(", "command substitution"),
    ("${", "variable expansion"),
    ("(", "subshell"),
    (")", "subshell"),
    ("<", "redirection"),
    (">", "redirection"),
    ("\\", "escape"),
    ("\n", "newline"),
    ("\r", "carriage return"),
    ("..", "path traversal"),
];

/// A command line that passed screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The binary to spawn.
    pub binary: String,
    /// Its arguments.
    pub args: Vec<String>,
}

/// Reject command lines containing a dangerous sequence.
///
/// # Errors
///
/// Returns [`ToolError::DangerousCommand`] naming the first match.
pub fn screen(command: &str) -> ToolResult<()> {
    match DANGEROUS_PATTERNS
        .iter()
        .find(|(pattern, _)| command.contains(pattern))
    {
        Some(&(pattern, name)) => Err(ToolError::DangerousCommand { pattern, name }),
        None => Ok(()),
    }
}

/// Screen, tokenize and check a command against an optional allowlist.
///
/// # Errors
///
/// Returns a validation error for dangerous or empty input and a policy
/// error for a binary outside `allowed_binaries`.
pub fn parse(command: &str, allowed_binaries: Option<&[String]>) -> ToolResult<ParsedCommand> {
    screen(command)?;
    let mut tokens = command.split_whitespace().map(str::to_string);
    let binary = tokens.next().ok_or(ToolError::EmptyCommand)?;
    if let Some(allowed) = allowed_binaries {
        if !allowed.iter().any(|b| *b == binary) {
            return Err(ToolError::BinaryNotAllowed(binary));
        }
    }
    Ok(ParsedCommand {
        binary,
        args: tokens.collect(),
    })
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// The command line as given.
    pub command: String,
    /// Exit code, absent if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether either stream was cut at the output limit.
    pub truncated: bool,
    /// Wall-clock run time in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Whether the process exited with code 0.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawn a parsed command and wait for it, killing it at `timeout`.
///
/// The child inherits the environment and `PATH` and runs in `cwd`.
///
/// # Errors
///
/// Returns [`ToolError::Spawn`] if the process cannot start or its output
/// cannot be collected, and [`ToolError::Timeout`] if it outlives `timeout`.
pub async fn run(
    raw: &str,
    parsed: &ParsedCommand,
    cwd: &Path,
    timeout: Duration,
    max_output_bytes: usize,
) -> ToolResult<CommandOutput> {
    let started = Instant::now();
    let child = Command::new(&parsed.binary)
        .args(&parsed.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            binary: parsed.binary.clone(),
            source,
        })?;
    debug!(binary = %parsed.binary, pid = ?child.id(), "spawned command");

    // Dropping the future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            binary: parsed.binary.clone(),
            source,
        })?,
        Err(_) => {
            warn!(binary = %parsed.binary, timeout_secs = timeout.as_secs(), "command timed out, killed");
            return Err(ToolError::Timeout(timeout));
        },
    };

    let (stdout, out_cut) = capture_output(&output.stdout, max_output_bytes);
    let (stderr, err_cut) = capture_output(&output.stderr, max_output_bytes);
    Ok(CommandOutput {
        command: raw.to_string(),
        exit_code: output.status.code(),
        stdout,
        stderr,
        truncated: out_cut || err_cut,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}
