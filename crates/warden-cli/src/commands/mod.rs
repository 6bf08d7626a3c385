//! Subcommand implementations.

pub(crate) mod call;
pub(crate) mod policy;

use anyhow::{Context, bail};
use serde_json::Value;

/// Parse a `--params` argument, which must be a JSON object.
pub(crate) fn parse_params(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--params is not valid JSON")?;
    if !value.is_object() {
        bail!("--params must be a JSON object, got {value}");
    }
    Ok(value)
}
