//! Shared helper functions for CLI commands

use std::io::{self, IsTerminal};

use miette::{IntoDiagnostic, Result};

use crate::core::spc::parse_measurement;
use crate::core::Config;

/// Format a measurement id for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id_str(id: &str) -> String {
    if id.chars().count() > 16 {
        let kept: String = id.chars().take(13).collect();
        format!("{}...", kept)
    } else {
        id.to_string()
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// True when stdin is attached to a terminal and prompts make sense
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Operator from the flag, falling back to config and `COILQC_OPERATOR`
pub fn operator_or_default(arg: Option<String>, config: &Config) -> Result<String> {
    if let Some(op) = arg.filter(|o| !o.trim().is_empty()) {
        return Ok(op);
    }
    if let Some(op) = config.operator() {
        return Ok(op.to_string());
    }
    if is_interactive() {
        let name: String = dialoguer::Input::new()
            .with_prompt("Operator")
            .interact_text()
            .into_diagnostic()?;
        return Ok(name);
    }
    Err(miette::miette!(
        help = "Pass --operator, set 'operator' in .coilqc/config.yaml or export COILQC_OPERATOR",
        "No operator given"
    ))
}

/// clap value parser for a single finite number
pub fn parse_finite(raw: &str) -> std::result::Result<f64, String> {
    parse_measurement(raw).ok_or_else(|| format!("'{}' is not a finite number", raw.trim()))
}

/// Parse a comma-separated list of readings
///
/// Empty entries are kept as missing readings, so `0.001,,0.002` yields
/// three positions with the middle one absent.
pub fn parse_readings(raw: &str) -> std::result::Result<Vec<Option<f64>>, String> {
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                parse_measurement(part)
                    .map(Some)
                    .ok_or_else(|| format!("'{}' is not a number", part))
            }
        })
        .collect()
}

/// Ask for confirmation, assuming yes when not attached to a terminal
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}
