//! `.config` fragment rendering and parsing.

use crate::error::ConfigError;
use crate::models::{KernelConfig, OptionValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(CONFIG_[A-Za-z0-9_]+)=(.*)$").expect("Invalid kconfig assignment regex"));

static NOT_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s*(CONFIG_[A-Za-z0-9_]+) is not set\s*$").expect("Invalid kconfig not-set regex"));

/// Render `config` as a `.config` fragment, keys sorted.
pub fn render_kconfig(config: &KernelConfig) -> String {
    let mut out = String::new();
    out.push_str("#\n");
    out.push_str(&format!(
        "# Generated by goatd-kconfig-lab: {} ({}, {})\n",
        config.name(),
        config.architecture(),
        config.config_type()
    ));
    out.push_str("#\n");
    for (key, value) in config.options() {
        match value {
            OptionValue::No => out.push_str(&format!("# {} is not set\n", key)),
            other => out.push_str(&format!("{}={}\n", key, other)),
        }
    }
    out
}

/// Tristate assignments read from a `.config` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedKconfig {
    pub options: BTreeMap<String, OptionValue>,
    /// Keys with non-tristate values (`CONFIG_HZ=1000`, strings).
    pub ignored: Vec<String>,
}

/// Parse a `.config` file. Comments and blank lines are skipped.
pub fn parse_kconfig(text: &str) -> Result<ParsedKconfig, ConfigError> {
    let mut parsed = ParsedKconfig::default();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = NOT_SET.captures(line) {
            parsed.options.insert(caps[1].to_string(), OptionValue::No);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let caps = ASSIGNMENT.captures(line).ok_or_else(|| {
            ConfigError::ValidationFailed(format!("Malformed kconfig line {}: {}", idx + 1, line))
        })?;
        match caps[2].parse::<OptionValue>() {
            Ok(value) => {
                parsed.options.insert(caps[1].to_string(), value);
            }
            Err(_) => parsed.ignored.push(caps[1].to_string()),
        }
    }
    Ok(parsed)
}
