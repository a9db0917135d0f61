//! Standard configuration generation.
//!
//! A pure function of (architecture, type): the type template with the
//! architecture overlay merged on top, architecture values winning.

use super::{arch, templates};
use crate::error::ConfigError;
use crate::models::{Architecture, ConfigType, KernelConfig};

/// Name of a generated config: `{type}_{arch}`.
pub fn standard_name(arch: Architecture, config_type: ConfigType) -> String {
    format!("{}_{}", config_type.as_str(), arch.as_str())
}

/// Generate one standard config. `ConfigType::Custom` has no template.
pub fn generate_standard_config(
    arch: Architecture,
    config_type: ConfigType,
) -> Result<KernelConfig, ConfigError> {
    let template = templates::template(config_type).ok_or_else(|| {
        ConfigError::ValidationFailed(format!(
            "No template for config type '{}'",
            config_type
        ))
    })?;

    let mut options = template.clone();
    for (key, value) in arch::profile(arch).overlay {
        options.insert(key.to_string(), *value);
    }

    let config = KernelConfig::new(
        standard_name(arch, config_type),
        arch,
        config_type,
        options,
        format!("{} ({})", templates::describe(config_type), arch),
    )?
    .with_metadata("generated_by", serde_json::Value::from("template"))
    .with_metadata("template", serde_json::Value::from(config_type.as_str()));

    log::debug!(
        "Generated {} with {} enabled options",
        config.name(),
        config.enabled_count()
    );
    Ok(config)
}

/// Minimal, default and maximal configs for `arch`, in that order.
pub fn generate_all_standard_configs(arch: Architecture) -> Result<Vec<KernelConfig>, ConfigError> {
    ConfigType::STANDARD
        .iter()
        .map(|&ty| generate_standard_config(arch, ty))
        .collect()
}

/// Standard configs for every listed architecture. Repeated architectures are ignored.
pub fn generate_for_architectures(
    architectures: &[Architecture],
) -> Result<Vec<KernelConfig>, ConfigError> {
    let mut seen = Vec::new();
    let mut configs = Vec::new();
    for &arch in architectures {
        if seen.contains(&arch) {
            continue;
        }
        seen.push(arch);
        configs.extend(generate_all_standard_configs(arch)?);
    }
    Ok(configs)
}
