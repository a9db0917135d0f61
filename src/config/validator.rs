//! Pre-build configuration validation.
//!
//! A fast gate: errors stop the config from ever reaching the builder,
//! warnings are informational only.

use super::arch;
use super::conflicts::MUTUAL_EXCLUSIONS;
use crate::models::{ConfigType, KernelConfig};
use serde::{Deserialize, Serialize};

/// Options that still exist but are on their way out.
const DEPRECATED_OPTIONS: &[(&str, &str)] = &[
    ("CONFIG_SLAB", "the SLAB allocator is deprecated in favour of SLUB"),
    ("CONFIG_SLOB", "the SLOB allocator has been removed upstream"),
    ("CONFIG_SYSFS_DEPRECATED", "legacy sysfs layout breaks modern userspace"),
    ("CONFIG_UEVENT_HELPER", "uevent helper is superseded by udev/netlink"),
    ("CONFIG_IDE", "the legacy IDE layer has been removed; use libata"),
];

/// Debug options with a measurable runtime cost.
const EXPENSIVE_DEBUG_OPTIONS: &[&str] = &[
    "CONFIG_KASAN",
    "CONFIG_UBSAN",
    "CONFIG_KCOV",
    "CONFIG_KCSAN",
    "CONFIG_PROVE_LOCKING",
    "CONFIG_LOCKDEP",
    "CONFIG_DEBUG_PAGEALLOC",
    "CONFIG_DEBUG_SLAB",
    "CONFIG_DEBUG_OBJECTS",
];

/// Result of [`validate_config`]. `is_valid` is exactly `errors.is_empty()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn into_parts(self) -> (bool, Vec<String>, Vec<String>) {
        (self.is_valid, self.errors, self.warnings)
    }
}

/// Check the name and keys, then required, exclusive, deprecated, foreign and debug options.
pub fn validate_config(config: &KernelConfig) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Err(e) = config.check() {
        errors.push(e.to_string());
    }

    for option in arch::missing_required(config) {
        errors.push(format!(
            "Required option {} is not enabled for architecture {}",
            option,
            config.architecture()
        ));
    }

    for (a, b, reason) in MUTUAL_EXCLUSIONS {
        if config.is_enabled(a) && config.is_enabled(b) {
            errors.push(format!("{} and {} cannot both be enabled: {}", a, b, reason));
        }
    }

    for (option, why) in DEPRECATED_OPTIONS {
        if config.is_enabled(option) {
            warnings.push(format!("{} is deprecated: {}", option, why));
        }
    }

    for (option, owner) in arch::foreign_options(config) {
        errors.push(format!(
            "{} is a {} option but the configuration targets {}",
            option,
            owner,
            config.architecture()
        ));
    }

    if config.config_type() != ConfigType::Maximal {
        for option in EXPENSIVE_DEBUG_OPTIONS {
            if config.is_enabled(option) {
                warnings.push(format!(
                    "{} has a significant performance cost in a {} configuration",
                    option,
                    config.config_type()
                ));
            }
        }
    }

    if !errors.is_empty() {
        log::debug!("{} failed validation: {}", config.name(), errors.join("; "));
    }

    ValidationOutcome {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generator::{generate_all_standard_configs, generate_standard_config};
    use crate::models::{Architecture, OptionValue};

    #[test]
    fn test_standard_configs_are_valid() {
        for arch in Architecture::ALL {
            for config in generate_all_standard_configs(arch).unwrap() {
                let outcome = validate_config(&config);
                assert!(outcome.is_valid, "{}: {:?}", config.name(), outcome.errors);
                assert!(outcome.warnings.is_empty(), "{}: {:?}", config.name(), outcome.warnings);
            }
        }
    }

    #[test]
    fn test_missing_64bit_is_an_error() {
        let config = generate_standard_config(Architecture::X86_64, ConfigType::Minimal)
            .unwrap()
            .with_option("CONFIG_64BIT", OptionValue::No)
            .unwrap();
        let (is_valid, errors, _) = validate_config(&config).into_parts();
        assert!(!is_valid);
        assert!(errors.iter().any(|e| e.contains("CONFIG_64BIT")));
    }

    #[test]
    fn test_path_like_name_is_an_error() {
        let mut value = serde_json::to_value(
            generate_standard_config(Architecture::X86_64, ConfigType::Default).unwrap(),
        )
        .unwrap();
        value["name"] = serde_json::json!("../../outside");
        let config: KernelConfig = serde_json::from_value(value).unwrap();
        let outcome = validate_config(&config);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].contains("../../outside"), "{:?}", outcome.errors);
    }

    #[test]
    fn test_deprecated_is_warning_only() {
        let config = generate_standard_config(Architecture::Arm64, ConfigType::Default)
            .unwrap()
            .with_option("CONFIG_UEVENT_HELPER", OptionValue::Yes)
            .unwrap();
        let outcome = validate_config(&config);
        assert!(outcome.is_valid);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_foreign_option_is_error() {
        let config = generate_standard_config(Architecture::X86_64, ConfigType::Default)
            .unwrap()
            .with_option("CONFIG_RISCV_SBI", OptionValue::Yes)
            .unwrap();
        let outcome = validate_config(&config);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].contains("riscv64"));
    }

    #[test]
    fn test_debug_option_warns_outside_maximal() {
        let config = generate_standard_config(Architecture::Riscv64, ConfigType::Default)
            .unwrap()
            .with_option("CONFIG_KASAN", OptionValue::Yes)
            .unwrap();
        let outcome = validate_config(&config);
        assert!(outcome.is_valid);
        assert!(outcome.warnings.iter().any(|w| w.contains("CONFIG_KASAN")));
    }

    #[test]
    fn test_slab_and_slub_together_rejected() {
        let config = generate_standard_config(Architecture::Arm, ConfigType::Minimal)
            .unwrap()
            .with_option("CONFIG_SLAB", OptionValue::Yes)
            .unwrap();
        let outcome = validate_config(&config);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }
}
