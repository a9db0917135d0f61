//! Custom config files and default store locations.

use crate::error::ConfigError;
use crate::kernel::kconfig::parse_kconfig;
use crate::models::{Architecture, ConfigType, KernelConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Default usage store: `<data dir>/goatd-kconfig-lab/usage.json`, or `./usage.json`.
pub fn default_usage_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("goatd-kconfig-lab").join("usage.json"))
        .unwrap_or_else(|| PathBuf::from("usage.json"))
}

/// Build history file kept beside the usage store.
pub fn build_history_path(usage_store_path: &Path) -> PathBuf {
    usage_store_path.with_file_name("build_history.json")
}

/// Default settings file: `~/.config/goatd-kconfig-lab/settings.json`.
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine config directory".to_string())
    })?;
    Ok(config_dir.join("goatd-kconfig-lab").join("settings.json"))
}

/// Load a custom config.
///
/// `.json` files hold a serialized [`KernelConfig`]; anything else is read as
/// kconfig text and wrapped as a `Custom` config named `name` for `arch`.
pub fn load_custom_config(
    path: &Path,
    arch: Architecture,
    name: &str,
) -> Result<KernelConfig, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    if path.extension().map_or(false, |ext| ext == "json") {
        let config: KernelConfig = serde_json::from_str(&content)?;
        config.check()?;
        return Ok(config);
    }

    let parsed = parse_kconfig(&content)?;
    if !parsed.ignored.is_empty() {
        log::debug!(
            "{}: skipped {} non-tristate option(s)",
            path.display(),
            parsed.ignored.len()
        );
    }
    KernelConfig::new(
        name,
        arch,
        ConfigType::Custom,
        parsed.options,
        format!("Loaded from {}", path.display()),
    )
}

/// Save a config as pretty JSON, creating parent directories.
pub fn save_config_to_file(config: &KernelConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json_content = serde_json::to_string_pretty(config)?;
    fs::write(path, json_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generator::generate_standard_config;
    use crate::models::OptionValue;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_json_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("configs/default.json");
        let config = generate_standard_config(Architecture::Arm64, ConfigType::Default).unwrap();

        save_config_to_file(&config, &path).unwrap();
        let loaded = load_custom_config(&path, Architecture::X86_64, "ignored").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_kconfig_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("my.config");
        fs::write(&path, "CONFIG_64BIT=y\nCONFIG_RISCV=y\n# CONFIG_SWAP is not set\n").unwrap();

        let loaded = load_custom_config(&path, Architecture::Riscv64, "board").unwrap();
        assert_eq!(loaded.name(), "board");
        assert_eq!(loaded.config_type(), ConfigType::Custom);
        assert_eq!(loaded.option("CONFIG_SWAP"), Some(OptionValue::No));
    }

    #[test]
    fn test_build_history_sits_beside_usage_store() {
        assert_eq!(
            build_history_path(Path::new("/var/lib/lab/usage.json")),
            PathBuf::from("/var/lib/lab/build_history.json")
        );
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_custom_config(Path::new("/nonexistent/x.json"), Architecture::Arm, "x");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ invalid").unwrap();
        let result = load_custom_config(&path, Architecture::Arm, "x");
        assert!(matches!(result, Err(ConfigError::InvalidJson(_))));
    }

    #[test]
    fn test_json_with_bad_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("badkey.json");
        fs::write(
            &path,
            r#"{"name":"x","architecture":"arm","config_type":"custom","options":{"BAD KEY":"y"}}"#,
        )
        .unwrap();
        let result = load_custom_config(&path, Architecture::Arm, "x");
        assert!(matches!(result, Err(ConfigError::InvalidOption { .. })));
    }
}
