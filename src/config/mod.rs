//! Configuration module for the kernel config lab.
//!
//! Two kinds of configuration live here:
//!
//! - `TesterSettings`: how the lab itself runs (paths, timeouts, parallelism).
//!   Loaded once at start by `SettingsManager` and passed to every component.
//! - `KernelConfig` generation, validation and conflict analysis:
//!   `templates` + `arch` feed the `generator`; `validator` gates builds;
//!   `conflicts` + `resolution` provide the advisory rule engine.
//!
//! # Module Structure
//!
//! - `loader`: custom config files (JSON or kconfig text) and store paths
//! - `arch`: per-architecture profile table
//! - `templates`: static minimal/default/maximal option templates
//! - `generator`: standard config generation
//! - `validator`: pre-build gating checks
//! - `conflicts`: dependency / mutual-exclusion rule engine
//! - `resolution`: fix suggestions for a conflict report

pub mod arch;
pub mod conflicts;
pub mod generator;
pub mod loader;
pub mod resolution;
pub mod templates;
pub mod validator;

use crate::error::ConfigError;
use crate::models::Architecture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings for one lab process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterSettings {
    /// Kernel source tree handed to `make -C`.
    pub kernel_source_dir: PathBuf,
    /// Per-config output directories are created below this.
    pub build_root: PathBuf,
    pub make_command: String,
    /// `None` means one job per CPU.
    pub build_jobs: Option<usize>,
    /// `CROSS_COMPILE=` prefix per architecture.
    pub cross_compile: BTreeMap<Architecture, String>,
    /// Emulator binary overrides per architecture.
    pub emulator_binaries: BTreeMap<Architecture, String>,
    pub initramfs: Option<PathBuf>,
    pub init_path: String,
    pub boot_memory_mb: u32,
    pub max_parallel_builds: usize,
    pub build_timeout_secs: u64,
    pub boot_timeout_secs: u64,
    pub min_kernel_image_bytes: u64,
    /// Never launch an emulator, even when one is installed.
    pub validation_only_boot: bool,
    pub architectures: Vec<Architecture>,
    pub usage_store_path: PathBuf,
    pub log_dir: PathBuf,
    /// Minimum observations before an option is judged by the usage analyzer.
    pub usage_min_tests: u64,
    pub rarely_used_threshold: f64,
}

impl Default for TesterSettings {
    fn default() -> Self {
        TesterSettings {
            kernel_source_dir: PathBuf::from("linux"),
            build_root: PathBuf::from("build"),
            make_command: "make".to_string(),
            build_jobs: None,
            cross_compile: BTreeMap::new(),
            emulator_binaries: BTreeMap::new(),
            initramfs: None,
            init_path: "/sbin/init".to_string(),
            boot_memory_mb: 512,
            max_parallel_builds: 2,
            build_timeout_secs: 3600,
            boot_timeout_secs: 120,
            min_kernel_image_bytes: 1024 * 1024,
            validation_only_boot: false,
            architectures: vec![Architecture::X86_64, Architecture::Arm64],
            usage_store_path: loader::default_usage_store_path(),
            log_dir: PathBuf::from("logs"),
            usage_min_tests: 5,
            rarely_used_threshold: 0.1,
        }
    }
}

impl TesterSettings {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_timeout_secs)
    }

    /// Reject settings that would make a run meaningless or hang.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel_builds == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_parallel_builds must be at least 1".to_string(),
            ));
        }
        if self.build_timeout_secs == 0 || self.boot_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "build and boot timeouts must be non-zero".to_string(),
            ));
        }
        let max_secs = crate::system::process::MAX_TIMEOUT.as_secs();
        if self.build_timeout_secs > max_secs || self.boot_timeout_secs > max_secs {
            return Err(ConfigError::ValidationFailed(format!(
                "build and boot timeouts must not exceed {} seconds",
                max_secs
            )));
        }
        if self.boot_memory_mb == 0 {
            return Err(ConfigError::ValidationFailed(
                "boot_memory_mb must be non-zero".to_string(),
            ));
        }
        if !(self.rarely_used_threshold > 0.0 && self.rarely_used_threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "rarely_used_threshold must be in (0, 1], got {}",
                self.rarely_used_threshold
            )));
        }
        if self.make_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "make_command cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads and saves [`TesterSettings`] as JSON.
pub struct SettingsManager;

impl SettingsManager {
    /// Load settings from `path`, or return defaults if the file doesn't exist.
    ///
    /// If deserialization fails, logs a warning and returns defaults instead of
    /// failing the run.
    pub fn load(path: &Path) -> Result<TesterSettings, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<TesterSettings>(&content) {
                Ok(settings) => {
                    log::debug!("Loaded settings from {}", path.display());
                    Ok(settings)
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse {}, falling back to defaults: {}",
                        path.display(),
                        e
                    );
                    Ok(TesterSettings::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TesterSettings::default()),
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Save settings to `path` as pretty JSON, creating parent directories.
    pub fn save(settings: &TesterSettings, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
