//! Core data types for the GOATd config lab.

use crate::error::ConfigError;
use crate::orchestrator::state::PipelineState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Boot stage: kernel entered `start_kernel`.
pub const STAGE_KERNEL_START: &str = "kernel_start";
/// Boot stage: memory zones initialized.
pub const STAGE_MEMORY_INIT: &str = "memory_init";
/// Boot stage: userspace init launched.
pub const STAGE_INIT_START: &str = "init_start";
/// Boot stage: explicit success sentinel observed.
pub const STAGE_BOOT_COMPLETE: &str = "boot_complete";

/// All boot stages, in boot order.
pub const BOOT_STAGES: [&str; 4] = [
    STAGE_KERNEL_START,
    STAGE_MEMORY_INIT,
    STAGE_INIT_START,
    STAGE_BOOT_COMPLETE,
];

/// Target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "arm")]
    Arm,
    #[serde(rename = "riscv64")]
    Riscv64,
}

impl Architecture {
    /// Every supported architecture.
    pub const ALL: [Architecture; 4] = [
        Architecture::X86_64,
        Architecture::Arm64,
        Architecture::Arm,
        Architecture::Riscv64,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
            Architecture::Arm => "arm",
            Architecture::Riscv64 => "riscv64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "x86-64" | "amd64" => Ok(Architecture::X86_64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "arm" | "armv7" => Ok(Architecture::Arm),
            "riscv64" | "riscv" => Ok(Architecture::Riscv64),
            _ => Err(format!("Unknown architecture: {}", s)),
        }
    }
}

/// Configuration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Minimal,
    Default,
    Maximal,
    Custom,
}

impl ConfigType {
    /// The three generated configuration types.
    pub const STANDARD: [ConfigType; 3] = [ConfigType::Minimal, ConfigType::Default, ConfigType::Maximal];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Minimal => "minimal",
            ConfigType::Default => "default",
            ConfigType::Maximal => "maximal",
            ConfigType::Custom => "custom",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(ConfigType::Minimal),
            "default" => Ok(ConfigType::Default),
            "maximal" => Ok(ConfigType::Maximal),
            "custom" => Ok(ConfigType::Custom),
            _ => Err(format!("Unknown config type: {}", s)),
        }
    }
}

/// Tristate option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionValue {
    #[serde(rename = "y")]
    Yes,
    #[serde(rename = "n")]
    No,
    #[serde(rename = "m")]
    Module,
}

impl OptionValue {
    /// Built in or built as a module.
    pub fn is_enabled(&self) -> bool {
        matches!(self, OptionValue::Yes | OptionValue::Module)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionValue::Yes => "y",
            OptionValue::No => "n",
            OptionValue::Module => "m",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "y" | "Y" => Ok(OptionValue::Yes),
            "n" | "N" => Ok(OptionValue::No),
            "m" | "M" => Ok(OptionValue::Module),
            other => Err(format!("Option value must be one of y/n/m, got: {}", other)),
        }
    }
}

/// Check an option key: non-empty, ASCII alphanumeric or underscore.
pub fn validate_option_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::InvalidOption {
            key: key.to_string(),
            reason: "option key cannot be empty".to_string(),
        });
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::InvalidOption {
            key: key.to_string(),
            reason: "keys must be alphanumeric with underscores only".to_string(),
        });
    }
    Ok(())
}

/// Check a config name. It becomes a directory under the build root, so it
/// must be a single plain path component.
pub fn validate_config_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration name cannot be empty".to_string(),
        ));
    }
    if name.contains(&['/', '\\', '\0'][..]) || name == "." || name.contains("..") {
        return Err(ConfigError::ValidationFailed(format!(
            "Configuration name '{}' must not contain path separators or '..'",
            name
        )));
    }
    Ok(())
}

/// A named, immutable set of option assignments for one architecture.
///
/// The fields are private: every "modification" returns a new config, so a
/// value handed to the builder can never change underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    name: String,
    architecture: Architecture,
    config_type: ConfigType,
    options: BTreeMap<String, OptionValue>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl KernelConfig {
    /// Create a config, validating every option key.
    pub fn new<I>(
        name: impl Into<String>,
        architecture: Architecture,
        config_type: ConfigType,
        options: I,
        description: impl Into<String>,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, OptionValue)>,
    {
        let name = name.into();
        validate_config_name(&name)?;
        let mut map = BTreeMap::new();
        for (key, value) in options {
            validate_option_key(&key)?;
            map.insert(key, value);
        }
        Ok(KernelConfig {
            name,
            architecture,
            config_type,
            options: map,
            description: description.into(),
            metadata: BTreeMap::new(),
        })
    }

    /// Re-check the name and keys of a config that arrived through deserialization.
    pub fn check(&self) -> Result<(), ConfigError> {
        validate_config_name(&self.name)?;
        self.options.keys().try_for_each(|k| validate_option_key(k))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn config_type(&self) -> ConfigType {
        self.config_type
    }

    pub fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn option(&self, key: &str) -> Option<OptionValue> {
        self.options.get(key).copied()
    }

    /// `true` when the option is set to `y` or `m`.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.option(key).map_or(false, |v| v.is_enabled())
    }

    /// Enabled option names, in key order.
    pub fn enabled_options(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|(_, v)| v.is_enabled())
            .map(|(k, _)| k.as_str())
    }

    /// Number of options set to `y` or `m`.
    pub fn enabled_count(&self) -> usize {
        self.enabled_options().count()
    }

    /// Copy with one option assigned.
    pub fn with_option(&self, key: &str, value: OptionValue) -> Result<Self, ConfigError> {
        self.with_options([(key.to_string(), value)])
    }

    /// Copy with several options assigned.
    pub fn with_options<I>(&self, changes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, OptionValue)>,
    {
        let mut next = self.clone();
        for (key, value) in changes {
            validate_option_key(&key)?;
            next.options.insert(key, value);
        }
        Ok(next)
    }

    /// Copy under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate_config_name(&name)?;
        let mut next = self.clone();
        next.name = name;
        Ok(next)
    }

    /// Copy with one metadata entry set.
    pub fn with_metadata(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key.into(), value);
        next
    }
}

/// Outcome of building one configuration.
///
/// Build with [`ConfigBuildResult::succeeded`] or [`ConfigBuildResult::failed`];
/// both keep `success` consistent with the image path and error list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBuildResult {
    pub config: Arc<KernelConfig>,
    pub success: bool,
    pub build_time: Duration,
    pub kernel_image_path: Option<PathBuf>,
    pub build_log: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub size_bytes: Option<u64>,
}

impl ConfigBuildResult {
    /// Successful build with a located image.
    pub fn succeeded(
        config: Arc<KernelConfig>,
        build_time: Duration,
        kernel_image_path: PathBuf,
        size_bytes: u64,
        build_log: String,
        warnings: Vec<String>,
    ) -> Self {
        ConfigBuildResult {
            config,
            success: true,
            build_time,
            kernel_image_path: Some(kernel_image_path),
            build_log,
            errors: Vec::new(),
            warnings,
            size_bytes: Some(size_bytes),
        }
    }

    /// Failed build. An empty error list is replaced with a generic message.
    pub fn failed(
        config: Arc<KernelConfig>,
        build_time: Duration,
        build_log: String,
        mut errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        if errors.is_empty() {
            errors.push("Build failed".to_string());
        }
        ConfigBuildResult {
            config,
            success: false,
            build_time,
            kernel_image_path: None,
            build_log,
            errors,
            warnings,
            size_bytes: None,
        }
    }

    /// Configuration rejected before any build was attempted.
    pub fn rejected(config: Arc<KernelConfig>, errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self::failed(config, Duration::ZERO, String::new(), errors, warnings)
    }
}

/// How a boot result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootMode {
    /// No boot attempted (build failed).
    Skipped,
    /// Booted under an emulator.
    Emulated,
    /// No emulator: static image and option checks only.
    ValidationOnly,
}

/// Outcome of booting one built image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBootResult {
    pub config: Arc<KernelConfig>,
    pub success: bool,
    pub boot_time: Duration,
    pub log: String,
    pub errors: Vec<String>,
    pub boot_stages: BTreeMap<String, bool>,
    pub kernel_version: Option<String>,
    pub mode: BootMode,
}

impl ConfigBootResult {
    /// Stage map with every stage present and unreached.
    pub fn empty_stages() -> BTreeMap<String, bool> {
        BOOT_STAGES.iter().map(|s| (s.to_string(), false)).collect()
    }

    /// Boot not attempted.
    pub fn skipped(config: Arc<KernelConfig>, reason: impl Into<String>) -> Self {
        ConfigBootResult {
            config,
            success: false,
            boot_time: Duration::ZERO,
            log: String::new(),
            errors: vec![reason.into()],
            boot_stages: Self::empty_stages(),
            kernel_version: None,
            mode: BootMode::Skipped,
        }
    }

    pub fn stage_reached(&self, stage: &str) -> bool {
        self.boot_stages.get(stage).copied().unwrap_or(false)
    }
}

/// Functional test status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// One functional check run against a booted kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionalTestResult {
    pub name: String,
    pub status: TestStatus,
    pub duration: Duration,
    pub output: String,
}

/// Full per-configuration record: build, boot and functional outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTestResult {
    pub config: Arc<KernelConfig>,
    pub build_result: ConfigBuildResult,
    pub boot_success: bool,
    pub boot_time: Option<Duration>,
    pub boot_result: Option<ConfigBootResult>,
    pub functional_tests: Vec<FunctionalTestResult>,
    pub test_log: String,
    pub final_state: PipelineState,
    pub state_history: Vec<PipelineState>,
    /// Why the pipeline stopped early when `final_state` is `Aborted`.
    #[serde(default)]
    pub abort_reason: Option<String>,
}

impl ConfigTestResult {
    /// Functional checks that ran and failed.
    pub fn functional_failures(&self) -> impl Iterator<Item = &FunctionalTestResult> {
        self.functional_tests
            .iter()
            .filter(|t| t.status == TestStatus::Failed)
    }

    /// Build, boot and every functional check passed.
    pub fn fully_succeeded(&self) -> bool {
        self.build_result.success
            && self.boot_success
            && self.functional_failures().next().is_none()
            && self.final_state == PipelineState::Completed
    }
}
