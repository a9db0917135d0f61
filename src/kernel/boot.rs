//! Boot verification of built images.
//!
//! Emulated when an emulator for the architecture is installed (and not
//! disabled in settings), validation-only otherwise. The branch is decided
//! by [`is_emulator_available`] up front.

use super::bootlog::analyze_boot_log;
use super::emulator::{build_invocation, is_emulator_available};
use crate::config::arch;
use crate::config::TesterSettings;
use crate::error::BootError;
use crate::models::{BootMode, ConfigBootResult, ConfigBuildResult, KernelConfig};
use crate::system::process;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Boots one built image.
#[async_trait]
pub trait BootVerifier: Send + Sync {
    /// Never fails. Returns a skipped result without spawning anything when
    /// the build did not succeed.
    async fn boot_test_config(
        &self,
        config: Arc<KernelConfig>,
        build_result: &ConfigBuildResult,
        timeout: Duration,
    ) -> ConfigBootResult;
}

pub struct BootTester {
    settings: Arc<TesterSettings>,
}

impl BootTester {
    pub fn new(settings: Arc<TesterSettings>) -> Self {
        BootTester { settings }
    }

    /// Whether `config` would be booted under an emulator.
    pub fn will_emulate(&self, config: &KernelConfig) -> bool {
        !self.settings.validation_only_boot
            && is_emulator_available(config.architecture(), &self.settings)
    }

    async fn emulate(&self, config: Arc<KernelConfig>, image: &Path, timeout: Duration) -> ConfigBootResult {
        let invocation = build_invocation(config.architecture(), image, &self.settings);
        log::info!("[Boot] {}: {}", config.name(), invocation.display());
        let started = Instant::now();

        let outcome = match process::run_with_timeout(invocation.to_command(), timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = BootError::EmulatorSpawn {
                    cmd: invocation.program.clone(),
                    reason: e.to_string(),
                };
                return ConfigBootResult {
                    config,
                    success: false,
                    boot_time: started.elapsed(),
                    log: String::new(),
                    errors: vec![err.to_string()],
                    boot_stages: ConfigBootResult::empty_stages(),
                    kernel_version: None,
                    mode: BootMode::Emulated,
                };
            }
        };

        let analysis = analyze_boot_log(&outcome.output);
        let mut errors = analysis.errors;
        let mut log = outcome.output;
        if outcome.timed_out {
            if analysis.success {
                // Userspace kept running until we pulled the plug.
                log.push_str(&format!(
                    "[lab] emulator stopped after {}s timeout; boot had completed\n",
                    timeout.as_secs()
                ));
            } else {
                errors.push(BootError::TimedOut(timeout.as_secs()).to_string());
            }
        }

        ConfigBootResult {
            config,
            success: analysis.success,
            boot_time: outcome.duration,
            log,
            errors,
            boot_stages: analysis.stages,
            kernel_version: analysis.kernel_version,
            mode: BootMode::Emulated,
        }
    }

    fn check_image(&self, image: &Path) -> Result<u64, BootError> {
        let meta = std::fs::metadata(image).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BootError::ImageMissing(image.display().to_string())
            } else {
                BootError::Io(e)
            }
        })?;
        let size = meta.len();
        if size == 0 {
            return Err(BootError::ImageEmpty(image.display().to_string()));
        }
        if size < self.settings.min_kernel_image_bytes {
            return Err(BootError::ImageTooSmall {
                path: image.display().to_string(),
                size,
                minimum: self.settings.min_kernel_image_bytes,
            });
        }
        Ok(size)
    }

    fn validate_only(&self, config: Arc<KernelConfig>, image: &Path) -> ConfigBootResult {
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut log = format!("validation-only boot check for {}\n", image.display());

        match self.check_image(image) {
            Ok(size) => log.push_str(&format!("image present, {} bytes\n", size)),
            Err(e) => errors.push(e.to_string()),
        }
        for option in arch::missing_required(&config) {
            errors.push(format!(
                "Required option {} missing for {}",
                option,
                config.architecture()
            ));
        }

        ConfigBootResult {
            success: errors.is_empty(),
            boot_time: started.elapsed(),
            log,
            errors,
            boot_stages: ConfigBootResult::empty_stages(),
            kernel_version: None,
            mode: BootMode::ValidationOnly,
            config,
        }
    }
}

#[async_trait]
impl BootVerifier for BootTester {
    async fn boot_test_config(
        &self,
        config: Arc<KernelConfig>,
        build_result: &ConfigBuildResult,
        timeout: Duration,
    ) -> ConfigBootResult {
        let image = match (&build_result.kernel_image_path, build_result.success) {
            (Some(image), true) => image.clone(),
            (_, false) => {
                return ConfigBootResult::skipped(config, "Build failed; boot test not attempted")
            }
            (None, true) => {
                return ConfigBootResult::skipped(config, "No kernel image available; boot test not attempted")
            }
        };

        let result = if self.will_emulate(&config) {
            self.emulate(config, &image, timeout).await
        } else {
            log::info!(
                "[Boot] No emulator for {}, falling back to validation-only",
                config.architecture()
            );
            self.validate_only(config, &image)
        };
        crate::log_parsed!(
            "[Boot] {} {} ({:?})",
            result.config.name(),
            if result.success { "booted" } else { "failed to boot" },
            result.mode
        );
        result
    }
}
