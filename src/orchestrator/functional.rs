//! Functional checks run after a successful boot.
//!
//! Battery membership depends on the config type:
//!
//! | check | minimal | default | maximal | custom |
//! |---|---|---|---|---|
//! | version_check | yes | yes | yes | yes |
//! | basic_syscalls | | yes | yes | yes |
//! | memory_management | | yes | yes | |

use crate::models::{
    BootMode, ConfigBootResult, ConfigType, FunctionalTestResult, KernelConfig, TestStatus,
    STAGE_INIT_START, STAGE_MEMORY_INIT,
};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionalCheck {
    VersionCheck,
    BasicSyscalls,
    MemoryManagement,
}

impl FunctionalCheck {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionalCheck::VersionCheck => "version_check",
            FunctionalCheck::BasicSyscalls => "basic_syscalls",
            FunctionalCheck::MemoryManagement => "memory_management",
        }
    }

    /// Evaluate against a console log. `Ok` carries the pass message.
    fn evaluate(&self, boot: &ConfigBootResult) -> Result<String, String> {
        match self {
            FunctionalCheck::VersionCheck => boot
                .kernel_version
                .as_ref()
                .map(|v| format!("kernel reports version {}", v))
                .ok_or_else(|| "no kernel version banner in console output".to_string()),
            FunctionalCheck::BasicSyscalls => {
                if !boot.stage_reached(STAGE_INIT_START) {
                    Err("userspace init never started".to_string())
                } else if boot.log.contains("Attempted to kill init") {
                    Err("init exited abnormally".to_string())
                } else {
                    Ok("init started and kept running".to_string())
                }
            }
            FunctionalCheck::MemoryManagement => {
                if !boot.stage_reached(STAGE_MEMORY_INIT) {
                    Err("memory zones were never reported".to_string())
                } else if let Some(line) = boot
                    .log
                    .lines()
                    .find(|l| l.contains("Out of memory") || l.contains("page allocation failure"))
                {
                    Err(format!("allocator trouble: {}", line.trim()))
                } else {
                    Ok("memory initialized without allocation failures".to_string())
                }
            }
        }
    }
}

/// Checks that apply to `config_type`.
pub fn battery(config_type: ConfigType) -> Vec<FunctionalCheck> {
    let mut checks = vec![FunctionalCheck::VersionCheck];
    if config_type != ConfigType::Minimal {
        checks.push(FunctionalCheck::BasicSyscalls);
    }
    if matches!(config_type, ConfigType::Default | ConfigType::Maximal) {
        checks.push(FunctionalCheck::MemoryManagement);
    }
    checks
}

/// Run the battery for `config` against a successful boot.
///
/// Validation-only boots have no console output, so every check is skipped.
pub fn run_functional_tests(config: &KernelConfig, boot: &ConfigBootResult) -> Vec<FunctionalTestResult> {
    battery(config.config_type())
        .into_iter()
        .map(|check| {
            let started = Instant::now();
            let (status, output) = if boot.mode != BootMode::Emulated {
                (TestStatus::Skipped, "no emulated boot to inspect".to_string())
            } else {
                match check.evaluate(boot) {
                    Ok(msg) => (TestStatus::Passed, msg),
                    Err(msg) => (TestStatus::Failed, msg),
                }
            };
            FunctionalTestResult {
                name: check.name().to_string(),
                status,
                duration: started.elapsed(),
                output,
            }
        })
        .collect()
}
