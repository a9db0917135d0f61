//! GOATd Kernel Config Lab
//!
//! Generates standard kernel configurations (minimal/default/maximal) per
//! architecture, builds and boot-tests them with bounded parallelism, detects
//! option conflicts, and tracks option usage across runs.
//!
//! The system is organized into functional modules:
//! - **error**: error enums per concern
//! - **models**: configs and per-stage results
//! - **config**: lab settings, generation, validation, conflict rules
//! - **kernel**: `.config` I/O, `make` builds, emulator boots, boot log analysis
//! - **orchestrator**: per-config pipeline, worker pool, run report
//! - **usage**: persisted option usage statistics and reports
//! - **sinks**: result storage / notification seams
//! - **system**: subprocess execution, capability probes, logging macros

// Core foundational modules
pub mod error;
pub mod models;

// Subprocess plumbing and logging macros
pub mod system;

// Settings, generation, validation and conflict analysis
pub mod config;

// Build and boot execution
pub mod kernel;

// Robust, decoupled logging system
pub mod log_collector;

// Pipeline coordination
pub mod orchestrator;

pub mod sinks;
pub mod usage;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{BootError, BuildError, ConfigError, UsageStoreError};

pub use models::{
    Architecture, BootMode, ConfigBootResult, ConfigBuildResult, ConfigTestResult, ConfigType,
    FunctionalTestResult, KernelConfig, OptionValue, TestStatus,
};

pub use config::conflicts::{ConfigConflict, ConflictDetector, ConflictReport, ConflictType, Severity};
pub use config::resolution::{ConflictResolution, ConflictResolutionSuggester};
pub use config::validator::{validate_config, ValidationOutcome};
pub use config::{SettingsManager, TesterSettings};

pub use kernel::{BootTester, BootVerifier, ConfigBuilder, KernelBuilder};

pub use orchestrator::{generate_test_report, Outcome, PipelineState, TestOrchestrator, TestReport};

pub use usage::{RarelyUsedOptionIdentifier, UsageReportGenerator, UsageTracker};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        let err: ConfigError = ConfigError::ValidationFailed("bad".to_string());
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_enum_variants_accessible() {
        assert_eq!(Architecture::Arm64, Architecture::Arm64);
        assert_eq!(Severity::Critical, Severity::Critical);
        assert_eq!(PipelineState::Completed.as_str(), "completed");
    }
}
