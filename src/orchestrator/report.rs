//! Aggregate report over one orchestration run.

use crate::models::{Architecture, ConfigTestResult, ConfigType, TestStatus};
use crate::orchestrator::state::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Where a configuration's pipeline fell short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Invalid,
    BuildFailed,
    BootFailed,
    FunctionalFailed,
    Aborted,
}

impl Outcome {
    /// `None` for a fully successful configuration.
    pub fn classify(result: &ConfigTestResult) -> Option<Outcome> {
        if result.final_state == PipelineState::Aborted {
            return Some(Outcome::Aborted);
        }
        if result.final_state == PipelineState::Invalid {
            return Some(Outcome::Invalid);
        }
        if !result.build_result.success {
            return Some(Outcome::BuildFailed);
        }
        if !result.boot_success {
            return Some(Outcome::BootFailed);
        }
        if result.functional_failures().next().is_some() {
            return Some(Outcome::FunctionalFailed);
        }
        if result.final_state != PipelineState::Completed {
            return Some(Outcome::Aborted);
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub total: usize,
    pub successful_builds: usize,
    pub successful_boots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSize {
    pub config_name: String,
    pub architecture: Architecture,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedConfig {
    pub config_name: String,
    pub architecture: Architecture,
    pub config_type: ConfigType,
    pub outcome: Outcome,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub generated_at: DateTime<Utc>,
    pub total_configurations: usize,
    pub successful_builds: usize,
    pub successful_boots: usize,
    pub fully_successful: usize,
    pub build_success_rate: f64,
    pub boot_success_rate: f64,
    pub by_architecture: BTreeMap<Architecture, Breakdown>,
    pub by_config_type: BTreeMap<ConfigType, Breakdown>,
    pub largest_kernel: Option<KernelSize>,
    pub smallest_kernel: Option<KernelSize>,
    /// Mean over successful builds only.
    pub average_build_time: Option<Duration>,
    pub functional_tests_passed: usize,
    pub functional_tests_failed: usize,
    pub failed_configs: Vec<FailedConfig>,
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Errors attached at the stage that failed.
fn stage_errors(result: &ConfigTestResult, outcome: Outcome) -> Vec<String> {
    let boot_errors = || {
        result
            .boot_result
            .as_ref()
            .map(|b| b.errors.clone())
            .unwrap_or_default()
    };
    match outcome {
        Outcome::Invalid | Outcome::BuildFailed => result.build_result.errors.clone(),
        Outcome::BootFailed => boot_errors(),
        Outcome::FunctionalFailed => result
            .functional_failures()
            .map(|t| format!("{}: {}", t.name, t.output))
            .collect(),
        Outcome::Aborted => {
            let mut errors: Vec<String> = result.abort_reason.iter().cloned().collect();
            errors.extend(result.build_result.errors.iter().cloned());
            errors.extend(boot_errors());
            errors
        }
    }
}

/// Summarize a run. Order of `results` does not matter.
pub fn generate_test_report(results: &[ConfigTestResult]) -> TestReport {
    let total = results.len();
    let mut successful_builds = 0;
    let mut successful_boots = 0;
    let mut fully_successful = 0;
    let mut by_architecture: BTreeMap<Architecture, Breakdown> = BTreeMap::new();
    let mut by_config_type: BTreeMap<ConfigType, Breakdown> = BTreeMap::new();
    let mut largest: Option<KernelSize> = None;
    let mut smallest: Option<KernelSize> = None;
    let mut build_time_sum = Duration::ZERO;
    let mut functional_tests_passed = 0;
    let mut functional_tests_failed = 0;
    let mut failed_configs = Vec::new();

    for result in results {
        let config = &result.config;
        let built = result.build_result.success;
        let booted = result.boot_success;

        for entry in [
            by_architecture.entry(config.architecture()).or_default(),
            by_config_type.entry(config.config_type()).or_default(),
        ] {
            entry.total += 1;
            entry.successful_builds += built as usize;
            entry.successful_boots += booted as usize;
        }

        if built {
            successful_builds += 1;
            build_time_sum += result.build_result.build_time;
            if let Some(size) = result.build_result.size_bytes {
                let candidate = KernelSize {
                    config_name: config.name().to_string(),
                    architecture: config.architecture(),
                    size_bytes: size,
                };
                // Equal sizes go to the lower config name so arrival order never matters.
                if largest.as_ref().map_or(true, |l| {
                    size > l.size_bytes || (size == l.size_bytes && candidate.config_name < l.config_name)
                }) {
                    largest = Some(candidate.clone());
                }
                if smallest.as_ref().map_or(true, |s| {
                    (size, &candidate.config_name) < (s.size_bytes, &s.config_name)
                }) {
                    smallest = Some(candidate);
                }
            }
        }
        if booted {
            successful_boots += 1;
        }

        for test in &result.functional_tests {
            match test.status {
                TestStatus::Passed => functional_tests_passed += 1,
                TestStatus::Failed => functional_tests_failed += 1,
                TestStatus::Skipped => {}
            }
        }

        match Outcome::classify(result) {
            None => fully_successful += 1,
            Some(outcome) => failed_configs.push(FailedConfig {
                config_name: config.name().to_string(),
                architecture: config.architecture(),
                config_type: config.config_type(),
                outcome,
                errors: stage_errors(result, outcome),
                warnings: result.build_result.warnings.clone(),
            }),
        }
    }
    failed_configs.sort_by(|a, b| a.config_name.cmp(&b.config_name));

    let average_build_time = (successful_builds > 0).then(|| build_time_sum / successful_builds as u32);

    TestReport {
        generated_at: Utc::now(),
        total_configurations: total,
        successful_builds,
        successful_boots,
        fully_successful,
        build_success_rate: rate(successful_builds, total),
        boot_success_rate: rate(successful_boots, total),
        by_architecture,
        by_config_type,
        largest_kernel: largest,
        smallest_kernel: smallest,
        average_build_time,
        functional_tests_passed,
        functional_tests_failed,
        failed_configs,
    }
}
