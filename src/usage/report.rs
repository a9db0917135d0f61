//! Usage statistics and recommendations.

use super::analyzer::{RarelyUsedAnalysis, RarelyUsedOptionIdentifier};
use super::tracker::{RunCounters, UsageFrequency, UsageStore, UsageTracker};
use crate::models::ConfigType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Architectures a healthy test matrix should cover.
const MIN_ARCHITECTURES: usize = 3;

/// Build success rate under which an option is reported as failure-correlated.
const FAILURE_CORRELATION_RATE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatistics {
    pub total_options: usize,
    /// Every bucket present, possibly zero.
    pub by_frequency: BTreeMap<UsageFrequency, usize>,
    /// Architecture -> number of options observed on it.
    pub architecture_coverage: BTreeMap<String, usize>,
    /// Config type -> number of options observed in it.
    pub config_type_coverage: BTreeMap<String, usize>,
    /// Runs tracked by the current process.
    pub session: RunCounters,
    /// Runs tracked against this store across restarts.
    pub run_history: RunCounters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCorrelatedOption {
    pub option_name: String,
    pub build_success_rate: f64,
    pub total_tests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub generated_at: DateTime<Utc>,
    pub statistics: UsageStatistics,
    pub analysis: RarelyUsedAnalysis,
    pub failure_correlated: Vec<FailureCorrelatedOption>,
    pub recommendations: Vec<String>,
}

pub struct UsageReportGenerator {
    identifier: RarelyUsedOptionIdentifier,
    known_options: BTreeSet<String>,
}

impl UsageReportGenerator {
    pub fn new(identifier: RarelyUsedOptionIdentifier) -> Self {
        UsageReportGenerator {
            identifier,
            known_options: BTreeSet::new(),
        }
    }

    /// Options expected to show up in tests; unobserved ones are reported.
    pub fn with_known_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn generate(&self, tracker: &UsageTracker) -> UsageReport {
        self.generate_from(&tracker.snapshot(), &tracker.session(), &tracker.run_history())
    }

    pub fn generate_from(&self, store: &UsageStore, session: &RunCounters, run_history: &RunCounters) -> UsageReport {
        let statistics = statistics(store, session, run_history);
        let analysis = self.identifier.identify(store, &self.known_options);
        let failure_correlated = self.failure_correlated(store);
        let recommendations = recommendations(&statistics, &analysis, &failure_correlated);
        UsageReport {
            generated_at: Utc::now(),
            statistics,
            analysis,
            failure_correlated,
            recommendations,
        }
    }

    fn failure_correlated(&self, store: &UsageStore) -> Vec<FailureCorrelatedOption> {
        store
            .values()
            .filter(|u| u.total_tests >= self.identifier.min_tests())
            .filter_map(|u| {
                let rate = u.build_success_rate()?;
                (rate < FAILURE_CORRELATION_RATE).then(|| FailureCorrelatedOption {
                    option_name: u.option_name.clone(),
                    build_success_rate: rate,
                    total_tests: u.total_tests,
                })
            })
            .collect()
    }
}

fn statistics(store: &UsageStore, session: &RunCounters, run_history: &RunCounters) -> UsageStatistics {
    let mut by_frequency: BTreeMap<UsageFrequency, usize> =
        UsageFrequency::ALL.iter().map(|f| (*f, 0)).collect();
    let mut architecture_coverage = BTreeMap::new();
    let mut config_type_coverage = BTreeMap::new();

    for usage in store.values() {
        *by_frequency.entry(usage.usage_frequency).or_insert(0) += 1;
        for arch in &usage.architectures_used {
            *architecture_coverage.entry(arch.clone()).or_insert(0) += 1;
        }
        for config_type in &usage.config_types_used {
            *config_type_coverage.entry(config_type.clone()).or_insert(0) += 1;
        }
    }

    UsageStatistics {
        total_options: store.len(),
        by_frequency,
        architecture_coverage,
        config_type_coverage,
        session: session.clone(),
        run_history: run_history.clone(),
    }
}

fn recommendations(
    stats: &UsageStatistics,
    analysis: &RarelyUsedAnalysis,
    failure_correlated: &[FailureCorrelatedOption],
) -> Vec<String> {
    let mut out = Vec::new();

    let covered = stats.architecture_coverage.len();
    if covered < MIN_ARCHITECTURES {
        out.push(format!(
            "Fewer than {} architectures covered ({}); add more targets to the test matrix",
            MIN_ARCHITECTURES, covered
        ));
    }

    let runs = stats.run_history.total_runs;
    if runs > 0 {
        let minimal = stats.run_history.runs_of(ConfigType::Minimal);
        if minimal * 3 < runs {
            out.push(format!(
                "Minimal configurations are {:.0}% of recorded runs, below one-third; test more minimal configs",
                minimal as f64 * 100.0 / runs as f64
            ));
        }
    }

    if !analysis.rarely_used.is_empty() {
        out.push(format!(
            "{} option(s) are rarely used; consider dropping them from the standard templates",
            analysis.rarely_used.len()
        ));
    }
    if !analysis.never_enabled.is_empty() {
        out.push(format!(
            "{} option(s) were never enabled in any tested configuration",
            analysis.never_enabled.len()
        ));
    }
    if !analysis.never_tested.is_empty() {
        out.push(format!(
            "{} known option(s) never appeared in a tested configuration: {}",
            analysis.never_tested.len(),
            analysis.never_tested.join(", ")
        ));
    }
    if !failure_correlated.is_empty() {
        let names: Vec<&str> = failure_correlated.iter().map(|f| f.option_name.as_str()).collect();
        out.push(format!(
            "Builds including {} fail more often than they succeed; investigate",
            names.join(", ")
        ));
    }

    if out.is_empty() {
        out.push("Usage coverage looks healthy".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Architecture, KernelConfig, OptionValue};
    use tempfile::TempDir;

    fn config(arch: Architecture, config_type: ConfigType, value: OptionValue) -> KernelConfig {
        KernelConfig::new(
            format!("{}_{}", config_type, arch),
            arch,
            config_type,
            vec![
                ("CONFIG_FOO".to_string(), value),
                ("CONFIG_BAR".to_string(), OptionValue::Yes),
            ],
            "",
        )
        .unwrap()
    }

    #[test]
    fn test_statistics_bucket_counts() {
        let temp = TempDir::new().unwrap();
        let tracker = UsageTracker::new(temp.path().join("usage.json"));
        tracker.track_configuration(&config(Architecture::X86_64, ConfigType::Default, OptionValue::No), None);

        let report = UsageReportGenerator::new(RarelyUsedOptionIdentifier::default()).generate(&tracker);
        let stats = &report.statistics;
        assert_eq!(stats.total_options, 2);
        assert_eq!(stats.by_frequency.len(), 5);
        assert_eq!(stats.by_frequency[&UsageFrequency::NeverUsed], 1);
        assert_eq!(stats.by_frequency[&UsageFrequency::AlwaysUsed], 1);
        assert_eq!(stats.by_frequency.values().sum::<usize>(), stats.total_options);
        assert_eq!(stats.architecture_coverage["x86_64"], 2);
    }

    #[test]
    fn test_recommendations_for_narrow_matrix() {
        let temp = TempDir::new().unwrap();
        let tracker = UsageTracker::new(temp.path().join("usage.json"));
        for _ in 0..3 {
            tracker.track_configuration(&config(Architecture::Arm64, ConfigType::Maximal, OptionValue::Yes), None);
        }
        let report = UsageReportGenerator::new(RarelyUsedOptionIdentifier::new(2, 0.1))
            .with_known_options(["CONFIG_BAZ"])
            .generate(&tracker);

        let joined = report.recommendations.join("\n");
        assert!(joined.contains("Fewer than 3 architectures"));
        assert!(joined.contains("below one-third"));
        assert!(joined.contains("CONFIG_BAZ"));
        // No build result was supplied, so every observation counts as a failed build.
        assert_eq!(report.failure_correlated.len(), 2);
    }

    #[test]
    fn test_healthy_store_gets_single_recommendation() {
        let report = UsageReportGenerator::new(RarelyUsedOptionIdentifier::default()).generate_from(
            &UsageStore::new(),
            &RunCounters::default(),
            &RunCounters::default(),
        );
        // Empty store still covers zero architectures.
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("architectures covered (0)"));
    }
}
