//! Cross-run option usage statistics.
//!
//! The store is a JSON object mapping option name to [`ConfigOptionUsage`].
//! It is loaded once when the tracker is created and rewritten after every
//! tracking call while the writer lock is held. Cumulative run counters live
//! in a sibling file so the store itself stays a pure option map.

use crate::error::UsageStoreError;
use crate::models::{Architecture, ConfigTestResult, ConfigType, KernelConfig, OptionValue};
use chrono::{DateTime, Utc};
use crate::system::write_json_atomic;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Coarse usage bucket derived from [`ConfigOptionUsage::usage_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageFrequency {
    NeverUsed,
    RarelyUsed,
    OccasionallyUsed,
    FrequentlyUsed,
    AlwaysUsed,
}

impl UsageFrequency {
    pub const ALL: [UsageFrequency; 5] = [
        UsageFrequency::NeverUsed,
        UsageFrequency::RarelyUsed,
        UsageFrequency::OccasionallyUsed,
        UsageFrequency::FrequentlyUsed,
        UsageFrequency::AlwaysUsed,
    ];

    /// Step function over the usage rate. Every boundary is a strict `<`,
    /// so a rate of exactly 0.1 is occasionally used, not rarely used.
    pub fn from_rate(rate: f64) -> Self {
        if rate <= 0.0 {
            UsageFrequency::NeverUsed
        } else if rate < 0.1 {
            UsageFrequency::RarelyUsed
        } else if rate < 0.5 {
            UsageFrequency::OccasionallyUsed
        } else if rate < 0.9 {
            UsageFrequency::FrequentlyUsed
        } else {
            UsageFrequency::AlwaysUsed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageFrequency::NeverUsed => "never_used",
            UsageFrequency::RarelyUsed => "rarely_used",
            UsageFrequency::OccasionallyUsed => "occasionally_used",
            UsageFrequency::FrequentlyUsed => "frequently_used",
            UsageFrequency::AlwaysUsed => "always_used",
        }
    }
}

/// Running statistics for one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOptionUsage {
    pub option_name: String,
    pub total_tests: u64,
    pub enabled_count: u64,
    pub disabled_count: u64,
    pub module_count: u64,
    /// Observations whose build succeeded.
    #[serde(default)]
    pub successful_builds: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub usage_frequency: UsageFrequency,
    pub architectures_used: BTreeSet<String>,
    pub config_types_used: BTreeSet<String>,
}

impl ConfigOptionUsage {
    pub fn new(option_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        ConfigOptionUsage {
            option_name: option_name.into(),
            total_tests: 0,
            enabled_count: 0,
            disabled_count: 0,
            module_count: 0,
            successful_builds: 0,
            first_seen: now,
            last_seen: now,
            usage_frequency: UsageFrequency::NeverUsed,
            architectures_used: BTreeSet::new(),
            config_types_used: BTreeSet::new(),
        }
    }

    /// `(enabled + module) / total`, or 0.0 before the first observation.
    pub fn usage_rate(&self) -> f64 {
        if self.total_tests == 0 {
            return 0.0;
        }
        (self.enabled_count + self.module_count) as f64 / self.total_tests as f64
    }

    /// Share of observations whose build succeeded; `None` before the first one.
    pub fn build_success_rate(&self) -> Option<f64> {
        (self.total_tests > 0).then(|| self.successful_builds as f64 / self.total_tests as f64)
    }

    pub fn observe(
        &mut self,
        value: OptionValue,
        arch: Architecture,
        config_type: ConfigType,
        build_succeeded: bool,
        now: DateTime<Utc>,
    ) {
        self.total_tests += 1;
        match value {
            OptionValue::Yes => self.enabled_count += 1,
            OptionValue::No => self.disabled_count += 1,
            OptionValue::Module => self.module_count += 1,
        }
        if build_succeeded {
            self.successful_builds += 1;
        }
        self.last_seen = now;
        self.architectures_used.insert(arch.as_str().to_string());
        self.config_types_used.insert(config_type.as_str().to_string());
        self.usage_frequency = UsageFrequency::from_rate(self.usage_rate());
    }
}

/// Tracked runs by architecture and config type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCounters {
    pub total_runs: u64,
    pub by_architecture: BTreeMap<Architecture, u64>,
    pub by_config_type: BTreeMap<ConfigType, u64>,
}

impl RunCounters {
    pub fn runs_of(&self, config_type: ConfigType) -> u64 {
        self.by_config_type.get(&config_type).copied().unwrap_or(0)
    }

    fn record(&mut self, arch: Architecture, config_type: ConfigType) {
        self.total_runs += 1;
        *self.by_architecture.entry(arch).or_insert(0) += 1;
        *self.by_config_type.entry(config_type).or_insert(0) += 1;
    }
}

pub type UsageStore = BTreeMap<String, ConfigOptionUsage>;

/// Sibling file holding the cumulative [`RunCounters`]: `usage.json` -> `usage.runs.json`.
pub fn run_counters_path(store_path: &Path) -> PathBuf {
    store_path.with_extension("runs.json")
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, UsageStoreError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(UsageStoreError::Io(e)),
    }
}

/// Read the store. A missing file is an empty store.
pub fn load_store(path: &Path) -> Result<UsageStore, UsageStoreError> {
    read_json_or_default(path)
}

/// Replace the store atomically.
pub fn save_store(path: &Path, store: &UsageStore) -> Result<(), UsageStoreError> {
    Ok(write_json_atomic(path, store)?)
}

/// Read the run counters. A missing file means no runs yet.
pub fn load_run_counters(path: &Path) -> Result<RunCounters, UsageStoreError> {
    read_json_or_default(path)
}

pub fn save_run_counters(path: &Path, counters: &RunCounters) -> Result<(), UsageStoreError> {
    Ok(write_json_atomic(path, counters)?)
}

struct TrackerState {
    options: UsageStore,
    /// Runs tracked by this process.
    session: RunCounters,
    /// Runs tracked by every process that used this store, this one included.
    history: RunCounters,
}

/// Accumulates option usage and keeps the store file current.
pub struct UsageTracker {
    store_path: PathBuf,
    state: Mutex<TrackerState>,
}

impl UsageTracker {
    /// Load the store at `store_path`. An unreadable store is logged and
    /// replaced by an empty one on the next save.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        let options = match load_store(&store_path) {
            Ok(options) => {
                log::debug!(
                    "[Usage] Loaded {} option record(s) from {}",
                    options.len(),
                    store_path.display()
                );
                options
            }
            Err(e) => {
                log::warn!(
                    "[Usage] Could not load {}, starting empty: {}",
                    store_path.display(),
                    e
                );
                UsageStore::new()
            }
        };
        let history = match load_run_counters(&run_counters_path(&store_path)) {
            Ok(history) => history,
            Err(e) => {
                log::warn!(
                    "[Usage] Could not load run counters for {}, starting from zero: {}",
                    store_path.display(),
                    e
                );
                RunCounters::default()
            }
        };
        UsageTracker {
            store_path,
            state: Mutex::new(TrackerState {
                options,
                session: RunCounters::default(),
                history,
            }),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one tested configuration.
    ///
    /// The in-memory update always happens; a failed save is only logged.
    pub fn track_configuration(&self, config: &KernelConfig, test_result: Option<&ConfigTestResult>) {
        let build_succeeded = test_result.map_or(false, |r| r.build_result.success);
        let now = Utc::now();
        let mut state = self.lock();

        for (name, value) in config.options() {
            state
                .options
                .entry(name.clone())
                .or_insert_with(|| ConfigOptionUsage::new(name.clone(), now))
                .observe(*value, config.architecture(), config.config_type(), build_succeeded, now);
        }
        state.session.record(config.architecture(), config.config_type());
        state.history.record(config.architecture(), config.config_type());

        if let Err(e) = save_store(&self.store_path, &state.options) {
            log::error!("[Usage] Failed to save {}: {}", self.store_path.display(), e);
        }
        let runs_path = run_counters_path(&self.store_path);
        if let Err(e) = save_run_counters(&runs_path, &state.history) {
            log::error!("[Usage] Failed to save {}: {}", runs_path.display(), e);
        }
    }

    pub fn get(&self, option: &str) -> Option<ConfigOptionUsage> {
        self.lock().options.get(option).cloned()
    }

    /// Copy of every option record.
    pub fn snapshot(&self) -> UsageStore {
        self.lock().options.clone()
    }

    pub fn session(&self) -> RunCounters {
        self.lock().session.clone()
    }

    /// Cumulative runs across restarts.
    pub fn run_history(&self) -> RunCounters {
        self.lock().history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generator::generate_standard_config;
    use tempfile::TempDir;

    fn foo_config(value: OptionValue) -> KernelConfig {
        KernelConfig::new(
            "foo",
            Architecture::X86_64,
            ConfigType::Custom,
            vec![("CONFIG_FOO".to_string(), value)],
            "",
        )
        .unwrap()
    }

    #[test]
    fn test_frequency_boundaries() {
        assert_eq!(UsageFrequency::from_rate(0.0), UsageFrequency::NeverUsed);
        assert_eq!(UsageFrequency::from_rate(0.05), UsageFrequency::RarelyUsed);
        assert_eq!(UsageFrequency::from_rate(0.1), UsageFrequency::OccasionallyUsed);
        assert_eq!(UsageFrequency::from_rate(0.5), UsageFrequency::FrequentlyUsed);
        assert_eq!(UsageFrequency::from_rate(0.9), UsageFrequency::AlwaysUsed);
        assert_eq!(UsageFrequency::from_rate(1.0), UsageFrequency::AlwaysUsed);
    }

    #[test]
    fn test_observe_counts_modules_as_usage() {
        let now = Utc::now();
        let mut usage = ConfigOptionUsage::new("CONFIG_EXT4_FS", now);
        usage.observe(OptionValue::Module, Architecture::Arm64, ConfigType::Default, true, now);
        usage.observe(OptionValue::No, Architecture::X86_64, ConfigType::Minimal, false, now);
        assert_eq!(usage.total_tests, 2);
        assert_eq!(usage.usage_rate(), 0.5);
        assert_eq!(usage.build_success_rate(), Some(0.5));
        assert_eq!(usage.usage_frequency, UsageFrequency::FrequentlyUsed);
        assert_eq!(usage.architectures_used.len(), 2);
    }

    #[test]
    fn test_tracker_persists_after_each_call() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store/usage.json");
        let tracker = UsageTracker::new(&path);
        tracker.track_configuration(&foo_config(OptionValue::Yes), None);
        assert!(path.exists());

        let reloaded = UsageTracker::new(&path);
        let usage = reloaded.get("CONFIG_FOO").unwrap();
        assert_eq!(usage.enabled_count, 1);
        assert_eq!(reloaded.session().total_runs, 0);
    }

    #[test]
    fn test_run_history_survives_restart() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("usage.json");
        let tracker = UsageTracker::new(&path);
        tracker.track_configuration(&foo_config(OptionValue::Yes), None);
        tracker.track_configuration(&foo_config(OptionValue::No), None);
        assert!(run_counters_path(&path).is_file());

        let reloaded = UsageTracker::new(&path);
        assert_eq!(reloaded.session().total_runs, 0);
        let history = reloaded.run_history();
        assert_eq!(history.total_runs, 2);
        assert_eq!(history.runs_of(ConfigType::Custom), 2);

        reloaded.track_configuration(&foo_config(OptionValue::Yes), None);
        assert_eq!(reloaded.run_history().total_runs, 3);
        assert_eq!(reloaded.session().total_runs, 1);
        assert!(load_store(&path).unwrap().contains_key("CONFIG_FOO"));
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("usage.json");
        std::fs::write(&path, "[not a map").unwrap();
        let tracker = UsageTracker::new(&path);
        assert!(tracker.snapshot().is_empty());

        tracker.track_configuration(
            &generate_standard_config(Architecture::Arm64, ConfigType::Minimal).unwrap(),
            None,
        );
        assert!(load_store(&path).is_ok());
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // Parent "directory" is a regular file, so every save fails.
        let tracker = UsageTracker::new(blocker.join("usage.json"));
        tracker.track_configuration(&foo_config(OptionValue::Yes), None);
        assert_eq!(tracker.get("CONFIG_FOO").unwrap().total_tests, 1);
    }
}
