//! Collaborator seams: where results are stored and critical events are sent.
//!
//! Most persistence and notification channels live outside this crate; the
//! orchestrator only needs "accepts a record" and "accepts an event".
//! [`BuildHistorySink`] is the one file-backed sink, used by the binary.

use crate::models::{Architecture, ConfigBootResult, ConfigBuildResult, ConfigTestResult, ConfigType};
use crate::system::write_json_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Result ingestion for later querying.
pub trait ResultSink: Send + Sync {
    fn record_build(&self, result: &ConfigBuildResult);
    fn record_boot(&self, result: &ConfigBootResult);
    fn record_test(&self, result: &ConfigTestResult);
    /// Outcome of the most recent recorded build for this pair, if any.
    fn last_build_succeeded(&self, arch: Architecture, config_type: ConfigType) -> Option<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Critical,
    Warning,
    Info,
}

/// A severity-tagged event for the notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalEvent {
    pub severity: EventSeverity,
    pub title: String,
    pub message: String,
    pub config_name: Option<String>,
    pub architecture: Option<Architecture>,
    pub timestamp: DateTime<Utc>,
}

impl CriticalEvent {
    pub fn new(severity: EventSeverity, title: impl Into<String>, message: impl Into<String>) -> Self {
        CriticalEvent {
            severity,
            title: title.into(),
            message: message.into(),
            config_name: None,
            architecture: None,
            timestamp: Utc::now(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &CriticalEvent);
}

#[derive(Default)]
struct Records {
    builds: Vec<ConfigBuildResult>,
    boots: Vec<ConfigBootResult>,
    tests: Vec<ConfigTestResult>,
}

/// In-process result store.
#[derive(Default)]
pub struct MemoryResultSink {
    records: Mutex<Records>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn builds(&self) -> Vec<ConfigBuildResult> {
        self.lock().builds.clone()
    }

    pub fn boots(&self) -> Vec<ConfigBootResult> {
        self.lock().boots.clone()
    }

    pub fn tests(&self) -> Vec<ConfigTestResult> {
        self.lock().tests.clone()
    }
}

impl ResultSink for MemoryResultSink {
    fn record_build(&self, result: &ConfigBuildResult) {
        self.lock().builds.push(result.clone());
    }

    fn record_boot(&self, result: &ConfigBootResult) {
        self.lock().boots.push(result.clone());
    }

    fn record_test(&self, result: &ConfigTestResult) {
        self.lock().tests.push(result.clone());
    }

    fn last_build_succeeded(&self, arch: Architecture, config_type: ConfigType) -> Option<bool> {
        self.lock()
            .builds
            .iter()
            .rev()
            .find(|b| b.config.architecture() == arch && b.config.config_type() == config_type)
            .map(|b| b.success)
    }
}

/// Latest build outcome for one (architecture, config type) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub architecture: Architecture,
    pub config_type: ConfigType,
    pub config_name: String,
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Result sink that remembers build outcomes across processes.
///
/// The latest build per (architecture, config type) is kept in a JSON file and
/// rewritten on every build record. Boot and test records stay in memory.
pub struct BuildHistorySink {
    path: PathBuf,
    history: Mutex<Vec<BuildRecord>>,
    records: MemoryResultSink,
}

impl BuildHistorySink {
    /// Open the history at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let history = match load_build_history(&path) {
            Ok(history) => history,
            Err(e) => {
                log::warn!(
                    "[Sink] Could not load build history {}, starting empty: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };
        BuildHistorySink {
            path,
            history: Mutex::new(history),
            records: MemoryResultSink::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BuildRecord>> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn history(&self) -> Vec<BuildRecord> {
        self.lock().clone()
    }

    /// Results recorded by this process.
    pub fn records(&self) -> &MemoryResultSink {
        &self.records
    }
}

fn load_build_history(path: &Path) -> std::io::Result<Vec<BuildRecord>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

impl ResultSink for BuildHistorySink {
    fn record_build(&self, result: &ConfigBuildResult) {
        self.records.record_build(result);
        let arch = result.config.architecture();
        let config_type = result.config.config_type();
        let record = BuildRecord {
            architecture: arch,
            config_type,
            config_name: result.config.name().to_string(),
            success: result.success,
            recorded_at: Utc::now(),
        };

        let mut history = self.lock();
        match history
            .iter_mut()
            .find(|r| r.architecture == arch && r.config_type == config_type)
        {
            Some(existing) => *existing = record,
            None => history.push(record),
        }
        if let Err(e) = write_json_atomic(&self.path, &*history) {
            log::error!("[Sink] Failed to save build history {}: {}", self.path.display(), e);
        }
    }

    fn record_boot(&self, result: &ConfigBootResult) {
        self.records.record_boot(result);
    }

    fn record_test(&self, result: &ConfigTestResult) {
        self.records.record_test(result);
    }

    fn last_build_succeeded(&self, arch: Architecture, config_type: ConfigType) -> Option<bool> {
        self.lock()
            .iter()
            .find(|r| r.architecture == arch && r.config_type == config_type)
            .map(|r| r.success)
    }
}

/// Writes events to the log at a level matching their severity.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, event: &CriticalEvent) {
        match event.severity {
            EventSeverity::Critical => log::error!("[Notify] {}: {}", event.title, event.message),
            EventSeverity::Warning => log::warn!("[Notify] {}: {}", event.title, event.message),
            EventSeverity::Info => log::info!("[Notify] {}: {}", event.title, event.message),
        }
    }
}

/// Keeps every event; handy for embedding and tests.
#[derive(Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<CriticalEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CriticalEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl NotificationSink for MemoryNotifier {
    fn notify(&self, event: &CriticalEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
