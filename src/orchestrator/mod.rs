//! Test orchestration: validate -> build -> boot -> functional tests, per configuration.
//!
//! ```text
//!  configs --validate--> invalid ----------------------------+
//!     |                                                      |
//!     +--> bounded job queue --> worker 1..N --> result channel --> results
//! ```
//!
//! One worker owns a configuration end-to-end. Each job runs in its own task so
//! a panic becomes an `Aborted` result instead of taking the worker down.

pub mod functional;
pub mod report;
pub mod state;

pub use report::{generate_test_report, Outcome, TestReport};
pub use state::{PipelineState, PipelineTracker};

use crate::config::generator::generate_for_architectures;
use crate::config::validator::validate_config;
use crate::config::TesterSettings;
use crate::error::ConfigError;
use crate::kernel::{BootTester, BootVerifier, ConfigBuilder, KernelBuilder};
use crate::models::{
    BootMode, ConfigBootResult, ConfigBuildResult, ConfigTestResult, ConfigType, FunctionalTestResult,
    KernelConfig,
};
use crate::sinks::{CriticalEvent, EventSeverity, NotificationSink, ResultSink};
use crate::usage::UsageTracker;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

/// A validated configuration waiting for a worker.
struct Job {
    config: Arc<KernelConfig>,
    validation_warnings: Vec<String>,
}

/// Everything a worker needs to run one configuration.
struct Pipeline {
    builder: Arc<dyn KernelBuilder>,
    boot: Arc<dyn BootVerifier>,
    boot_timeout: Duration,
    cancel_rx: Option<watch::Receiver<bool>>,
}

/// Builder for a [`ConfigTestResult`] as stages complete.
struct PipelineRun {
    config: Arc<KernelConfig>,
    tracker: PipelineTracker,
    test_log: String,
}

impl PipelineRun {
    fn new(config: Arc<KernelConfig>) -> Self {
        PipelineRun {
            config,
            tracker: PipelineTracker::new(),
            test_log: String::new(),
        }
    }

    fn enter(&mut self, next: PipelineState) {
        match self.tracker.advance(next) {
            Ok(()) => {
                log::debug!("[Pipeline] {} -> {}", self.config.name(), next);
                self.test_log.push_str(&format!("[state] {}\n", next));
            }
            Err(e) => {
                log::error!("[Pipeline] {}: {}", self.config.name(), e);
                self.test_log.push_str(&format!("[error] {}\n", e));
            }
        }
    }

    fn note(&mut self, line: impl AsRef<str>) {
        self.test_log.push_str(line.as_ref());
        self.test_log.push('\n');
    }

    fn finish(
        self,
        build_result: ConfigBuildResult,
        boot_result: Option<ConfigBootResult>,
        functional_tests: Vec<FunctionalTestResult>,
        abort_reason: Option<String>,
    ) -> ConfigTestResult {
        let boot_success = boot_result.as_ref().map_or(false, |b| b.success);
        let boot_time = boot_result
            .as_ref()
            .filter(|b| b.mode != BootMode::Skipped)
            .map(|b| b.boot_time);
        let (final_state, state_history) = self.tracker.into_parts();
        ConfigTestResult {
            config: self.config,
            build_result,
            boot_success,
            boot_time,
            boot_result,
            functional_tests,
            test_log: self.test_log,
            final_state,
            state_history,
            abort_reason,
        }
    }
}

impl Pipeline {
    fn cancelled(&self) -> bool {
        self.cancel_rx.as_ref().map_or(false, |rx| *rx.borrow())
    }

    async fn run(&self, job: Job, build_timeout: Duration) -> ConfigTestResult {
        let config = job.config;
        let mut run = PipelineRun::new(config.clone());
        run.enter(PipelineState::Validated);

        if self.cancelled() {
            let reason = "run cancelled before build".to_string();
            run.note(&reason);
            run.tracker.abort();
            let build = ConfigBuildResult::rejected(config, vec![reason.clone()], job.validation_warnings);
            return run.finish(build, None, Vec::new(), Some(reason));
        }

        run.enter(PipelineState::Building);
        let mut build = self.builder.build_config(config.clone(), build_timeout).await;
        if !job.validation_warnings.is_empty() {
            let mut warnings = job.validation_warnings;
            warnings.append(&mut build.warnings);
            build.warnings = warnings;
        }
        run.note(format!(
            "build {} in {:.1}s",
            if build.success { "succeeded" } else { "failed" },
            build.build_time.as_secs_f64()
        ));

        if !build.success {
            run.enter(PipelineState::BuildFailed);
            let boot = ConfigBootResult::skipped(config, "Build failed; boot test not attempted");
            return run.finish(build, Some(boot), Vec::new(), None);
        }
        run.enter(PipelineState::BuildSucceeded);

        if self.cancelled() {
            let reason = "run cancelled before boot".to_string();
            run.note(&reason);
            run.tracker.abort();
            return run.finish(build, None, Vec::new(), Some(reason));
        }

        run.enter(PipelineState::BootTesting);
        let boot = self
            .boot
            .boot_test_config(config.clone(), &build, self.boot_timeout)
            .await;
        run.note(format!(
            "boot {} ({:?}) in {:.1}s",
            if boot.success { "succeeded" } else { "failed" },
            boot.mode,
            boot.boot_time.as_secs_f64()
        ));

        if !boot.success {
            run.enter(PipelineState::BootFailed);
            return run.finish(build, Some(boot), Vec::new(), None);
        }
        run.enter(PipelineState::BootSucceeded);

        if self.cancelled() {
            let reason = "run cancelled before functional tests".to_string();
            run.note(&reason);
            run.tracker.abort();
            return run.finish(build, Some(boot), Vec::new(), Some(reason));
        }

        run.enter(PipelineState::FunctionalTesting);
        let tests = functional::run_functional_tests(&config, &boot);
        for test in &tests {
            run.note(format!("functional {}: {:?}", test.name, test.status));
        }
        run.enter(PipelineState::Completed);
        run.finish(build, Some(boot), tests, None)
    }
}

/// Result for a configuration rejected before any build slot was used.
fn invalid_result(config: Arc<KernelConfig>, errors: Vec<String>, warnings: Vec<String>) -> ConfigTestResult {
    let mut run = PipelineRun::new(config.clone());
    for error in &errors {
        run.note(format!("invalid: {}", error));
    }
    run.enter(PipelineState::Invalid);
    let build = ConfigBuildResult::rejected(config, errors, warnings);
    run.finish(build, None, Vec::new(), None)
}

/// Result for a job whose task panicked or was torn down.
fn aborted_result(config: Arc<KernelConfig>, err: tokio::task::JoinError) -> ConfigTestResult {
    let reason = if err.is_panic() {
        let payload = err.into_panic();
        let text = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        format!("worker panicked: {}", text)
    } else {
        "worker task was cancelled".to_string()
    };
    log::error!("[Pipeline] {}: {}", config.name(), reason);

    let mut run = PipelineRun::new(config.clone());
    run.enter(PipelineState::Validated);
    run.note(&reason);
    run.tracker.abort();
    let build = ConfigBuildResult::rejected(config, vec![reason.clone()], Vec::new());
    run.finish(build, None, Vec::new(), Some(reason))
}

/// Coordinates validation, parallel builds, boots and functional tests.
pub struct TestOrchestrator {
    settings: Arc<TesterSettings>,
    builder: Arc<dyn KernelBuilder>,
    boot: Arc<dyn BootVerifier>,
    usage: Option<Arc<UsageTracker>>,
    result_sink: Option<Arc<dyn ResultSink>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl TestOrchestrator {
    /// Orchestrator driving the real `make` builder and boot tester.
    pub fn new(settings: Arc<TesterSettings>) -> Self {
        let builder = Arc::new(ConfigBuilder::new(settings.clone()));
        let boot = Arc::new(BootTester::new(settings.clone()));
        Self::with_components(settings, builder, boot)
    }

    pub fn with_components(
        settings: Arc<TesterSettings>,
        builder: Arc<dyn KernelBuilder>,
        boot: Arc<dyn BootVerifier>,
    ) -> Self {
        TestOrchestrator {
            settings,
            builder,
            boot,
            usage: None,
            result_sink: None,
            notifier: None,
            cancel_rx: None,
        }
    }

    /// Flip the channel to `true` to stop the run after in-flight stages finish.
    pub fn with_cancellation(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_usage_tracker(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.result_sink = Some(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Generate and test the standard matrix for the configured architectures.
    pub async fn test_standard_configurations(&self) -> Result<Vec<ConfigTestResult>, ConfigError> {
        let configs = generate_for_architectures(&self.settings.architectures)?;
        Ok(self
            .test_configurations(configs, self.settings.build_timeout())
            .await)
    }

    /// Run every configuration through the pipeline.
    ///
    /// Returns exactly one result per input configuration, in completion order.
    pub async fn test_configurations(
        &self,
        configs: Vec<KernelConfig>,
        timeout_per_build: Duration,
    ) -> Vec<ConfigTestResult> {
        let submitted = configs.len();
        let mut results = Vec::with_capacity(submitted);
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for config in configs {
            let config = Arc::new(config);
            if !seen.insert(config.name().to_string()) {
                let error = format!("Duplicate configuration name in run: {}", config.name());
                log::warn!("[Run] {}", error);
                results.push(invalid_result(config, vec![error], Vec::new()));
                continue;
            }
            let (is_valid, errors, warnings) = validate_config(&config).into_parts();
            if !is_valid {
                log::warn!("[Run] {} rejected: {}", config.name(), errors.join("; "));
                results.push(invalid_result(config, errors, warnings));
                continue;
            }
            jobs.push(Job {
                config,
                validation_warnings: warnings,
            });
        }

        if !jobs.is_empty() {
            let workers = self.settings.max_parallel_builds.max(1).min(jobs.len());
            crate::log_info!(
                "[Run] Testing {} configuration(s) with {} worker(s), {} rejected up front",
                jobs.len(),
                workers,
                results.len()
            );
            results.extend(self.run_pool(jobs, workers, timeout_per_build).await);
        }

        self.publish(&results);

        let built = results.iter().filter(|r| r.build_result.success).count();
        let booted = results.iter().filter(|r| r.boot_success).count();
        crate::log_parsed!(
            "[Run] {} configuration(s): {} built, {} booted",
            results.len(),
            built,
            booted
        );
        debug_assert_eq!(results.len(), submitted);
        results
    }

    async fn run_pool(&self, jobs: Vec<Job>, workers: usize, build_timeout: Duration) -> Vec<ConfigTestResult> {
        let expected = jobs.len();
        let pipeline = Arc::new(Pipeline {
            builder: self.builder.clone(),
            boot: self.boot.clone(),
            boot_timeout: self.settings.boot_timeout(),
            cancel_rx: self.cancel_rx.clone(),
        });

        let (job_tx, job_rx) = mpsc::channel::<Job>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<ConfigTestResult>();

        tokio::spawn(async move {
            for job in jobs {
                if job_tx.send(job).await.is_err() {
                    break;
                }
            }
        });

        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                loop {
                    let next = job_rx.lock().await.recv().await;
                    let Some(job) = next else { break };
                    let config = job.config.clone();
                    log::debug!("[Run] worker {} picked {}", worker, config.name());

                    let task_pipeline = pipeline.clone();
                    let handle = tokio::spawn(async move { task_pipeline.run(job, build_timeout).await });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => aborted_result(config, e),
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(expected);
        while let Some(result) = result_rx.recv().await {
            crate::log_parsed!(
                "[Run] {} finished: {}",
                result.config.name(),
                result.final_state
            );
            results.push(result);
        }
        results
    }

    /// Hand results to the sinks and the usage tracker.
    fn publish(&self, results: &[ConfigTestResult]) {
        for result in results {
            let config = &result.config;
            if let Some(sink) = &self.result_sink {
                let previous = sink.last_build_succeeded(config.architecture(), config.config_type());
                if config.config_type() == ConfigType::Maximal
                    && result.final_state == PipelineState::BuildFailed
                    && previous == Some(true)
                {
                    self.raise_regression(result);
                }
                sink.record_build(&result.build_result);
                if let Some(boot) = &result.boot_result {
                    sink.record_boot(boot);
                }
                sink.record_test(result);
            }
            if let Some(usage) = &self.usage {
                usage.track_configuration(config, Some(result));
            }
        }
    }

    fn raise_regression(&self, result: &ConfigTestResult) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let config = &result.config;
        let mut event = CriticalEvent::new(
            EventSeverity::Critical,
            format!("Maximal build regression on {}", config.architecture()),
            format!(
                "{} failed to build after a previous success: {}",
                config.name(),
                result.build_result.errors.join("; ")
            ),
        );
        event.config_name = Some(config.name().to_string());
        event.architecture = Some(config.architecture());
        notifier.notify(&event);
    }
}
