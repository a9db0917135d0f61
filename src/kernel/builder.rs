//! Kernel build execution for one configuration.
//!
//! ```text
//! build_root/<name>/.config   <- render_kconfig
//! make -C <src> O=<out> ARCH=<arch> olddefconfig
//! make -C <src> O=<out> ARCH=<arch> -j<N> <target>
//! locate image -> ConfigBuildResult
//! ```
//!
//! Nothing escapes `build_config`: every `BuildError` ends up in the result.

use super::kconfig::render_kconfig;
use crate::config::arch::{self, FALLBACK_IMAGE};
use crate::config::TesterSettings;
use crate::error::BuildError;
use crate::models::{validate_config_name, ConfigBuildResult, KernelConfig};
use crate::system::{build_jobs, process};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;

static ERROR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)error:").expect("Invalid build error regex"));
static WARNING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)warning:").expect("Invalid build warning regex"));

/// Builds one configuration into a bootable image.
#[async_trait]
pub trait KernelBuilder: Send + Sync {
    /// Never fails: problems are reported in the returned result.
    async fn build_config(&self, config: Arc<KernelConfig>, timeout: Duration) -> ConfigBuildResult;
}

/// Split build output into error and warning lines.
pub fn parse_build_output(output: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for line in output.lines() {
        let line = line.strip_prefix("[STDERR] ").unwrap_or(line).trim();
        if ERROR_LINE.is_match(line) {
            errors.push(line.to_string());
        } else if WARNING_LINE.is_match(line) {
            warnings.push(line.to_string());
        }
    }
    (errors, warnings)
}

/// `make`-driven builder.
pub struct ConfigBuilder {
    settings: Arc<TesterSettings>,
}

impl ConfigBuilder {
    pub fn new(settings: Arc<TesterSettings>) -> Self {
        ConfigBuilder { settings }
    }

    /// Output directory for a config: `build_root/<name>`.
    ///
    /// Names that would resolve outside the build root are refused.
    pub fn output_dir(&self, config: &KernelConfig) -> Result<PathBuf, BuildError> {
        validate_config_name(config.name()).map_err(|e| BuildError::OutputDirectory {
            path: config.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.settings.build_root.join(config.name()))
    }

    fn make(&self, config: &KernelConfig, out_dir: &Path) -> Command {
        let profile = arch::profile(config.architecture());
        let mut cmd = Command::new(&self.settings.make_command);
        cmd.arg("-C")
            .arg(&self.settings.kernel_source_dir)
            .arg(format!("O={}", out_dir.display()))
            .arg(format!("ARCH={}", profile.kernel_arch));
        if let Some(prefix) = self.settings.cross_compile.get(&config.architecture()) {
            cmd.arg(format!("CROSS_COMPILE={}", prefix));
        }
        cmd
    }

    async fn run_step(
        &self,
        step: &str,
        cmd: Command,
        deadline: Instant,
        timeout: Duration,
        log: &mut String,
    ) -> Result<(), BuildError> {
        let cmd_display = format!("{} {}", self.settings.make_command, step);
        log.push_str(&format!("$ {}\n", cmd_display));

        let outcome = process::run_with_deadline(cmd, deadline, None)
            .await
            .map_err(|e| BuildError::SpawnFailed {
                cmd: cmd_display.clone(),
                reason: e.to_string(),
            })?;
        log.push_str(&outcome.output);

        if outcome.timed_out {
            return Err(BuildError::TimedOut(timeout.as_secs()));
        }
        match outcome.exit_code {
            Some(0) => Ok(()),
            Some(code) => Err(BuildError::StepFailed {
                step: step.to_string(),
                code,
            }),
            None => Err(BuildError::Terminated(step.to_string())),
        }
    }

    /// First existing, non-empty artifact from the candidate list.
    pub fn locate_artifact(&self, config: &KernelConfig, out_dir: &Path) -> Result<(PathBuf, u64), BuildError> {
        let profile = arch::profile(config.architecture());
        let candidates: Vec<&str> = profile
            .image_candidates
            .iter()
            .copied()
            .chain(std::iter::once(FALLBACK_IMAGE))
            .collect();
        for candidate in &candidates {
            let path = out_dir.join(candidate);
            if let Ok(meta) = std::fs::metadata(&path) {
                if meta.is_file() && meta.len() > 0 {
                    return Ok((path, meta.len()));
                }
            }
        }
        Err(BuildError::ArtifactMissing {
            arch: config.architecture().to_string(),
            searched: candidates.join(", "),
        })
    }

    async fn run_build(
        &self,
        config: &KernelConfig,
        started: Instant,
        timeout: Duration,
        log: &mut String,
    ) -> Result<(PathBuf, u64), BuildError> {
        let out_dir = self.output_dir(config)?;
        std::fs::create_dir_all(&out_dir).map_err(|e| BuildError::OutputDirectory {
            path: out_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(out_dir.join(".config"), render_kconfig(config))
            .map_err(|e| BuildError::ConfigWrite(e.to_string()))?;

        let deadline = process::deadline_after(started, timeout);
        let mut resolve = self.make(config, &out_dir);
        resolve.arg("olddefconfig");
        self.run_step("olddefconfig", resolve, deadline, timeout, log).await?;

        let target = arch::profile(config.architecture()).make_target;
        let jobs = build_jobs(self.settings.build_jobs);
        let mut build = self.make(config, &out_dir);
        build.arg(format!("-j{}", jobs)).arg(target);
        self.run_step(target, build, deadline, timeout, log).await?;

        self.locate_artifact(config, &out_dir)
    }
}

#[async_trait]
impl KernelBuilder for ConfigBuilder {
    async fn build_config(&self, config: Arc<KernelConfig>, timeout: Duration) -> ConfigBuildResult {
        let started = Instant::now();
        log::info!("[Build] {} ({}) starting", config.name(), config.architecture());

        let mut build_log = String::new();
        let outcome = self.run_build(&config, started, timeout, &mut build_log).await;
        let build_time = started.elapsed();
        let (mut errors, mut warnings) = parse_build_output(&build_log);

        match outcome {
            Ok((image, size)) => {
                // Exit status is authoritative; stray "error:" lines become warnings.
                warnings.extend(errors.drain(..));
                crate::log_parsed!(
                    "[Build] {} succeeded in {:.1}s ({} bytes)",
                    config.name(),
                    build_time.as_secs_f64(),
                    size
                );
                ConfigBuildResult::succeeded(config, build_time, image, size, build_log, warnings)
            }
            Err(BuildError::StepFailed { step, code }) => {
                let failure = BuildError::StepFailed { step, code }.to_string();
                crate::log_parsed!("[Build] {} failed: {}", config.name(), failure);
                errors.push(failure);
                ConfigBuildResult::failed(config, build_time, build_log, errors, warnings)
            }
            Err(e) => {
                crate::log_parsed!("[Build] {} failed: {}", config.name(), e);
                ConfigBuildResult::failed(config, build_time, build_log, vec![e.to_string()], warnings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_output() {
        let output = "\
  CC      kernel/fork.o
[STDERR] kernel/fork.c:12:1: error: expected ';'
[STDERR] mm/slub.c:40: Warning: unused variable
  LD      vmlinux
make[2]: *** [scripts/Makefile.build:243] ERROR: 1
";
        let (errors, warnings) = parse_build_output(output);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("kernel/fork.c"));
        assert_eq!(warnings, vec!["mm/slub.c:40: Warning: unused variable"]);
    }

    #[test]
    fn test_output_dir_uses_config_name() {
        let mut settings = TesterSettings::default();
        settings.build_root = PathBuf::from("/tmp/lab-build");
        let builder = ConfigBuilder::new(Arc::new(settings));
        let config = crate::config::generator::generate_standard_config(
            crate::models::Architecture::Arm64,
            crate::models::ConfigType::Minimal,
        )
        .unwrap();
        assert_eq!(
            builder.output_dir(&config).unwrap(),
            PathBuf::from("/tmp/lab-build/minimal_arm64")
        );
    }

    #[test]
    fn test_output_dir_refuses_names_outside_build_root() {
        let mut settings = TesterSettings::default();
        settings.build_root = PathBuf::from("/tmp/lab-build");
        let builder = ConfigBuilder::new(Arc::new(settings));
        let json = r#"{"name":"/etc/evil","architecture":"x86_64","config_type":"custom","options":{}}"#;
        let config: KernelConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            builder.output_dir(&config),
            Err(BuildError::OutputDirectory { .. })
        ));
    }

    #[test]
    fn test_locate_artifact_prefers_candidates_over_vmlinux() {
        let temp = tempfile::TempDir::new().unwrap();
        let builder = ConfigBuilder::new(Arc::new(TesterSettings::default()));
        let config = crate::config::generator::generate_standard_config(
            crate::models::Architecture::X86_64,
            crate::models::ConfigType::Default,
        )
        .unwrap();

        assert!(matches!(
            builder.locate_artifact(&config, temp.path()),
            Err(BuildError::ArtifactMissing { .. })
        ));

        std::fs::write(temp.path().join("vmlinux"), vec![0u8; 64]).unwrap();
        let (path, size) = builder.locate_artifact(&config, temp.path()).unwrap();
        assert!(path.ends_with("vmlinux"));
        assert_eq!(size, 64);

        std::fs::create_dir_all(temp.path().join("arch/x86/boot")).unwrap();
        std::fs::write(temp.path().join("arch/x86/boot/bzImage"), vec![1u8; 128]).unwrap();
        let (path, _) = builder.locate_artifact(&config, temp.path()).unwrap();
        assert!(path.ends_with("arch/x86/boot/bzImage"));
    }
}
