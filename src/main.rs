use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use goatd_kconfig_lab::config::generator::generate_for_architectures;
use goatd_kconfig_lab::config::loader::{
    build_history_path, get_global_settings_path, load_custom_config, save_config_to_file,
};
use goatd_kconfig_lab::log_collector::default_session_name;
use goatd_kconfig_lab::sinks::{BuildHistorySink, LogNotifier};
use goatd_kconfig_lab::{
    generate_test_report, validate_config, Architecture, ConflictDetector, ConflictResolutionSuggester,
    KernelConfig, LogCollector, RarelyUsedOptionIdentifier, SettingsManager, TestOrchestrator,
    TesterSettings, UsageReportGenerator, UsageTracker,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "goatd-kconfig-lab", version, about = "Generate, build, boot-test and audit kernel configurations")]
struct Cli {
    /// Settings file (JSON). Defaults to the per-user settings path.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the standard configurations for the given architectures.
    Generate {
        #[arg(long = "arch")]
        architectures: Vec<Architecture>,
        /// Also write each config as `<dir>/<name>.json`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the pre-build checks on a config file.
    Validate {
        file: PathBuf,
        #[arg(long, default_value = "x86_64")]
        arch: Architecture,
        #[arg(long, default_value = "custom")]
        name: String,
    },
    /// Run the conflict rule engine on a config file.
    Conflicts {
        file: PathBuf,
        #[arg(long, default_value = "x86_64")]
        arch: Architecture,
        #[arg(long, default_value = "custom")]
        name: String,
        /// Include resolution suggestions.
        #[arg(long)]
        resolve: bool,
    },
    /// Build and boot-test configurations, then print the run report.
    Run {
        #[arg(long = "arch")]
        architectures: Vec<Architecture>,
        /// Custom config files to test instead of the standard matrix.
        #[arg(long = "config")]
        configs: Vec<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print option usage statistics and recommendations.
    UsageReport,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<TesterSettings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_global_settings_path()?,
    };
    let settings = SettingsManager::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(settings)
}

fn pick_architectures(requested: Vec<Architecture>, settings: &TesterSettings) -> Vec<Architecture> {
    if requested.is_empty() {
        settings.architectures.clone()
    } else {
        requested
    }
}

fn load_configs(files: &[PathBuf], settings: &TesterSettings) -> anyhow::Result<Vec<KernelConfig>> {
    let arch = settings.architectures.first().copied().unwrap_or(Architecture::X86_64);
    files
        .iter()
        .map(|file| {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom".to_string());
            load_custom_config(file, arch, &name)
                .with_context(|| format!("Failed to load {}", file.display()))
        })
        .collect()
}

async fn run(cli: Cli, settings: TesterSettings) -> anyhow::Result<bool> {
    match cli.command {
        Command::Generate { architectures, out } => {
            let configs = generate_for_architectures(&pick_architectures(architectures, &settings))?;
            if let Some(dir) = out {
                for config in &configs {
                    save_config_to_file(config, &dir.join(format!("{}.json", config.name())))?;
                }
                log::info!("[Main] Wrote {} config(s) to {}", configs.len(), dir.display());
            }
            print_json(&configs)?;
            Ok(true)
        }
        Command::Validate { file, arch, name } => {
            let config = load_custom_config(&file, arch, &name)?;
            let outcome = validate_config(&config);
            print_json(&outcome)?;
            Ok(outcome.is_valid)
        }
        Command::Conflicts {
            file,
            arch,
            name,
            resolve,
        } => {
            let config = load_custom_config(&file, arch, &name)?;
            let report = ConflictDetector::new().detect_conflicts(&config);
            if resolve {
                let resolution = ConflictResolutionSuggester::new().suggest_resolutions(&report);
                print_json(&serde_json::json!({ "report": report, "resolution": resolution }))?;
            } else {
                print_json(&report)?;
            }
            Ok(!report.has_build_blocking_conflicts)
        }
        Command::Run {
            architectures,
            configs,
            report,
        } => {
            let mut settings = settings;
            settings.architectures = pick_architectures(architectures, &settings);
            let configs = if configs.is_empty() {
                generate_for_architectures(&settings.architectures)?
            } else {
                load_configs(&configs, &settings)?
            };

            let settings = Arc::new(settings);
            let usage = Arc::new(UsageTracker::new(settings.usage_store_path.clone()));
            let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("[Main] Interrupt received, finishing in-flight stages");
                    let _ = cancel_tx.send(true);
                }
            });

            let orchestrator = TestOrchestrator::new(settings.clone())
                .with_usage_tracker(usage)
                .with_result_sink(Arc::new(BuildHistorySink::open(build_history_path(
                    &settings.usage_store_path,
                ))))
                .with_notifier(Arc::new(LogNotifier))
                .with_cancellation(cancel_rx);
            let results = orchestrator
                .test_configurations(configs, settings.build_timeout())
                .await;
            let test_report = generate_test_report(&results);

            if let Some(path) = report {
                std::fs::write(&path, serde_json::to_string_pretty(&test_report)?)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                log::info!("[Main] Report written to {}", path.display());
            }
            print_json(&test_report)?;
            Ok(test_report.fully_successful == test_report.total_configurations)
        }
        Command::UsageReport => {
            let tracker = UsageTracker::new(settings.usage_store_path.clone());
            let known: Vec<String> = generate_for_architectures(&settings.architectures)?
                .iter()
                .flat_map(|c| c.options().keys().cloned().collect::<Vec<_>>())
                .collect();
            let report = UsageReportGenerator::new(RarelyUsedOptionIdentifier::from_settings(&settings))
                .with_known_options(known)
                .generate(&tracker);
            print_json(&report)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let collector = match LogCollector::new(&settings.log_dir, &default_session_name(), level) {
        Ok(collector) => Some(collector),
        Err(e) => {
            eprintln!("[Main] WARNING: LogCollector initialization failed: {}", e);
            None
        }
    };
    if let Some(collector) = &collector {
        if let Err(e) = collector.clone().install() {
            eprintln!("[Main] WARNING: {}", e);
        }
    }
    log::info!("GOATd kconfig lab {} starting", goatd_kconfig_lab::VERSION);

    let outcome = run(cli, settings).await;

    if let Some(collector) = &collector {
        if let Err(e) = collector.wait_for_empty() {
            eprintln!("[Main] WARNING: Failed to wait for log collector to empty: {}", e);
        }
    }

    if !outcome? {
        std::process::exit(1);
    }
    Ok(())
}
