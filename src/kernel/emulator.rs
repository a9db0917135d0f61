//! Emulator command shape and availability probe.

use crate::config::arch;
use crate::config::TesterSettings;
use crate::models::Architecture;
use crate::system::find_in_path;
use std::path::{Path, PathBuf};

/// A fully resolved emulator command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl EmulatorInvocation {
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Shell-ish rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Emulator binary for `arch`: settings override, else the profile default.
pub fn emulator_binary(arch: Architecture, settings: &TesterSettings) -> String {
    settings
        .emulator_binaries
        .get(&arch)
        .cloned()
        .unwrap_or_else(|| arch::profile(arch).emulator.to_string())
}

/// Capability probe: can we boot `arch` images here?
pub fn is_emulator_available(arch: Architecture, settings: &TesterSettings) -> bool {
    find_in_path(&emulator_binary(arch, settings)).is_some()
}

/// Kernel command line: serial console, panic reboots immediately, explicit init.
pub fn kernel_command_line(arch: Architecture, settings: &TesterSettings) -> String {
    format!(
        "console={} panic=1 init={}",
        arch::profile(arch).console,
        settings.init_path
    )
}

/// Build the emulator invocation for one image.
///
/// `-no-reboot` together with `panic=1` turns a kernel panic into an emulator exit.
pub fn build_invocation(
    arch: Architecture,
    image: &Path,
    settings: &TesterSettings,
) -> EmulatorInvocation {
    let profile = arch::profile(arch);
    let mut args: Vec<String> = profile.machine_args.iter().map(|a| a.to_string()).collect();
    args.extend([
        "-kernel".to_string(),
        image.display().to_string(),
        "-m".to_string(),
        settings.boot_memory_mb.to_string(),
        "-display".to_string(),
        "none".to_string(),
        "-serial".to_string(),
        "stdio".to_string(),
        "-monitor".to_string(),
        "none".to_string(),
        "-no-reboot".to_string(),
    ]);
    if let Some(initrd) = usable_initramfs(settings) {
        args.push("-initrd".to_string());
        args.push(initrd.display().to_string());
    }
    args.push("-append".to_string());
    args.push(kernel_command_line(arch, settings));

    EmulatorInvocation {
        program: emulator_binary(arch, settings),
        args,
    }
}

fn usable_initramfs(settings: &TesterSettings) -> Option<PathBuf> {
    let path = settings.initramfs.as_ref()?;
    if path.is_file() {
        Some(path.clone())
    } else {
        log::warn!("Initramfs {} not found, booting without it", path.display());
        None
    }
}
