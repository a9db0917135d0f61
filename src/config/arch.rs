//! Per-architecture profile table.
//!
//! Every component that needs to know something architecture-specific
//! (required options, make target, emulator shape) reads it from here.

use crate::models::{Architecture, KernelConfig, OptionValue};

/// Static facts about one target architecture.
#[derive(Debug, Clone, Copy)]
pub struct ArchProfile {
    pub arch: Architecture,
    /// Options that must be enabled for a config of this architecture.
    pub required_options: &'static [&'static str],
    /// Options that say "this config targets this architecture".
    pub identity_options: &'static [&'static str],
    /// Prefixes of options that only exist on this architecture.
    pub private_prefixes: &'static [&'static str],
    /// Value for `make ARCH=`.
    pub kernel_arch: &'static str,
    /// Default make target producing the boot image.
    pub make_target: &'static str,
    /// Boot image candidates relative to the build output directory, in preference order.
    pub image_candidates: &'static [&'static str],
    pub emulator: &'static str,
    /// Machine / CPU flags passed to the emulator.
    pub machine_args: &'static [&'static str],
    pub console: &'static str,
    /// Option overlay merged into every generated config for this architecture.
    pub overlay: &'static [(&'static str, OptionValue)],
}

/// Fallback artifact when no preferred image exists.
pub const FALLBACK_IMAGE: &str = "vmlinux";

const X86_64: ArchProfile = ArchProfile {
    arch: Architecture::X86_64,
    required_options: &["CONFIG_64BIT", "CONFIG_X86_64"],
    identity_options: &["CONFIG_X86_64", "CONFIG_X86"],
    private_prefixes: &["CONFIG_X86_"],
    kernel_arch: "x86_64",
    make_target: "bzImage",
    image_candidates: &["arch/x86/boot/bzImage", "arch/x86_64/boot/bzImage"],
    emulator: "qemu-system-x86_64",
    machine_args: &[],
    console: "ttyS0",
    overlay: &[
        ("CONFIG_64BIT", OptionValue::Yes),
        ("CONFIG_X86_64", OptionValue::Yes),
        ("CONFIG_X86", OptionValue::Yes),
        ("CONFIG_SERIAL_8250", OptionValue::Yes),
        ("CONFIG_SERIAL_8250_CONSOLE", OptionValue::Yes),
    ],
};

const ARM64: ArchProfile = ArchProfile {
    arch: Architecture::Arm64,
    required_options: &["CONFIG_64BIT", "CONFIG_ARM64"],
    identity_options: &["CONFIG_ARM64"],
    private_prefixes: &["CONFIG_ARM64_"],
    kernel_arch: "arm64",
    make_target: "Image",
    image_candidates: &["arch/arm64/boot/Image", "arch/arm64/boot/Image.gz"],
    emulator: "qemu-system-aarch64",
    machine_args: &["-M", "virt", "-cpu", "cortex-a57"],
    console: "ttyAMA0",
    overlay: &[
        ("CONFIG_64BIT", OptionValue::Yes),
        ("CONFIG_ARM64", OptionValue::Yes),
        ("CONFIG_ARM64_4K_PAGES", OptionValue::Yes),
        ("CONFIG_ARM_AMBA", OptionValue::Yes),
        ("CONFIG_SERIAL_AMBA_PL011", OptionValue::Yes),
        ("CONFIG_SERIAL_AMBA_PL011_CONSOLE", OptionValue::Yes),
    ],
};

const ARM: ArchProfile = ArchProfile {
    arch: Architecture::Arm,
    required_options: &["CONFIG_ARM"],
    identity_options: &["CONFIG_ARM"],
    private_prefixes: &[],
    kernel_arch: "arm",
    make_target: "zImage",
    image_candidates: &["arch/arm/boot/zImage", "arch/arm/boot/Image"],
    emulator: "qemu-system-arm",
    machine_args: &["-M", "virt", "-cpu", "cortex-a15"],
    console: "ttyAMA0",
    overlay: &[
        ("CONFIG_ARM", OptionValue::Yes),
        ("CONFIG_64BIT", OptionValue::No),
        ("CONFIG_MMU", OptionValue::Yes),
        ("CONFIG_AEABI", OptionValue::Yes),
        ("CONFIG_ARM_AMBA", OptionValue::Yes),
        ("CONFIG_SERIAL_AMBA_PL011", OptionValue::Yes),
        ("CONFIG_SERIAL_AMBA_PL011_CONSOLE", OptionValue::Yes),
    ],
};

const RISCV64: ArchProfile = ArchProfile {
    arch: Architecture::Riscv64,
    required_options: &["CONFIG_64BIT", "CONFIG_RISCV"],
    identity_options: &["CONFIG_RISCV"],
    private_prefixes: &["CONFIG_RISCV_"],
    kernel_arch: "riscv",
    make_target: "Image",
    image_candidates: &["arch/riscv/boot/Image", "arch/riscv/boot/Image.gz"],
    emulator: "qemu-system-riscv64",
    machine_args: &["-M", "virt"],
    console: "ttyS0",
    overlay: &[
        ("CONFIG_64BIT", OptionValue::Yes),
        ("CONFIG_RISCV", OptionValue::Yes),
        ("CONFIG_ARCH_RV64I", OptionValue::Yes),
        ("CONFIG_SERIAL_8250", OptionValue::Yes),
        ("CONFIG_SERIAL_8250_CONSOLE", OptionValue::Yes),
        ("CONFIG_SERIAL_OF_PLATFORM", OptionValue::Yes),
    ],
};

/// Profile for `arch`.
pub fn profile(arch: Architecture) -> &'static ArchProfile {
    match arch {
        Architecture::X86_64 => &X86_64,
        Architecture::Arm64 => &ARM64,
        Architecture::Arm => &ARM,
        Architecture::Riscv64 => &RISCV64,
    }
}

/// Whether `option` belongs to `arch` (identity option or private prefix).
pub fn belongs_to(arch: Architecture, option: &str) -> bool {
    let p = profile(arch);
    p.identity_options.contains(&option)
        || p.private_prefixes.iter().any(|prefix| option.starts_with(prefix))
}

/// Options enabled in `config` that belong to some other architecture, with their owner.
///
/// Options shared with the config's own architecture are never foreign
/// (`CONFIG_ARM_AMBA` is valid on arm64 even though it looks like an ARM option).
pub fn foreign_options(config: &KernelConfig) -> Vec<(String, Architecture)> {
    let own = config.architecture();
    config
        .enabled_options()
        .filter(|opt| !belongs_to(own, opt))
        .filter_map(|opt| {
            Architecture::ALL
                .iter()
                .copied()
                .filter(|&other| other != own)
                .find(|&other| belongs_to(other, opt))
                .map(|other| (opt.to_string(), other))
        })
        .collect()
}

/// Architectures whose identity options are enabled in `config`.
pub fn enabled_architectures(config: &KernelConfig) -> Vec<Architecture> {
    Architecture::ALL
        .iter()
        .copied()
        .filter(|&arch| {
            profile(arch)
                .identity_options
                .iter()
                .any(|opt| config.is_enabled(opt))
        })
        .collect()
}

/// Required options for the config's architecture that are not enabled.
pub fn missing_required(config: &KernelConfig) -> Vec<&'static str> {
    profile(config.architecture())
        .required_options
        .iter()
        .copied()
        .filter(|opt| !config.is_enabled(opt))
        .collect()
}
