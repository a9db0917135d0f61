//! Static option templates for the standard configuration types.

use crate::models::{ConfigType, OptionValue};
use lazy_static::lazy_static;
use std::collections::BTreeMap;

use crate::models::OptionValue::{Module as M, No as N, Yes as Y};

/// Options every standard config carries regardless of type.
const BASE: &[(&str, OptionValue)] = &[
    ("CONFIG_PRINTK", Y),
    ("CONFIG_TTY", Y),
    ("CONFIG_BLK_DEV_INITRD", Y),
    ("CONFIG_BINFMT_ELF", Y),
    ("CONFIG_BINFMT_SCRIPT", Y),
    ("CONFIG_SLUB", Y),
    ("CONFIG_PROC_FS", Y),
    ("CONFIG_SYSFS", Y),
    ("CONFIG_DEVTMPFS", Y),
    ("CONFIG_DEVTMPFS_MOUNT", Y),
    ("CONFIG_MULTIUSER", Y),
];

/// Size-optimized, no modules, no debug, no swap/audit/cgroups.
const MINIMAL: &[(&str, OptionValue)] = &[
    ("CONFIG_CC_OPTIMIZE_FOR_SIZE", Y),
    ("CONFIG_CC_OPTIMIZE_FOR_PERFORMANCE", N),
    ("CONFIG_EXPERT", Y),
    ("CONFIG_MODULES", N),
    ("CONFIG_DEBUG_KERNEL", N),
    ("CONFIG_DEBUG_INFO", N),
    ("CONFIG_SWAP", N),
    ("CONFIG_AUDIT", N),
    ("CONFIG_CGROUPS", N),
    ("CONFIG_NET", N),
    ("CONFIG_BLOCK", N),
    ("CONFIG_PREEMPT_NONE", Y),
    ("CONFIG_HZ_100", Y),
];

/// Typical production set: modules, networking, filesystems, performance tuned.
const DEFAULT: &[(&str, OptionValue)] = &[
    ("CONFIG_CC_OPTIMIZE_FOR_PERFORMANCE", Y),
    ("CONFIG_CC_OPTIMIZE_FOR_SIZE", N),
    ("CONFIG_MODULES", Y),
    ("CONFIG_MODULE_UNLOAD", Y),
    ("CONFIG_SWAP", Y),
    ("CONFIG_AUDIT", Y),
    ("CONFIG_CGROUPS", Y),
    ("CONFIG_MEMCG", Y),
    ("CONFIG_BLK_CGROUP", Y),
    ("CONFIG_NET", Y),
    ("CONFIG_INET", Y),
    ("CONFIG_IPV6", Y),
    ("CONFIG_NETFILTER", Y),
    ("CONFIG_PACKET", Y),
    ("CONFIG_UNIX", Y),
    ("CONFIG_BLOCK", Y),
    ("CONFIG_EXT4_FS", Y),
    ("CONFIG_BTRFS_FS", M),
    ("CONFIG_XFS_FS", M),
    ("CONFIG_TMPFS", Y),
    ("CONFIG_PREEMPT_VOLUNTARY", Y),
    ("CONFIG_HZ_250", Y),
    ("CONFIG_SMP", Y),
    ("CONFIG_PCI", Y),
    ("CONFIG_VIRTIO", Y),
    ("CONFIG_VIRTIO_PCI", Y),
    ("CONFIG_VIRTIO_BLK", Y),
    ("CONFIG_VIRTIO_NET", M),
    ("CONFIG_BPF_SYSCALL", Y),
    ("CONFIG_CGROUP_BPF", Y),
    ("CONFIG_FUTEX", Y),
    ("CONFIG_EPOLL", Y),
    ("CONFIG_DEBUG_KERNEL", N),
];

/// Debug and sanitizer instrumentation layered on top of DEFAULT.
const MAXIMAL_EXTRA: &[(&str, OptionValue)] = &[
    ("CONFIG_DEBUG_KERNEL", Y),
    ("CONFIG_DEBUG_INFO", Y),
    ("CONFIG_DEBUG_FS", Y),
    ("CONFIG_KASAN", Y),
    ("CONFIG_KASAN_GENERIC", Y),
    ("CONFIG_UBSAN", Y),
    ("CONFIG_KCOV", Y),
    ("CONFIG_PROVE_LOCKING", Y),
    ("CONFIG_LOCKDEP", Y),
    ("CONFIG_DEBUG_LOCK_ALLOC", Y),
    ("CONFIG_DEBUG_ATOMIC_SLEEP", Y),
    ("CONFIG_DEBUG_PAGEALLOC", Y),
    ("CONFIG_DEBUG_OBJECTS", Y),
    ("CONFIG_SLUB_DEBUG", Y),
    ("CONFIG_DEBUG_LIST", Y),
    ("CONFIG_FTRACE", Y),
    ("CONFIG_FUNCTION_TRACER", Y),
    ("CONFIG_KPROBES", Y),
    ("CONFIG_MAGIC_SYSRQ", Y),
    ("CONFIG_DETECT_HUNG_TASK", Y),
    ("CONFIG_SOFTLOCKUP_DETECTOR", Y),
];

fn layered(layers: &[&[(&str, OptionValue)]]) -> BTreeMap<String, OptionValue> {
    let mut options = BTreeMap::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            options.insert(key.to_string(), *value);
        }
    }
    options
}

lazy_static! {
    static ref TEMPLATES: BTreeMap<ConfigType, BTreeMap<String, OptionValue>> = {
        let mut templates = BTreeMap::new();
        templates.insert(ConfigType::Minimal, layered(&[BASE, MINIMAL]));
        templates.insert(ConfigType::Default, layered(&[BASE, DEFAULT]));
        templates.insert(ConfigType::Maximal, layered(&[BASE, DEFAULT, MAXIMAL_EXTRA]));
        templates
    };
}

/// Architecture-neutral template for a standard type. `Custom` has none.
pub fn template(config_type: ConfigType) -> Option<&'static BTreeMap<String, OptionValue>> {
    TEMPLATES.get(&config_type)
}

/// Human-readable description for a standard type.
pub fn describe(config_type: ConfigType) -> &'static str {
    match config_type {
        ConfigType::Minimal => "Size-optimized kernel without modules, debugging, swap, audit or cgroups",
        ConfigType::Default => "Production kernel with modules, networking and common filesystems",
        ConfigType::Maximal => "Default kernel plus every debug and sanitizer option",
        ConfigType::Custom => "Custom configuration",
    }
}
