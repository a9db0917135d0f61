//! Option conflict detection.
//!
//! A static rule engine over a dependency table and a mutual-exclusion table,
//! plus architecture consistency and a handful of hand-written allocator /
//! optimization / debug rules. Advisory only: nothing here gates a build.
//!
//! Output is deterministic. Rules iterate static tables and `BTreeMap`s, and
//! the final list is sorted by (severity, type, options).

use super::arch;
use crate::models::{Architecture, KernelConfig, OptionValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Option -> options it requires.
pub const DEPENDENCIES: &[(&str, &[&str])] = &[
    ("CONFIG_IPV6", &["CONFIG_INET", "CONFIG_NET"]),
    ("CONFIG_INET", &["CONFIG_NET"]),
    ("CONFIG_NETFILTER", &["CONFIG_NET"]),
    ("CONFIG_PACKET", &["CONFIG_NET"]),
    ("CONFIG_BRIDGE", &["CONFIG_NET"]),
    ("CONFIG_EXT4_FS", &["CONFIG_BLOCK"]),
    ("CONFIG_BTRFS_FS", &["CONFIG_BLOCK"]),
    ("CONFIG_XFS_FS", &["CONFIG_BLOCK"]),
    ("CONFIG_KASAN", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_UBSAN", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_PROVE_LOCKING", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_LOCKDEP", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_DEBUG_LOCK_ALLOC", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_DEBUG_OBJECTS", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_DEBUG_PAGEALLOC", &["CONFIG_DEBUG_KERNEL"]),
    ("CONFIG_KCOV", &["CONFIG_DEBUG_FS"]),
    ("CONFIG_CGROUP_BPF", &["CONFIG_CGROUPS", "CONFIG_BPF_SYSCALL"]),
    ("CONFIG_MEMCG", &["CONFIG_CGROUPS"]),
    ("CONFIG_BLK_CGROUP", &["CONFIG_CGROUPS", "CONFIG_BLOCK"]),
    ("CONFIG_KVM", &["CONFIG_VIRTUALIZATION"]),
    ("CONFIG_VIRTIO_NET", &["CONFIG_VIRTIO", "CONFIG_NET"]),
    ("CONFIG_VIRTIO_BLK", &["CONFIG_VIRTIO", "CONFIG_BLOCK"]),
    ("CONFIG_VIRTIO_PCI", &["CONFIG_PCI"]),
    ("CONFIG_MODULE_UNLOAD", &["CONFIG_MODULES"]),
    ("CONFIG_MODVERSIONS", &["CONFIG_MODULES"]),
    ("CONFIG_DEBUG_INFO_BTF", &["CONFIG_DEBUG_INFO", "CONFIG_BPF_SYSCALL"]),
    ("CONFIG_SERIAL_8250_CONSOLE", &["CONFIG_SERIAL_8250"]),
    ("CONFIG_SERIAL_AMBA_PL011_CONSOLE", &["CONFIG_SERIAL_AMBA_PL011"]),
];

/// (option A, option B, reason). A is the usual preference when one must go.
pub const MUTUAL_EXCLUSIONS: &[(&str, &str, &str)] = &[
    (
        "CONFIG_CC_OPTIMIZE_FOR_PERFORMANCE",
        "CONFIG_CC_OPTIMIZE_FOR_SIZE",
        "Compiler cannot optimize for both performance and size",
    ),
    ("CONFIG_SLUB", "CONFIG_SLAB", "Only one slab allocator can be selected"),
    ("CONFIG_SLUB", "CONFIG_SLOB", "Only one slab allocator can be selected"),
    ("CONFIG_SLAB", "CONFIG_SLOB", "Only one slab allocator can be selected"),
    ("CONFIG_PREEMPT_VOLUNTARY", "CONFIG_PREEMPT_NONE", "Only one preemption model can be selected"),
    ("CONFIG_PREEMPT", "CONFIG_PREEMPT_NONE", "Only one preemption model can be selected"),
    ("CONFIG_PREEMPT", "CONFIG_PREEMPT_VOLUNTARY", "Only one preemption model can be selected"),
    ("CONFIG_HZ_250", "CONFIG_HZ_100", "Only one timer frequency can be selected"),
    ("CONFIG_HZ_250", "CONFIG_HZ_1000", "Only one timer frequency can be selected"),
    ("CONFIG_HZ_1000", "CONFIG_HZ_100", "Only one timer frequency can be selected"),
    ("CONFIG_KASAN", "CONFIG_KCSAN", "KASAN and KCSAN instrumentation cannot be combined"),
];

/// Option prefix -> subsystem. First match wins, so specific prefixes come first.
const SUBSYSTEMS: &[(&str, &str)] = &[
    ("CONFIG_CC_OPTIMIZE", "compiler"),
    ("CONFIG_DEBUG_SLAB", "memory"),
    ("CONFIG_DEBUG_PAGEALLOC", "memory"),
    ("CONFIG_SLUB", "memory"),
    ("CONFIG_SLAB", "memory"),
    ("CONFIG_SLOB", "memory"),
    ("CONFIG_KASAN", "memory"),
    ("CONFIG_MEMCG", "cgroups"),
    ("CONFIG_CGROUP", "cgroups"),
    ("CONFIG_BLK_CGROUP", "cgroups"),
    ("CONFIG_NET", "networking"),
    ("CONFIG_INET", "networking"),
    ("CONFIG_IPV6", "networking"),
    ("CONFIG_PACKET", "networking"),
    ("CONFIG_BRIDGE", "networking"),
    ("CONFIG_PREEMPT", "scheduler"),
    ("CONFIG_HZ_", "scheduler"),
    ("CONFIG_PROVE_LOCKING", "locking"),
    ("CONFIG_LOCKDEP", "locking"),
    ("CONFIG_DEBUG_LOCK", "locking"),
    ("CONFIG_DEBUG", "debug"),
    ("CONFIG_UBSAN", "debug"),
    ("CONFIG_KCOV", "debug"),
    ("CONFIG_KCSAN", "debug"),
    ("CONFIG_EXT4", "filesystems"),
    ("CONFIG_BTRFS", "filesystems"),
    ("CONFIG_XFS", "filesystems"),
    ("CONFIG_BLK", "block"),
    ("CONFIG_BLOCK", "block"),
    ("CONFIG_VIRTIO", "virtualization"),
    ("CONFIG_KVM", "virtualization"),
    ("CONFIG_VIRTUALIZATION", "virtualization"),
    ("CONFIG_MODULE", "modules"),
    ("CONFIG_MODVERSIONS", "modules"),
    ("CONFIG_BPF", "bpf"),
    ("CONFIG_SERIAL", "drivers"),
    ("CONFIG_PCI", "drivers"),
];

/// Kind of incompatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    MutualExclusion,
    DependencyMissing,
    ArchitectureMismatch,
    OptimizationConflict,
    DebugConflict,
    AllocatorConflict,
    FeatureIncompatibility,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::MutualExclusion => "mutual_exclusion",
            ConflictType::DependencyMissing => "dependency_missing",
            ConflictType::ArchitectureMismatch => "architecture_mismatch",
            ConflictType::OptimizationConflict => "optimization_conflict",
            ConflictType::DebugConflict => "debug_conflict",
            ConflictType::AllocatorConflict => "allocator_conflict",
            ConflictType::FeatureIncompatibility => "feature_incompatibility",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflict severity. Orders most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];

    /// Critical and high conflicts are expected to break the build.
    pub fn blocks_build(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

/// One detected incompatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigConflict {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    /// Sorted, never empty.
    pub conflicting_options: Vec<String>,
    pub description: String,
    pub affected_subsystems: Vec<String>,
    /// Never empty.
    pub resolution_suggestions: Vec<String>,
}

impl ConfigConflict {
    fn new(
        conflict_type: ConflictType,
        severity: Severity,
        options: impl IntoIterator<Item = String>,
        description: String,
        resolution_suggestions: Vec<String>,
    ) -> Self {
        let set: BTreeSet<String> = options.into_iter().collect();
        let conflicting_options: Vec<String> = set.into_iter().collect();
        let affected_subsystems = subsystems_for(&conflicting_options);
        let resolution_suggestions = if resolution_suggestions.is_empty() {
            vec![format!("Review {} manually", conflicting_options.join(", "))]
        } else {
            resolution_suggestions
        };
        ConfigConflict {
            conflict_type,
            severity,
            conflicting_options,
            description,
            affected_subsystems,
            resolution_suggestions,
        }
    }

    /// Identity used for deduplication and determinism checks.
    pub fn key(&self) -> (ConflictType, Severity, Vec<String>) {
        (self.conflict_type, self.severity, self.conflicting_options.clone())
    }
}

/// All conflicts found in one configuration, with derived aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictReport {
    pub config: KernelConfig,
    pub conflicts: Vec<ConfigConflict>,
    pub has_critical_conflicts: bool,
    pub has_build_blocking_conflicts: bool,
    pub total_conflicts: usize,
    /// Always holds all four severities.
    pub conflicts_by_severity: BTreeMap<Severity, usize>,
}

impl ConflictReport {
    /// Build a report; every aggregate is derived from `conflicts`.
    pub fn new(config: KernelConfig, conflicts: Vec<ConfigConflict>) -> Self {
        let mut conflicts_by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|&s| (s, 0)).collect();
        for conflict in &conflicts {
            *conflicts_by_severity.entry(conflict.severity).or_insert(0) += 1;
        }
        ConflictReport {
            has_critical_conflicts: conflicts.iter().any(|c| c.severity == Severity::Critical),
            has_build_blocking_conflicts: conflicts.iter().any(|c| c.severity.blocks_build()),
            total_conflicts: conflicts.len(),
            conflicts_by_severity,
            config,
            conflicts,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

fn subsystems_for(options: &[String]) -> Vec<String> {
    let mut found = BTreeSet::new();
    for option in options {
        let arch_owned = Architecture::ALL.iter().any(|&a| {
            arch::profile(a).identity_options.contains(&option.as_str())
                || arch::profile(a).required_options.contains(&option.as_str())
        });
        let subsystem = if arch_owned {
            "architecture"
        } else {
            SUBSYSTEMS
                .iter()
                .find(|(prefix, _)| option.starts_with(prefix))
                .map(|(_, name)| *name)
                .unwrap_or("core")
        };
        found.insert(subsystem.to_string());
    }
    found.into_iter().collect()
}

/// The conflict rule engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        ConflictDetector
    }

    /// Every enabled option whose listed dependencies are not all enabled.
    pub fn analyze_dependencies(&self, config: &KernelConfig) -> Vec<ConfigConflict> {
        DEPENDENCIES
            .iter()
            .filter(|(option, _)| config.is_enabled(option))
            .filter_map(|(option, deps)| {
                let missing: Vec<&str> = deps
                    .iter()
                    .copied()
                    .filter(|dep| !config.is_enabled(dep))
                    .collect();
                if missing.is_empty() {
                    return None;
                }
                let mut suggestions: Vec<String> =
                    missing.iter().map(|dep| format!("Enable {}", dep)).collect();
                suggestions.push(format!("Disable {}", option));
                Some(ConfigConflict::new(
                    ConflictType::DependencyMissing,
                    Severity::High,
                    std::iter::once(option.to_string()).chain(missing.iter().map(|d| d.to_string())),
                    format!("{} requires {} which is not enabled", option, missing.join(", ")),
                    suggestions,
                ))
            })
            .collect()
    }

    /// Every mutually exclusive pair that is enabled together.
    pub fn find_mutual_exclusions(&self, config: &KernelConfig) -> Vec<ConfigConflict> {
        MUTUAL_EXCLUSIONS
            .iter()
            .filter(|(a, b, _)| config.is_enabled(a) && config.is_enabled(b))
            .map(|(a, b, reason)| {
                ConfigConflict::new(
                    ConflictType::MutualExclusion,
                    Severity::Critical,
                    [a.to_string(), b.to_string()],
                    format!("{} and {} are mutually exclusive: {}", a, b, reason),
                    vec![format!("Disable {}", b), format!("Disable {}", a)],
                )
            })
            .collect()
    }

    /// Required options present, no foreign options, at most one architecture enabled.
    pub fn check_architecture_consistency(&self, config: &KernelConfig) -> Vec<ConfigConflict> {
        let own = config.architecture();
        let mut conflicts = Vec::new();

        let missing = arch::missing_required(config);
        if !missing.is_empty() {
            conflicts.push(ConfigConflict::new(
                ConflictType::ArchitectureMismatch,
                Severity::High,
                missing.iter().map(|m| m.to_string()),
                format!("Architecture {} requires {} to be enabled", own, missing.join(", ")),
                missing.iter().map(|m| format!("Enable {}", m)).collect(),
            ));
        }

        let enabled = arch::enabled_architectures(config);
        if enabled.len() > 1 {
            let options: Vec<String> = enabled
                .iter()
                .flat_map(|&a| arch::profile(a).identity_options.iter())
                .filter(|opt| config.is_enabled(opt))
                .map(|opt| opt.to_string())
                .collect();
            let others: Vec<String> = enabled
                .iter()
                .filter(|&&a| a != own)
                .map(|a| a.to_string())
                .collect();
            conflicts.push(ConfigConflict::new(
                ConflictType::ArchitectureMismatch,
                Severity::Critical,
                options,
                format!(
                    "Options for several architectures are enabled ({}); only one can be built",
                    enabled.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
                ),
                others
                    .iter()
                    .map(|a| format!("Disable {} architecture options", a))
                    .collect(),
            ));
        }

        let mut foreign_by_arch: BTreeMap<Architecture, Vec<String>> = BTreeMap::new();
        for (option, owner) in arch::foreign_options(config) {
            let is_identity = arch::profile(owner).identity_options.contains(&option.as_str());
            if !is_identity {
                foreign_by_arch.entry(owner).or_default().push(option);
            }
        }
        for (owner, options) in foreign_by_arch {
            conflicts.push(ConfigConflict::new(
                ConflictType::ArchitectureMismatch,
                Severity::High,
                options.clone(),
                format!("{} options enabled in a {} configuration", owner, own),
                options.iter().map(|o| format!("Disable {}", o)).collect(),
            ));
        }
        conflicts
    }

    /// Hand-written allocator, optimization, debug and module rules.
    pub fn check_special_rules(&self, config: &KernelConfig) -> Vec<ConfigConflict> {
        let mut conflicts = Vec::new();

        if config.is_enabled("CONFIG_CC_OPTIMIZE_FOR_SIZE")
            && config.is_enabled("CONFIG_CC_OPTIMIZE_FOR_PERFORMANCE")
        {
            conflicts.push(ConfigConflict::new(
                ConflictType::OptimizationConflict,
                Severity::Medium,
                ["CONFIG_CC_OPTIMIZE_FOR_SIZE".to_string(), "CONFIG_CC_OPTIMIZE_FOR_PERFORMANCE".to_string()],
                "Size and performance optimization are both enabled".to_string(),
                vec!["Choose one optimization goal".to_string()],
            ));
        }

        if config.is_enabled("CONFIG_DEBUG_SLAB") && !config.is_enabled("CONFIG_SLAB") {
            let mut options = vec!["CONFIG_DEBUG_SLAB".to_string()];
            options.extend(
                ["CONFIG_SLUB", "CONFIG_SLOB"]
                    .iter()
                    .filter(|a| config.is_enabled(a))
                    .map(|a| a.to_string()),
            );
            conflicts.push(ConfigConflict::new(
                ConflictType::AllocatorConflict,
                Severity::Medium,
                options,
                "CONFIG_DEBUG_SLAB only instruments the SLAB allocator".to_string(),
                vec![
                    "Disable CONFIG_DEBUG_SLAB".to_string(),
                    "Use CONFIG_SLUB_DEBUG with the SLUB allocator".to_string(),
                ],
            ));
        }

        if config.is_enabled("CONFIG_KASAN") && config.is_enabled("CONFIG_SLOB") {
            conflicts.push(ConfigConflict::new(
                ConflictType::AllocatorConflict,
                Severity::High,
                ["CONFIG_KASAN".to_string(), "CONFIG_SLOB".to_string()],
                "KASAN does not support the SLOB allocator".to_string(),
                vec!["Switch to CONFIG_SLUB".to_string(), "Disable CONFIG_KASAN".to_string()],
            ));
        }

        if config.is_enabled("CONFIG_DEBUG_INFO_NONE") {
            let others: Vec<String> = config
                .enabled_options()
                .filter(|o| o.starts_with("CONFIG_DEBUG_INFO") && *o != "CONFIG_DEBUG_INFO_NONE")
                .map(|o| o.to_string())
                .collect();
            if !others.is_empty() {
                let mut suggestions = vec!["Disable CONFIG_DEBUG_INFO_NONE".to_string()];
                suggestions.extend(others.iter().map(|o| format!("Disable {}", o)));
                conflicts.push(ConfigConflict::new(
                    ConflictType::DebugConflict,
                    Severity::Medium,
                    std::iter::once("CONFIG_DEBUG_INFO_NONE".to_string()).chain(others.iter().cloned()),
                    "CONFIG_DEBUG_INFO_NONE contradicts other debug info options".to_string(),
                    suggestions,
                ));
            }
        }

        if !config.is_enabled("CONFIG_MODULES") {
            let modules: Vec<String> = config
                .options()
                .iter()
                .filter(|(_, v)| **v == OptionValue::Module)
                .map(|(k, _)| k.clone())
                .collect();
            if !modules.is_empty() {
                conflicts.push(ConfigConflict::new(
                    ConflictType::FeatureIncompatibility,
                    Severity::High,
                    std::iter::once("CONFIG_MODULES".to_string()).chain(modules.iter().cloned()),
                    format!(
                        "{} option(s) set to 'm' while loadable module support is disabled",
                        modules.len()
                    ),
                    vec![
                        "Enable CONFIG_MODULES".to_string(),
                        "Build the options in (=y) or disable them".to_string(),
                    ],
                ));
            }
        }

        conflicts
    }

    /// Run every check and merge the findings into a report.
    pub fn detect_conflicts(&self, config: &KernelConfig) -> ConflictReport {
        let mut all = Vec::new();
        all.extend(self.find_mutual_exclusions(config));
        all.extend(self.analyze_dependencies(config));
        all.extend(self.check_architecture_consistency(config));
        all.extend(self.check_special_rules(config));

        let conflicts = merge_conflicts(all);
        log::debug!(
            "Conflict detection for {}: {} conflict(s)",
            config.name(),
            conflicts.len()
        );
        ConflictReport::new(config.clone(), conflicts)
    }
}

/// Collapse conflicts naming the same option set, keeping the most severe
/// (earliest on ties), then sort.
fn merge_conflicts(conflicts: Vec<ConfigConflict>) -> Vec<ConfigConflict> {
    let mut by_options: BTreeMap<Vec<String>, ConfigConflict> = BTreeMap::new();
    for conflict in conflicts {
        match by_options.get(&conflict.conflicting_options) {
            Some(existing) if existing.severity <= conflict.severity => {}
            _ => {
                by_options.insert(conflict.conflicting_options.clone(), conflict);
            }
        }
    }
    let mut merged: Vec<ConfigConflict> = by_options.into_values().collect();
    merged.sort_by(|a, b| a.key().cmp(&b.key()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generator::generate_standard_config;
    use crate::models::ConfigType;

    fn custom(arch: Architecture, opts: &[(&str, OptionValue)]) -> KernelConfig {
        KernelConfig::new(
            "custom",
            arch,
            ConfigType::Custom,
            opts.iter().map(|(k, v)| (k.to_string(), *v)),
            "",
        )
        .unwrap()
    }

    #[test]
    fn test_missing_dependency_reported() {
        let cfg = custom(
            Architecture::X86_64,
            &[
                ("CONFIG_64BIT", OptionValue::Yes),
                ("CONFIG_X86_64", OptionValue::Yes),
                ("CONFIG_IPV6", OptionValue::Yes),
                ("CONFIG_NET", OptionValue::Yes),
            ],
        );
        let conflicts = ConflictDetector::new().analyze_dependencies(&cfg);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::High);
        assert_eq!(conflicts[0].conflicting_options, vec!["CONFIG_INET", "CONFIG_IPV6"]);
        assert!(conflicts[0].resolution_suggestions.contains(&"Enable CONFIG_INET".to_string()));
        assert_eq!(conflicts[0].affected_subsystems, vec!["networking"]);
    }

    #[test]
    fn test_size_and_performance_merge_into_one_critical() {
        let cfg = generate_standard_config(Architecture::X86_64, ConfigType::Default)
            .unwrap()
            .with_option("CONFIG_CC_OPTIMIZE_FOR_SIZE", OptionValue::Yes)
            .unwrap();
        let report = ConflictDetector::new().detect_conflicts(&cfg);
        assert_eq!(report.total_conflicts, 1);
        assert_eq!(report.conflicts[0].conflict_type, ConflictType::MutualExclusion);
        assert_eq!(report.conflicts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_multiple_architectures_critical() {
        let cfg = custom(
            Architecture::X86_64,
            &[
                ("CONFIG_64BIT", OptionValue::Yes),
                ("CONFIG_X86_64", OptionValue::Yes),
                ("CONFIG_ARM64", OptionValue::Yes),
            ],
        );
        let conflicts = ConflictDetector::new().check_architecture_consistency(&cfg);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Critical);
        assert!(conflicts[0].conflicting_options.contains(&"CONFIG_ARM64".to_string()));
    }

    #[test]
    fn test_module_without_module_support() {
        let cfg = generate_standard_config(Architecture::Arm64, ConfigType::Minimal)
            .unwrap()
            .with_option("CONFIG_EXT4_FS", OptionValue::Module)
            .unwrap();
        let special = ConflictDetector::new().check_special_rules(&cfg);
        assert!(special
            .iter()
            .any(|c| c.conflict_type == ConflictType::FeatureIncompatibility && c.severity == Severity::High));
    }

    #[test]
    fn test_kasan_with_slob() {
        let cfg = custom(
            Architecture::Riscv64,
            &[
                ("CONFIG_64BIT", OptionValue::Yes),
                ("CONFIG_RISCV", OptionValue::Yes),
                ("CONFIG_DEBUG_KERNEL", OptionValue::Yes),
                ("CONFIG_KASAN", OptionValue::Yes),
                ("CONFIG_SLOB", OptionValue::Yes),
            ],
        );
        let report = ConflictDetector::new().detect_conflicts(&cfg);
        assert_eq!(report.total_conflicts, 1);
        assert_eq!(report.conflicts[0].conflict_type, ConflictType::AllocatorConflict);
        assert!(report.has_build_blocking_conflicts);
        assert!(!report.has_critical_conflicts);
    }

    #[test]
    fn test_debug_info_none_conflict() {
        let cfg = custom(
            Architecture::Arm,
            &[
                ("CONFIG_ARM", OptionValue::Yes),
                ("CONFIG_DEBUG_INFO_NONE", OptionValue::Yes),
                ("CONFIG_DEBUG_INFO_DWARF5", OptionValue::Yes),
            ],
        );
        let report = ConflictDetector::new().detect_conflicts(&cfg);
        assert_eq!(report.conflicts_by_severity[&Severity::Medium], 1);
        assert_eq!(report.conflicts[0].conflict_type, ConflictType::DebugConflict);
    }

    #[test]
    fn test_report_counts_all_severities() {
        let report = ConflictReport::new(
            custom(Architecture::Arm, &[("CONFIG_ARM", OptionValue::Yes)]),
            Vec::new(),
        );
        assert_eq!(report.conflicts_by_severity.len(), 4);
        assert!(report.is_clean());
        assert!(!report.has_build_blocking_conflicts);
    }
}
