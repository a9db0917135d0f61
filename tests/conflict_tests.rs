//! Conflict rule engine and resolution suggester tests.

use goatd_kconfig_lab::config::generator::{generate_all_standard_configs, generate_standard_config};
use goatd_kconfig_lab::{
    Architecture, ConflictDetector, ConflictReport, ConflictResolutionSuggester, ConflictType, ConfigType,
    KernelConfig, OptionValue, Severity,
};
use proptest::prelude::*;

fn default_x86() -> KernelConfig {
    generate_standard_config(Architecture::X86_64, ConfigType::Default).unwrap()
}

fn assert_aggregates_consistent(report: &ConflictReport) {
    assert_eq!(report.total_conflicts, report.conflicts.len());
    assert_eq!(report.conflicts_by_severity.len(), 4);
    assert_eq!(
        report.conflicts_by_severity.values().sum::<usize>(),
        report.total_conflicts
    );
    assert_eq!(
        report.has_critical_conflicts,
        report.conflicts.iter().any(|c| c.severity == Severity::Critical)
    );
    assert_eq!(
        report.has_build_blocking_conflicts,
        report.conflicts.iter().any(|c| c.severity.blocks_build())
    );
    for conflict in &report.conflicts {
        assert!(!conflict.conflicting_options.is_empty());
        assert!(!conflict.resolution_suggestions.is_empty());
        let mut sorted = conflict.conflicting_options.clone();
        sorted.sort();
        assert_eq!(sorted, conflict.conflicting_options);
    }
}

#[test]
fn test_standard_configs_have_no_conflicts() {
    let detector = ConflictDetector::new();
    for arch in Architecture::ALL {
        for config in generate_all_standard_configs(arch).unwrap() {
            let report = detector.detect_conflicts(&config);
            assert!(report.is_clean(), "{}: {:?}", config.name(), report.conflicts);
            assert_aggregates_consistent(&report);
        }
    }
}

#[test]
fn test_slab_on_default_x86_is_one_critical_exclusion() {
    let config = default_x86().with_option("CONFIG_SLAB", OptionValue::Yes).unwrap();
    let report = ConflictDetector::new().detect_conflicts(&config);

    assert_eq!(report.total_conflicts, 1, "{:?}", report.conflicts);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::MutualExclusion);
    assert_eq!(conflict.severity, Severity::Critical);
    assert_eq!(
        conflict.conflicting_options,
        vec!["CONFIG_SLAB".to_string(), "CONFIG_SLUB".to_string()]
    );
    assert_eq!(conflict.affected_subsystems, vec!["memory".to_string()]);
    assert!(report.has_critical_conflicts);
    assert!(report.has_build_blocking_conflicts);
    assert_eq!(report.conflicts_by_severity[&Severity::Critical], 1);
    assert_eq!(report.conflicts_by_severity[&Severity::Low], 0);
}

#[test]
fn test_missing_network_dependency_on_minimal() {
    let config = generate_standard_config(Architecture::X86_64, ConfigType::Minimal)
        .unwrap()
        .with_option("CONFIG_IPV6", OptionValue::Yes)
        .unwrap();
    let report = ConflictDetector::new().detect_conflicts(&config);

    assert_eq!(report.total_conflicts, 1, "{:?}", report.conflicts);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::DependencyMissing);
    assert_eq!(conflict.severity, Severity::High);
    assert!(conflict.conflicting_options.contains(&"CONFIG_NET".to_string()));
    assert!(!report.has_critical_conflicts);
    assert!(report.has_build_blocking_conflicts);
}

#[test]
fn test_exclusion_resolution_alternatives_are_clean() {
    let config = default_x86().with_option("CONFIG_SLAB", OptionValue::Yes).unwrap();
    let detector = ConflictDetector::new();
    let report = detector.detect_conflicts(&config);
    let resolution = ConflictResolutionSuggester::new().suggest_resolutions(&report);

    assert_eq!(resolution.automatic_fixes.len(), 2);
    assert!(resolution.manual_actions.is_empty());
    assert_eq!(resolution.priority_order.len(), 1);
    assert_eq!(resolution.alternative_configs.len(), 2);

    let first = &resolution.alternative_configs[0];
    assert_eq!(first.name(), "default_x86_64_resolved_a");
    assert_eq!(first.option("CONFIG_SLAB"), Some(OptionValue::No));
    assert!(first.is_enabled("CONFIG_SLUB"));
    assert_eq!(
        first.metadata()["resolved_from"],
        serde_json::json!("default_x86_64")
    );

    let second = &resolution.alternative_configs[1];
    assert_eq!(second.option("CONFIG_SLUB"), Some(OptionValue::No));
    assert!(second.is_enabled("CONFIG_SLAB"));

    for alternative in &resolution.alternative_configs {
        assert!(
            detector.detect_conflicts(alternative).is_clean(),
            "{} still conflicts",
            alternative.name()
        );
    }
    // The input config is never modified.
    assert!(config.is_enabled("CONFIG_SLAB") && config.is_enabled("CONFIG_SLUB"));
}

#[test]
fn test_dependency_resolution_enables_or_drops() {
    let config = generate_standard_config(Architecture::Arm64, ConfigType::Minimal)
        .unwrap()
        .with_option("CONFIG_IPV6", OptionValue::Yes)
        .unwrap();
    let detector = ConflictDetector::new();
    let resolution = ConflictResolutionSuggester::new().suggest_resolutions(&detector.detect_conflicts(&config));

    assert_eq!(resolution.alternative_configs.len(), 2);
    let enable = &resolution.alternative_configs[0];
    assert!(enable.is_enabled("CONFIG_NET") && enable.is_enabled("CONFIG_INET"));
    let drop = &resolution.alternative_configs[1];
    assert_eq!(drop.option("CONFIG_IPV6"), Some(OptionValue::No));

    for alternative in &resolution.alternative_configs {
        assert!(detector.detect_conflicts(alternative).is_clean(), "{}", alternative.name());
    }
}

#[test]
fn test_priority_order_puts_critical_first() {
    let config = default_x86()
        .with_options(vec![
            ("CONFIG_SLAB".to_string(), OptionValue::Yes),
            ("CONFIG_KCOV".to_string(), OptionValue::Yes),
        ])
        .unwrap();
    let report = ConflictDetector::new().detect_conflicts(&config);
    assert_aggregates_consistent(&report);
    let resolution = ConflictResolutionSuggester::new().suggest_resolutions(&report);

    let severities: Vec<Severity> = resolution.priority_order.iter().map(|c| c.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
    assert_eq!(severities.first(), Some(&Severity::Critical));
}

/// Options that trip at least one rule when toggled on a default config.
const TOGGLES: &[&str] = &[
    "CONFIG_SLAB",
    "CONFIG_SLOB",
    "CONFIG_CC_OPTIMIZE_FOR_SIZE",
    "CONFIG_PREEMPT",
    "CONFIG_PREEMPT_NONE",
    "CONFIG_HZ_1000",
    "CONFIG_KASAN",
    "CONFIG_KCSAN",
    "CONFIG_KCOV",
    "CONFIG_DEBUG_SLAB",
    "CONFIG_DEBUG_INFO_NONE",
    "CONFIG_DEBUG_INFO_BTF",
    "CONFIG_ARM64",
    "CONFIG_RISCV_SBI",
    "CONFIG_NET",
    "CONFIG_MODULES",
    "CONFIG_CGROUPS",
];

fn toggled(flags: &[bool]) -> KernelConfig {
    let changes: Vec<(String, OptionValue)> = TOGGLES
        .iter()
        .zip(flags)
        .map(|(name, on)| {
            let value = if *on { OptionValue::Yes } else { OptionValue::No };
            (name.to_string(), value)
        })
        .collect();
    default_x86().with_options(changes).unwrap()
}

proptest! {
    #[test]
    fn prop_detection_is_deterministic(flags in prop::collection::vec(any::<bool>(), TOGGLES.len())) {
        let config = toggled(&flags);
        let detector = ConflictDetector::new();
        let first = detector.detect_conflicts(&config);
        let second = detector.detect_conflicts(&config.clone());
        prop_assert_eq!(&first.conflicts, &second.conflicts);

        let keys: Vec<_> = first.conflicts.iter().map(|c| c.key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(&keys, &sorted);

        let mut option_sets: Vec<&Vec<String>> =
            first.conflicts.iter().map(|c| &c.conflicting_options).collect();
        option_sets.sort();
        option_sets.dedup();
        prop_assert_eq!(option_sets.len(), first.conflicts.len());
    }

    #[test]
    fn prop_report_aggregates_match_conflicts(flags in prop::collection::vec(any::<bool>(), TOGGLES.len())) {
        let report = ConflictDetector::new().detect_conflicts(&toggled(&flags));
        prop_assert_eq!(report.total_conflicts, report.conflicts.len());
        prop_assert_eq!(report.conflicts_by_severity.values().sum::<usize>(), report.total_conflicts);
        prop_assert_eq!(
            report.has_build_blocking_conflicts,
            report.conflicts.iter().any(|c| c.severity.blocks_build())
        );
        prop_assert_eq!(
            report.has_critical_conflicts,
            report.conflicts.iter().any(|c| c.severity == Severity::Critical)
        );
    }
}
