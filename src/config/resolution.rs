//! Turn a conflict report into concrete fix suggestions.

use super::conflicts::{ConfigConflict, ConflictReport, ConflictType, Severity};
use crate::models::{KernelConfig, OptionValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mechanically generated option changes that remove one conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticFix {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    pub description: String,
    pub changes: BTreeMap<String, OptionValue>,
}

/// A conflict that needs a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAction {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    pub description: String,
    pub suggestions: Vec<String>,
}

/// Everything the suggester produced for one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub automatic_fixes: Vec<AutomaticFix>,
    pub manual_actions: Vec<ManualAction>,
    /// Full configs with the automatic fixes applied.
    pub alternative_configs: Vec<KernelConfig>,
    /// Conflicts ordered critical -> low.
    pub priority_order: Vec<ConfigConflict>,
}

/// Per-conflict change sets for the two alternative variants.
struct Variants {
    /// Keep the preferred option / satisfy the dependency.
    first: BTreeMap<String, OptionValue>,
    /// Keep the other option / drop the dependent.
    second: BTreeMap<String, OptionValue>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictResolutionSuggester;

impl ConflictResolutionSuggester {
    pub fn new() -> Self {
        ConflictResolutionSuggester
    }

    pub fn suggest_resolutions(&self, report: &ConflictReport) -> ConflictResolution {
        let mut automatic_fixes = Vec::new();
        let mut manual_actions = Vec::new();
        let mut variants = Variants {
            first: BTreeMap::new(),
            second: BTreeMap::new(),
        };

        for conflict in &report.conflicts {
            match conflict.conflict_type {
                ConflictType::MutualExclusion => {
                    self.mutual_exclusion_fixes(conflict, &mut automatic_fixes, &mut variants)
                }
                ConflictType::DependencyMissing => {
                    self.dependency_fixes(report, conflict, &mut automatic_fixes, &mut variants)
                }
                _ => manual_actions.push(ManualAction {
                    conflict_type: conflict.conflict_type,
                    severity: conflict.severity,
                    description: conflict.description.clone(),
                    suggestions: conflict.resolution_suggestions.clone(),
                }),
            }
        }

        let mut priority_order = report.conflicts.clone();
        // Stable: equal severities keep report order.
        priority_order.sort_by_key(|c| c.severity);
        manual_actions.sort_by_key(|a| a.severity);

        let alternative_configs = self.alternative_configs(&report.config, variants);

        ConflictResolution {
            automatic_fixes,
            manual_actions,
            alternative_configs,
            priority_order,
        }
    }

    fn mutual_exclusion_fixes(
        &self,
        conflict: &ConfigConflict,
        fixes: &mut Vec<AutomaticFix>,
        variants: &mut Variants,
    ) {
        // Options are sorted in the conflict; the table decides which one is preferred.
        let (keep, drop) = preferred_pair(&conflict.conflicting_options);
        for disabled in [&drop, &keep] {
            let mut changes = BTreeMap::new();
            changes.insert(disabled.clone(), OptionValue::No);
            fixes.push(AutomaticFix {
                conflict_type: conflict.conflict_type,
                severity: conflict.severity,
                description: format!("Disable {}", disabled),
                changes,
            });
        }
        variants.first.entry(drop.clone()).or_insert(OptionValue::No);
        variants.second.entry(keep).or_insert(OptionValue::No);
    }

    fn dependency_fixes(
        &self,
        report: &ConflictReport,
        conflict: &ConfigConflict,
        fixes: &mut Vec<AutomaticFix>,
        variants: &mut Variants,
    ) {
        // The dependent is the one option in the set that is currently enabled.
        let (enabled, missing): (Vec<&String>, Vec<&String>) = conflict
            .conflicting_options
            .iter()
            .partition(|o| report.config.is_enabled(o));
        if missing.is_empty() {
            return;
        }
        let changes: BTreeMap<String, OptionValue> = missing
            .iter()
            .map(|o| ((*o).clone(), OptionValue::Yes))
            .collect();
        fixes.push(AutomaticFix {
            conflict_type: conflict.conflict_type,
            severity: conflict.severity,
            description: format!(
                "Enable {}",
                missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            ),
            changes: changes.clone(),
        });
        for (key, value) in changes {
            variants.first.entry(key).or_insert(value);
        }
        for dependent in enabled {
            variants.second.insert(dependent.clone(), OptionValue::No);
        }
    }

    fn alternative_configs(&self, base: &KernelConfig, variants: Variants) -> Vec<KernelConfig> {
        let mut alternatives = Vec::new();
        for (suffix, changes) in [("a", variants.first), ("b", variants.second)] {
            if changes.is_empty() {
                continue;
            }
            let alternative = base
                .with_options(changes)
                .and_then(|config| config.renamed(format!("{}_resolved_{}", base.name(), suffix)));
            match alternative {
                Ok(config) => alternatives
                    .push(config.with_metadata("resolved_from", serde_json::Value::from(base.name()))),
                Err(e) => log::warn!("Could not build alternative for {}: {}", base.name(), e),
            }
        }
        alternatives
    }
}

/// Order a mutually exclusive pair as (preferred, other) using the exclusion table.
fn preferred_pair(options: &[String]) -> (String, String) {
    let first = options.first().cloned().unwrap_or_default();
    let second = options.get(1).cloned().unwrap_or_default();
    let table_order = super::conflicts::MUTUAL_EXCLUSIONS
        .iter()
        .find(|(a, b, _)| (*a == first && *b == second) || (*a == second && *b == first));
    match table_order {
        Some((a, b, _)) => (a.to_string(), b.to_string()),
        None => (first, second),
    }
}
