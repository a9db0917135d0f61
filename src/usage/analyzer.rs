//! Flags options that tested configurations rarely or never exercise.

use super::tracker::UsageStore;
use crate::config::TesterSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarelyUsedOption {
    pub option_name: String,
    pub usage_rate: f64,
    pub total_tests: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RarelyUsedAnalysis {
    pub rarely_used: Vec<RarelyUsedOption>,
    /// Observed, but never set to `y` or `m`.
    pub never_enabled: Vec<String>,
    /// Known options that no tracked configuration ever included.
    pub never_tested: Vec<String>,
    /// Option name -> the one architecture it was seen on.
    pub architecture_specific: BTreeMap<String, String>,
}

pub struct RarelyUsedOptionIdentifier {
    min_tests: u64,
    threshold: f64,
}

impl Default for RarelyUsedOptionIdentifier {
    fn default() -> Self {
        RarelyUsedOptionIdentifier {
            min_tests: 5,
            threshold: 0.1,
        }
    }
}

impl RarelyUsedOptionIdentifier {
    pub fn new(min_tests: u64, threshold: f64) -> Self {
        RarelyUsedOptionIdentifier { min_tests, threshold }
    }

    pub fn from_settings(settings: &TesterSettings) -> Self {
        Self::new(settings.usage_min_tests, settings.rarely_used_threshold)
    }

    pub fn min_tests(&self) -> u64 {
        self.min_tests
    }

    /// Options with enough observations and a usage rate under the threshold,
    /// least used first.
    pub fn rarely_used(&self, store: &UsageStore) -> Vec<RarelyUsedOption> {
        let mut found: Vec<RarelyUsedOption> = store
            .values()
            .filter(|u| u.total_tests >= self.min_tests && u.usage_rate() < self.threshold)
            .map(|u| RarelyUsedOption {
                option_name: u.option_name.clone(),
                usage_rate: u.usage_rate(),
                total_tests: u.total_tests,
            })
            .collect();
        found.sort_by(|a, b| {
            a.usage_rate
                .total_cmp(&b.usage_rate)
                .then_with(|| a.option_name.cmp(&b.option_name))
        });
        found
    }

    pub fn never_enabled(&self, store: &UsageStore) -> Vec<String> {
        store
            .values()
            .filter(|u| u.total_tests > 0 && u.enabled_count + u.module_count == 0)
            .map(|u| u.option_name.clone())
            .collect()
    }

    pub fn never_tested(&self, store: &UsageStore, known: &BTreeSet<String>) -> Vec<String> {
        known
            .iter()
            .filter(|name| !store.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn architecture_specific(&self, store: &UsageStore) -> BTreeMap<String, String> {
        store
            .values()
            .filter(|u| u.architectures_used.len() == 1)
            .filter_map(|u| {
                u.architectures_used
                    .iter()
                    .next()
                    .map(|arch| (u.option_name.clone(), arch.clone()))
            })
            .collect()
    }

    pub fn identify(&self, store: &UsageStore, known: &BTreeSet<String>) -> RarelyUsedAnalysis {
        RarelyUsedAnalysis {
            rarely_used: self.rarely_used(store),
            never_enabled: self.never_enabled(store),
            never_tested: self.never_tested(store, known),
            architecture_specific: self.architecture_specific(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Architecture, ConfigType, OptionValue};
    use crate::usage::tracker::ConfigOptionUsage;
    use chrono::Utc;

    fn usage(name: &str, yes: u64, no: u64, arch: Architecture) -> ConfigOptionUsage {
        let now = Utc::now();
        let mut u = ConfigOptionUsage::new(name, now);
        for _ in 0..yes {
            u.observe(OptionValue::Yes, arch, ConfigType::Default, true, now);
        }
        for _ in 0..no {
            u.observe(OptionValue::No, arch, ConfigType::Default, true, now);
        }
        u
    }

    fn store(items: Vec<ConfigOptionUsage>) -> UsageStore {
        items.into_iter().map(|u| (u.option_name.clone(), u)).collect()
    }

    #[test]
    fn test_rarely_used_needs_min_tests() {
        let s = store(vec![
            usage("CONFIG_A", 1, 19, Architecture::X86_64),
            usage("CONFIG_B", 0, 3, Architecture::X86_64),
            usage("CONFIG_C", 2, 18, Architecture::X86_64),
        ]);
        let found = RarelyUsedOptionIdentifier::default().rarely_used(&s);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].option_name, "CONFIG_A");
    }

    #[test]
    fn test_never_enabled_and_never_tested() {
        let s = store(vec![usage("CONFIG_A", 0, 2, Architecture::Arm)]);
        let known: BTreeSet<String> = ["CONFIG_A", "CONFIG_Z"].iter().map(|s| s.to_string()).collect();
        let analysis = RarelyUsedOptionIdentifier::default().identify(&s, &known);
        assert_eq!(analysis.never_enabled, vec!["CONFIG_A"]);
        assert_eq!(analysis.never_tested, vec!["CONFIG_Z"]);
        assert_eq!(analysis.architecture_specific["CONFIG_A"], "arm");
    }

    #[test]
    fn test_multi_arch_option_is_not_specific() {
        let now = Utc::now();
        let mut u = usage("CONFIG_NET", 1, 0, Architecture::X86_64);
        u.observe(OptionValue::Yes, Architecture::Riscv64, ConfigType::Minimal, true, now);
        let s = store(vec![u]);
        assert!(RarelyUsedOptionIdentifier::default().architecture_specific(&s).is_empty());
    }
}
