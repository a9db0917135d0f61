//! Console log analysis for boot attempts.

use crate::models::{
    ConfigBootResult, STAGE_BOOT_COMPLETE, STAGE_INIT_START, STAGE_KERNEL_START,
    STAGE_MEMORY_INIT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// A boot checkpoint and the console output that proves it was reached.
struct BootMarker {
    stage: &'static str,
    pattern: Lazy<Regex>,
}

static MARKERS: [BootMarker; 4] = [
    BootMarker {
        stage: STAGE_KERNEL_START,
        pattern: Lazy::new(|| {
            Regex::new(r"Linux version|Booting Linux|Booting the kernel").expect("Invalid kernel start regex")
        }),
    },
    BootMarker {
        stage: STAGE_MEMORY_INIT,
        pattern: Lazy::new(|| Regex::new(r"Memory:|Zone ranges").expect("Invalid memory init regex")),
    },
    BootMarker {
        stage: STAGE_INIT_START,
        pattern: Lazy::new(|| {
            Regex::new(r"Run /\S*init|Run \S+ as init process|Freeing unused kernel")
                .expect("Invalid init start regex")
        }),
    },
    BootMarker {
        stage: STAGE_BOOT_COMPLETE,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)boot(ing)? complete|BOOT_TEST_PASSED").expect("Invalid boot complete regex")
        }),
    },
];

static KERNEL_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Linux version (\S+)").expect("Invalid kernel version regex"));

static FAILURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)panic|oops|bug:|error:|failed").expect("Invalid failure marker regex"));

/// Echo of our own `panic=1` argument; never a failure.
const COMMAND_LINE_ECHO: &str = "Kernel command line";

/// Failure lines kept in the result; the rest are only counted.
const MAX_REPORTED_FAILURES: usize = 20;

/// What a console log says about a boot attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BootAnalysis {
    /// Every stage present, reached or not.
    pub stages: BTreeMap<String, bool>,
    pub kernel_version: Option<String>,
    pub errors: Vec<String>,
    pub success: bool,
}

/// Scan a console log for stage markers, the kernel version and failure markers.
///
/// Success requires the kernel to have started, no failure markers, and either
/// the explicit sentinel or userspace init to have been reached.
pub fn analyze_boot_log(log: &str) -> BootAnalysis {
    let mut stages = ConfigBootResult::empty_stages();
    let mut kernel_version = None;
    let mut errors = Vec::new();
    let mut failure_count = 0usize;

    for line in log.lines() {
        for marker in MARKERS.iter() {
            if marker.pattern.is_match(line) {
                stages.insert(marker.stage.to_string(), true);
            }
        }
        if kernel_version.is_none() {
            if let Some(caps) = KERNEL_VERSION.captures(line) {
                kernel_version = Some(caps[1].to_string());
            }
        }
        if !line.contains(COMMAND_LINE_ECHO) && FAILURE.is_match(line) {
            failure_count += 1;
            if errors.len() < MAX_REPORTED_FAILURES {
                errors.push(format!("Boot failure marker: {}", line.trim()));
            }
        }
    }
    if failure_count > MAX_REPORTED_FAILURES {
        errors.push(format!(
            "... {} more failure marker(s) omitted",
            failure_count - MAX_REPORTED_FAILURES
        ));
    }

    let reached = |stage: &str| stages.get(stage).copied().unwrap_or(false);
    let success = reached(STAGE_KERNEL_START)
        && failure_count == 0
        && (reached(STAGE_BOOT_COMPLETE) || reached(STAGE_INIT_START));

    BootAnalysis {
        stages,
        kernel_version,
        errors,
        success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_BOOT: &str = "\
[    0.000000] Linux version 6.9.0-lab (builder@host) (gcc 13.2) #1 SMP
[    0.000000] Kernel command line: console=ttyS0 panic=1 init=/sbin/init
[    0.010000] Zone ranges:
[    0.020000] Memory: 490000K/524288K available
[    1.200000] Freeing unused kernel image (initmem) memory: 2000K
[    1.300000] Run /sbin/init as init process
";

    #[test]
    fn test_clean_boot_succeeds() {
        let analysis = analyze_boot_log(GOOD_BOOT);
        assert!(analysis.success, "{:?}", analysis.errors);
        assert_eq!(analysis.kernel_version.as_deref(), Some("6.9.0-lab"));
        assert!(analysis.stages[STAGE_MEMORY_INIT]);
        assert!(analysis.stages[STAGE_INIT_START]);
        assert!(!analysis.stages[STAGE_BOOT_COMPLETE]);
    }

    #[test]
    fn test_panic_fails_boot_but_keeps_stages() {
        let log = format!("{}[    1.400000] Kernel panic - not syncing: Attempted to kill init!\n", GOOD_BOOT);
        let analysis = analyze_boot_log(&log);
        assert!(!analysis.success);
        assert_eq!(analysis.errors.len(), 1);
        assert!(analysis.stages[STAGE_KERNEL_START]);
    }

    #[test]
    fn test_sentinel_without_init_succeeds() {
        let analysis = analyze_boot_log("Booting Linux on physical CPU 0x0\nBOOT_TEST_PASSED\n");
        assert!(analysis.success);
        assert!(analysis.kernel_version.is_none());
    }

    #[test]
    fn test_no_kernel_start_is_failure() {
        let analysis = analyze_boot_log("Run /sbin/init as init process\nboot complete\n");
        assert!(!analysis.success);
        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.stages.len(), 4);
    }

    #[test]
    fn test_empty_log_has_all_stages_false() {
        let analysis = analyze_boot_log("");
        assert!(!analysis.success);
        assert!(analysis.stages.values().all(|reached| !reached));
    }

    #[test]
    fn test_failure_markers_are_case_insensitive() {
        for line in ["OOPS: 0002", "BUG: kernel NULL pointer", "mount FAILED", "Error: no root"] {
            let log = format!("Linux version 6.1\nRun /init as init process\n{}\n", line);
            assert!(!analyze_boot_log(&log).success, "{}", line);
        }
    }
}
