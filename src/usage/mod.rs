//! Option usage tracking across test runs.
//!
//! - `tracker`: per-option statistics and the persisted JSON store
//! - `analyzer`: rarely used / never used / architecture-specific options
//! - `report`: statistics and recommendations over a tracker

pub mod analyzer;
pub mod report;
pub mod tracker;

pub use analyzer::{RarelyUsedAnalysis, RarelyUsedOptionIdentifier};
pub use report::{UsageReport, UsageReportGenerator};
pub use tracker::{ConfigOptionUsage, RunCounters, UsageFrequency, UsageTracker};
