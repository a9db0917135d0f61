//! Unified error type hierarchy for the GOATd config lab
//!
//! Provides structured error handling with ConfigError, BuildError, BootError
//! and UsageStoreError. Build and boot errors never leave the builder / boot
//! tester: they are rendered into the `errors` list of the stage result.

use std::io;
use thiserror::Error;

/// Settings, config-file and option validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Kernel build execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to prepare output directory {path}: {reason}")]
    OutputDirectory { path: String, reason: String },

    #[error("Failed to write kernel configuration: {0}")]
    ConfigWrite(String),

    #[error("Failed to spawn '{cmd}': {reason}")]
    SpawnFailed { cmd: String, reason: String },

    #[error("Build step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("Build step '{0}' terminated by signal")]
    Terminated(String),

    #[error("Build timed out after {0} seconds")]
    TimedOut(u64),

    #[error("Kernel image not found for {arch} (searched: {searched})")]
    ArtifactMissing { arch: String, searched: String },
}

/// Boot test errors.
#[derive(Error, Debug)]
pub enum BootError {
    #[error("Kernel image not found: {0}")]
    ImageMissing(String),

    #[error("Kernel image is empty: {0}")]
    ImageEmpty(String),

    #[error("Kernel image too small ({size} bytes, minimum {minimum}): {path}")]
    ImageTooSmall { path: String, size: u64, minimum: u64 },

    #[error("Failed to spawn emulator '{cmd}': {reason}")]
    EmulatorSpawn { cmd: String, reason: String },

    #[error("Boot test timed out after {0} seconds")]
    TimedOut(u64),

    #[error("IO error during boot test: {0}")]
    Io(#[from] io::Error),
}

/// Persisted usage store errors. Never fatal to tracking.
#[derive(Error, Debug)]
pub enum UsageStoreError {
    #[error("Usage store IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Usage store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
