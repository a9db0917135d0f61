//! Kernel-side execution: `.config` I/O, builds, emulator boots and log analysis.

pub mod boot;
pub mod bootlog;
pub mod builder;
pub mod emulator;
pub mod kconfig;

pub use boot::{BootTester, BootVerifier};
pub use builder::{ConfigBuilder, KernelBuilder};
