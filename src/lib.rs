// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Early-boot chain loader.
//!
//! Finds the root filesystem by GPT disk and partition GUID, mounts it,
//! loads the kernel it links to with `kexec_file_load`, and reboots into it.
//! Every failure lands in an interactive recovery shell.

/// Block-device discovery, GPT parsing and partition matching.
pub mod block;
pub mod cli;
/// Build-time identity and YAML overrides.
pub mod config;
pub mod controller;
pub mod diag;
pub mod error;
pub mod finalizer;
/// bzImage version probe.
pub mod kver;
pub mod shell;
/// Mount and kexec stages.
pub mod stage;
/// Syscall wrappers.
pub mod sys;

pub use config::{BootConfig, TargetIdentity};
pub use controller::{BootOutcome, FallbackController, Platform};
pub use diag::{DiagSink, LogSink, MemorySink};
pub use error::{BootError, Stage};
