// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Boot-chain stages that follow device matching.

pub mod kexec;
pub mod mount;

pub use kexec::{resolve_in_root, KexecStage};
pub use mount::{mount_root, MountStage};
