// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::block::Guid;

/// Boot-chain stage, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Match,
    Mount,
    Kexec,
    Reboot,
    /// A panic escaped one of the stages.
    Internal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Match => "match",
            Stage::Mount => "mount",
            Stage::Kexec => "kexec",
            Stage::Reboot => "reboot",
            Stage::Internal => "internal",
        })
    }
}

/// A failure that aborts the boot attempt and sends us to the shell.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("no device matching pt {disk} / part {partition}")]
    NoMatch { disk: Guid, partition: Guid },
    #[error("mount {} on {}: {source}", .device.display(), .target.display())]
    Mount {
        device: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("resolving kernel link {}: {source}", .path.display())]
    ResolveKernel {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("opening kernel {}: {source}", .path.display())]
    OpenKernel {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("opening initramfs {}: {source}", .path.display())]
    OpenInitramfs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("kexec load of {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reboot into new kernel: {0}")]
    Reboot(#[source] io::Error),
    #[error("panic during boot: {0}")]
    Panicked(String),
}

impl BootError {
    pub fn stage(&self) -> Stage {
        match self {
            BootError::NoMatch { .. } => Stage::Match,
            BootError::Mount { .. } => Stage::Mount,
            BootError::ResolveKernel { .. }
            | BootError::OpenKernel { .. }
            | BootError::OpenInitramfs { .. }
            | BootError::Load { .. } => Stage::Kexec,
            BootError::Reboot(_) => Stage::Reboot,
            BootError::Panicked(_) => Stage::Internal,
        }
    }
}
