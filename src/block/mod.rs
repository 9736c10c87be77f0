// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Block-device discovery and partition matching.

pub mod enumerate;
pub mod gpt;
pub mod matcher;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

pub use enumerate::Enumerator;
pub use gpt::{Guid, GptReader, PartitionTable, PartitionTableReader};
pub use matcher::{MatchResult, Matcher};

use crate::config::BootConfig;

/// A candidate block device found under the sysfs block directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDeviceRef {
    /// Device-node basename, e.g. `nvme0n1`.
    pub name: String,
    /// Set when the sysfs link points below `/virtual/`.
    pub is_virtual: bool,
}

/// Random-access view of a raw block device.
pub trait BlockDevice: Read + Seek {}

impl<T: Read + Seek> BlockDevice for T {}

/// Access to device nodes and OS-reported partition sizes.
pub trait DeviceAccess {
    /// Open a whole-disk node for direct, read-only access.
    fn open(&self, name: &str) -> io::Result<Box<dyn BlockDevice>>;
    /// Size of a partition node in 512-byte sectors as the kernel reports it.
    fn reported_sectors(&self, node: &str) -> io::Result<u64>;
    /// Path of the device node for `node`.
    fn node_path(&self, node: &str) -> PathBuf;
}

/// [`DeviceAccess`] backed by `/dev` and `/sys/class/block`.
#[derive(Debug, Clone)]
pub struct SysfsDevices {
    dev_dir: PathBuf,
    class_dir: PathBuf,
}

impl SysfsDevices {
    pub fn new(dev_dir: impl Into<PathBuf>, class_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            class_dir: class_dir.into(),
        }
    }

    pub fn from_config(cfg: &BootConfig) -> Self {
        Self::new(&cfg.dev_dir, &cfg.sys_class_block_dir)
    }
}

impl DeviceAccess for SysfsDevices {
    fn open(&self, name: &str) -> io::Result<Box<dyn BlockDevice>> {
        let file = open_direct(&self.dev_dir.join(name))?;
        Ok(Box::new(file))
    }

    fn reported_sectors(&self, node: &str) -> io::Result<u64> {
        let raw = fs::read_to_string(self.class_dir.join(node).join("size"))?;
        raw.trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn node_path(&self, node: &str) -> PathBuf {
        self.dev_dir.join(node)
    }
}

#[cfg(all(target_os = "linux", not(feature = "buffered_probe")))]
fn open_direct(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECT)
        .open(path)
}

#[cfg(any(not(target_os = "linux"), feature = "buffered_probe"))]
fn open_direct(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}
