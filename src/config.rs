// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Boot configuration.
//!
//! The target identity is baked in at build time (see `build.rs`); every
//! field may be overridden by a YAML file. A missing or broken file never
//! stops the boot: the compiled defaults are used instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::block::Guid;
use crate::diag::DiagSink;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/kexboot.yaml";
pub const CONFIG_ENV: &str = "KEXBOOT_CONFIG";

/// Which disk and partition to boot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TargetIdentity {
    /// Partition-table (disk) GUID, `PTUUID` in blkid terms.
    pub disk_id: Guid,
    /// Partition GUID, `PARTUUID` in blkid terms.
    pub partition_id: Guid,
    /// Informational only.
    pub partition_label: String,
}

impl TargetIdentity {
    /// The identity compiled into this binary.
    pub fn compiled() -> Self {
        Self {
            disk_id: env!("KEXBOOT_DISK_UUID").parse().unwrap_or_default(),
            partition_id: env!("KEXBOOT_PART_UUID").parse().unwrap_or_default(),
            partition_label: env!("KEXBOOT_PART_LABEL").to_string(),
        }
    }
}

impl Default for TargetIdentity {
    fn default() -> Self {
        Self::compiled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    pub target: TargetIdentity,
    pub mount_point: PathBuf,
    pub fs_type: String,
    /// Filesystem-specific mount data, passed through verbatim.
    pub mount_data: String,
    /// Kernel symlink, relative to the mounted root.
    pub kernel_link: PathBuf,
    /// Optional initramfs symlink, relative to the mounted root.
    pub initramfs_link: Option<PathBuf>,
    pub cmdline: String,
    pub reboot_delay_ms: u64,
    /// argv of the recovery shell.
    pub shell: Vec<String>,
    pub sys_block_dir: PathBuf,
    pub sys_class_block_dir: PathBuf,
    pub dev_dir: PathBuf,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            target: TargetIdentity::compiled(),
            mount_point: PathBuf::from("/newroot"),
            fs_type: "ext4".into(),
            mount_data: String::new(),
            kernel_link: PathBuf::from("boot/kernel"),
            initramfs_link: None,
            cmdline: String::new(),
            reboot_delay_ms: 2000,
            shell: vec!["/bin/sh".into()],
            sys_block_dir: PathBuf::from("/sys/block"),
            sys_class_block_dir: PathBuf::from("/sys/class/block"),
            dev_dir: PathBuf::from("/dev"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Parse one config file.
pub fn load_file(path: &Path) -> Result<BootConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `explicit`, else `$KEXBOOT_CONFIG`, else [`DEFAULT_CONFIG_PATH`].
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

/// Load the active configuration, falling back to compiled defaults.
pub fn load_active(explicit: Option<&Path>, sink: &dyn DiagSink) -> BootConfig {
    let path = config_path(explicit);
    let mut cfg = match load_file(&path) {
        Ok(cfg) => {
            sink.debug(&format!("loaded config from {}", path.display()));
            cfg
        }
        Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            sink.debug(&format!("no config at {}, using built-in defaults", path.display()));
            BootConfig::default()
        }
        Err(e) => {
            sink.error(&format!("{e}; using built-in defaults"));
            BootConfig::default()
        }
    };
    if cfg.shell.is_empty() {
        sink.warn("empty shell argv in config, using /bin/sh");
        cfg.shell = BootConfig::default().shell;
    }
    cfg
}
