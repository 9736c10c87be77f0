// CLASSIFICATION: COMMUNITY
// Filename: mount.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Mounts the matched partition at the fixed new-root directory.

use std::fs;
use std::path::Path;

use crate::config::BootConfig;
use crate::diag::DiagSink;
use crate::error::BootError;
use crate::sys::{MountFlags, Mounter};

pub struct MountStage<'a> {
    mounter: &'a dyn Mounter,
    sink: &'a dyn DiagSink,
    mount_point: &'a Path,
    fs_type: &'a str,
    data: &'a str,
    read_only: bool,
}

impl<'a> MountStage<'a> {
    pub fn new(
        mounter: &'a dyn Mounter,
        sink: &'a dyn DiagSink,
        mount_point: &'a Path,
        fs_type: &'a str,
    ) -> Self {
        Self {
            mounter,
            sink,
            mount_point,
            fs_type,
            data: "",
            read_only: true,
        }
    }

    pub fn from_config(mounter: &'a dyn Mounter, sink: &'a dyn DiagSink, cfg: &'a BootConfig) -> Self {
        Self::new(mounter, sink, &cfg.mount_point, &cfg.fs_type).with_data(&cfg.mount_data)
    }

    pub fn with_data(mut self, data: &'a str) -> Self {
        self.data = data;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn mount_point(&self) -> &'a Path {
        self.mount_point
    }

    /// Mount `device` at the mount point. No retries, no alternate types.
    pub fn mount(&self, device: &Path) -> Result<(), BootError> {
        // A leftover directory from an earlier attempt is fine.
        if let Err(e) = fs::create_dir_all(self.mount_point) {
            self.sink.warn(&format!(
                "mkdir {} err {e}",
                self.mount_point.display()
            ));
        }

        let flags = if self.read_only {
            MountFlags::RDONLY
        } else {
            MountFlags::empty()
        };
        self.mounter
            .mount(device, self.mount_point, self.fs_type, self.data, flags)
            .map_err(|source| {
                let err = BootError::Mount {
                    device: device.to_path_buf(),
                    target: self.mount_point.to_path_buf(),
                    source,
                };
                self.sink.error(&err.to_string());
                err
            })?;
        self.sink.info(&format!(
            "mounted {} on {} ({}{})",
            device.display(),
            self.mount_point.display(),
            self.fs_type,
            if self.read_only { ", ro" } else { "" }
        ));
        Ok(())
    }

    /// Release action for the mounted root: a lazy, non-forced unmount.
    pub fn unmount_finalizer(&self) -> impl FnOnce() + 'a {
        let mounter = self.mounter;
        let sink = self.sink;
        let target = self.mount_point;
        move || match mounter.unmount(target, false, true) {
            Ok(()) => sink.info(&format!("unmounted {}", target.display())),
            Err(e) => sink.error(&format!("umount {} err {e}", target.display())),
        }
    }
}

/// One-shot form of [`MountStage::mount`] with default mount data.
pub fn mount_root(
    mounter: &dyn Mounter,
    sink: &dyn DiagSink,
    device: &Path,
    mount_point: &Path,
    fs_type: &str,
    read_only: bool,
) -> Result<(), BootError> {
    MountStage::new(mounter, sink, mount_point, fs_type)
        .read_only(read_only)
        .mount(device)
}
