// CLASSIFICATION: COMMUNITY
// Filename: enumerate.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Candidate block-device discovery from the sysfs block directory.
//!
//! Every entry of `/sys/block` is a symlink into the device tree. Entries
//! whose link target lies below `/virtual/` (loop, ram, dm, zram, ...) are
//! not backed by hardware and are dropped. Nothing here is fatal: the right
//! disk is unknown in advance, so unreadable entries are logged and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use super::BlockDeviceRef;
use crate::diag::DiagSink;

const VIRTUAL_SEGMENT: &str = "/virtual/";

pub struct Enumerator<'a> {
    sys_block: PathBuf,
    sink: &'a dyn DiagSink,
}

impl<'a> Enumerator<'a> {
    pub fn new(sys_block: impl AsRef<Path>, sink: &'a dyn DiagSink) -> Self {
        Self {
            sys_block: sys_block.as_ref().to_path_buf(),
            sink,
        }
    }

    /// Every resolvable entry, virtual ones included, sorted by name.
    pub fn scan(&self) -> Vec<BlockDeviceRef> {
        let entries = match fs::read_dir(&self.sys_block) {
            Ok(entries) => entries,
            Err(e) => {
                self.sink.error(&format!(
                    "error {e} reading block devs in {}",
                    self.sys_block.display()
                ));
                return Vec::new();
            }
        };

        let mut devs = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.sink.warn(&format!("error {e} listing block devs"));
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let link = match fs::read_link(entry.path()) {
                Ok(link) => link,
                Err(e) => {
                    self.sink
                        .warn(&format!("error {e} reading block link {name}"));
                    continue;
                }
            };
            let is_virtual = link.to_string_lossy().contains(VIRTUAL_SEGMENT);
            devs.push(BlockDeviceRef { name, is_virtual });
        }
        devs.sort_by(|a, b| a.name.cmp(&b.name));
        devs
    }

    /// Physical block devices only.
    pub fn enumerate(&self) -> Vec<BlockDeviceRef> {
        self.scan()
            .into_iter()
            .filter(|dev| {
                if dev.is_virtual {
                    self.sink.debug(&format!("skipping virtual device {}", dev.name));
                }
                !dev.is_virtual
            })
            .collect()
    }
}
