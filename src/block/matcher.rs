// CLASSIFICATION: COMMUNITY
// Filename: matcher.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Dual-UUID partition matching.
//!
//! Devices are probed one at a time, in enumeration order. A device is a hit
//! only when its table's disk GUID *and* one of its partition GUIDs both
//! equal the configured target; the first hit ends the search. A probe that
//! cannot open or parse a device skips it and moves on.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::gpt::{GptError, PartitionTableReader};
use super::{BlockDeviceRef, DeviceAccess};
use crate::config::TargetIdentity;
use crate::diag::DiagSink;

/// The partition selected for boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Whole-disk device name, e.g. `nvme0n1`.
    pub device: String,
    /// 1-based slot of the partition in the table.
    pub index: usize,
    /// `<device>p<index>`.
    pub node: String,
    /// Device node to mount.
    pub path: PathBuf,
}

impl MatchResult {
    /// `<dev_dir>/<node>`
    pub fn device_path(&self) -> &Path {
        &self.path
    }
}

/// Why a single device was skipped.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("opening dev: {0}")]
    Open(#[source] io::Error),
    #[error("reading gpt: {0}")]
    Table(#[source] GptError),
}

pub struct Matcher<'a> {
    devices: &'a dyn DeviceAccess,
    tables: &'a dyn PartitionTableReader,
    sink: &'a dyn DiagSink,
}

impl<'a> Matcher<'a> {
    pub fn new(
        devices: &'a dyn DeviceAccess,
        tables: &'a dyn PartitionTableReader,
        sink: &'a dyn DiagSink,
    ) -> Self {
        Self {
            devices,
            tables,
            sink,
        }
    }

    /// Find the partition matching `target`, or `None`.
    pub fn find(&self, devs: &[BlockDeviceRef], target: &TargetIdentity) -> Option<MatchResult> {
        for dev in devs {
            match self.probe(dev, target) {
                Ok(Some(found)) => return Some(found),
                Ok(None) => continue,
                Err(e) => {
                    self.sink.warn(&format!("skipping {}: {e}", dev.name));
                    continue;
                }
            }
        }
        self.sink.error(&format!(
            "no device matching pt {} / part {}",
            target.disk_id, target.partition_id
        ));
        None
    }

    fn probe(
        &self,
        dev: &BlockDeviceRef,
        target: &TargetIdentity,
    ) -> Result<Option<MatchResult>, ProbeError> {
        let table = {
            let mut handle = self.devices.open(&dev.name).map_err(ProbeError::Open)?;
            self.tables
                .read_table(handle.as_mut())
                .map_err(ProbeError::Table)?
        };

        if table.disk_id != target.disk_id {
            self.sink.debug(&format!(
                "{}: disk {} is not the target",
                dev.name, table.disk_id
            ));
            return Ok(None);
        }

        let hit = table
            .partitions
            .iter()
            .enumerate()
            .find(|(_, p)| p.is_used() && p.partition_id == target.partition_id);
        let Some((slot, part)) = hit else {
            self.sink.warn(&format!(
                "{}: disk matches but no partition {}",
                dev.name, target.partition_id
            ));
            return Ok(None);
        };

        let index = slot + 1;
        let node = format!("{}p{}", dev.name, index);
        let size = part.lba_span();
        match self.devices.reported_sectors(&node) {
            Ok(reported) if reported == size => {
                self.sink.debug(&format!("{node}: size {size} agrees with the OS"));
            }
            Ok(reported) => self.sink.warn(&format!(
                "sizes do not match for p{index}: gpt says {size}, /sys says {reported}"
            )),
            Err(e) => self
                .sink
                .warn(&format!("error {e} reading size of {node}")),
        }

        Ok(Some(MatchResult {
            device: dev.name.clone(),
            index,
            path: self.devices.node_path(&node),
            node,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::gpt::{Guid, PartitionEntry, PartitionTable};
    use crate::block::BlockDevice;
    use crate::diag::MemorySink;
    use log::Level;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::{Cursor, Read};

    const DISK: &str = "e6bb521c-a495-4d06-ab6a-d94b1c07bdc9";
    const PART: &str = "ec02ad2a-caeb-44de-9fc7-1b4b5358faf2";
    const OTHER: &str = "00000000-1111-2222-3333-444444444444";

    fn guid(s: &str) -> Guid {
        s.parse().unwrap()
    }

    fn target() -> TargetIdentity {
        TargetIdentity {
            disk_id: guid(DISK),
            partition_id: guid(PART),
            partition_label: "nvme".into(),
        }
    }

    fn entry(id: &str, first: u64, last: u64) -> PartitionEntry {
        PartitionEntry {
            type_id: guid("0fc63daf-8483-4772-8e79-3d69d8477de4"),
            partition_id: guid(id),
            first_lba: first,
            last_lba: last,
            attributes: 0,
            name: String::new(),
        }
    }

    /// Each fake device's content is its name; the table reader maps names
    /// to canned tables.
    struct Fake {
        tables: HashMap<String, Result<PartitionTable, ()>>,
        sizes: HashMap<String, u64>,
        opened: RefCell<Vec<String>>,
    }

    impl Fake {
        fn new() -> Self {
            Self {
                tables: HashMap::new(),
                sizes: HashMap::new(),
                opened: RefCell::new(Vec::new()),
            }
        }

        fn disk(mut self, name: &str, disk: &str, parts: Vec<PartitionEntry>) -> Self {
            let table = PartitionTable {
                disk_id: guid(disk),
                block_size: 512,
                partitions: parts,
            };
            self.tables.insert(name.into(), Ok(table));
            self
        }
    }

    impl DeviceAccess for Fake {
        fn open(&self, name: &str) -> io::Result<Box<dyn BlockDevice>> {
            self.opened.borrow_mut().push(name.to_string());
            if !self.tables.contains_key(name) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
            }
            Ok(Box::new(Cursor::new(name.as_bytes().to_vec())))
        }

        fn reported_sectors(&self, node: &str) -> io::Result<u64> {
            self.sizes
                .get(node)
                .copied()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no size"))
        }

        fn node_path(&self, node: &str) -> PathBuf {
            PathBuf::from("/dev").join(node)
        }
    }

    impl PartitionTableReader for Fake {
        fn read_table(&self, dev: &mut dyn BlockDevice) -> Result<PartitionTable, GptError> {
            let mut name = String::new();
            dev.read_to_string(&mut name)?;
            match self.tables.get(&name) {
                Some(Ok(t)) => Ok(t.clone()),
                _ => Err(GptError::MissingSignature),
            }
        }
    }

    fn refs(names: &[&str]) -> Vec<BlockDeviceRef> {
        names
            .iter()
            .map(|n| BlockDeviceRef {
                name: n.to_string(),
                is_virtual: false,
            })
            .collect()
    }

    #[test]
    fn third_device_wins() {
        let mut fake = Fake::new()
            .disk("sda", OTHER, vec![entry(PART, 34, 100)])
            .disk("sdb", OTHER, vec![entry(OTHER, 34, 100)])
            .disk("sdc", DISK, vec![entry(OTHER, 34, 99), entry(PART, 100, 300)]);
        fake.sizes.insert("sdcp2".into(), 200);
        let sink = MemorySink::new();
        let found = Matcher::new(&fake, &fake, &sink)
            .find(&refs(&["sda", "sdb", "sdc"]), &target())
            .unwrap();
        assert_eq!(found.node, "sdcp2");
        assert_eq!(found.index, 2);
        assert_eq!(found.device_path(), Path::new("/dev/sdcp2"));
        assert!(!sink.contains(Level::Warn, "sizes do not match"));
    }

    #[test]
    fn disk_only_match_is_not_selected() {
        let fake = Fake::new()
            .disk("sda", DISK, vec![entry(OTHER, 34, 100)])
            .disk("sdb", DISK, vec![entry(PART, 34, 100)])
            .disk("sdc", DISK, vec![entry(PART, 34, 100)]);
        let sink = MemorySink::new();
        let found = Matcher::new(&fake, &fake, &sink)
            .find(&refs(&["sda", "sdb", "sdc"]), &target())
            .unwrap();
        assert_eq!(found.node, "sdbp1");
        assert_eq!(*fake.opened.borrow(), vec!["sda", "sdb"]);
    }

    #[test]
    fn partition_only_match_is_not_selected() {
        let fake = Fake::new().disk("sda", OTHER, vec![entry(PART, 34, 100)]);
        let sink = MemorySink::new();
        assert!(Matcher::new(&fake, &fake, &sink)
            .find(&refs(&["sda"]), &target())
            .is_none());
        assert!(sink.contains(Level::Error, "no device matching"));
    }

    #[test]
    fn unopenable_and_unparsable_devices_are_skipped() {
        let mut fake = Fake::new().disk("sdc", DISK, vec![entry(PART, 34, 100)]);
        fake.tables.insert("sdb".into(), Err(()));
        let sink = MemorySink::new();
        let found = Matcher::new(&fake, &fake, &sink)
            .find(&refs(&["sda", "sdb", "sdc"]), &target())
            .unwrap();
        assert_eq!(found.node, "sdcp1");
        assert!(sink.contains(Level::Warn, "skipping sda: opening dev"));
        assert!(sink.contains(Level::Warn, "skipping sdb: reading gpt"));
    }

    #[test]
    fn size_mismatch_only_warns() {
        let mut fake = Fake::new().disk("nvme0n1", DISK, vec![entry(PART, 2048, 4096)]);
        fake.sizes.insert("nvme0n1p1".into(), 2049);
        let sink = MemorySink::new();
        let found = Matcher::new(&fake, &fake, &sink)
            .find(&refs(&["nvme0n1"]), &target())
            .unwrap();
        assert_eq!(found.node, "nvme0n1p1");
        assert!(sink.contains(
            Level::Warn,
            "sizes do not match for p1: gpt says 2048, /sys says 2049"
        ));
    }

    #[test]
    fn unreadable_size_only_warns() {
        let fake = Fake::new().disk("nvme0n1", DISK, vec![entry(PART, 2048, 4096)]);
        let sink = MemorySink::new();
        let found = Matcher::new(&fake, &fake, &sink).find(&refs(&["nvme0n1"]), &target());
        assert!(found.is_some());
        assert!(sink.contains(Level::Warn, "reading size of nvme0n1p1"));
    }

    #[test]
    fn unused_slots_never_match_a_zero_target() {
        let mut zero = target();
        zero.partition_id = Guid::ZERO;
        let mut empty = entry(OTHER, 0, 0);
        empty.type_id = Guid::ZERO;
        empty.partition_id = Guid::ZERO;
        let fake = Fake::new().disk("sda", DISK, vec![empty]);
        let sink = MemorySink::new();
        assert!(Matcher::new(&fake, &fake, &sink)
            .find(&refs(&["sda"]), &zero)
            .is_none());
    }
}
