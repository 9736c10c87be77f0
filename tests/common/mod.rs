// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use kexboot::block::{BlockDevice, DeviceAccess, Guid};
use kexboot::shell::Shell;
use kexboot::sys::{KernelLoader, MountFlags, Mounter};
use kexboot::{BootConfig, TargetIdentity};
use tempfile::{tempdir, TempDir};

pub const DISK: &str = "e6bb521c-a495-4d06-ab6a-d94b1c07bdc9";
pub const PART: &str = "ec02ad2a-caeb-44de-9fc7-1b4b5358faf2";
pub const OTHER_DISK: &str = "5a1d0c4e-7f3b-4d0e-9a51-2b8c6f4d9e10";
pub const OTHER_PART: &str = "9d3c1b7a-0e2f-4a68-b5c4-71f0e8d2a3b6";
const LINUX_FS: &str = "0fc63daf-8483-4772-8e79-3d69d8477de4";

pub type Events = Rc<RefCell<Vec<String>>>;

/// Primary GPT (512-byte blocks, 128 × 128-byte entries at LBA 2) padded
/// to 64 KiB. `parts` are (partition GUID, first LBA, last LBA).
pub fn gpt_image(disk: &str, parts: &[(&str, u64, u64)]) -> Vec<u8> {
    let mut img = vec![0u8; 64 * 1024];
    let mut array = vec![0u8; 128 * 128];
    for (i, (id, first, last)) in parts.iter().enumerate() {
        let e = &mut array[i * 128..(i + 1) * 128];
        e[0..16].copy_from_slice(LINUX_FS.parse::<Guid>().unwrap().as_disk_bytes());
        e[16..32].copy_from_slice(id.parse::<Guid>().unwrap().as_disk_bytes());
        e[32..40].copy_from_slice(&first.to_le_bytes());
        e[40..48].copy_from_slice(&last.to_le_bytes());
    }
    let mut hdr = vec![0u8; 92];
    hdr[0..8].copy_from_slice(b"EFI PART");
    hdr[8..12].copy_from_slice(&0x0001_0000u32.to_le_bytes());
    hdr[12..16].copy_from_slice(&92u32.to_le_bytes());
    hdr[24..32].copy_from_slice(&1u64.to_le_bytes());
    hdr[56..72].copy_from_slice(disk.parse::<Guid>().unwrap().as_disk_bytes());
    hdr[72..80].copy_from_slice(&2u64.to_le_bytes());
    hdr[80..84].copy_from_slice(&128u32.to_le_bytes());
    hdr[84..88].copy_from_slice(&128u32.to_le_bytes());
    hdr[88..92].copy_from_slice(&crc32fast::hash(&array).to_le_bytes());
    let crc = crc32fast::hash(&hdr);
    hdr[16..20].copy_from_slice(&crc.to_le_bytes());
    img[512..604].copy_from_slice(&hdr);
    img[1024..1024 + array.len()].copy_from_slice(&array);
    img
}

/// Point the header's entry array at `lba` and fix up the header CRC.
pub fn with_entries_lba(mut img: Vec<u8>, lba: u64) -> Vec<u8> {
    let hdr = &mut img[512..604];
    hdr[72..80].copy_from_slice(&lba.to_le_bytes());
    hdr[16..20].fill(0);
    let crc = crc32fast::hash(hdr);
    hdr[16..20].copy_from_slice(&crc.to_le_bytes());
    img
}

/// A fake machine: sysfs block tree, device nodes backed by image files,
/// and a directory standing in for the mounted root.
pub struct Rig {
    pub dir: TempDir,
    pub cfg: BootConfig,
    pub events: Events,
}

impl Rig {
    pub fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for sub in ["sys/block", "sys/class/block", "dev", "newroot"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        let cfg = BootConfig {
            target: TargetIdentity {
                disk_id: DISK.parse().unwrap(),
                partition_id: PART.parse().unwrap(),
                partition_label: "nvme".into(),
            },
            mount_point: root.join("newroot"),
            sys_block_dir: root.join("sys/block"),
            sys_class_block_dir: root.join("sys/class/block"),
            dev_dir: root.join("dev"),
            reboot_delay_ms: 0,
            ..BootConfig::default()
        };
        Self {
            dir,
            cfg,
            events: Events::default(),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Register a whole disk under sysfs and back its node with `image`.
    pub fn add_disk(&self, name: &str, image: &[u8], is_virtual: bool) {
        let parent = if is_virtual {
            "../devices/virtual/block"
        } else {
            "../devices/pci0000:00/0000:00:1d.0/block"
        };
        symlink(format!("{parent}/{name}"), self.cfg.sys_block_dir.join(name)).unwrap();
        fs::write(self.cfg.dev_dir.join(name), image).unwrap();
    }

    pub fn set_reported_size(&self, node: &str, sectors: u64) {
        let dir = self.cfg.sys_class_block_dir.join(node);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("size"), format!("{sectors}\n")).unwrap();
    }

    /// `boot/kernel -> vmlinuz-6.1.0` inside the stand-in root.
    pub fn install_kernel(&self) {
        let boot = self.cfg.mount_point.join("boot");
        fs::create_dir_all(&boot).unwrap();
        fs::write(boot.join("vmlinuz-6.1.0"), b"kernel image").unwrap();
        symlink("vmlinuz-6.1.0", boot.join("kernel")).unwrap();
    }

    pub fn devices(&self) -> FileDevices {
        FileDevices {
            dev_dir: self.cfg.dev_dir.clone(),
            class_dir: self.cfg.sys_class_block_dir.clone(),
            events: self.events.clone(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Device nodes opened with plain buffered reads.
pub struct FileDevices {
    dev_dir: PathBuf,
    class_dir: PathBuf,
    events: Events,
}

impl DeviceAccess for FileDevices {
    fn open(&self, name: &str) -> io::Result<Box<dyn BlockDevice>> {
        self.events.borrow_mut().push(format!("open {name}"));
        Ok(Box::new(File::open(self.dev_dir.join(name))?))
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

pub struct RecordingMounter {
    pub events: Events,
    pub fail: bool,
}

impl Mounter for RecordingMounter {
    fn mount(&self, source: &Path, target: &Path, fs_type: &str, _: &str, flags: MountFlags) -> io::Result<()> {
        self.events.borrow_mut().push(format!(
            "mount {} {} {fs_type} ro={}",
            source.display(),
            target.display(),
            flags.contains(MountFlags::RDONLY)
        ));
        if self.fail {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        Ok(())
    }

    fn unmount(&self, target: &Path, force: bool, lazy: bool) -> io::Result<()> {
        self.events
            .borrow_mut()
            .push(format!("umount {} force={force} lazy={lazy}", target.display()));
        Ok(())
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum LoaderMode {
    #[default]
    Ok,
    FailLoad,
    FailReboot,
    PanicOnLoad,
}

pub struct RecordingLoader {
    pub events: Events,
    pub mode: LoaderMode,
}

impl KernelLoader for RecordingLoader {
    fn load(&self, _: &File, initramfs: Option<&File>, cmdline: &str) -> io::Result<()> {
        self.events.borrow_mut().push(format!(
            "load initrd={} cmdline={cmdline}",
            initramfs.is_some()
        ));
        match self.mode {
            LoaderMode::FailLoad => Err(io::Error::from_raw_os_error(libc::ENOEXEC)),
            LoaderMode::PanicOnLoad => panic!("loader exploded"),
            _ => Ok(()),
        }
    }

    fn reboot(&self) -> io::Result<()> {
        self.events.borrow_mut().push("reboot".into());
        if self.mode == LoaderMode::FailReboot {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        Ok(())
    }
}

pub struct RecordingShell {
    pub events: Events,
    pub code: i32,
}

impl Shell for RecordingShell {
    fn enter(&self, argv: &[String]) -> i32 {
        self.events
            .borrow_mut()
            .push(format!("shell {}", argv.join(" ")));
        self.code
    }
}
