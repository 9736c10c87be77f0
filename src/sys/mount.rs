// CLASSIFICATION: COMMUNITY
// Filename: mount.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::io;
use std::path::Path;

use bitflags::bitflags;

bitflags! {
    /// Generic mount flags; mapped onto `MS_*` by [`SysMounter`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MountFlags: u32 {
        const RDONLY = 1 << 0;
        const NOSUID = 1 << 1;
        const NODEV  = 1 << 2;
        const NOEXEC = 1 << 3;
    }
}

/// Mount/unmount collaborator.
pub trait Mounter {
    fn mount(
        &self,
        source: &Path,
        target: &Path,
        fs_type: &str,
        data: &str,
        flags: MountFlags,
    ) -> io::Result<()>;

    /// `force` maps to `MNT_FORCE`, `lazy` to `MNT_DETACH`.
    fn unmount(&self, target: &Path, force: bool, lazy: bool) -> io::Result<()>;
}

/// `mount(2)` / `umount2(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysMounter;

#[cfg(target_os = "linux")]
impl Mounter for SysMounter {
    fn mount(
        &self,
        source: &Path,
        target: &Path,
        fs_type: &str,
        data: &str,
        flags: MountFlags,
    ) -> io::Result<()> {
        let src = super::c_path(source)?;
        let tgt = super::c_path(target)?;
        let fs = super::c_string(fs_type.as_bytes())?;
        let data = super::c_string(data.as_bytes())?;
        let data_ptr = if data.as_bytes().is_empty() {
            std::ptr::null()
        } else {
            data.as_ptr() as *const libc::c_void
        };
        // SAFETY: every pointer is a live NUL-terminated string or null.
        let rc = unsafe {
            libc::mount(
                src.as_ptr(),
                tgt.as_ptr(),
                fs.as_ptr(),
                ms_flags(flags),
                data_ptr,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn unmount(&self, target: &Path, force: bool, lazy: bool) -> io::Result<()> {
        let tgt = super::c_path(target)?;
        let mut flags = 0;
        if force {
            flags |= libc::MNT_FORCE;
        }
        if lazy {
            flags |= libc::MNT_DETACH;
        }
        // SAFETY: `tgt` is a live NUL-terminated string.
        if unsafe { libc::umount2(tgt.as_ptr(), flags) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
impl Mounter for SysMounter {
    fn mount(&self, _: &Path, _: &Path, _: &str, _: &str, _: MountFlags) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "mount requires Linux"))
    }

    fn unmount(&self, _: &Path, _: bool, _: bool) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "umount requires Linux"))
    }
}

#[cfg(target_os = "linux")]
fn ms_flags(flags: MountFlags) -> libc::c_ulong {
    let mut out = 0;
    for (flag, ms) in [
        (MountFlags::RDONLY, libc::MS_RDONLY),
        (MountFlags::NOSUID, libc::MS_NOSUID),
        (MountFlags::NODEV, libc::MS_NODEV),
        (MountFlags::NOEXEC, libc::MS_NOEXEC),
    ] {
        if flags.contains(flag) {
            out |= ms;
        }
    }
    out
}
