// CLASSIFICATION: COMMUNITY
// Filename: kexec.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::fs::File;
use std::io;

/// Kernel-load and reboot collaborator.
pub trait KernelLoader {
    /// Stage `kernel` (and `initramfs`) for the next reboot.
    fn load(&self, kernel: &File, initramfs: Option<&File>, cmdline: &str) -> io::Result<()>;

    /// Jump into the staged kernel. On real hardware this does not return on
    /// success; any return means the reboot did not happen.
    fn reboot(&self) -> io::Result<()>;
}

/// `kexec_file_load(2)` followed by `reboot(LINUX_REBOOT_CMD_KEXEC)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Kexec;

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
impl KernelLoader for Kexec {
    fn load(&self, kernel: &File, initramfs: Option<&File>, cmdline: &str) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        const KEXEC_FILE_NO_INITRAMFS: libc::c_ulong = 0x4;

        let cmd = super::c_string(cmdline.as_bytes())?;
        let (initrd_fd, flags) = match initramfs {
            Some(f) => (f.as_raw_fd(), 0),
            None => (-1, KEXEC_FILE_NO_INITRAMFS),
        };
        // SAFETY: fds are open for the duration of the call and the command
        // line length includes its NUL terminator.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_kexec_file_load,
                kernel.as_raw_fd(),
                initrd_fd,
                cmd.as_bytes_with_nul().len() as libc::c_ulong,
                cmd.as_ptr(),
                flags,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn reboot(&self) -> io::Result<()> {
        // SAFETY: plain syscalls without pointer arguments.
        let rc = unsafe {
            libc::sync();
            libc::reboot(libc::LINUX_REBOOT_CMD_KEXEC)
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
impl KernelLoader for Kexec {
    fn load(&self, _: &File, _: Option<&File>, _: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "kexec_file_load is not available on this target",
        ))
    }

    fn reboot(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "kexec reboot is not available on this target",
        ))
    }
}
