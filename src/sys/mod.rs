// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Thin wrappers over the Linux syscalls the boot chain depends on.

pub mod kexec;
pub mod mount;

pub use kexec::{Kexec, KernelLoader};
pub use mount::{MountFlags, Mounter, SysMounter};

#[cfg(target_os = "linux")]
fn c_path(path: &std::path::Path) -> std::io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    c_string(path.as_os_str().as_bytes())
}

#[cfg(target_os = "linux")]
fn c_string(bytes: &[u8]) -> std::io::Result<std::ffi::CString> {
    std::ffi::CString::new(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}
