// CLASSIFICATION: COMMUNITY
// Filename: kexec.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Kernel resolution, kexec load, finalization and reboot.
//!
//! Order is fixed: resolve → open → load → finalizers → reboot. A failure
//! before the load completes leaves the finalizers unrun so the root stays
//! mounted for the recovery shell.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::BootConfig;
use crate::diag::DiagSink;
use crate::error::BootError;
use crate::finalizer::Finalizers;
use crate::kver;
use crate::sys::KernelLoader;

const MAX_LINK_HOPS: usize = 40;

pub struct KexecStage<'a> {
    loader: &'a dyn KernelLoader,
    sink: &'a dyn DiagSink,
    kernel_link: &'a Path,
    initramfs_link: Option<&'a Path>,
    cmdline: &'a str,
    reboot_delay: Duration,
}

impl<'a> KexecStage<'a> {
    pub fn new(loader: &'a dyn KernelLoader, sink: &'a dyn DiagSink, kernel_link: &'a Path) -> Self {
        Self {
            loader,
            sink,
            kernel_link,
            initramfs_link: None,
            cmdline: "",
            reboot_delay: Duration::ZERO,
        }
    }

    pub fn from_config(loader: &'a dyn KernelLoader, sink: &'a dyn DiagSink, cfg: &'a BootConfig) -> Self {
        Self {
            loader,
            sink,
            kernel_link: &cfg.kernel_link,
            initramfs_link: cfg.initramfs_link.as_deref(),
            cmdline: &cfg.cmdline,
            reboot_delay: Duration::from_millis(cfg.reboot_delay_ms),
        }
    }

    pub fn with_initramfs(mut self, link: &'a Path) -> Self {
        self.initramfs_link = Some(link);
        self
    }

    pub fn with_cmdline(mut self, cmdline: &'a str) -> Self {
        self.cmdline = cmdline;
        self
    }

    pub fn with_reboot_delay(mut self, delay: Duration) -> Self {
        self.reboot_delay = delay;
        self
    }

    /// Load the kernel found under `root`, run `finalizers`, reboot.
    ///
    /// Returns `Ok(())` only if the reboot call itself returned success.
    pub fn boot(&self, root: &Path, finalizers: Finalizers<'_>) -> Result<(), BootError> {
        let kernel_path = self.resolve(root, self.kernel_link).map_err(|source| {
            self.fail(BootError::ResolveKernel {
                path: root.join(relative(self.kernel_link)),
                source,
            })
        })?;
        let kernel = open_regular(&kernel_path).map_err(|source| {
            self.fail(BootError::OpenKernel {
                path: kernel_path.clone(),
                source,
            })
        })?;

        // Read from the handle that is about to be loaded; `probe` rewinds it.
        match kver::probe(&mut &kernel) {
            Ok(info) => self.sink.info(&format!(
                "kernel {} is {} {}",
                kernel_path.display(),
                info.release,
                info.version
            )),
            Err(e) => self
                .sink
                .debug(&format!("no version for {}: {e}", kernel_path.display())),
        }

        let initramfs = match self.initramfs_link {
            Some(link) => {
                let path = root.join(relative(link));
                let file = self
                    .resolve(root, link)
                    .and_then(|p| open_regular(&p))
                    .map_err(|source| self.fail(BootError::OpenInitramfs { path, source }))?;
                Some(file)
            }
            None => None,
        };

        let loaded = self.loader.load(&kernel, initramfs.as_ref(), self.cmdline);
        drop(kernel);
        drop(initramfs);
        loaded.map_err(|source| {
            self.fail(BootError::Load {
                path: kernel_path.clone(),
                source,
            })
        })?;
        self.sink
            .info(&format!("loaded {}", kernel_path.display()));

        finalizers.run(self.sink);

        self.sink.info(&format!(
            "reboot to new kernel in {}ms...",
            self.reboot_delay.as_millis()
        ));
        if !self.reboot_delay.is_zero() {
            thread::sleep(self.reboot_delay);
        }
        self.loader
            .reboot()
            .map_err(|source| self.fail(BootError::Reboot(source)))
    }

    fn resolve(&self, root: &Path, link: &Path) -> io::Result<PathBuf> {
        let resolved = resolve_in_root(root, link)?;
        self.sink.debug(&format!(
            "{} -> {}",
            root.join(relative(link)).display(),
            resolved.display()
        ));
        Ok(resolved)
    }

    fn fail(&self, err: BootError) -> BootError {
        self.sink.error(&err.to_string());
        err
    }
}

fn open_regular(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    Ok(file)
}

fn relative(path: &Path) -> &Path {
    path.strip_prefix("/").unwrap_or(path)
}

enum Step {
    Parent,
    Name(OsString),
}

fn steps(path: &Path) -> Vec<Step> {
    path.components()
        .filter_map(|c| match c {
            Component::ParentDir => Some(Step::Parent),
            Component::Normal(name) => Some(Step::Name(name.to_os_string())),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Follow `link` and every intermediate symlink as if `root` were `/`.
///
/// Absolute link targets restart at `root` and `..` never climbs above it,
/// so a link like `boot/kernel -> /boot/vmlinuz-6.1` resolves inside the
/// mounted root rather than the running system.
pub fn resolve_in_root(root: &Path, link: &Path) -> io::Result<PathBuf> {
    let mut pending: Vec<Step> = steps(link);
    pending.reverse();
    let mut resolved = PathBuf::new();
    let mut hops = 0;

    while let Some(step) = pending.pop() {
        let name = match step {
            Step::Parent => {
                resolved.pop();
                continue;
            }
            Step::Name(name) => name,
        };
        let candidate = resolved.join(&name);
        let full = root.join(&candidate);
        let meta = fs::symlink_metadata(&full)?;
        if !meta.file_type().is_symlink() {
            resolved = candidate;
            continue;
        }
        hops += 1;
        if hops > MAX_LINK_HOPS {
            return Err(io::Error::from_raw_os_error(libc::ELOOP));
        }
        let target = fs::read_link(&full)?;
        if target.is_absolute() {
            resolved = PathBuf::new();
        }
        pending.extend(steps(&target).into_iter().rev());
    }
    Ok(root.join(resolved))
}
