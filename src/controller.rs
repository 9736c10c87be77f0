// CLASSIFICATION: COMMUNITY
// Filename: controller.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Runs the boot chain once and falls back to the recovery shell.
//!
//! Stage order: enumerate → match → mount → kexec (load, finalize, reboot).
//! Any failure, or a panic inside a stage, ends the attempt. The mounted
//! root is left in place for inspection.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::block::{DeviceAccess, Enumerator, Matcher, PartitionTableReader};
use crate::config::BootConfig;
use crate::diag::DiagSink;
use crate::error::{BootError, Stage};
use crate::finalizer::Finalizers;
use crate::shell::Shell;
use crate::stage::{KexecStage, MountStage};
use crate::sys::{KernelLoader, Mounter};

/// The outside world the controller drives.
#[derive(Clone, Copy)]
pub struct Platform<'a> {
    pub devices: &'a dyn DeviceAccess,
    pub tables: &'a dyn PartitionTableReader,
    pub mounter: &'a dyn Mounter,
    pub loader: &'a dyn KernelLoader,
    pub shell: &'a dyn Shell,
}

#[derive(Debug)]
pub enum BootOutcome {
    /// The reboot call returned without error. On hardware this is never
    /// observed because the process is gone.
    Rebooted,
    FailedAt(Stage, BootError),
}

impl BootOutcome {
    pub fn is_rebooted(&self) -> bool {
        matches!(self, BootOutcome::Rebooted)
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            BootOutcome::Rebooted => None,
            BootOutcome::FailedAt(stage, _) => Some(*stage),
        }
    }
}

pub struct FallbackController<'a> {
    config: &'a BootConfig,
    platform: Platform<'a>,
    sink: &'a dyn DiagSink,
}

impl<'a> FallbackController<'a> {
    pub fn new(config: &'a BootConfig, platform: Platform<'a>, sink: &'a dyn DiagSink) -> Self {
        Self {
            config,
            platform,
            sink,
        }
    }

    /// One pass through the boot chain.
    pub fn attempt(&self) -> BootOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.boot_chain())) {
            Ok(Ok(())) => BootOutcome::Rebooted,
            Ok(Err(err)) => BootOutcome::FailedAt(err.stage(), err),
            Err(payload) => {
                let err = BootError::Panicked(panic_message(payload.as_ref()));
                BootOutcome::FailedAt(err.stage(), err)
            }
        }
    }

    /// Attempt the boot; if control comes back, enter the shell and return
    /// its exit status.
    pub fn run(&self) -> i32 {
        match self.attempt() {
            BootOutcome::Rebooted => self.sink.error("reboot returned control"),
            BootOutcome::FailedAt(stage, err) => self
                .sink
                .error(&format!("boot failed at {stage} stage: {err}")),
        }
        self.sink
            .error("something went wrong - see logs above. starting shell...");
        self.run_shell()
    }

    /// Enter the configured recovery shell and return its exit status.
    pub fn run_shell(&self) -> i32 {
        self.platform.shell.enter(&self.config.shell)
    }

    fn boot_chain(&self) -> Result<(), BootError> {
        let cfg = self.config;
        let p = self.platform;

        let devs = Enumerator::new(&cfg.sys_block_dir, self.sink).enumerate();
        self.sink
            .debug(&format!("{} candidate block devices", devs.len()));

        let found = Matcher::new(p.devices, p.tables, self.sink)
            .find(&devs, &cfg.target)
            .ok_or(BootError::NoMatch {
                disk: cfg.target.disk_id,
                partition: cfg.target.partition_id,
            })?;
        self.sink.info(&format!(
            "found pt {} / part {} ({}) at {}",
            cfg.target.disk_id,
            cfg.target.partition_id,
            cfg.target.partition_label,
            found.device_path().display()
        ));

        let mount = MountStage::from_config(p.mounter, self.sink, cfg);
        mount.mount(found.device_path())?;

        let mut finalizers = Finalizers::new();
        finalizers.push("unmount root", mount.unmount_finalizer());

        KexecStage::from_config(p.loader, self.sink, cfg).boot(mount.mount_point(), finalizers)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_stringified() {
        let p = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "static");
        let p = panic::catch_unwind(|| panic!("{}", 7)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "7");
        let p = panic::catch_unwind(|| std::panic::panic_any(3u8)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "unknown panic");
    }

    #[test]
    fn outcome_helpers() {
        assert!(BootOutcome::Rebooted.is_rebooted());
        let failed = BootOutcome::FailedAt(Stage::Reboot, BootError::Panicked("x".into()));
        assert_eq!(failed.stage(), Some(Stage::Reboot));
        assert!(!failed.is_rebooted());
    }
}
