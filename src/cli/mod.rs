// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Process entry for `kexboot`: flag handling, wiring of the real
//! collaborators, and the PID 1 shell loop.

pub mod args;

use std::fmt::Write as _;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;

pub use args::{build_cli, Options};

use crate::block::{GptReader, SysfsDevices};
use crate::config::{self, TargetIdentity};
use crate::controller::{FallbackController, Platform};
use crate::diag::{DiagSink, LogSink};
use crate::kver;
use crate::shell::{CommandShell, SPAWN_FAILED};
use crate::sys::{Kexec, SysMounter};

pub const RESPAWN_BACKOFF: Duration = Duration::from_secs(1);

/// Text printed by `--id`.
pub fn identity_report(target: &TargetIdentity) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "disk:      {}", target.disk_id);
    let _ = writeln!(out, "partition: {}", target.partition_id);
    let _ = writeln!(out, "label:     {}", target.partition_label);
    out
}

fn print_kver(path: &Path) -> anyhow::Result<()> {
    let mut f = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let desc = kver::read_version(&mut f)
        .with_context(|| format!("reading version from {}", path.display()))?;
    println!("{desc}");
    match desc.parse::<kver::KernelInfo>() {
        Ok(info) => println!(
            "release {} ({}.{}.{}{}), build #{} at {}",
            info.release,
            info.major,
            info.minor,
            info.patch,
            if info.local_version.is_empty() {
                String::new()
            } else {
                format!(" {}", info.local_version)
            },
            info.build_num,
            info.build_time
        ),
        Err(e) => log::debug!("{e}"),
    }
    Ok(())
}

/// Run the binary. The returned code is the last shell exit status.
pub fn run(opts: &Options) -> anyhow::Result<i32> {
    let sink = LogSink;
    let cfg = config::load_active(opts.config.as_deref(), &sink);

    if opts.id {
        print!("{}", identity_report(&cfg.target));
        return Ok(0);
    }
    if let Some(image) = &opts.kver {
        print_kver(image)?;
        return Ok(0);
    }
    if !opts.quiet {
        println!(
            "kexboot {}: looking for pt {} / part {}",
            env!("CARGO_PKG_VERSION"),
            cfg.target.disk_id,
            cfg.target.partition_id
        );
    }

    let devices = SysfsDevices::from_config(&cfg);
    let shell = CommandShell::new(&sink);
    let platform = Platform {
        devices: &devices,
        tables: &GptReader,
        mounter: &SysMounter,
        loader: &Kexec,
        shell: &shell,
    };
    if !opts.init_args.is_empty() {
        sink.info(&format!(
            "ignoring init arguments: {}",
            opts.init_args.join(" ")
        ));
    }

    let controller = FallbackController::new(&cfg, platform, &sink);
    let mut code = controller.run();

    // Exiting as init panics the kernel.
    while std::process::id() == 1 {
        sink.warn(&format!("shell exited with {code}; restarting it"));
        let delay = respawn_delay(code);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        code = controller.run_shell();
    }
    Ok(code)
}

/// Pause before restarting a shell that exited with `code`. A shell that
/// could not even be started would otherwise be respawned in a busy loop.
pub fn respawn_delay(code: i32) -> Duration {
    if code == SPAWN_FAILED {
        RESPAWN_BACKOFF
    } else {
        Duration::ZERO
    }
}
