// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Recovery shell entered whenever the boot chain gives up.

pub mod command;

pub use command::CommandShell;

/// Exit status reported when the shell could not be started at all.
pub const SPAWN_FAILED: i32 = 127;

pub trait Shell {
    /// Run the interactive shell given by `argv` and wait for it to exit.
    fn enter(&self, argv: &[String]) -> i32;
}
