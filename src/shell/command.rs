// CLASSIFICATION: COMMUNITY
// Filename: command.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Spawns the recovery shell as a child process wired to the console.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Shell, SPAWN_FAILED};
use crate::diag::DiagSink;

pub const DEFAULT_CONSOLE: &str = "/dev/console";

pub struct CommandShell<'a> {
    sink: &'a dyn DiagSink,
    console: Option<PathBuf>,
}

impl<'a> CommandShell<'a> {
    /// Shell that talks on [`DEFAULT_CONSOLE`] when it can be opened.
    pub fn new(sink: &'a dyn DiagSink) -> Self {
        Self {
            sink,
            console: Some(PathBuf::from(DEFAULT_CONSOLE)),
        }
    }

    /// Shell that keeps the caller's stdio.
    pub fn inherit(sink: &'a dyn DiagSink) -> Self {
        Self { sink, console: None }
    }

    pub fn with_console(mut self, console: impl AsRef<Path>) -> Self {
        self.console = Some(console.as_ref().to_path_buf());
        self
    }

    fn stdio(&self) -> (Stdio, Stdio, Stdio) {
        let Some(path) = &self.console else {
            return (Stdio::inherit(), Stdio::inherit(), Stdio::inherit());
        };
        match open_console(path) {
            Ok((i, o, e)) => (i.into(), o.into(), e.into()),
            Err(e) => {
                self.sink.warn(&format!(
                    "console {} unavailable ({e}); keeping stdio",
                    path.display()
                ));
                (Stdio::inherit(), Stdio::inherit(), Stdio::inherit())
            }
        }
    }
}

fn open_console(path: &Path) -> io::Result<(File, File, File)> {
    let f = OpenOptions::new().read(true).write(true).open(path)?;
    Ok((f.try_clone()?, f.try_clone()?, f))
}

impl Shell for CommandShell<'_> {
    fn enter(&self, argv: &[String]) -> i32 {
        let Some((program, args)) = argv.split_first() else {
            self.sink.error("no shell configured");
            return SPAWN_FAILED;
        };
        let (stdin, stdout, stderr) = self.stdio();
        let mut child = match Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                self.sink.error(&format!("starting shell {program}: {e}"));
                return SPAWN_FAILED;
            }
        };
        match child.wait() {
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                self.sink.info(&format!("shell exited with {code}"));
                code
            }
            Err(e) => {
                self.sink.error(&format!("waiting for shell: {e}"));
                -1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::MemorySink;
    use log::Level;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_child_exit_code() {
        let sink = MemorySink::new();
        let shell = CommandShell::inherit(&sink);
        assert_eq!(shell.enter(&argv(&["/bin/sh", "-c", "exit 3"])), 3);
        assert!(sink.contains(Level::Info, "exited with 3"));
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let sink = MemorySink::new();
        let shell = CommandShell::inherit(&sink);
        assert_eq!(shell.enter(&argv(&["/nonexistent/kexboot-sh"])), SPAWN_FAILED);
        assert!(sink.contains(Level::Error, "starting shell"));
    }

    #[test]
    fn empty_argv_is_rejected() {
        let sink = MemorySink::new();
        assert_eq!(CommandShell::inherit(&sink).enter(&[]), SPAWN_FAILED);
    }

    #[test]
    fn unusable_console_falls_back_to_stdio() {
        let sink = MemorySink::new();
        let shell = CommandShell::new(&sink).with_console("/nonexistent/console");
        assert_eq!(shell.enter(&argv(&["/bin/sh", "-c", "exit 0"])), 0);
        assert!(sink.contains(Level::Warn, "unavailable"));
    }
}
