// CLASSIFICATION: COMMUNITY
// Filename: diag.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Diagnostic sink handed to every boot component.
//!
//! Production code forwards to the `log` facade; tests capture records in a
//! [`MemorySink`] and assert on them.

use std::cell::RefCell;

use log::Level;

pub const LOG_TARGET: &str = "kexboot";

pub trait DiagSink {
    fn emit(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

/// Forwards to whatever logger the binary installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagSink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: LOG_TARGET, level, "{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub message: String,
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RefCell<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.borrow().clone()
    }

    /// True if a record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }
}

impl DiagSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.records.borrow_mut().push(Record {
            level,
            message: message.to_string(),
        });
    }
}
