// CLASSIFICATION: COMMUNITY
// Filename: finalizer.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Ordered release actions run between a successful kexec load and reboot.
//!
//! Actions run last-acquired first. Dropping a [`Finalizers`] without
//! calling [`Finalizers::run`] discards the actions unrun, which is what the
//! failure path wants: the root stays mounted for the recovery shell.

use crate::diag::DiagSink;

type Action<'a> = Box<dyn FnOnce() + 'a>;

#[derive(Default)]
pub struct Finalizers<'a> {
    actions: Vec<(String, Action<'a>)>,
}

impl<'a> Finalizers<'a> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Register the release action for a freshly acquired resource.
    pub fn push(&mut self, name: impl Into<String>, action: impl FnOnce() + 'a) {
        self.actions.push((name.into(), Box::new(action)));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every action, newest first. Each action runs exactly once.
    pub fn run(self, sink: &dyn DiagSink) {
        for (name, action) in self.actions.into_iter().rev() {
            sink.debug(&format!("finalizer: {name}"));
            action();
        }
    }
}

impl std::fmt::Debug for Finalizers<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|(name, _)| name))
            .finish()
    }
}
