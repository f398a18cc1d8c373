//! Seams to the host: text injection, clipboard, selection and timers.

use crate::error::Result;
use std::time::Duration;

/// Performs the destructive edit in the focused application.
pub trait TextInjector: Send {
    fn delete_backward(&mut self, count: usize) -> Result<()>;
    /// Put `text` on the clipboard and paste it.
    fn paste_text(&mut self, text: &str) -> Result<()>;
}

/// Shared system clipboard, used to save and restore around a paste.
pub trait ClipboardAccess: Send {
    fn get_text(&mut self) -> Result<Option<String>>;
    fn set_text(&mut self, text: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub available: bool,
    pub non_empty: bool,
}

impl SelectionState {
    pub fn is_active(&self) -> bool {
        self.available && self.non_empty
    }
}

/// Reports whether the focused application has selected text.
pub trait SelectionOracle: Send {
    fn current_selection(&mut self) -> SelectionState;
}

/// Hosts without selection introspection never report one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSelection;

impl SelectionOracle for NoSelection {
    fn current_selection(&mut self) -> SelectionState {
        SelectionState::default()
    }
}

/// A continuation of an in-flight replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementStep {
    Paste,
    RestoreClipboard,
    Settle,
}

/// Delivers a step back to the owning context after `delay`, without blocking it.
pub trait Scheduler: Send {
    fn schedule(&self, delay: Duration, step: ReplacementStep);
}

/// Hook called once per successful expansion.
pub trait ExpansionRecorder: Send {
    fn record_expansion(&mut self, trigger: &str);
}
