//! In-memory collaborators that record instead of touching the host.
//!
//! Used by the `check` dry run and by tests. Each recorder shares its log
//! through an `Arc`, so a clone kept by the caller can inspect what the
//! boxed copy inside the engine did.

use crate::dispatcher::EventDispatcher;
use crate::error::Result;
use crate::models::{KeyEvent, Snippet};
use crate::orchestrator::{EngineContext, ReplacementOrchestrator};
use crate::settings::DelimiterConfig;
use crate::traits::{
    ClipboardAccess, ExpansionRecorder, NoSelection, ReplacementStep, Scheduler,
    SelectionOracle, SelectionState, TextInjector,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedEdit {
    DeleteBackward(usize),
    Paste(String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingInjector {
    edits: Arc<Mutex<Vec<InjectedEdit>>>,
}

impl RecordingInjector {
    pub fn edits(&self) -> Vec<InjectedEdit> {
        lock(&self.edits).clone()
    }
}

impl TextInjector for RecordingInjector {
    fn delete_backward(&mut self, count: usize) -> Result<()> {
        lock(&self.edits).push(InjectedEdit::DeleteBackward(count));
        Ok(())
    }

    fn paste_text(&mut self, text: &str) -> Result<()> {
        lock(&self.edits).push(InjectedEdit::Paste(text.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Arc::new(Mutex::new(Some(text.to_string()))),
        }
    }

    pub fn text(&self) -> Option<String> {
        lock(&self.text).clone()
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn get_text(&mut self) -> Result<Option<String>> {
        Ok(lock(&self.text).clone())
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        *lock(&self.text) = Some(text.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *lock(&self.text) = None;
        Ok(())
    }
}

/// Selection oracle whose answer the caller controls.
#[derive(Debug, Clone, Default)]
pub struct FixedSelection {
    state: Arc<Mutex<SelectionState>>,
}

impl FixedSelection {
    pub fn set(&self, state: SelectionState) {
        *lock(&self.state) = state;
    }
}

impl SelectionOracle for FixedSelection {
    fn current_selection(&mut self) -> SelectionState {
        *lock(&self.state)
    }
}

/// Scheduler that queues steps until the caller fires them.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    pending: Arc<Mutex<VecDeque<(Duration, ReplacementStep)>>>,
}

impl ManualScheduler {
    pub fn next_step(&self) -> Option<ReplacementStep> {
        lock(&self.pending).pop_front().map(|(_, step)| step)
    }

    pub fn pending(&self) -> Vec<(Duration, ReplacementStep)> {
        lock(&self.pending).iter().copied().collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, step: ReplacementStep) {
        lock(&self.pending).push_back((delay, step));
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountingRecorder {
    triggers: Arc<Mutex<Vec<String>>>,
}

impl CountingRecorder {
    pub fn triggers(&self) -> Vec<String> {
        lock(&self.triggers).clone()
    }
}

impl ExpansionRecorder for CountingRecorder {
    fn record_expansion(&mut self, trigger: &str) {
        lock(&self.triggers).push(trigger.to_string());
    }
}

/// Result of feeding text through the engine without touching the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRun {
    pub edits: Vec<InjectedEdit>,
    /// What the focused field would contain afterwards.
    pub output: String,
    pub expanded: Vec<String>,
}

/// Type `text` one character at a time against `snippets`, running each
/// replacement to completion before the next character.
pub fn simulate_typing(snippets: &[Snippet], config: &DelimiterConfig, text: &str) -> DryRun {
    let injector = RecordingInjector::default();
    let scheduler = ManualScheduler::default();
    let recorder = CountingRecorder::default();
    let ctx = EngineContext {
        injector: Box::new(injector.clone()),
        clipboard: Box::new(MemoryClipboard::default()),
        selection: Box::new(NoSelection),
        scheduler: Box::new(scheduler.clone()),
        recorder: Some(Box::new(recorder.clone())),
    };
    let mut dispatcher = EventDispatcher::new(ctx, ReplacementOrchestrator::default());
    dispatcher.rebuild_index(snippets, config);

    let mut output = String::new();
    let mut applied = 0;
    for c in text.chars() {
        let typed = c.to_string();
        output.push(c);
        dispatcher.handle_key(&KeyEvent::text(&typed));
        while let Some(step) = scheduler.next_step() {
            dispatcher.handle_step(step);
        }

        let edits = injector.edits();
        for edit in &edits[applied..] {
            match edit {
                InjectedEdit::DeleteBackward(n) => {
                    for _ in 0..*n {
                        output.pop();
                    }
                }
                InjectedEdit::Paste(s) => output.push_str(s),
            }
        }
        applied = edits.len();
    }

    DryRun {
        edits: injector.edits(),
        output,
        expanded: recorder.triggers(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_reports_the_resulting_text() {
        let snippets = vec![
            Snippet::new(";eml/".into(), "user@example.com".into()),
            Snippet::new("sig".into(), "Regards".into()),
        ];
        let run = simulate_typing(&snippets, &DelimiterConfig::default(), "hi ;eml/ and ;sig/!");
        assert_eq!(run.output, "hi user@example.com and Regards!");
        assert_eq!(run.expanded, vec![";eml/", ";sig/"]);
        assert_eq!(run.edits.len(), 4);
    }

    #[test]
    fn dry_run_leaves_glued_triggers_alone() {
        let snippets = vec![Snippet::new(";t/".into(), "tee".into())];
        let run = simulate_typing(&snippets, &DelimiterConfig::default(), "x;t/");
        assert_eq!(run.output, "x;t/");
        assert!(run.edits.is_empty());
    }
}
