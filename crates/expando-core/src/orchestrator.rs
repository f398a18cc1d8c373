//! The delete → paste → restore → settle replacement sequence.
//!
//! Each step after the first is a delayed continuation delivered by the
//! [`Scheduler`]; while a sequence is in flight the orchestrator reports
//! `Replacing` and the dispatcher ignores every key event, including the
//! ones we inject ourselves.

use crate::buffer::InputBuffer;
use crate::matcher::{MatchEvaluator, MatchResult};
use crate::traits::{
    ClipboardAccess, ExpansionRecorder, ReplacementStep, Scheduler, SelectionOracle, TextInjector,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delays between replacement steps. The host is assumed to have processed
/// injected keystrokes within each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementTimings {
    pub after_delete: Duration,
    pub before_restore: Duration,
    pub settle: Duration,
}

impl Default for ReplacementTimings {
    fn default() -> Self {
        Self {
            after_delete: Duration::from_millis(40),
            before_restore: Duration::from_millis(250),
            settle: Duration::from_millis(60),
        }
    }
}

/// Everything the engine talks to outside itself.
pub struct EngineContext {
    pub injector: Box<dyn TextInjector>,
    pub clipboard: Box<dyn ClipboardAccess>,
    pub selection: Box<dyn SelectionOracle>,
    pub scheduler: Box<dyn Scheduler>,
    pub recorder: Option<Box<dyn ExpansionRecorder>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed(MatchResult),
    Replacing(MatchResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Started,
    /// Boundary unsatisfied and no active selection.
    Discarded,
    NotArmed,
}

#[derive(Debug)]
pub struct ReplacementOrchestrator {
    phase: Phase,
    timings: ReplacementTimings,
    /// Clipboard text to put back; inner `None` means it held no text.
    saved_clipboard: Option<Option<String>>,
}

impl Default for ReplacementOrchestrator {
    fn default() -> Self {
        Self::new(ReplacementTimings::default())
    }
}

impl ReplacementOrchestrator {
    pub fn new(timings: ReplacementTimings) -> Self {
        Self {
            phase: Phase::Idle,
            timings,
            saved_clipboard: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_replacing(&self) -> bool {
        matches!(self.phase, Phase::Replacing(_))
    }

    pub fn arm(&mut self, result: MatchResult) {
        if matches!(self.phase, Phase::Idle | Phase::Armed(_)) {
            self.phase = Phase::Armed(result);
        }
    }

    pub fn disarm(&mut self) {
        if matches!(self.phase, Phase::Armed(_)) {
            self.phase = Phase::Idle;
        }
    }

    /// Start the sequence for the armed match if it is eligible.
    pub fn fire(&mut self, ctx: &mut EngineContext) -> FireOutcome {
        let result = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Armed(result) => result,
            other => {
                self.phase = other;
                return FireOutcome::NotArmed;
            }
        };

        if result.requires_selection && !ctx.selection.current_selection().is_active() {
            debug!(trigger = %result.trigger, "match needs a selection override, discarding");
            return FireOutcome::Discarded;
        }

        debug!(trigger = %result.trigger, "replacing trigger");
        if let Err(e) = ctx.injector.delete_backward(result.delete_count()) {
            warn!(error = %e, "failed to delete trigger");
        }
        self.phase = Phase::Replacing(result);
        ctx.scheduler
            .schedule(self.timings.after_delete, ReplacementStep::Paste);
        FireOutcome::Started
    }

    /// Advance an in-flight sequence.
    pub fn on_step(
        &mut self,
        step: ReplacementStep,
        buffer: &mut InputBuffer,
        evaluator: &mut MatchEvaluator,
        ctx: &mut EngineContext,
    ) {
        let Phase::Replacing(result) = &self.phase else {
            debug!(?step, "no replacement in flight, ignoring step");
            return;
        };

        match step {
            ReplacementStep::Paste => {
                self.saved_clipboard = match ctx.clipboard.get_text() {
                    Ok(saved) => Some(saved),
                    Err(e) => {
                        warn!(error = %e, "could not save clipboard, it will not be restored");
                        None
                    }
                };

                match ctx.injector.paste_text(&result.expansion) {
                    Ok(()) => {
                        info!(trigger = %result.trigger, "expanded snippet");
                        if let Some(recorder) = ctx.recorder.as_mut() {
                            recorder.record_expansion(&result.trigger);
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to paste expansion"),
                }

                buffer.invalidate();
                evaluator.suppress_next();

                if self.saved_clipboard.is_some() {
                    ctx.scheduler.schedule(
                        self.timings.before_restore,
                        ReplacementStep::RestoreClipboard,
                    );
                } else {
                    ctx.scheduler
                        .schedule(self.timings.settle, ReplacementStep::Settle);
                }
            }
            ReplacementStep::RestoreClipboard => {
                let restored = match self.saved_clipboard.take() {
                    Some(Some(text)) => ctx.clipboard.set_text(&text),
                    Some(None) => ctx.clipboard.clear(),
                    None => Ok(()),
                };
                if let Err(e) = restored {
                    warn!(error = %e, "failed to restore clipboard");
                }
                ctx.scheduler
                    .schedule(self.timings.settle, ReplacementStep::Settle);
            }
            ReplacementStep::Settle => {
                self.phase = Phase::Idle;
                debug!("replacement settled");
            }
        }
    }
}
