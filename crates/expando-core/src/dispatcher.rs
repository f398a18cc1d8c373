//! Per-key dispatch: buffer update, match evaluation, replacement.

use crate::buffer::InputBuffer;
use crate::index::TriggerIndex;
use crate::matcher::MatchEvaluator;
use crate::models::{KeyEvent, Snippet};
use crate::orchestrator::{EngineContext, FireOutcome, Phase, ReplacementOrchestrator};
use crate::settings::DelimiterConfig;
use crate::traits::ReplacementStep;
use tracing::{debug, trace};

/// What a single key event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Expansion is switched off.
    Paused,
    /// A replacement is in flight; the event may be our own injection.
    IgnoredWhileReplacing,
    /// Shortcut or navigation reset the typing context.
    Invalidated,
    /// No characters and no deletion; nothing changed.
    Unchanged,
    Typed,
    ReplacementStarted,
    /// A match was found but needed a selection the host did not report.
    MatchDiscarded,
}

pub struct EventDispatcher {
    buffer: InputBuffer,
    index: TriggerIndex,
    evaluator: MatchEvaluator,
    orchestrator: ReplacementOrchestrator,
    ctx: EngineContext,
    enabled: bool,
}

impl EventDispatcher {
    pub fn new(ctx: EngineContext, orchestrator: ReplacementOrchestrator) -> Self {
        Self {
            buffer: InputBuffer::default(),
            index: TriggerIndex::default(),
            evaluator: MatchEvaluator::new(),
            orchestrator,
            ctx,
            enabled: true,
        }
    }

    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    pub fn index(&self) -> &TriggerIndex {
        &self.index
    }

    pub fn phase(&self) -> &Phase {
        self.orchestrator.phase()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fresh typing session: empty buffer, not invalidated.
    pub fn start_session(&mut self) {
        self.buffer.clear();
        self.orchestrator.disarm();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!(enabled, "expansion toggled");
        }
        self.enabled = enabled;
        if !enabled {
            self.buffer.clear();
            self.orchestrator.disarm();
        }
    }

    /// Swap in a new index wholesale.
    pub fn replace_index(&mut self, index: TriggerIndex) {
        debug!(triggers = index.len(), "trigger index rebuilt");
        self.index = index;
        self.orchestrator.disarm();
    }

    pub fn rebuild_index(&mut self, snippets: &[Snippet], config: &DelimiterConfig) {
        self.replace_index(TriggerIndex::build(snippets, config));
    }

    /// The typing context changed outside our view (focus, selection).
    pub fn invalidate_context(&mut self) {
        self.buffer.invalidate();
        self.orchestrator.disarm();
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> DispatchOutcome {
        if !self.enabled {
            return DispatchOutcome::Paused;
        }
        if self.orchestrator.is_replacing() {
            trace!("key ignored during replacement");
            return DispatchOutcome::IgnoredWhileReplacing;
        }

        if event.modifiers.is_shortcut() {
            self.invalidate_context();
            return DispatchOutcome::Invalidated;
        }

        if event.is_backspace || event.is_delete_forward {
            self.buffer.backspace();
            self.evaluator.suppress_next();
        } else if event.is_arrow {
            self.invalidate_context();
        } else if let Some(text) = event.printable() {
            self.buffer.append(text);
        } else {
            return DispatchOutcome::Unchanged;
        }

        let outcome = self.evaluate();
        if event.is_arrow && outcome == DispatchOutcome::Typed {
            DispatchOutcome::Invalidated
        } else {
            outcome
        }
    }

    pub fn handle_step(&mut self, step: ReplacementStep) {
        self.orchestrator
            .on_step(step, &mut self.buffer, &mut self.evaluator, &mut self.ctx);
    }

    fn evaluate(&mut self) -> DispatchOutcome {
        let Some(result) = self.evaluator.evaluate(&self.buffer, &self.index) else {
            self.orchestrator.disarm();
            return DispatchOutcome::Typed;
        };

        self.orchestrator.arm(result);
        match self.orchestrator.fire(&mut self.ctx) {
            FireOutcome::Started => DispatchOutcome::ReplacementStarted,
            FireOutcome::Discarded => DispatchOutcome::MatchDiscarded,
            FireOutcome::NotArmed => DispatchOutcome::Typed,
        }
    }
}
