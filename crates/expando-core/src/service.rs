//! The single owner of engine state.
//!
//! Every mutation of the buffer, the index and the snippet list goes through
//! [`ExpansionService::handle`] on one execution context. Other contexts
//! (key capture, file watching, timers) only send [`ServiceMessage`]s.

use crate::dispatcher::{DispatchOutcome, EventDispatcher};
use crate::models::KeyEvent;
use crate::settings::SettingsStore;
use crate::store::{LoadOutcome, SnippetStore};
use crate::traits::ReplacementStep;
use tracing::{debug, info};

/// Which watched documents changed on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedDocuments {
    pub snippets: bool,
    pub settings: bool,
}

impl ChangedDocuments {
    pub fn any(&self) -> bool {
        self.snippets || self.settings
    }

    pub fn merge(&mut self, other: ChangedDocuments) {
        self.snippets |= other.snippets;
        self.settings |= other.settings;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMessage {
    Key(KeyEvent),
    Step(ReplacementStep),
    /// The caret may have moved (mouse click, focus change).
    ContextChanged,
    DocumentsChanged(ChangedDocuments),
    Shutdown,
}

pub struct ExpansionService {
    dispatcher: EventDispatcher,
    store: SnippetStore,
    settings: SettingsStore,
}

impl ExpansionService {
    pub fn new(dispatcher: EventDispatcher, store: SnippetStore, settings: SettingsStore) -> Self {
        let mut service = Self {
            dispatcher,
            store,
            settings,
        };
        let enabled = service.settings.settings().desired_enabled;
        service.dispatcher.set_enabled(enabled);
        service.notify_changed();
        service.dispatcher.start_session();
        service
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Mutate the snippet list, then rebuild the index.
    pub fn edit_snippets<T>(&mut self, f: impl FnOnce(&mut SnippetStore) -> T) -> T {
        let result = f(&mut self.store);
        self.notify_changed();
        result
    }

    /// Rebuild the trigger index from the current snippets and delimiters.
    pub fn notify_changed(&mut self) {
        let config = self.settings.delimiter_config();
        self.dispatcher.rebuild_index(self.store.snippets(), &config);
    }

    /// Process one message; returns false once the service should stop.
    pub fn handle(&mut self, message: ServiceMessage) -> bool {
        match message {
            ServiceMessage::Key(event) => {
                self.handle_key(&event);
            }
            ServiceMessage::Step(step) => self.dispatcher.handle_step(step),
            ServiceMessage::ContextChanged => self.dispatcher.invalidate_context(),
            ServiceMessage::DocumentsChanged(changed) => {
                self.reload_documents(changed);
            }
            ServiceMessage::Shutdown => {
                info!("expansion service stopping");
                return false;
            }
        }
        true
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> DispatchOutcome {
        self.dispatcher.handle_key(event)
    }

    /// Reload what changed on disk; returns whether the index was rebuilt.
    pub fn reload_documents(&mut self, changed: ChangedDocuments) -> bool {
        let mut rebuild = false;

        if changed.settings && self.settings.load() {
            let enabled = self.settings.settings().desired_enabled;
            self.dispatcher.set_enabled(enabled);
            rebuild = true;
        }

        if changed.snippets {
            let outcome = self.store.handle_external_change();
            debug!(?outcome, "snippet document change handled");
            rebuild |= outcome.changed();
            if outcome == LoadOutcome::Deferred {
                debug!("reload deferred until staged edits finish");
            }
        }

        if rebuild {
            self.notify_changed();
        }
        rebuild
    }
}
