pub mod buffer;
pub mod clipboard;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod index;
pub mod keyboard;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod persist;
pub mod recording;
pub mod service;
pub mod settings;
pub mod stats;
pub mod store;
pub mod traits;

// Re-export common items for convenience
pub use buffer::InputBuffer;
pub use config::{get_config_dir, is_daemon_running};
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use error::{ExpandoError, Result};
pub use index::{normalize_trigger, TriggerIndex};
pub use matcher::{MatchEvaluator, MatchResult};
pub use models::{KeyEvent, Modifiers, Snippet};
pub use orchestrator::{EngineContext, ReplacementOrchestrator, ReplacementTimings};
pub use service::{ChangedDocuments, ExpansionService, ServiceMessage};
pub use settings::{DelimiterConfig, Settings, SettingsStore};
pub use stats::{ExpansionStats, StatsStore};
pub use store::{LoadOutcome, SnippetStore};
