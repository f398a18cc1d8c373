pub mod daemon_manager;
pub mod keyboard_listener;
pub mod process;
pub mod runtime;
pub mod scheduler;
pub mod watcher;

pub use daemon_manager::{daemon_status, daemon_worker_entry, start_daemon, stop_daemon};
