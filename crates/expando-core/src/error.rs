use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpandoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Keyboard controller error: {0}")]
    Keyboard(String),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Snippet with ID {0} not found")]
    NotFound(String),
    #[error("Invalid trigger: {0:?}")]
    InvalidTrigger(String),
    #[error("Daemon is not running")]
    DaemonNotRunning,
    #[error("Invalid PID in daemon file")]
    InvalidPid,
    #[error("File watcher error: {0}")]
    Watcher(String),
    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ExpandoError>;
