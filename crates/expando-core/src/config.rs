use crate::error::Result;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const HOME_ENV: &str = "EXPANDO_HOME";
pub const PID_FILENAME: &str = "expando-daemon.pid";
pub const SNIPPETS_FILENAME: &str = "snippets.json";
pub const SETTINGS_FILENAME: &str = "settings.json";
pub const STATS_FILENAME: &str = "stats.json";
pub const DAEMON_LOG_FILENAME: &str = "daemon_log.txt";

/// Get the expando configuration directory
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var(HOME_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".expando"))
        .unwrap_or_else(|_| PathBuf::from(".expando"))
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir();
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

/// Get the path to the PID file
pub fn get_pid_file_path() -> PathBuf {
    get_config_dir().join(PID_FILENAME)
}

pub fn get_snippets_file_path() -> PathBuf {
    get_config_dir().join(SNIPPETS_FILENAME)
}

pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILENAME)
}

pub fn get_stats_file_path() -> PathBuf {
    get_config_dir().join(STATS_FILENAME)
}

pub fn get_daemon_log_path() -> PathBuf {
    get_config_dir().join(DAEMON_LOG_FILENAME)
}

/// Read the PID recorded by a running daemon, if any
pub fn is_daemon_running() -> Result<Option<u32>> {
    let pid_file = get_pid_file_path();

    if !pid_file.exists() {
        return Ok(None);
    }

    match fs::read_to_string(&pid_file) {
        Ok(contents) => match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                // Invalid PID, treat as not running and clean up
                let _ = fs::remove_file(&pid_file);
                Ok(None)
            }
        },
        Err(_) => {
            let _ = fs::remove_file(&pid_file);
            Ok(None)
        }
    }
}
