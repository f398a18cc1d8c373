//! Atomic JSON documents on disk.
//!
//! Every document is written to a sibling temp file, synced, then renamed over
//! the canonical path, so a reader never observes a partial file. Reads are
//! permissive: a missing or malformed document yields the type's default.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Temp file used while replacing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` with temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "document saved");
    Ok(bytes)
}

/// Read raw bytes, mapping "file absent" to `None`.
pub fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load a document, falling back to `T::default()` on any failure.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_bytes(path) {
        Ok(Some(bytes)) if bytes.iter().all(u8::is_ascii_whitespace) => T::default(),
        Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "malformed document, using defaults");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document, using defaults");
            T::default()
        }
    }
}
