//! Durable snippet list with change detection and staged editing.

use crate::error::{ExpandoError, Result};
use crate::models::Snippet;
use crate::persist::{read_bytes, save_json};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifies a particular on-disk version of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSignature {
    pub byte_size: u64,
    pub modified: Option<SystemTime>,
    pub content_hash: String,
}

impl StoreSignature {
    fn of(path: &Path, bytes: &[u8]) -> Self {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
        Self {
            byte_size: bytes.len() as u64,
            modified,
            content_hash: format!("{:x}", Sha256::digest(bytes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file matches what is already in memory.
    Unchanged,
    Reloaded,
    /// Unreadable or malformed; memory now holds an empty list.
    Fallback,
    /// A staged editing session is open; memory was left alone.
    Deferred,
}

impl LoadOutcome {
    /// Whether the in-memory list may have changed.
    pub fn changed(self) -> bool {
        matches!(self, LoadOutcome::Reloaded | LoadOutcome::Fallback)
    }
}

#[derive(Debug)]
pub struct SnippetStore {
    path: PathBuf,
    snippets: Vec<Snippet>,
    signature: Option<StoreSignature>,
    staged: bool,
    self_write: Arc<AtomicBool>,
}

impl SnippetStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            snippets: Vec::new(),
            signature: None,
            staged: false,
            self_write: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a store and load whatever is on disk.
    pub fn open(path: PathBuf) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn get(&self, id: Uuid) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.id == id)
    }

    pub fn find_by_trigger(&self, trigger: &str) -> Option<&Snippet> {
        let wanted = trigger.trim();
        self.snippets.iter().find(|s| s.trigger.trim() == wanted)
    }

    pub fn signature(&self) -> Option<&StoreSignature> {
        self.signature.as_ref()
    }

    /// Set while this store is writing its own file.
    pub fn self_write_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.self_write)
    }

    pub fn load(&mut self) -> LoadOutcome {
        let bytes = match read_bytes(&self.path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                if self.signature.is_none() && self.snippets.is_empty() {
                    return LoadOutcome::Unchanged;
                }
                debug!(path = %self.path.display(), "snippet file missing, starting empty");
                return self.fall_back();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read snippets");
                return self.fall_back();
            }
        };

        let signature = StoreSignature::of(&self.path, &bytes);
        if self.signature.as_ref() == Some(&signature) {
            debug!("snippet file unchanged, skipping reload");
            return LoadOutcome::Unchanged;
        }

        let decoded = if bytes.iter().all(u8::is_ascii_whitespace) {
            Ok(Vec::new())
        } else {
            serde_json::from_slice::<Vec<Snippet>>(&bytes)
        };

        match decoded {
            Ok(snippets) => {
                info!(count = snippets.len(), "loaded snippets");
                self.snippets = snippets;
                self.signature = Some(signature);
                LoadOutcome::Reloaded
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed snippet file");
                self.fall_back()
            }
        }
    }

    fn fall_back(&mut self) -> LoadOutcome {
        self.snippets.clear();
        self.signature = None;
        LoadOutcome::Fallback
    }

    pub fn save(&mut self) -> Result<()> {
        self.self_write.store(true, Ordering::SeqCst);
        let written = save_json(&self.path, &self.snippets);
        self.self_write.store(false, Ordering::SeqCst);

        match written {
            Ok(bytes) => {
                self.signature = Some(StoreSignature::of(&self.path, &bytes));
                debug!(count = self.snippets.len(), "snippets saved");
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to save snippets");
                Err(e)
            }
        }
    }

    /// Reload requested by the file watcher.
    pub fn handle_external_change(&mut self) -> LoadOutcome {
        if self.staged {
            debug!("staged edits open, deferring external reload");
            return LoadOutcome::Deferred;
        }
        self.load()
    }

    pub fn is_staged(&self) -> bool {
        self.staged
    }

    pub fn begin_staged_editing(&mut self) {
        self.staged = true;
    }

    pub fn commit_staged_editing(&mut self) -> Result<()> {
        self.staged = false;
        self.save()
    }

    /// Drop staged edits and return to the last durable snapshot.
    pub fn discard_staged_editing(&mut self) -> LoadOutcome {
        self.staged = false;
        self.signature = None;
        self.load()
    }

    /// Persist a mutation, putting `previous` back if the save fails so
    /// memory never holds edits the file does not.
    fn mutated(&mut self, previous: Vec<Snippet>) -> Result<()> {
        if self.staged {
            return Ok(());
        }
        self.save().map_err(|e| {
            self.snippets = previous;
            e
        })
    }

    pub fn add(&mut self, trigger: String, expansion: String) -> Result<Snippet> {
        if trigger.trim().is_empty() {
            return Err(ExpandoError::InvalidTrigger(trigger));
        }
        let previous = self.snippets.clone();
        let snippet = Snippet::new(trigger, expansion);
        self.snippets.push(snippet.clone());
        self.mutated(previous)?;
        Ok(snippet)
    }

    pub fn update(
        &mut self,
        id: Uuid,
        trigger: Option<String>,
        expansion: Option<String>,
    ) -> Result<Snippet> {
        if let Some(t) = &trigger {
            if t.trim().is_empty() {
                return Err(ExpandoError::InvalidTrigger(t.clone()));
            }
        }
        let previous = self.snippets.clone();
        let snippet = self
            .snippets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ExpandoError::NotFound(id.to_string()))?;
        if let Some(trigger) = trigger {
            snippet.trigger = trigger;
        }
        if let Some(expansion) = expansion {
            snippet.expansion = expansion;
        }
        let updated = snippet.clone();
        self.mutated(previous)?;
        Ok(updated)
    }

    pub fn set_enabled(&mut self, id: Uuid, enabled: bool) -> Result<()> {
        let previous = self.snippets.clone();
        let snippet = self
            .snippets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ExpandoError::NotFound(id.to_string()))?;
        snippet.is_enabled = enabled;
        self.mutated(previous)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Snippet> {
        let position = self
            .snippets
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ExpandoError::NotFound(id.to_string()))?;
        let previous = self.snippets.clone();
        let removed = self.snippets.remove(position);
        self.mutated(previous)?;
        Ok(removed)
    }

    /// Replace the whole list, regenerating duplicate ids.
    pub fn replace_all(&mut self, snippets: Vec<Snippet>) -> Result<()> {
        let mut seen = HashSet::new();
        let replaced = snippets
            .into_iter()
            .map(|mut s| {
                while !seen.insert(s.id) {
                    s.id = Uuid::new_v4();
                }
                s
            })
            .collect();
        let previous = std::mem::replace(&mut self.snippets, replaced);
        self.mutated(previous)
    }

    /// Replace the list with a snippets document read from `path`.
    pub fn import_from(&mut self, path: &Path) -> Result<usize> {
        let bytes = fs::read(path)?;
        let snippets: Vec<Snippet> = serde_json::from_slice(&bytes)?;
        let count = snippets.len();
        self.replace_all(snippets)?;
        info!(count, from = %path.display(), "imported snippets");
        Ok(count)
    }

    pub fn export_to(&self, path: &Path) -> Result<()> {
        save_json(path, &self.snippets)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SnippetStore {
        SnippetStore::new(dir.path().join("snippets.json"))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";eml/".into(), "user@example.com".into()).unwrap();
        store.add("sig".into(), "Regards,\nMe".into()).unwrap();
        let before = store.snippets().to_vec();

        store.save().unwrap();
        assert_eq!(store.load(), LoadOutcome::Unchanged);
        assert_eq!(store.snippets(), before.as_slice());

        let mut fresh = store_in(&dir);
        assert_eq!(fresh.load(), LoadOutcome::Reloaded);
        assert_eq!(fresh.snippets(), before.as_slice());
    }

    #[test]
    fn document_format_is_an_array_of_camel_case_objects() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";a/".into(), "alpha".into()).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = &json.as_array().unwrap()[0];
        assert_eq!(first["trigger"], ";a/");
        assert_eq!(first["expansion"], "alpha");
        assert_eq!(first["isEnabled"], true);
    }

    #[test]
    fn external_change_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";a/".into(), "alpha".into()).unwrap();

        let mut other = SnippetStore::open(store.path().to_path_buf());
        other.add(";b/".into(), "beta".into()).unwrap();

        assert_eq!(store.handle_external_change(), LoadOutcome::Reloaded);
        assert_eq!(store.snippets().len(), 2);
    }

    #[test]
    fn malformed_file_falls_back_to_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";a/".into(), "alpha".into()).unwrap();

        fs::write(store.path(), "[{ broken").unwrap();
        assert_eq!(store.load(), LoadOutcome::Fallback);
        assert!(store.snippets().is_empty());
        assert!(store.signature().is_none());
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert_eq!(store.load(), LoadOutcome::Unchanged);
        assert!(store.snippets().is_empty());
    }

    #[test]
    fn self_write_flag_is_clear_after_save() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let flag = store.self_write_flag();
        store.add(";a/".into(), "alpha".into()).unwrap();
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn failed_save_rolls_back_the_mutation() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let kept = store.add(";a/".into(), "alpha".into()).unwrap();

        // A directory at the document path makes the rename fail.
        fs::remove_file(store.path()).unwrap();
        fs::create_dir(store.path()).unwrap();

        assert!(store.add(";b/".into(), "beta".into()).is_err());
        assert!(store.set_enabled(kept.id, false).is_err());
        assert!(store.update(kept.id, None, Some("ALPHA".into())).is_err());
        assert!(store.delete(kept.id).is_err());
        assert!(store.replace_all(Vec::new()).is_err());
        assert_eq!(store.snippets(), &[kept]);
    }

    #[test]
    fn staged_edits_are_not_saved_until_commit() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";a/".into(), "alpha".into()).unwrap();

        store.begin_staged_editing();
        store.add(";b/".into(), "beta".into()).unwrap();
        assert_eq!(SnippetStore::open(store.path().to_path_buf()).snippets().len(), 1);

        store.commit_staged_editing().unwrap();
        assert!(!store.is_staged());
        assert_eq!(SnippetStore::open(store.path().to_path_buf()).snippets().len(), 2);
    }

    #[test]
    fn discard_reverts_to_durable_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let kept = store.add(";a/".into(), "alpha".into()).unwrap();

        store.begin_staged_editing();
        store.delete(kept.id).unwrap();
        store.add(";b/".into(), "beta".into()).unwrap();

        assert_eq!(store.discard_staged_editing(), LoadOutcome::Reloaded);
        assert_eq!(store.snippets(), &[kept]);
    }

    #[test]
    fn external_edit_during_staging_waits_for_discard() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";a/".into(), "alpha".into()).unwrap();

        store.begin_staged_editing();
        store.add(";mine/".into(), "staged".into()).unwrap();
        let staged = store.snippets().to_vec();

        let mut external = SnippetStore::open(store.path().to_path_buf());
        external.add(";theirs/".into(), "external".into()).unwrap();

        assert_eq!(store.handle_external_change(), LoadOutcome::Deferred);
        assert_eq!(store.snippets(), staged.as_slice());

        store.discard_staged_editing();
        let triggers: Vec<_> = store.snippets().iter().map(|s| s.trigger.as_str()).collect();
        assert_eq!(triggers, vec![";a/", ";theirs/"]);
    }

    #[test]
    fn update_toggle_and_delete_by_id() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let snippet = store.add(";a/".into(), "alpha".into()).unwrap();

        let updated = store
            .update(snippet.id, None, Some("ALPHA".into()))
            .unwrap();
        assert_eq!(updated.trigger, ";a/");
        assert_eq!(updated.expansion, "ALPHA");

        store.set_enabled(snippet.id, false).unwrap();
        assert!(!store.get(snippet.id).unwrap().is_enabled);
        assert!(store.find_by_trigger(" ;a/ ").is_some());

        store.delete(snippet.id).unwrap();
        assert!(matches!(
            store.delete(snippet.id),
            Err(ExpandoError::NotFound(_))
        ));
        assert!(matches!(
            store.update(snippet.id, None, None),
            Err(ExpandoError::NotFound(_))
        ));
    }

    #[test]
    fn blank_triggers_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(
            store.add("  ".into(), "x".into()),
            Err(ExpandoError::InvalidTrigger(_))
        ));
        assert!(store.snippets().is_empty());
    }

    #[test]
    fn import_replaces_and_export_writes_a_copy() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";old/".into(), "gone".into()).unwrap();

        let duplicate = Snippet::new(";x/".into(), "one".into());
        let mut twin = duplicate.clone();
        twin.expansion = "two".into();
        let import_path = dir.path().join("import.json");
        fs::write(
            &import_path,
            serde_json::to_string(&vec![duplicate, twin]).unwrap(),
        )
        .unwrap();

        assert_eq!(store.import_from(&import_path).unwrap(), 2);
        let ids: HashSet<_> = store.snippets().iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(store.find_by_trigger(";old/").is_none());

        let export_path = dir.path().join("export.json");
        store.export_to(&export_path).unwrap();
        let exported = SnippetStore::open(export_path);
        assert_eq!(exported.snippets(), store.snippets());
    }

    #[test]
    fn malformed_import_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(";keep/".into(), "kept".into()).unwrap();

        let import_path = dir.path().join("bad.json");
        fs::write(&import_path, "not json").unwrap();
        assert!(store.import_from(&import_path).is_err());
        assert_eq!(store.snippets().len(), 1);
    }
}
