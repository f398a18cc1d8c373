//! Debounced watch over the config directory.
//!
//! Raw notify events are classified by file name and coalesced: each event
//! pushes the flush deadline out by the quiet period, and one
//! `DocumentsChanged` message naming every touched document is sent when the
//! directory has been quiet for that long.

use expando_core::config::{SETTINGS_FILENAME, SNIPPETS_FILENAME};
use expando_core::{ChangedDocuments, ExpandoError, Result, ServiceMessage};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub dir: PathBuf,
    pub debounce: Duration,
}

impl WatchConfig {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            debounce: Duration::from_millis(200),
        }
    }
}

/// Which documents a path refers to. Temp files from atomic saves match nothing.
pub fn classify(path: &Path) -> ChangedDocuments {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    ChangedDocuments {
        snippets: name == SNIPPETS_FILENAME,
        settings: name == SETTINGS_FILENAME,
    }
}

fn classify_event(event: &Event, self_write: &AtomicBool) -> ChangedDocuments {
    if matches!(event.kind, EventKind::Access(_)) {
        return ChangedDocuments::default();
    }
    let mut changed = ChangedDocuments::default();
    for path in &event.paths {
        changed.merge(classify(path));
    }
    // Our own saves; a late event is still harmless because the store's
    // signature will match.
    if changed.snippets && self_write.load(Ordering::SeqCst) {
        changed.snippets = false;
    }
    changed
}

pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl DocumentWatcher {
    pub fn start(
        config: WatchConfig,
        self_write: Arc<AtomicBool>,
        owner: UnboundedSender<ServiceMessage>,
        handle: &Handle,
    ) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let changed = classify_event(&event, &self_write);
                    if changed.any() {
                        let _ = raw_tx.send(changed);
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| ExpandoError::Watcher(format!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(&config.dir, RecursiveMode::NonRecursive)
            .map_err(|e| ExpandoError::Watcher(format!("Failed to watch path: {}", e)))?;
        info!(dir = %config.dir.display(), "watching config directory");

        let task = handle.spawn(debounce_changes(raw_rx, owner, config.debounce));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

/// Coalesce raw changes until `quiet` passes with no new ones, then notify the owner.
pub(crate) async fn debounce_changes(
    mut raw: UnboundedReceiver<ChangedDocuments>,
    owner: UnboundedSender<ServiceMessage>,
    quiet: Duration,
) {
    let mut pending = ChangedDocuments::default();
    loop {
        if !pending.any() {
            match raw.recv().await {
                Some(changed) => pending.merge(changed),
                None => return,
            }
            continue;
        }

        tokio::select! {
            next = raw.recv() => match next {
                Some(changed) => pending.merge(changed),
                None => {
                    let _ = owner.send(ServiceMessage::DocumentsChanged(pending));
                    return;
                }
            },
            _ = tokio::time::sleep(quiet) => {
                debug!(?pending, "flushing document changes");
                if owner.send(ServiceMessage::DocumentsChanged(pending)).is_err() {
                    return;
                }
                pending = ChangedDocuments::default();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[test]
    fn classifies_documents_and_ignores_temp_files() {
        let dir = Path::new("/cfg");
        assert!(classify(&dir.join("snippets.json")).snippets);
        assert!(classify(&dir.join("settings.json")).settings);
        assert!(!classify(&dir.join("snippets.json.tmp")).any());
        assert!(!classify(&dir.join("stats.json")).any());
    }

    #[test]
    fn self_writes_are_skipped() {
        let event = Event::new(EventKind::Any)
            .add_path(PathBuf::from("/cfg/snippets.json"))
            .add_path(PathBuf::from("/cfg/settings.json"));
        let flag = AtomicBool::new(true);
        let changed = classify_event(&event, &flag);
        assert!(!changed.snippets);
        assert!(changed.settings);

        flag.store(false, Ordering::SeqCst);
        assert!(classify_event(&event, &flag).snippets);
    }

    #[tokio::test]
    async fn bursts_coalesce_into_one_message() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (owner_tx, mut owner_rx) = mpsc::unbounded_channel();
        tokio::spawn(debounce_changes(
            raw_rx,
            owner_tx,
            Duration::from_millis(50),
        ));

        for _ in 0..5 {
            raw_tx
                .send(ChangedDocuments {
                    snippets: true,
                    settings: false,
                })
                .unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        raw_tx
            .send(ChangedDocuments {
                snippets: false,
                settings: true,
            })
            .unwrap();

        let message = timeout(Duration::from_secs(2), owner_rx.recv())
            .await
            .unwrap();
        assert_eq!(
            message,
            Some(ServiceMessage::DocumentsChanged(ChangedDocuments {
                snippets: true,
                settings: true,
            }))
        );
        assert!(
            timeout(Duration::from_millis(150), owner_rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn external_edit_reaches_the_owner() {
        let dir = TempDir::new().unwrap();
        let (owner_tx, mut owner_rx) = mpsc::unbounded_channel();
        let watcher = DocumentWatcher::start(
            WatchConfig {
                dir: dir.path().to_path_buf(),
                debounce: Duration::from_millis(50),
            },
            Arc::new(AtomicBool::new(false)),
            owner_tx,
            &Handle::current(),
        )
        .unwrap();

        fs::write(dir.path().join("snippets.json"), "[]").unwrap();

        let message = timeout(Duration::from_secs(5), owner_rx.recv())
            .await
            .unwrap();
        match message {
            Some(ServiceMessage::DocumentsChanged(changed)) => assert!(changed.snippets),
            other => panic!("unexpected message {:?}", other),
        }
        watcher.stop();
    }
}
