//! The daemon's owner loop and its wiring.

use crate::keyboard_listener::start_keyboard_listener;
use crate::scheduler::TokioScheduler;
use crate::watcher::{DocumentWatcher, WatchConfig};
use expando_core::clipboard::SystemClipboard;
use expando_core::config::{
    ensure_config_dir, get_settings_file_path, get_snippets_file_path, get_stats_file_path,
};
use expando_core::keyboard::{EnigoInjector, ThreadedInjector};
use expando_core::traits::NoSelection;
use expando_core::{
    EngineContext, EventDispatcher, ExpansionService, ReplacementOrchestrator, Result,
    ServiceMessage, SettingsStore, SnippetStore, StatsStore,
};
use tokio::runtime::{Builder, Handle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

pub const LOG_ENV: &str = "EXPANDO_LOG";

/// Install the stderr subscriber; the detached worker's stderr is the daemon log.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Drain owner messages into the service until shutdown or until every sender is gone.
pub async fn owner_loop(
    mut service: ExpansionService,
    mut messages: UnboundedReceiver<ServiceMessage>,
) -> ExpansionService {
    while let Some(message) = messages.recv().await {
        if !service.handle(message) {
            break;
        }
    }
    service
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "cannot listen for SIGTERM"),
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}

fn forward_shutdown(handle: &Handle, sender: UnboundedSender<ServiceMessage>) {
    handle.spawn(async move {
        wait_for_signal().await;
        info!("termination signal received");
        let _ = sender.send(ServiceMessage::Shutdown);
    });
}

/// Build the engine against the real host and run it until shutdown.
pub async fn run_service() -> Result<()> {
    let config_dir = ensure_config_dir()?;
    let handle = Handle::current();
    let (sender, messages) = mpsc::unbounded_channel();

    let store = SnippetStore::open(get_snippets_file_path());
    let mut settings = SettingsStore::new(get_settings_file_path());
    settings.load();
    let stats = StatsStore::open(get_stats_file_path());

    let ctx = EngineContext {
        injector: Box::new(ThreadedInjector::spawn(EnigoInjector::new())?),
        clipboard: Box::new(SystemClipboard::new()),
        selection: Box::new(NoSelection),
        scheduler: Box::new(TokioScheduler::new(handle.clone(), sender.clone())),
        recorder: Some(Box::new(stats)),
    };

    let watcher = DocumentWatcher::start(
        WatchConfig::new(config_dir),
        store.self_write_flag(),
        sender.clone(),
        &handle,
    )?;

    let service = ExpansionService::new(
        EventDispatcher::new(ctx, ReplacementOrchestrator::default()),
        store,
        settings,
    );
    info!(
        snippets = service.store().snippets().len(),
        triggers = service.dispatcher().index().len(),
        enabled = service.dispatcher().is_enabled(),
        "expansion service ready"
    );

    forward_shutdown(&handle, sender.clone());
    let _listener = start_keyboard_listener(sender);

    owner_loop(service, messages).await;
    watcher.stop();
    Ok(())
}

/// Blocking entry point for the worker process.
pub fn run_daemon_worker() -> Result<()> {
    init_logging();
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run_service())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expando_core::models::KeyEvent;
    use expando_core::orchestrator::Phase;
    use expando_core::recording::{InjectedEdit, MemoryClipboard, RecordingInjector};
    use expando_core::traits::ReplacementStep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn service_in(
        dir: &TempDir,
        handle: Handle,
        sender: UnboundedSender<ServiceMessage>,
        injector: RecordingInjector,
    ) -> ExpansionService {
        let mut store = SnippetStore::new(dir.path().join("snippets.json"));
        store
            .add(";eml/".to_string(), "user@example.com".to_string())
            .unwrap();
        let ctx = EngineContext {
            injector: Box::new(injector),
            clipboard: Box::new(MemoryClipboard::with_text("kept")),
            selection: Box::new(NoSelection),
            scheduler: Box::new(TokioScheduler::new(handle, sender)),
            recorder: None,
        };
        ExpansionService::new(
            EventDispatcher::new(ctx, ReplacementOrchestrator::default()),
            store,
            SettingsStore::new(dir.path().join("settings.json")),
        )
    }

    #[tokio::test]
    async fn owner_loop_runs_a_replacement_through_the_scheduler() {
        let dir = TempDir::new().unwrap();
        let (sender, messages) = mpsc::unbounded_channel();
        let injector = RecordingInjector::default();
        let service = service_in(&dir, Handle::current(), sender.clone(), injector.clone());

        let owner = tokio::spawn(owner_loop(service, messages));
        for c in " ;eml/".chars() {
            sender
                .send(ServiceMessage::Key(KeyEvent::text(&c.to_string())))
                .unwrap();
        }

        // Delete, paste, restore and settle take about 350ms.
        tokio::time::sleep(Duration::from_millis(800)).await;
        sender.send(ServiceMessage::Shutdown).unwrap();
        let service = owner.await.unwrap();

        assert_eq!(
            injector.edits(),
            vec![
                InjectedEdit::DeleteBackward(5),
                InjectedEdit::Paste("user@example.com".to_string())
            ]
        );
        assert_eq!(service.dispatcher().phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn owner_loop_ends_when_senders_are_dropped() {
        let dir = TempDir::new().unwrap();
        let (step_sender, _steps) = mpsc::unbounded_channel();
        let service = service_in(
            &dir,
            Handle::current(),
            step_sender,
            RecordingInjector::default(),
        );

        let (sender, messages) = mpsc::unbounded_channel();
        sender
            .send(ServiceMessage::Key(KeyEvent::text("a")))
            .unwrap();
        sender
            .send(ServiceMessage::Step(ReplacementStep::Settle))
            .unwrap();
        drop(sender);

        let service = owner_loop(service, messages).await;
        assert_eq!(service.dispatcher().buffer().text(), "a");
    }
}
