use expando_core::traits::{ReplacementStep, Scheduler};
use expando_core::ServiceMessage;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Delivers replacement steps back into the owner channel after a delay.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    sender: UnboundedSender<ServiceMessage>,
}

impl TokioScheduler {
    pub fn new(handle: Handle, sender: UnboundedSender<ServiceMessage>) -> Self {
        Self { handle, sender }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, step: ReplacementStep) {
        let sender = self.sender.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(ServiceMessage::Step(step)).is_err() {
                debug!(?step, "owner loop gone, dropping step");
            }
        });
    }
}
