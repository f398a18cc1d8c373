use crate::clipboard::SystemClipboard;
use crate::error::{ExpandoError, Result};
use crate::traits::{ClipboardAccess, TextInjector};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// Modifier held for the paste shortcut on this platform.
pub fn paste_modifier() -> Key {
    if cfg!(target_os = "macos") {
        Key::Meta
    } else {
        Key::Control
    }
}

/// Create a keyboard controller
pub fn create_keyboard_controller() -> Result<Enigo> {
    Enigo::new(&Settings::default()).map_err(|err| {
        ExpandoError::Keyboard(format!("Failed to create keyboard controller: {}", err))
    })
}

fn press(keyboard: &mut Enigo, key: Key, direction: Direction) -> Result<()> {
    keyboard
        .key(key, direction)
        .map_err(|err| ExpandoError::Keyboard(format!("Failed to send {:?}: {}", key, err)))
}

/// Send backspace key presses
pub fn send_backspace(keyboard: &mut Enigo, count: usize) -> Result<()> {
    for _ in 0..count {
        thread::sleep(Duration::from_millis(2));
        press(keyboard, Key::Backspace, Direction::Click)?;
    }
    Ok(())
}

/// Press the platform paste shortcut.
pub fn send_paste(keyboard: &mut Enigo) -> Result<()> {
    let modifier = paste_modifier();
    press(keyboard, modifier, Direction::Press)?;
    let clicked = press(keyboard, Key::Unicode('v'), Direction::Click);
    // Release the modifier even when the click failed.
    press(keyboard, modifier, Direction::Release)?;
    clicked
}

/// Injects edits into the focused application through synthetic key events.
///
/// The controller is created per call so the injector can move between
/// threads on every platform.
#[derive(Default)]
pub struct EnigoInjector {
    clipboard: SystemClipboard,
}

impl EnigoInjector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextInjector for EnigoInjector {
    fn delete_backward(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let mut keyboard = create_keyboard_controller()?;
        send_backspace(&mut keyboard, count)
    }

    fn paste_text(&mut self, text: &str) -> Result<()> {
        self.clipboard.set_text(text)?;
        thread::sleep(Duration::from_millis(5));
        let mut keyboard = create_keyboard_controller()?;
        send_paste(&mut keyboard)
    }
}

enum Injection {
    Delete(usize),
    Paste(String),
}

/// Runs a blocking injector on its own thread.
///
/// Calls enqueue and return at once, so key pacing sleeps never stall the
/// caller. Edits run in submission order; failures are logged by the worker.
/// Dropping the injector drains the queue and joins the thread.
pub struct ThreadedInjector {
    sender: Option<Sender<Injection>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedInjector {
    pub fn spawn<I>(mut inner: I) -> Result<Self>
    where
        I: TextInjector + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Injection>();
        let worker = thread::Builder::new()
            .name("expando-injector".to_string())
            .spawn(move || {
                for injection in receiver {
                    let outcome = match &injection {
                        Injection::Delete(count) => inner.delete_backward(*count),
                        Injection::Paste(text) => inner.paste_text(text),
                    };
                    if let Err(e) = outcome {
                        warn!(error = %e, "injection failed");
                    }
                }
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn submit(&self, injection: Injection) -> Result<()> {
        self.sender
            .as_ref()
            .and_then(|sender| sender.send(injection).ok())
            .ok_or_else(|| ExpandoError::Keyboard("injection thread has stopped".to_string()))
    }
}

impl TextInjector for ThreadedInjector {
    fn delete_backward(&mut self, count: usize) -> Result<()> {
        self.submit(Injection::Delete(count))
    }

    fn paste_text(&mut self, text: &str) -> Result<()> {
        self.submit(Injection::Paste(text.to_string()))
    }
}

impl Drop for ThreadedInjector {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{InjectedEdit, RecordingInjector};
    use std::time::Instant;

    struct SlowInjector {
        inner: RecordingInjector,
        delay: Duration,
    }

    impl TextInjector for SlowInjector {
        fn delete_backward(&mut self, count: usize) -> Result<()> {
            thread::sleep(self.delay);
            self.inner.delete_backward(count)
        }

        fn paste_text(&mut self, text: &str) -> Result<()> {
            thread::sleep(self.delay);
            self.inner.paste_text(text)
        }
    }

    #[test]
    fn threaded_injector_returns_before_the_edit_runs() {
        let recorder = RecordingInjector::default();
        let mut injector = ThreadedInjector::spawn(SlowInjector {
            inner: recorder.clone(),
            delay: Duration::from_millis(100),
        })
        .unwrap();

        let started = Instant::now();
        injector.delete_backward(5).unwrap();
        injector.paste_text("user@example.com").unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));

        drop(injector);
        assert_eq!(
            recorder.edits(),
            vec![
                InjectedEdit::DeleteBackward(5),
                InjectedEdit::Paste("user@example.com".to_string())
            ]
        );
    }

    #[test]
    fn paste_uses_the_platform_modifier() {
        let expected = if cfg!(target_os = "macos") {
            Key::Meta
        } else {
            Key::Control
        };
        assert_eq!(paste_modifier(), expected);
    }
}
