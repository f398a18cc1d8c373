use crate::error::{ExpandoError, Result};
use crate::traits::ClipboardAccess;
use arboard::Clipboard;

/// The system clipboard, opened on first use and kept for the process.
///
/// Some platforms only serve clipboard contents while a handle is alive, so
/// the handle is not dropped between calls.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut Clipboard> {
        if self.handle.is_none() {
            let clipboard =
                Clipboard::new().map_err(|e| ExpandoError::Clipboard(e.to_string()))?;
            self.handle = Some(clipboard);
        }
        self.handle
            .as_mut()
            .ok_or_else(|| ExpandoError::Clipboard("clipboard unavailable".to_string()))
    }
}

impl ClipboardAccess for SystemClipboard {
    fn get_text(&mut self) -> Result<Option<String>> {
        match self.handle()?.get_text() {
            Ok(text) => Ok(Some(text)),
            // Empty, or holding something that is not text.
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ExpandoError::Clipboard(e.to_string())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.handle()?
            .set_text(text)
            .map_err(|e| ExpandoError::Clipboard(e.to_string()))
    }

    fn clear(&mut self) -> Result<()> {
        self.handle()?
            .clear()
            .map_err(|e| ExpandoError::Clipboard(e.to_string()))
    }
}
