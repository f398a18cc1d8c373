use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored trigger and the text it expands to.
///
/// `trigger` is kept exactly as the user entered it; normalization against the
/// current delimiter settings happens when the trigger index is built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: Uuid,
    pub trigger: String,
    pub expansion: String,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Snippet {
    pub fn new(trigger: String, expansion: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            expansion,
            is_enabled: true,
        }
    }
}

/// Modifier keys held while a key was pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub command: bool,
}

impl Modifiers {
    /// Command or control combinations are shortcuts, not typing.
    pub fn is_shortcut(&self) -> bool {
        self.command || self.control
    }
}

/// A decoded key press as delivered by a key source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    /// Characters produced by the key; `None` when the host could not decode it.
    pub text: Option<String>,
    /// Virtual key code (USB HID usage id where the key is known).
    pub key_code: u32,
    pub modifiers: Modifiers,
    pub is_backspace: bool,
    pub is_delete_forward: bool,
    pub is_arrow: bool,
}

impl KeyEvent {
    pub fn text(s: &str) -> Self {
        Self {
            text: Some(s.to_string()),
            ..Self::default()
        }
    }

    pub fn backspace() -> Self {
        Self {
            is_backspace: true,
            ..Self::default()
        }
    }

    pub fn delete_forward() -> Self {
        Self {
            is_delete_forward: true,
            ..Self::default()
        }
    }

    pub fn arrow() -> Self {
        Self {
            is_arrow: true,
            ..Self::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Printable payload, if the event carries any.
    pub fn printable(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| {
                !t.is_empty() && t.chars().all(|c| !c.is_control() || c.is_whitespace())
            })
    }
}
