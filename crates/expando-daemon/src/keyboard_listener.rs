use expando_core::models::{KeyEvent, Modifiers};
use expando_core::ServiceMessage;
use rdev::{self, EventType, Key as RdevKey};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

const MAX_RETRIES: u32 = 5;

/// Turns raw rdev events into owner messages, tracking held modifiers.
#[derive(Debug, Clone, Default)]
pub struct KeyDecoder {
    modifiers: Modifiers,
}

impl KeyDecoder {
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns `None` for events the engine does not care about.
    pub fn decode(&mut self, event_type: &EventType, name: Option<&str>) -> Option<ServiceMessage> {
        match event_type {
            EventType::KeyPress(key) => {
                if self.track_modifier(*key, true) {
                    return None;
                }
                Some(ServiceMessage::Key(self.key_event(*key, name)))
            }
            EventType::KeyRelease(key) => {
                self.track_modifier(*key, false);
                None
            }
            // A click can move the caret anywhere.
            EventType::ButtonPress(_) => Some(ServiceMessage::ContextChanged),
            _ => None,
        }
    }

    fn track_modifier(&mut self, key: RdevKey, down: bool) -> bool {
        match key {
            RdevKey::ShiftLeft | RdevKey::ShiftRight => self.modifiers.shift = down,
            RdevKey::ControlLeft | RdevKey::ControlRight => self.modifiers.control = down,
            RdevKey::Alt | RdevKey::AltGr => self.modifiers.alt = down,
            RdevKey::MetaLeft | RdevKey::MetaRight => self.modifiers.command = down,
            _ => return false,
        }
        true
    }

    fn key_event(&self, key: RdevKey, name: Option<&str>) -> KeyEvent {
        let base = match key {
            RdevKey::Backspace => KeyEvent::backspace(),
            RdevKey::Delete => KeyEvent::delete_forward(),
            RdevKey::LeftArrow
            | RdevKey::RightArrow
            | RdevKey::UpArrow
            | RdevKey::DownArrow
            | RdevKey::Home
            | RdevKey::End
            | RdevKey::PageUp
            | RdevKey::PageDown => KeyEvent::arrow(),
            RdevKey::Return | RdevKey::KpReturn => KeyEvent::text("\n"),
            RdevKey::Tab => KeyEvent::text("\t"),
            RdevKey::Space => KeyEvent::text(" "),
            _ => match name.filter(|n| !n.is_empty()) {
                Some(text) => KeyEvent::text(text),
                None => KeyEvent::default(),
            },
        };

        let mut event = base.with_modifiers(self.modifiers);
        event.key_code = virtual_key_code(key);
        event
    }
}

/// USB HID usage id for a named key; keys rdev cannot name keep their raw
/// platform code.
pub fn virtual_key_code(key: RdevKey) -> u32 {
    match key {
        RdevKey::KeyA => 0x04,
        RdevKey::KeyB => 0x05,
        RdevKey::KeyC => 0x06,
        RdevKey::KeyD => 0x07,
        RdevKey::KeyE => 0x08,
        RdevKey::KeyF => 0x09,
        RdevKey::KeyG => 0x0A,
        RdevKey::KeyH => 0x0B,
        RdevKey::KeyI => 0x0C,
        RdevKey::KeyJ => 0x0D,
        RdevKey::KeyK => 0x0E,
        RdevKey::KeyL => 0x0F,
        RdevKey::KeyM => 0x10,
        RdevKey::KeyN => 0x11,
        RdevKey::KeyO => 0x12,
        RdevKey::KeyP => 0x13,
        RdevKey::KeyQ => 0x14,
        RdevKey::KeyR => 0x15,
        RdevKey::KeyS => 0x16,
        RdevKey::KeyT => 0x17,
        RdevKey::KeyU => 0x18,
        RdevKey::KeyV => 0x19,
        RdevKey::KeyW => 0x1A,
        RdevKey::KeyX => 0x1B,
        RdevKey::KeyY => 0x1C,
        RdevKey::KeyZ => 0x1D,
        RdevKey::Num1 => 0x1E,
        RdevKey::Num2 => 0x1F,
        RdevKey::Num3 => 0x20,
        RdevKey::Num4 => 0x21,
        RdevKey::Num5 => 0x22,
        RdevKey::Num6 => 0x23,
        RdevKey::Num7 => 0x24,
        RdevKey::Num8 => 0x25,
        RdevKey::Num9 => 0x26,
        RdevKey::Num0 => 0x27,
        RdevKey::Return => 0x28,
        RdevKey::Escape => 0x29,
        RdevKey::Backspace => 0x2A,
        RdevKey::Tab => 0x2B,
        RdevKey::Space => 0x2C,
        RdevKey::Minus => 0x2D,
        RdevKey::Equal => 0x2E,
        RdevKey::LeftBracket => 0x2F,
        RdevKey::RightBracket => 0x30,
        RdevKey::BackSlash => 0x31,
        RdevKey::SemiColon => 0x33,
        RdevKey::Quote => 0x34,
        RdevKey::BackQuote => 0x35,
        RdevKey::Comma => 0x36,
        RdevKey::Dot => 0x37,
        RdevKey::Slash => 0x38,
        RdevKey::CapsLock => 0x39,
        RdevKey::F1 => 0x3A,
        RdevKey::F2 => 0x3B,
        RdevKey::F3 => 0x3C,
        RdevKey::F4 => 0x3D,
        RdevKey::F5 => 0x3E,
        RdevKey::F6 => 0x3F,
        RdevKey::F7 => 0x40,
        RdevKey::F8 => 0x41,
        RdevKey::F9 => 0x42,
        RdevKey::F10 => 0x43,
        RdevKey::F11 => 0x44,
        RdevKey::F12 => 0x45,
        RdevKey::PrintScreen => 0x46,
        RdevKey::ScrollLock => 0x47,
        RdevKey::Pause => 0x48,
        RdevKey::Insert => 0x49,
        RdevKey::Home => 0x4A,
        RdevKey::PageUp => 0x4B,
        RdevKey::Delete => 0x4C,
        RdevKey::End => 0x4D,
        RdevKey::PageDown => 0x4E,
        RdevKey::RightArrow => 0x4F,
        RdevKey::LeftArrow => 0x50,
        RdevKey::DownArrow => 0x51,
        RdevKey::UpArrow => 0x52,
        RdevKey::NumLock => 0x53,
        RdevKey::KpDivide => 0x54,
        RdevKey::KpMultiply => 0x55,
        RdevKey::KpMinus => 0x56,
        RdevKey::KpPlus => 0x57,
        RdevKey::KpReturn => 0x58,
        RdevKey::Kp1 => 0x59,
        RdevKey::Kp2 => 0x5A,
        RdevKey::Kp3 => 0x5B,
        RdevKey::Kp4 => 0x5C,
        RdevKey::Kp5 => 0x5D,
        RdevKey::Kp6 => 0x5E,
        RdevKey::Kp7 => 0x5F,
        RdevKey::Kp8 => 0x60,
        RdevKey::Kp9 => 0x61,
        RdevKey::Kp0 => 0x62,
        RdevKey::KpDelete => 0x63,
        RdevKey::IntlBackslash => 0x64,
        RdevKey::ControlLeft => 0xE0,
        RdevKey::ShiftLeft => 0xE1,
        RdevKey::Alt => 0xE2,
        RdevKey::MetaLeft => 0xE3,
        RdevKey::ControlRight => 0xE4,
        RdevKey::ShiftRight => 0xE5,
        RdevKey::AltGr => 0xE6,
        RdevKey::MetaRight => 0xE7,
        RdevKey::Function => 0,
        RdevKey::Unknown(code) => code,
        #[allow(unreachable_patterns)]
        _ => 0,
    }
}

/// Capture global key events on a dedicated thread and forward them to the owner.
///
/// Sending on `sender` is the only thing this thread does with the engine.
pub fn start_keyboard_listener(sender: UnboundedSender<ServiceMessage>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut decoder = KeyDecoder::default();
        let forward = sender.clone();
        let callback = move |event: rdev::Event| {
            if let Some(message) = decoder.decode(&event.event_type, event.name.as_deref()) {
                if forward.send(message).is_err() {
                    debug!("owner loop gone, dropping key event");
                }
            }
        };

        let mut retry_count = 0;
        while !sender.is_closed() && retry_count < MAX_RETRIES {
            match rdev::listen(callback.clone()) {
                Ok(()) => break,
                Err(e) => {
                    retry_count += 1;
                    warn!(error = ?e, retry_count, "keyboard listener failed, retrying");
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }

        if retry_count >= MAX_RETRIES {
            error!(attempts = MAX_RETRIES, "failed to start keyboard listener");
        }
    })
}
