//! Synthetic key presses through enigo

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use tracing::{debug, info, warn};

use crate::constants::config::DEFAULT_TRIGGER_KEY;
use crate::error::{Error, Result};

/// What the detection loop does on a positive frame
pub trait Action {
    fn trigger(&mut self) -> Result<()>;
}

/// Press-and-release of a single key
///
/// The enigo connection is opened on first use and dropped after any failure, so a backend
/// that comes and goes (display server restart, revoked permission) is retried on the next hit.
pub struct KeyTap {
    key: Key,
    enigo: Option<Enigo>,
}

impl KeyTap {
    pub fn new(key: Key) -> Self {
        Self { key, enigo: None }
    }

    /// Build from a config key name, falling back to Enter for unknown names
    pub fn from_name(name: &str) -> Self {
        let key = parse_key(name).unwrap_or_else(|| {
            warn!(trigger_key = name, fallback = DEFAULT_TRIGGER_KEY, "Unknown trigger key, using fallback");
            Key::Return
        });
        info!(key = ?key, "Trigger key configured");
        Self::new(key)
    }

    fn backend(&mut self) -> Result<&mut Enigo> {
        if self.enigo.is_none() {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|err| Error::ActionDispatch(format!("failed to open input backend: {err}")))?;
            debug!("Opened input backend");
            self.enigo = Some(enigo);
        }
        self.enigo
            .as_mut()
            .ok_or_else(|| Error::ActionDispatch("input backend missing".to_string()))
    }
}

impl Action for KeyTap {
    fn trigger(&mut self) -> Result<()> {
        let key = self.key;
        let result = self
            .backend()
            .and_then(|enigo| {
                enigo
                    .key(key, Direction::Click)
                    .map_err(|err| Error::ActionDispatch(format!("key {key:?} rejected: {err}")))
            });
        if result.is_err() {
            self.enigo = None;
        }
        result
    }
}

/// Key names accepted in `[detection] trigger_key`
pub fn parse_key(name: &str) -> Option<Key> {
    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(Key::Unicode(c.to_ascii_lowercase()));
    }

    let key = match name.to_ascii_lowercase().as_str() {
        "enter" | "return" => Key::Return,
        "space" => Key::Space,
        "tab" => Key::Tab,
        "escape" | "esc" => Key::Escape,
        "backspace" => Key::Backspace,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => return None,
    };
    Some(key)
}
