//! System-wide hotkeys via global-hotkey
//!
//! Each binding is registered on its own: a combo that fails to parse or is already taken by
//! another program disables only that action. Presses arrive on the backend's thread and are
//! forwarded as [`AppCommand`]s to the UI thread, which does the actual work.

use anyhow::{Context, Result};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::config::HotkeyBindings;
use crate::error::Error;
use crate::types::AppCommand;

/// Backend-assigned id of one registered combo
pub type HotkeyHandle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    ToggleBox,
    ToggleAction,
    ExitApp,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 3] = [Self::ToggleBox, Self::ToggleAction, Self::ExitApp];

    pub fn command(self) -> AppCommand {
        match self {
            Self::ToggleBox => AppCommand::ToggleRegionOverlay,
            Self::ToggleAction => AppCommand::ToggleDetection,
            Self::ExitApp => AppCommand::Exit,
        }
    }

    /// Human-readable label for the settings form
    pub fn label(self) -> &'static str {
        match self {
            Self::ToggleBox => "Toggle region box",
            Self::ToggleAction => "Toggle detection",
            Self::ExitApp => "Exit",
        }
    }

    fn combo(self, bindings: &HotkeyBindings) -> &str {
        match self {
            Self::ToggleBox => &bindings.toggle_box,
            Self::ToggleAction => &bindings.toggle_action,
            Self::ExitApp => &bindings.exit_app,
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::ToggleBox => "toggle_box",
            Self::ToggleAction => "toggle_action",
            Self::ExitApp => "exit_app",
        };
        f.write_str(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("no key combination set")]
    Empty,
    #[error("invalid key combination: {0}")]
    Parse(String),
    #[error("rejected by the system: {0}")]
    Rejected(String),
}

pub trait HotkeyBackend {
    fn register(&mut self, combo: &str) -> Result<HotkeyHandle, HotkeyError>;
    fn unregister(&mut self, handle: HotkeyHandle);
}

/// Parse a combo string in global-hotkey syntax (`F3`, `ctrl+shift+KeyS`)
pub fn parse_combo(combo: &str) -> Result<HotKey, HotkeyError> {
    let combo = combo.trim();
    if combo.is_empty() {
        return Err(HotkeyError::Empty);
    }
    HotKey::from_str(combo).map_err(|err| HotkeyError::Parse(err.to_string()))
}

pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    registered: HashMap<HotkeyHandle, HotKey>,
}

impl GlobalHotkeyBackend {
    /// Must be called on the thread that runs the window event loop
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to initialize global hotkey manager")?;
        Ok(Self { manager, registered: HashMap::new() })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, combo: &str) -> Result<HotkeyHandle, HotkeyError> {
        let hotkey = parse_combo(combo)?;
        self.manager
            .register(hotkey)
            .map_err(|err| HotkeyError::Rejected(err.to_string()))?;
        self.registered.insert(hotkey.id(), hotkey);
        Ok(hotkey.id())
    }

    fn unregister(&mut self, handle: HotkeyHandle) {
        if let Some(hotkey) = self.registered.remove(&handle)
            && let Err(err) = self.manager.unregister(hotkey)
        {
            warn!(error = %err, "Failed to unregister hotkey");
        }
    }
}

/// Handle-to-action lookup shared with the backend's event callback
#[derive(Clone, Default)]
pub struct ActionMap(Arc<RwLock<HashMap<HotkeyHandle, HotkeyAction>>>);

impl ActionMap {
    pub fn lookup(&self, handle: HotkeyHandle) -> Option<HotkeyAction> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).get(&handle).copied()
    }

    fn replace(&self, entries: HashMap<HotkeyHandle, HotkeyAction>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = entries;
    }
}

/// Per-binding outcome of the last [`HotkeyRegistry::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingStatus {
    Registered,
    Disabled(String),
}

pub struct HotkeyRegistry<B> {
    backend: B,
    handles: Vec<HotkeyHandle>,
    map: ActionMap,
    status: HashMap<HotkeyAction, BindingStatus>,
}

impl<B: HotkeyBackend> HotkeyRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handles: Vec::new(),
            map: ActionMap::default(),
            status: HashMap::new(),
        }
    }

    /// Replace all registrations with `bindings`
    ///
    /// Returns one error per binding that could not be registered; the rest are live.
    pub fn apply(&mut self, bindings: &HotkeyBindings) -> Vec<Error> {
        for handle in self.handles.drain(..) {
            self.backend.unregister(handle);
        }

        let mut entries = HashMap::new();
        let mut failures = Vec::new();
        for action in HotkeyAction::ALL {
            let combo = action.combo(bindings);
            match self.backend.register(combo) {
                Ok(handle) => {
                    info!(action = %action, combo, "Registered hotkey");
                    self.handles.push(handle);
                    entries.insert(handle, action);
                    self.status.insert(action, BindingStatus::Registered);
                }
                Err(err) => {
                    let err = Error::HotkeyRegistration {
                        action,
                        combo: combo.to_string(),
                        reason: err.to_string(),
                    };
                    warn!(error = %err, "Hotkey disabled");
                    self.status.insert(action, BindingStatus::Disabled(err.to_string()));
                    failures.push(err);
                }
            }
        }

        self.map.replace(entries);
        failures
    }

    pub fn status(&self, action: HotkeyAction) -> Option<&BindingStatus> {
        self.status.get(&action)
    }

    pub fn action_map(&self) -> ActionMap {
        self.map.clone()
    }
}

/// Route hotkey presses to the UI command queue
///
/// `wake` runs after each posted command so an idle UI picks it up promptly.
pub fn install_event_handler(
    map: ActionMap,
    commands: Sender<AppCommand>,
    wake: impl Fn() + Send + Sync + 'static,
) {
    GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
        if event.state != HotKeyState::Pressed {
            return;
        }
        let Some(action) = map.lookup(event.id) else {
            debug!(id = event.id, "Press for unknown hotkey");
            return;
        };
        debug!(action = %action, "Hotkey pressed");
        if commands.send(action.command()).is_ok() {
            wake();
        }
    }));
}
