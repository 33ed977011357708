//! Recoverable failure kinds
//!
//! None of these ends the process. Each is absorbed where it happens and turned into a log
//! line, a skipped cycle, a disabled hotkey or a default config.

use std::path::PathBuf;

use thiserror::Error;

use crate::hotkeys::HotkeyAction;

#[derive(Debug, Error)]
pub enum Error {
    /// Screen grab failed or produced nothing; the cycle is skipped
    #[error("screen capture unavailable: {0}")]
    TransientCapture(String),

    /// Config file exists but is not valid TOML for our schema
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config i/o on {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One binding could not be registered; the other bindings are unaffected
    #[error("hotkey '{combo}' for {action} not registered: {reason}")]
    HotkeyRegistration {
        action: HotkeyAction,
        combo: String,
        reason: String,
    },

    /// Key press could not be synthesized; counts as a missed trigger
    #[error("key dispatch failed: {0}")]
    ActionDispatch(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
