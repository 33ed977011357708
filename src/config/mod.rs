//! Configuration management
//!
//! - **settings**: the typed [`Config`] with built-in defaults
//! - **store**: TOML persistence with key backfilling and atomic replace

pub mod settings;
pub mod store;

pub use settings::{Config, HotkeyBindings};
pub use store::ConfigStore;
