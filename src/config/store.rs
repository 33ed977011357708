//! TOML persistence for [`Config`]
//!
//! Loading never fails: a missing, unreadable or malformed file is replaced by defaults which
//! are written back. Saving merges the typed values into the existing document with
//! `toml_edit`, so keys we do not know about and the user's comments survive, then swaps the
//! file in through a temp file and a rename.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, TableLike, Value};
use tracing::{error, info, warn};

use super::settings::Config;
use crate::error::Error;

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config location
    pub fn at_default_location() -> Self {
        Self::new(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, falling back to (and persisting) defaults on any problem
    pub fn load(&self) -> Config {
        match self.read() {
            Ok(Some((mut config, contents))) => {
                let clamped = config.validate_and_clamp();
                // Backfill keys missing from the file (and clamped values) so the user sees them
                let merged = merge_into_document(&contents, &config).to_string();
                if clamped || merged != contents {
                    info!(path = %self.path.display(), "Writing backfilled config keys");
                    self.persist_fallback(&config);
                }
                info!(path = %self.path.display(), region = %config.capture_region, "Loaded config");
                config
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No config file found, creating default");
                let config = Config::default();
                self.persist_fallback(&config);
                config
            }
            Err(err) => {
                warn!(error = %err, "Config unusable, falling back to defaults");
                let config = Config::default();
                self.persist_fallback(&config);
                config
            }
        }
    }

    /// Read and parse the file; `Ok(None)` when it does not exist
    fn read(&self) -> Result<Option<(Config, String)>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::ConfigIo { path: self.path.clone(), source });
            }
        };

        let config = toml::from_str::<Config>(&contents)
            .map_err(|source| Error::ConfigParse { path: self.path.clone(), source })?;
        Ok(Some((config, contents)))
    }

    fn persist_fallback(&self, config: &Config) {
        if let Err(err) = self.save(config) {
            error!(error = ?err, "Failed to persist config");
        }
    }

    /// Serialize the whole config over the previous file
    pub fn save(&self, config: &Config) -> Result<()> {
        // Unreadable or absent previous content just means nothing to preserve
        let existing = fs::read_to_string(&self.path).unwrap_or_default();
        let document = merge_into_document(&existing, config);
        write_atomic(&self.path, &document.to_string())?;
        info!(path = %self.path.display(), "Saved config");
        Ok(())
    }
}

/// Overlay `config` onto the TOML text in `existing`
///
/// Values that already match are left untouched so their comments and formatting stay put.
/// Text that is not valid TOML is discarded.
fn merge_into_document(existing: &str, config: &Config) -> DocumentMut {
    let mut doc = existing.parse::<DocumentMut>().unwrap_or_else(|err| {
        if !existing.trim().is_empty() {
            warn!(error = %err, "Existing config is not valid TOML, rewriting from scratch");
        }
        DocumentMut::new()
    });

    let region = &config.capture_region;
    write_section(&mut doc, "capture-region", |table| {
        set_value(table, "width", i64::from(region.width));
        set_value(table, "height", i64::from(region.height));
        set_value(table, "x", i64::from(region.x));
        set_value(table, "y", i64::from(region.y));
    });

    let hotkeys = &config.hotkeys;
    write_section(&mut doc, "hotkeys", |table| {
        set_value(table, "toggle_box", hotkeys.toggle_box.as_str());
        set_value(table, "toggle_action", hotkeys.toggle_action.as_str());
        set_value(table, "exit_app", hotkeys.exit_app.as_str());
    });

    let ui = &config.ui;
    write_section(&mut doc, "ui", |table| {
        set_value(table, "enable_overlay", ui.enable_overlay);
        set_value(table, "status_x", i64::from(ui.status_x));
        set_value(table, "status_y", i64::from(ui.status_y));
    });

    let detection = &config.detection;
    write_section(&mut doc, "detection", |table| {
        set_value(table, "trigger_key", detection.trigger_key.as_str());
        set_value(table, "min_cycle_ms", i64::try_from(detection.min_cycle_ms).unwrap_or(i64::MAX));
    });

    doc
}

/// Run `fill` on the named section, creating it (or replacing a non-table value) first
fn write_section(doc: &mut DocumentMut, name: &str, fill: impl FnOnce(&mut dyn TableLike)) {
    let item = doc.as_table_mut().entry(name).or_insert(toml_edit::table());
    if item.as_table_like().is_none() {
        *item = toml_edit::table();
    }
    if let Some(table) = item.as_table_like_mut() {
        fill(table);
    }
}

fn set_value(table: &mut dyn TableLike, key: &str, new: impl Into<Value>) {
    let new = new.into();
    let unchanged = table
        .get(key)
        .and_then(Item::as_value)
        .is_some_and(|old| same_value(old, &new));
    if !unchanged {
        table.insert(key, Item::Value(new));
    }
}

fn same_value(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::Integer(a), Value::Integer(b)) => a.value() == b.value(),
        (Value::String(a), Value::String(b)) => a.value() == b.value(),
        (Value::Boolean(a), Value::Boolean(b)) => a.value() == b.value(),
        _ => false,
    }
}

/// Write to a sibling temp file, flush it to disk, then rename over the target
///
/// A crash mid-write leaves the previous file intact.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", tmp_path.display()))?;
    Ok(())
}
