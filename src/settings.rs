//! Persisted user settings
//!
//! Three scalar values survive restarts: the index of the layout-switch
//! combination, the mask of remapped editing shortcuts and the autostart
//! preference. `JsonSettingsStore` keeps them in a small JSON file and
//! writes through on every change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Errors writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Access to the persisted settings
pub trait SettingsStore: Send {
    fn selected_combo_index(&self) -> usize;
    fn set_selected_combo_index(&mut self, index: usize) -> Result<(), SettingsError>;

    fn edit_flag_mask(&self) -> u32;
    fn set_edit_flag_mask(&mut self, mask: u32) -> Result<(), SettingsError>;

    fn autostart_enabled(&self) -> bool;
    fn set_autostart_enabled(&mut self, enabled: bool) -> Result<(), SettingsError>;
}

/// The persisted values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub combo_index: usize,
    pub edit_flag_mask: u32,
    pub autostart: bool,
}

/// Settings in a JSON file
pub struct JsonSettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl JsonSettingsStore {
    /// Open the store at `path`. A missing or unreadable file yields
    /// defaults; the file is only written on the first change.
    pub fn open(path: &Path) -> Self {
        let settings = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(?e, ?path, "settings file is corrupt, using defaults");
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no settings file, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!(?e, ?path, "failed to read settings, using defaults");
                Settings::default()
            }
        };

        info!(?path, ?settings, "settings loaded");
        Self {
            path: path.to_owned(),
            settings,
        }
    }

    #[cfg(test)]
    pub fn settings(&self) -> Settings {
        self.settings
    }

    fn update(&mut self, apply: impl FnOnce(&mut Settings)) -> Result<(), SettingsError> {
        let mut next = self.settings;
        apply(&mut next);
        self.save(&next)?;
        self.settings = next;
        Ok(())
    }

    /// Write to a sibling temp file then rename over the old file
    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let bytes = serde_json::to_vec_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&tmp, bytes).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = ?self.path, ?settings, "settings saved");
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn selected_combo_index(&self) -> usize {
        self.settings.combo_index
    }

    fn set_selected_combo_index(&mut self, index: usize) -> Result<(), SettingsError> {
        self.update(|s| s.combo_index = index)
    }

    fn edit_flag_mask(&self) -> u32 {
        self.settings.edit_flag_mask
    }

    fn set_edit_flag_mask(&mut self, mask: u32) -> Result<(), SettingsError> {
        self.update(|s| s.edit_flag_mask = mask)
    }

    fn autostart_enabled(&self) -> bool {
        self.settings.autostart
    }

    fn set_autostart_enabled(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.update(|s| s.autostart = enabled)
    }
}

/// Settings held in memory only
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Settings,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn get(&self) -> Settings {
        self.settings
    }

    fn update(&mut self, apply: impl FnOnce(&mut Settings)) -> Result<(), SettingsError> {
        apply(&mut self.settings);
        Ok(())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn selected_combo_index(&self) -> usize {
        self.get().combo_index
    }

    fn set_selected_combo_index(&mut self, index: usize) -> Result<(), SettingsError> {
        self.update(|s| s.combo_index = index)
    }

    fn edit_flag_mask(&self) -> u32 {
        self.get().edit_flag_mask
    }

    fn set_edit_flag_mask(&mut self, mask: u32) -> Result<(), SettingsError> {
        self.update(|s| s.edit_flag_mask = mask)
    }

    fn autostart_enabled(&self) -> bool {
        self.get().autostart
    }

    fn set_autostart_enabled(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.update(|s| s.autostart = enabled)
    }
}
