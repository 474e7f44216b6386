//! UI layout preferences persisted between runs.
//!
//! Stored as TOML under the platform config dir. These keys are presentation
//! state only; nothing in the domain core reads them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CHAT_PANEL_WIDTH: u32 = 480;
const DEFAULT_CONTEXT_PANEL_WIDTH: u32 = 360;

/// Persisted layout state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiPreferences {
    pub is_sidebar_open: bool,
    pub is_context_sidebar_open: bool,
    pub chat_panel_width: u32,
    pub context_panel_width: u32,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            is_sidebar_open: true,
            is_context_sidebar_open: true,
            chat_panel_width: DEFAULT_CHAT_PANEL_WIDTH,
            context_panel_width: DEFAULT_CONTEXT_PANEL_WIDTH,
        }
    }
}

impl UiPreferences {
    pub fn toggle_sidebar(&mut self) {
        self.is_sidebar_open = !self.is_sidebar_open;
    }

    pub fn toggle_context_sidebar(&mut self) {
        self.is_context_sidebar_open = !self.is_context_sidebar_open;
    }
}

/// Errors from saving preferences
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Failed to write preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// File-backed preferences
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `<config dir>/structured-chat/preferences.toml`
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("structured-chat").join("preferences.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read preferences; a missing or unreadable file yields defaults
    pub fn load(&self) -> UiPreferences {
        let source = match std::fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return UiPreferences::default(),
            Err(e) => {
                tracing::warn!("[PREFS] Could not read {}: {}", self.path.display(), e);
                return UiPreferences::default();
            }
        };
        toml::from_str(&source).unwrap_or_else(|e| {
            tracing::warn!("[PREFS] Ignoring malformed {}: {}", self.path.display(), e);
            UiPreferences::default()
        })
    }

    pub fn save(&self, preferences: &UiPreferences) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = toml::to_string_pretty(preferences)?;
        std::fs::write(&self.path, encoded)?;
        Ok(())
    }
}
