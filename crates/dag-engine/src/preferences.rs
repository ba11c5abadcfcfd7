//! UI preferences with session-scoped file persistence
//!
//! Preferences are a convenience (open tool panel, flow direction, draft
//! runner inputs) and never part of the DAG. Unreadable storage silently
//! falls back to defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::storage;
use crate::dag::DataId;
use crate::error::Result;
use crate::layout::LayoutDirection;

/// Persisted UI state of the editor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiPreferences {
    /// Name of the tool panel currently displayed
    pub displayed_tool: Option<String>,
    pub panel_shown: bool,
    /// Flow direction last picked by the user
    pub preferred_layout: Option<LayoutDirection>,
    /// Raw runner form values per DAG input
    pub runner_drafts: BTreeMap<DataId, String>,
}

/// Namespaced preference storage
///
/// Without a persistence directory every operation is a no-op and loads
/// return defaults.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    persist_path: Option<PathBuf>,
    namespace: String,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage {
    /// Create a storage that keeps nothing
    pub fn new() -> Self {
        Self {
            persist_path: None,
            namespace: storage::PREFERENCES_NAMESPACE.to_string(),
        }
    }

    /// Create a storage that persists below `path`
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            persist_path: Some(path.as_ref().to_path_buf()),
            ..Self::new()
        }
    }

    /// Use another namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn file_path(&self) -> Option<PathBuf> {
        self.persist_path
            .as_ref()
            .map(|root| root.join(format!("{}.json", self.namespace)))
    }

    /// Load the stored preferences, or defaults
    pub fn load(&self) -> UiPreferences {
        let Some(file_path) = self.file_path() else {
            return UiPreferences::default();
        };
        if !file_path.exists() {
            return UiPreferences::default();
        }

        let content = match std::fs::read_to_string(&file_path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to read preferences from {:?}: {}", file_path, e);
                return UiPreferences::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(preferences) => {
                log::debug!("Loaded preferences from {:?}", file_path);
                preferences
            }
            Err(e) => {
                log::warn!("Failed to parse preferences from {:?}: {}", file_path, e);
                UiPreferences::default()
            }
        }
    }

    /// Store the preferences (if persistence is enabled)
    pub fn save(&self, preferences: &UiPreferences) -> Result<()> {
        let Some(file_path) = self.file_path() else {
            return Ok(());
        };

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(preferences)?;
        std::fs::write(&file_path, content)?;
        log::debug!("Saved preferences to {:?}", file_path);
        Ok(())
    }

    /// Forget the stored preferences
    pub fn clear(&self) -> Result<()> {
        let Some(file_path) = self.file_path() else {
            return Ok(());
        };
        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn test_round_trip_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let input = Uuid::new_v4();
        let preferences = UiPreferences {
            displayed_tool: Some("modules".to_string()),
            panel_shown: true,
            preferred_layout: Some(LayoutDirection::LeftToRight),
            runner_drafts: BTreeMap::from([(input, "1, 2".to_string())]),
        };

        {
            let storage = SessionStorage::with_persistence(temp_dir.path());
            storage.save(&preferences).unwrap();
        }

        let storage = SessionStorage::with_persistence(temp_dir.path());
        assert_eq!(storage.load(), preferences);
        assert!(temp_dir
            .path()
            .join("editor/module-bar-storage.json")
            .exists());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::with_persistence(temp_dir.path()).with_namespace("prefs");
        std::fs::write(temp_dir.path().join("prefs.json"), "{not json").unwrap();
        assert_eq!(storage.load(), UiPreferences::default());
    }

    #[test]
    fn test_missing_file_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::with_persistence(temp_dir.path());
        assert_eq!(storage.load(), UiPreferences::default());

        let preferences = UiPreferences {
            panel_shown: true,
            ..Default::default()
        };
        storage.save(&preferences).unwrap();
        storage.clear().unwrap();
        assert_eq!(storage.load(), UiPreferences::default());
    }

    #[test]
    fn test_in_memory_storage_keeps_nothing() {
        let storage = SessionStorage::new();
        let preferences = UiPreferences {
            panel_shown: true,
            ..Default::default()
        };
        storage.save(&preferences).unwrap();
        assert_eq!(storage.load(), UiPreferences::default());
    }
}
