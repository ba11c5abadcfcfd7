//! Configuration types for the editor

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{LayoutDirection, LayoutSpacing};
use crate::projection::render::PlacementConfig;

/// Editor configuration
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Flow direction used until the user picks another
    pub preferred_layout: LayoutDirection,
    /// Default placement and styling of freshly rendered elements
    pub placement: PlacementConfig,
    /// Spacing of the built-in layered layout
    pub layout: LayoutSpacing,
}

impl EditorConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        log::debug!("Loaded editor config from {:?}", path.as_ref());
        Ok(config)
    }
}
