//! Editor-wide constants
//!
//! Single source of truth for placement, styling and storage defaults.

/// Default values for editor configuration
pub mod defaults {
    /// Stroke and marker color of rendered edges
    pub const EDGE_COLOR: &str = "#f6ab00";
    /// X of the column freshly rendered modules are dropped into
    pub const MODULE_COLUMN_X: f64 = 250.0;
    /// X of the column freshly rendered data nodes are dropped into
    pub const DATA_COLUMN_X: f64 = 50.0;
    /// Vertical distance between freshly rendered nodes
    pub const ROW_SPACING: f64 = 100.0;
    /// Y of the first freshly rendered node
    pub const ROW_OFFSET: f64 = 50.0;
    /// Gap between neighbours in the same layer
    pub const NODE_SEP: f64 = 50.0;
    /// Gap between consecutive layers
    pub const RANK_SEP: f64 = 50.0;
    /// Size assumed for nodes the view has not measured yet
    pub const UNMEASURED_WIDTH: f64 = 150.0;
    pub const UNMEASURED_HEIGHT: f64 = 50.0;
}

/// Client-side storage
pub mod storage {
    /// Namespace UI preferences are stored under
    pub const PREFERENCES_NAMESPACE: &str = "editor/module-bar-storage";
}
