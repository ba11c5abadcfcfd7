//! DAG Engine - Editing core of the pipeline editor
//!
//! This crate keeps a DAG of typed modules and data nodes consistent under
//! interactive editing and mirrors it into a rendered projection. It
//! supports:
//!
//! - Adding modules with fresh data nodes per parameter
//! - Deleting modules along with the data nodes only they used
//! - Merging compatible data nodes by drag and drop (cycle-safe)
//! - Pluggable automatic layout, with a built-in layered layout
//! - Projecting execution results onto the rendered nodes
//!
//! # Architecture
//!
//! - `types` / `dag`: the type/value model and the DAG specification
//! - `mutation`: pure edits producing a new DAG plus projection deltas
//! - `projection`: rendered nodes/edges and the `GraphProjector`
//! - `store`: `EditorStore`, the single-writer state owner that persists
//!   through a `DagBackend`
//! - `persistence`: the ordered background queue of DAG saves
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dag_engine::{CType, EditorStore, MemoryBackend, ModuleSpecBuilder};
//!
//! let mut store = EditorStore::new(Arc::new(MemoryBackend::new()));
//! store.load_dag("pipeline").await?;
//! store
//!     .add_module(ModuleSpecBuilder::new("tokenize").consumes("text", CType::String).build())
//!     .await?;
//! ```

pub mod backend;
pub mod builder;
pub mod config;
pub mod constants;
pub mod dag;
pub mod error;
pub mod events;
pub mod execution;
pub mod layout;
pub mod mutation;
pub mod persistence;
pub mod preferences;
pub mod projection;
pub mod runtime;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use backend::{CreateDagResponse, DagBackend, MemoryBackend};
pub use builder::{DagBuilder, ModuleSpecBuilder};
pub use config::EditorConfig;
pub use dag::{
    sanitize_dag_name, ComponentMetadata, DagSpec, DataId, DataNodeSpec, ModuleId, ModuleNodeSpec,
    ModuleRuntimeConfig, ParamName,
};
pub use error::{BackendError, EngineError, Result, TypeError};
pub use events::{EditorEvent, EventSink, NullEventSink, VecEventSink};
pub use execution::{apply_result, clear_result};
pub use layout::{
    apply_layout, LayeredLayout, LayoutDirection, LayoutEngine, LayoutNode, LayoutSpacing,
};
pub use mutation::{add_module, delete_modules, merge_data_nodes, GraphEdit, MergeOutcome};
pub use preferences::{SessionStorage, UiPreferences};
pub use projection::{
    EdgeChange, Graph, GraphProjector, NodeChange, PlacementConfig, ProjectionUpdate,
    RenderAction, RenderedEdge, RenderedNode,
};
pub use runtime::{ModuleStatus, RuntimeState};
pub use persistence::SaveQueue;
pub use store::{run_shared, EditorStore, PendingRun, SharedEditorStore};
pub use types::{CList, CMap, CType, CValue};
pub use validation::{has_cycle, validate_dag, ValidationError};
