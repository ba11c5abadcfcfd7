//! Rendered projection of a DAG
//!
//! - `node`: rendered nodes, edges and the projection graph
//! - `changes`: incremental deltas exchanged with the view
//! - `render`: deriving the projection from a DAG
//! - `orchestrator`: deciding between patch, merge/delete and layout

pub mod changes;
pub mod node;
pub mod orchestrator;
pub mod render;

pub use changes::{apply_edge_changes, apply_node_changes, EdgeChange, NodeChange};
pub use node::{
    DataNodePayload, EdgeMarker, EdgeStyle, Graph, HandleSide, ModuleNodePayload, NodeId,
    NodeKind, NodePayload, Position, RenderedEdge, RenderedNode, Size,
};
pub use orchestrator::{GraphProjector, MergedPair, ProjectionUpdate, RenderAction};
pub use render::{render_dag, PlacementConfig};
