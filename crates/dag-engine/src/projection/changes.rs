//! Incremental change deltas for the rendered projection
//!
//! The view reports interaction as batches of node/edge changes; the
//! engine answers with batches of the same shape. Applying a batch never
//! touches the DAG.

use serde::{Deserialize, Serialize};

use super::node::{NodeId, Position, RenderedEdge, RenderedNode, Size};

/// A change to one rendered node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    /// The node moved; `dragging` is false on the final change of a drag
    Position {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
        #[serde(default)]
        dragging: bool,
    },
    /// The view measured the node
    Dimensions { id: NodeId, dimensions: Size },
    Select { id: NodeId, selected: bool },
    Remove { id: NodeId },
    Add { item: RenderedNode },
    Replace { id: NodeId, item: RenderedNode },
}

impl NodeChange {
    /// Id of the node this change applies to
    pub fn id(&self) -> NodeId {
        match self {
            Self::Position { id, .. }
            | Self::Dimensions { id, .. }
            | Self::Select { id, .. }
            | Self::Remove { id }
            | Self::Replace { id, .. } => *id,
            Self::Add { item } => item.id,
        }
    }

    /// Check if this change marks the end of a drag
    pub fn is_drag_end(&self) -> bool {
        matches!(self, Self::Position { dragging: false, .. })
    }
}

/// A change to one rendered edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Add { item: RenderedEdge },
    Remove { id: String },
    Select { id: String, selected: bool },
}

/// Apply a batch of node changes, returning the new node list
///
/// Changes that refer to unknown ids are ignored.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[RenderedNode]) -> Vec<RenderedNode> {
    let mut nodes = nodes.to_vec();
    for change in changes {
        match change {
            NodeChange::Position {
                id,
                position,
                dragging,
            } => {
                if let Some(node) = nodes.iter_mut().find(|n| &n.id == id) {
                    if let Some(position) = position {
                        node.position = *position;
                    }
                    node.dragging = *dragging;
                }
            }
            NodeChange::Dimensions { id, dimensions } => {
                if let Some(node) = nodes.iter_mut().find(|n| &n.id == id) {
                    node.measured = Some(*dimensions);
                }
            }
            NodeChange::Select { id, selected } => {
                if let Some(node) = nodes.iter_mut().find(|n| &n.id == id) {
                    node.selected = *selected;
                }
            }
            NodeChange::Remove { id } => nodes.retain(|n| &n.id != id),
            NodeChange::Add { item } => {
                if !nodes.iter().any(|n| n.id == item.id) {
                    nodes.push(item.clone());
                }
            }
            NodeChange::Replace { id, item } => {
                if let Some(node) = nodes.iter_mut().find(|n| &n.id == id) {
                    *node = item.clone();
                }
            }
        }
    }
    nodes
}

/// Apply a batch of edge changes, returning the new edge list
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[RenderedEdge]) -> Vec<RenderedEdge> {
    let mut edges = edges.to_vec();
    for change in changes {
        match change {
            EdgeChange::Add { item } => {
                if !edges.iter().any(|e| e.id == item.id) {
                    edges.push(item.clone());
                }
            }
            EdgeChange::Remove { id } => edges.retain(|e| &e.id != id),
            EdgeChange::Select { id, selected } => {
                if let Some(edge) = edges.iter_mut().find(|e| &e.id == id) {
                    edge.selected = *selected;
                }
            }
        }
    }
    edges
}
