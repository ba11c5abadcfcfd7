//! Rendered nodes and edges
//!
//! The view-layer mirror of a DAG: every module and data node becomes a
//! `RenderedNode` carrying a copy of its spec plus transient visual state,
//! and every DAG edge becomes a styled `RenderedEdge`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::defaults;
use crate::dag::{DataNodeSpec, ModuleNodeSpec};
use crate::layout::LayoutDirection;
use crate::runtime::ModuleStatus;
use crate::types::CValue;

/// Identity of a rendered node (same as the DAG node id)
pub type NodeId = Uuid;

/// Top-left anchored screen position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Measured on-screen size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Side of a node a connector attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// Which kind of DAG node a rendered node mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Data,
    Module,
}

/// Visual payload of a data node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataNodePayload {
    #[serde(flatten)]
    pub spec: DataNodeSpec,
    pub preferred_layout: LayoutDirection,
    /// Value from the last run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CValue>,
}

/// Visual payload of a module node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNodePayload {
    #[serde(flatten)]
    pub spec: ModuleNodeSpec,
    pub preferred_layout: LayoutDirection,
    /// Status from the last run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ModuleStatus>,
}

/// Payload of a rendered node, tagged by node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum NodePayload {
    Data(DataNodePayload),
    Module(ModuleNodePayload),
}

impl NodePayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Data(_) => NodeKind::Data,
            Self::Module(_) => NodeKind::Module,
        }
    }

    pub fn set_preferred_layout(&mut self, direction: LayoutDirection) {
        match self {
            Self::Data(data) => data.preferred_layout = direction,
            Self::Module(module) => module.preferred_layout = direction,
        }
    }
}

/// A node in the rendered projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedNode {
    pub id: NodeId,
    pub position: Position,
    /// Size reported by the view after the first paint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Size>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub dragging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandleSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandleSide>,
    pub data: NodePayload,
}

impl RenderedNode {
    /// A fresh data node at `position`
    pub fn data(
        id: NodeId,
        spec: DataNodeSpec,
        direction: LayoutDirection,
        position: Position,
    ) -> Self {
        Self::with_payload(
            id,
            position,
            NodePayload::Data(DataNodePayload {
                spec,
                preferred_layout: direction,
                value: None,
            }),
        )
    }

    /// A fresh module node at `position`
    pub fn module(
        id: NodeId,
        spec: ModuleNodeSpec,
        direction: LayoutDirection,
        position: Position,
    ) -> Self {
        Self::with_payload(
            id,
            position,
            NodePayload::Module(ModuleNodePayload {
                spec,
                preferred_layout: direction,
                status: None,
            }),
        )
    }

    fn with_payload(id: NodeId, position: Position, data: NodePayload) -> Self {
        Self {
            id,
            position,
            measured: None,
            selected: false,
            dragging: false,
            source_position: None,
            target_position: None,
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn is_data(&self) -> bool {
        self.kind() == NodeKind::Data
    }

    pub fn is_module(&self) -> bool {
        self.kind() == NodeKind::Module
    }

    /// Measured size, zero until the view has reported one
    pub fn size(&self) -> Size {
        self.measured.unwrap_or_default()
    }

    /// Check whether the bounding boxes of two nodes overlap
    pub fn intersects(&self, other: &RenderedNode) -> bool {
        let (a, b) = (self.size(), other.size());
        self.position.x < other.position.x + b.width
            && self.position.x + a.width > other.position.x
            && self.position.y < other.position.y + b.height
            && self.position.y + a.height > other.position.y
    }
}

/// Arrow marker at the end of a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMarker {
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
}

/// Stroke style of a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub stroke: String,
}

/// A directed connector between two rendered nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub animated: bool,
    pub style: EdgeStyle,
    #[serde(rename = "type")]
    pub kind: String,
    pub marker_end: EdgeMarker,
    #[serde(default)]
    pub selected: bool,
}

impl RenderedEdge {
    /// A connector with the default editor styling
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self::styled(source, target, defaults::EDGE_COLOR)
    }

    /// A connector drawn in `color`
    pub fn styled(source: NodeId, target: NodeId, color: &str) -> Self {
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
            animated: true,
            style: EdgeStyle {
                stroke: color.to_string(),
            },
            kind: "smoothstep".to_string(),
            marker_end: EdgeMarker {
                kind: "arrowclosed".to_string(),
                color: color.to_string(),
            },
            selected: false,
        }
    }

    /// The same connector re-attached to other endpoints
    pub fn repointed(&self, source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
            selected: false,
            ..self.clone()
        }
    }

    /// Check if the edge starts or ends at `id`
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}

/// The rendered projection: nodes plus edges
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<RenderedNode>,
    pub edges: Vec<RenderedEdge>,
}

impl Graph {
    /// Find a node by ID
    pub fn find_node(&self, id: &NodeId) -> Option<&RenderedNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Every other node whose bounding box overlaps `node`, in node order
    pub fn intersecting_nodes(&self, node: &RenderedNode) -> Vec<&RenderedNode> {
        self.nodes
            .iter()
            .filter(|n| n.id != node.id && node.intersects(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CType;

    fn data_node(x: f64, y: f64, size: Option<Size>) -> RenderedNode {
        let mut node = RenderedNode::data(
            Uuid::new_v4(),
            DataNodeSpec {
                name: "d".to_string(),
                nicknames: Default::default(),
                c_type: CType::Integer,
            },
            LayoutDirection::TopToBottom,
            Position::new(x, y),
        );
        node.measured = size;
        node
    }

    #[test]
    fn test_intersection_is_strict_overlap() {
        let a = data_node(0.0, 0.0, Some(Size::new(10.0, 10.0)));
        let b = data_node(5.0, 5.0, Some(Size::new(10.0, 10.0)));
        let touching = data_node(10.0, 0.0, Some(Size::new(10.0, 10.0)));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&touching));
    }

    #[test]
    fn test_unmeasured_nodes_never_intersect() {
        let a = data_node(0.0, 0.0, None);
        let b = data_node(0.0, 0.0, None);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_intersecting_nodes_keeps_order() {
        let size = Some(Size::new(10.0, 10.0));
        let dragged = data_node(0.0, 0.0, size);
        let first = data_node(2.0, 2.0, size);
        let far = data_node(100.0, 100.0, size);
        let second = data_node(4.0, 4.0, size);
        let graph = Graph {
            nodes: vec![dragged.clone(), first.clone(), far, second.clone()],
            edges: vec![],
        };
        let hits: Vec<NodeId> = graph
            .intersecting_nodes(&dragged)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(hits, vec![first.id, second.id]);
    }

    #[test]
    fn test_edge_defaults() {
        let (s, t) = (Uuid::new_v4(), Uuid::new_v4());
        let edge = RenderedEdge::new(s, t);
        assert_eq!(edge.id, format!("{}-{}", s, t));
        assert!(edge.animated);
        assert_eq!(edge.style.stroke, "#f6ab00");
        assert_eq!(edge.kind, "smoothstep");
    }
}
