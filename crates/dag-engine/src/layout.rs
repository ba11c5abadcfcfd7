//! Automatic layout of the rendered projection
//!
//! Position computation is pluggable through [`LayoutEngine`]. An engine
//! returns *center* positions; [`apply_layout`] converts them to the
//! top-left anchored positions the view uses and points connector handles
//! along the flow direction.
//!
//! [`LayeredLayout`] is the built-in engine: longest-path layering
//! followed by barycenter ordering within each layer.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::projection::node::{Graph, HandleSide, NodeId, Position, RenderedNode};

/// Direction the graph flows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutDirection {
    #[default]
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "LR")]
    LeftToRight,
}

impl LayoutDirection {
    /// Side outgoing connectors leave from
    pub fn source_side(&self) -> HandleSide {
        match self {
            Self::TopToBottom => HandleSide::Bottom,
            Self::LeftToRight => HandleSide::Right,
        }
    }

    /// Side incoming connectors arrive at
    pub fn target_side(&self) -> HandleSide {
        match self {
            Self::TopToBottom => HandleSide::Top,
            Self::LeftToRight => HandleSide::Left,
        }
    }
}

/// A node as seen by a layout engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutNode {
    pub id: NodeId,
    pub width: f64,
    pub height: f64,
}

impl LayoutNode {
    /// Size used for layout; unmeasured nodes get a placeholder box
    pub fn from_rendered(node: &RenderedNode) -> Self {
        let (width, height) = match node.measured {
            Some(size) => (size.width, size.height),
            None => (defaults::UNMEASURED_WIDTH, defaults::UNMEASURED_HEIGHT),
        };
        Self {
            id: node.id,
            width,
            height,
        }
    }
}

/// Spacing of the layered layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSpacing {
    /// Gap between neighbours in the same layer
    pub node_sep: f64,
    /// Gap between consecutive layers
    pub rank_sep: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            node_sep: defaults::NODE_SEP,
            rank_sep: defaults::RANK_SEP,
        }
    }
}

/// Computes positions from graph topology
pub trait LayoutEngine: Send + Sync {
    /// Center position for every node it could place
    ///
    /// Nodes missing from the result keep their current position.
    fn layout(
        &self,
        nodes: &[LayoutNode],
        edges: &[(NodeId, NodeId)],
        direction: LayoutDirection,
    ) -> HashMap<NodeId, Position>;
}

/// Lay the graph out and re-anchor every node at its top-left corner
pub fn apply_layout(
    graph: &Graph,
    engine: &dyn LayoutEngine,
    direction: LayoutDirection,
) -> Graph {
    let layout_nodes: Vec<LayoutNode> =
        graph.nodes.iter().map(LayoutNode::from_rendered).collect();
    let edges: Vec<(NodeId, NodeId)> = graph.edges.iter().map(|e| (e.source, e.target)).collect();
    let centers = engine.layout(&layout_nodes, &edges, direction);

    let nodes = graph
        .nodes
        .iter()
        .zip(&layout_nodes)
        .map(|(node, boxed)| {
            let mut node = node.clone();
            if let Some(center) = centers.get(&node.id) {
                node.position = Position::new(
                    center.x - boxed.width / 2.0,
                    center.y - boxed.height / 2.0,
                );
            }
            node.source_position = Some(direction.source_side());
            node.target_position = Some(direction.target_side());
            node.data.set_preferred_layout(direction);
            node
        })
        .collect();

    log::debug!(
        "Laid out {} nodes ({} placed) {:?}",
        graph.nodes.len(),
        centers.len(),
        direction
    );

    Graph {
        nodes,
        edges: graph.edges.clone(),
    }
}

/// Longest-path layering with barycenter crossing reduction
#[derive(Debug, Clone, Default)]
pub struct LayeredLayout {
    spacing: LayoutSpacing,
}

impl LayeredLayout {
    const ORDERING_PASSES: usize = 4;

    pub fn new(spacing: LayoutSpacing) -> Self {
        Self { spacing }
    }

    /// Layer index per node, in node order
    ///
    /// Nodes left over by a cycle are stacked after the deepest layer.
    fn assign_layers(nodes: &[LayoutNode], edges: &[(usize, usize)]) -> Vec<usize> {
        let mut in_degree = vec![0usize; nodes.len()];
        let mut successors = vec![Vec::new(); nodes.len()];
        for &(source, target) in edges {
            in_degree[target] += 1;
            successors[source].push(target);
        }

        let mut queue: VecDeque<usize> =
            (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut layers = vec![0usize; nodes.len()];
        let mut placed = vec![false; nodes.len()];
        while let Some(node) = queue.pop_front() {
            placed[node] = true;
            for &succ in &successors[node] {
                layers[succ] = layers[succ].max(layers[node] + 1);
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    queue.push_back(succ);
                }
            }
        }

        let deepest = layers.iter().copied().max().unwrap_or(0);
        for (i, layer) in layers.iter_mut().enumerate() {
            if !placed[i] {
                *layer = deepest + 1;
            }
        }
        layers
    }

    /// Order every layer by the mean position of its neighbours
    fn order_layers(layers: &[usize], edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
        let depth = layers.iter().copied().max().map_or(0, |d| d + 1);
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); depth];
        for (node, &layer) in layers.iter().enumerate() {
            groups[layer].push(node);
        }

        let mut predecessors = vec![Vec::new(); layers.len()];
        let mut successors = vec![Vec::new(); layers.len()];
        for &(source, target) in edges {
            predecessors[target].push(source);
            successors[source].push(target);
        }

        for _ in 0..Self::ORDERING_PASSES {
            for li in 1..groups.len() {
                let reordered = Self::by_barycenter(&groups[li], &groups[li - 1], &predecessors);
                groups[li] = reordered;
            }
            for li in (0..groups.len().saturating_sub(1)).rev() {
                let reordered = Self::by_barycenter(&groups[li], &groups[li + 1], &successors);
                groups[li] = reordered;
            }
        }
        groups
    }

    fn by_barycenter(layer: &[usize], fixed: &[usize], neighbours: &[Vec<usize>]) -> Vec<usize> {
        let rank: HashMap<usize, f64> = fixed
            .iter()
            .enumerate()
            .map(|(i, &node)| (node, i as f64))
            .collect();
        let mut scored: Vec<(usize, f64)> = layer
            .iter()
            .enumerate()
            .map(|(current, &node)| {
                let positions: Vec<f64> = neighbours[node]
                    .iter()
                    .filter_map(|n| rank.get(n).copied())
                    .collect();
                // Unconnected nodes hold their place
                let score = if positions.is_empty() {
                    current as f64
                } else {
                    positions.iter().sum::<f64>() / positions.len() as f64
                };
                (node, score)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(node, _)| node).collect()
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(
        &self,
        nodes: &[LayoutNode],
        edges: &[(NodeId, NodeId)],
        direction: LayoutDirection,
    ) -> HashMap<NodeId, Position> {
        let index: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let edges: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|(s, t)| Some((*index.get(s)?, *index.get(t)?)))
            .filter(|(s, t)| s != t)
            .collect();

        let layers = Self::assign_layers(nodes, &edges);
        let groups = Self::order_layers(&layers, &edges);

        // (extent along a layer, thickness across it)
        let measure = |node: &LayoutNode| match direction {
            LayoutDirection::TopToBottom => (node.width, node.height),
            LayoutDirection::LeftToRight => (node.height, node.width),
        };

        let extents: Vec<f64> = groups
            .iter()
            .map(|group| {
                let total: f64 = group.iter().map(|&i| measure(&nodes[i]).0).sum();
                total + self.spacing.node_sep * group.len().saturating_sub(1) as f64
            })
            .collect();
        let widest = extents.iter().copied().fold(0.0, f64::max);

        let mut centers = HashMap::with_capacity(nodes.len());
        let mut rank_offset = 0.0;
        for (group, extent) in groups.iter().zip(&extents) {
            let thickness = group
                .iter()
                .map(|&i| measure(&nodes[i]).1)
                .fold(0.0, f64::max);
            let rank_center = rank_offset + thickness / 2.0;

            let mut cursor = (widest - extent) / 2.0;
            for &i in group {
                let (along, _) = measure(&nodes[i]);
                let cross = cursor + along / 2.0;
                let center = match direction {
                    LayoutDirection::TopToBottom => Position::new(cross, rank_center),
                    LayoutDirection::LeftToRight => Position::new(rank_center, cross),
                };
                centers.insert(nodes[i].id, center);
                cursor += along + self.spacing.node_sep;
            }
            rank_offset += thickness + self.spacing.rank_sep;
        }
        centers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DagBuilder, ModuleSpecBuilder};
    use crate::projection::node::{NodePayload, Size};
    use crate::projection::render::{render_dag, PlacementConfig};
    use crate::types::CType;
    use uuid::Uuid;

    fn boxed(id: NodeId) -> LayoutNode {
        LayoutNode {
            id,
            width: 100.0,
            height: 40.0,
        }
    }

    #[test]
    fn test_chain_is_stacked_by_layer() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let nodes = [boxed(c), boxed(b), boxed(a)];
        let centers = LayeredLayout::default().layout(
            &nodes,
            &[(a, b), (b, c)],
            LayoutDirection::TopToBottom,
        );

        assert_eq!(centers[&a].y, 20.0);
        assert_eq!(centers[&b].y, 110.0);
        assert_eq!(centers[&c].y, 200.0);
        assert_eq!(centers[&a].x, centers[&c].x);
    }

    #[test]
    fn test_left_to_right_swaps_axes() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let centers = LayeredLayout::default().layout(
            &[boxed(a), boxed(b)],
            &[(a, b)],
            LayoutDirection::LeftToRight,
        );
        assert_eq!(centers[&a].x, 50.0);
        assert_eq!(centers[&b].x, 200.0);
        assert_eq!(centers[&a].y, centers[&b].y);
    }

    #[test]
    fn test_siblings_share_a_layer() {
        let (root, left, right) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let centers = LayeredLayout::default().layout(
            &[boxed(root), boxed(left), boxed(right)],
            &[(root, left), (root, right)],
            LayoutDirection::TopToBottom,
        );
        assert_eq!(centers[&left].y, centers[&right].y);
        assert_eq!((centers[&right].x - centers[&left].x).abs(), 150.0);
        // Root is centered above its children
        assert_eq!(centers[&root].x, (centers[&left].x + centers[&right].x) / 2.0);
    }

    #[test]
    fn test_cycle_still_places_every_node() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let centers = LayeredLayout::default().layout(
            &[boxed(a), boxed(b)],
            &[(a, b), (b, a)],
            LayoutDirection::TopToBottom,
        );
        assert_eq!(centers.len(), 2);
    }

    #[test]
    fn test_apply_layout_recenters_and_sets_handles() {
        let dag = DagBuilder::new("layout")
            .add_module(
                ModuleSpecBuilder::new("m")
                    .consumes("x", CType::Integer)
                    .produces("y", CType::Integer)
                    .build(),
            )
            .build();
        let mut graph = render_dag(
            &dag,
            &Graph::default(),
            LayoutDirection::TopToBottom,
            &PlacementConfig::default(),
        );
        for node in &mut graph.nodes {
            node.measured = Some(Size::new(80.0, 30.0));
        }

        let engine = LayeredLayout::default();
        let laid = apply_layout(&graph, &engine, LayoutDirection::LeftToRight);
        let centers = engine.layout(
            &graph.nodes.iter().map(LayoutNode::from_rendered).collect::<Vec<_>>(),
            &graph.edges.iter().map(|e| (e.source, e.target)).collect::<Vec<_>>(),
            LayoutDirection::LeftToRight,
        );

        for node in &laid.nodes {
            let center = centers[&node.id];
            assert_eq!(node.position, Position::new(center.x - 40.0, center.y - 15.0));
            assert_eq!(node.source_position, Some(HandleSide::Right));
            assert_eq!(node.target_position, Some(HandleSide::Left));
            let preferred = match &node.data {
                NodePayload::Data(d) => d.preferred_layout,
                NodePayload::Module(m) => m.preferred_layout,
            };
            assert_eq!(preferred, LayoutDirection::LeftToRight);
        }
        assert_eq!(laid.edges, graph.edges);
    }

    #[test]
    fn test_engine_may_skip_nodes() {
        struct Nowhere;
        impl LayoutEngine for Nowhere {
            fn layout(
                &self,
                _: &[LayoutNode],
                _: &[(NodeId, NodeId)],
                _: LayoutDirection,
            ) -> HashMap<NodeId, Position> {
                HashMap::new()
            }
        }

        let dag = DagBuilder::new("skip")
            .add_module(ModuleSpecBuilder::new("m").produces("y", CType::Float).build())
            .build();
        let graph = render_dag(
            &dag,
            &Graph::default(),
            LayoutDirection::TopToBottom,
            &PlacementConfig::default(),
        );
        let laid = apply_layout(&graph, &Nowhere, LayoutDirection::TopToBottom);
        for (before, after) in graph.nodes.iter().zip(&laid.nodes) {
            assert_eq!(before.position, after.position);
        }
    }

    #[test]
    fn test_direction_wire_format() {
        assert_eq!(
            serde_json::to_string(&LayoutDirection::LeftToRight).unwrap(),
            "\"LR\""
        );
        assert_eq!(LayoutDirection::default(), LayoutDirection::TopToBottom);
    }
}
