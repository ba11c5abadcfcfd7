//! Deriving the rendered projection from a DAG

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::dag::DagSpec;
use crate::layout::LayoutDirection;

use super::node::{Graph, NodeId, NodePayload, Position, RenderedEdge, RenderedNode};

/// Where and how freshly rendered elements appear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub module_column_x: f64,
    pub data_column_x: f64,
    pub row_spacing: f64,
    pub row_offset: f64,
    /// Stroke and arrow color of connectors
    pub edge_color: String,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            module_column_x: defaults::MODULE_COLUMN_X,
            data_column_x: defaults::DATA_COLUMN_X,
            row_spacing: defaults::ROW_SPACING,
            row_offset: defaults::ROW_OFFSET,
            edge_color: defaults::EDGE_COLOR.to_string(),
        }
    }
}

impl PlacementConfig {
    fn row(&self, index: usize) -> f64 {
        index as f64 * self.row_spacing + self.row_offset
    }
}

/// Re-derive the projection of `dag`
///
/// Nodes already rendered in `previous` keep their position and visual
/// state; only the spec they carry is refreshed. Nodes of the DAG that
/// are not rendered yet are dropped into a module column and a data
/// column, one row per node. Rendered nodes gone from the DAG are dropped
/// and the edge list is rebuilt from scratch. Parallel edges between the
/// same pair of nodes are kept, their ids suffixed `-1`, `-2`, ...
pub fn render_dag(
    dag: &DagSpec,
    previous: &Graph,
    direction: LayoutDirection,
    placement: &PlacementConfig,
) -> Graph {
    let mut nodes = Vec::with_capacity(dag.modules.len() + dag.data.len());

    for (index, (id, spec)) in dag.modules.iter().enumerate() {
        let node = match previous.find_node(id) {
            Some(existing) => {
                let mut node = existing.clone();
                if let NodePayload::Module(payload) = &mut node.data {
                    payload.spec = spec.clone();
                } else {
                    node = RenderedNode::module(*id, spec.clone(), direction, existing.position);
                }
                node
            }
            None => RenderedNode::module(
                *id,
                spec.clone(),
                direction,
                Position::new(placement.module_column_x, placement.row(index)),
            ),
        };
        nodes.push(node);
    }

    for (index, (id, spec)) in dag.data.iter().enumerate() {
        let node = match previous.find_node(id) {
            Some(existing) => {
                let mut node = existing.clone();
                if let NodePayload::Data(payload) = &mut node.data {
                    payload.spec = spec.clone();
                } else {
                    node = RenderedNode::data(*id, spec.clone(), direction, existing.position);
                }
                node
            }
            None => RenderedNode::data(
                *id,
                spec.clone(),
                direction,
                Position::new(placement.data_column_x, placement.row(index)),
            ),
        };
        nodes.push(node);
    }

    // A merge of two inputs of one module leaves parallel edges behind;
    // each repeat gets an occurrence suffix so ids stay unique
    let mut seen: HashMap<(NodeId, NodeId), usize> = HashMap::new();
    let edges = dag
        .in_edges
        .iter()
        .copied()
        .chain(dag.out_edges.iter().copied())
        .map(|(source, target)| {
            let mut edge = RenderedEdge::styled(source, target, &placement.edge_color);
            let repeat = seen.entry((source, target)).or_insert(0);
            if *repeat > 0 {
                edge.id = format!("{}-{}", edge.id, repeat);
            }
            *repeat += 1;
            edge
        })
        .collect();

    Graph { nodes, edges }
}
