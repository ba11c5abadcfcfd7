//! Execution result projection
//!
//! Attaches a run's per-data values and per-module statuses to the
//! rendered nodes for display, and strips them again on reset.

use crate::projection::node::{Graph, NodePayload};
use crate::runtime::RuntimeState;

/// Copy `result` onto the projection
///
/// Nodes the result does not mention are cleared.
pub fn apply_result(graph: &Graph, result: &RuntimeState) -> Graph {
    let mut graph = graph.clone();
    for node in &mut graph.nodes {
        match &mut node.data {
            NodePayload::Data(payload) => payload.value = result.data.get(&node.id).cloned(),
            NodePayload::Module(payload) => {
                payload.status = result.module_status.get(&node.id).cloned()
            }
        }
    }
    graph
}

/// Remove every value and status from the projection
pub fn clear_result(graph: &Graph) -> Graph {
    let mut graph = graph.clone();
    for node in &mut graph.nodes {
        match &mut node.data {
            NodePayload::Data(payload) => payload.value = None,
            NodePayload::Module(payload) => payload.status = None,
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::builder::{DagBuilder, ModuleSpecBuilder};
    use crate::layout::LayoutDirection;
    use crate::projection::render::{render_dag, PlacementConfig};
    use crate::runtime::ModuleStatus;
    use crate::types::{CType, CValue};

    fn rendered() -> (crate::dag::DagSpec, Graph) {
        let dag = DagBuilder::new("run")
            .add_module(
                ModuleSpecBuilder::new("m")
                    .consumes("x", CType::Integer)
                    .produces("y", CType::String)
                    .build(),
            )
            .build();
        let graph = render_dag(
            &dag,
            &Graph::default(),
            LayoutDirection::TopToBottom,
            &PlacementConfig::default(),
        );
        (dag, graph)
    }

    fn fired(dag: &crate::dag::DagSpec) -> RuntimeState {
        let mut data = BTreeMap::new();
        for id in dag.data.keys() {
            data.insert(*id, CValue::integer(7));
        }
        let mut state = RuntimeState::unfired("p-1", dag.clone(), data);
        for status in state.module_status.values_mut() {
            *status = ModuleStatus::Fired {
                latency: 3.0,
                context: None,
            };
        }
        state
    }

    #[test]
    fn test_apply_result_attaches_values() {
        let (dag, graph) = rendered();
        let applied = apply_result(&graph, &fired(&dag));

        for node in &applied.nodes {
            match &node.data {
                NodePayload::Data(d) => assert_eq!(d.value, Some(CValue::integer(7))),
                NodePayload::Module(m) => assert!(m.status.as_ref().is_some_and(|s| s.is_fired())),
            }
        }
        // Positions and edges untouched
        assert_eq!(applied.edges, graph.edges);
        assert_eq!(applied.nodes[0].position, graph.nodes[0].position);
    }

    #[test]
    fn test_missing_entries_clear_previous_values() {
        let (dag, graph) = rendered();
        let applied = apply_result(&graph, &fired(&dag));
        let empty = RuntimeState::unfired("p-2", dag, BTreeMap::new());
        let reapplied = apply_result(&applied, &empty);

        for node in &reapplied.nodes {
            if let NodePayload::Data(d) = &node.data {
                assert!(d.value.is_none());
            }
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (dag, graph) = rendered();
        let cleared = clear_result(&apply_result(&graph, &fired(&dag)));
        assert_eq!(cleared, graph);
        assert_eq!(clear_result(&cleared), cleared);
    }
}
