//! Render projection and layout orchestration
//!
//! [`GraphProjector`] owns the rendered projection. It decides whether a
//! batch of node changes coming from the view is a plain visual patch, a
//! structural edit (drag-to-merge, module removal) that goes through the
//! mutation engine, or the settle pass that follows a full re-render.
//!
//! # Two-phase change application
//!
//! After a full re-derivation (`GraphRender`) freshly added nodes have no
//! measured size yet. The next batch coming from the view is the one that
//! reports those sizes, so it is applied as-is and followed by exactly one
//! layout pass (`SetLayout`). Every other batch goes through merge/delete
//! detection first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dag::{DagSpec, DataId, ModuleId};
use crate::error::{EngineError, Result};
use crate::layout::{apply_layout, LayeredLayout, LayoutDirection, LayoutEngine};
use crate::mutation::{delete_modules, merge_data_nodes, MergeOutcome};

use super::changes::{apply_edge_changes, apply_node_changes, EdgeChange, NodeChange};
use super::node::{Graph, NodeId, Position, RenderedNode};
use super::render::{render_dag, PlacementConfig};

/// What the last projection update did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderAction {
    /// Only rendered nodes/edges were patched
    #[default]
    Nothing,
    /// A layout pass ran
    SetLayout,
    /// The projection was fully re-derived from the DAG
    GraphRender,
}

/// A data node folded into another during a change batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPair {
    pub dragged: DataId,
    pub target: DataId,
}

/// Result of applying a batch of node changes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectionUpdate {
    pub action: RenderAction,
    /// The new DAG, when the batch changed its structure
    pub dag: Option<DagSpec>,
    pub merged: Vec<MergedPair>,
    pub removed_modules: Vec<ModuleId>,
    pub removed_data: Vec<DataId>,
}

impl ProjectionUpdate {
    fn settled(action: RenderAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    /// Check if the DAG changed
    pub fn is_structural(&self) -> bool {
        self.dag.is_some()
    }
}

/// Owner of the rendered projection
pub struct GraphProjector {
    graph: Graph,
    last_action: RenderAction,
    direction: LayoutDirection,
    placement: PlacementConfig,
    engine: Arc<dyn LayoutEngine>,
}

impl GraphProjector {
    /// Create a projector with the built-in layered layout
    pub fn new(direction: LayoutDirection, placement: PlacementConfig) -> Self {
        Self::with_engine(direction, placement, Arc::new(LayeredLayout::default()))
    }

    /// Create a projector with a custom layout engine
    pub fn with_engine(
        direction: LayoutDirection,
        placement: PlacementConfig,
        engine: Arc<dyn LayoutEngine>,
    ) -> Self {
        Self {
            graph: Graph::default(),
            last_action: RenderAction::Nothing,
            direction,
            placement,
            engine,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn last_action(&self) -> RenderAction {
        self.last_action
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    /// Check if the next node batch is the post-render settle pass
    pub fn is_settling(&self) -> bool {
        self.last_action == RenderAction::GraphRender
    }

    /// Look a rendered node up, treating absence as a defect
    pub fn node(&self, id: &NodeId) -> Result<&RenderedNode> {
        self.graph.find_node(id).ok_or(EngineError::MissingNode(*id))
    }

    /// Fully re-derive the projection from `dag`
    pub fn render(&mut self, dag: &DagSpec) {
        self.graph = render_dag(dag, &self.graph, self.direction, &self.placement);
        self.last_action = RenderAction::GraphRender;
        log::debug!(
            "Rendered {} nodes and {} edges",
            self.graph.nodes.len(),
            self.graph.edges.len()
        );
    }

    /// Replace the projection wholesale, e.g. with execution results
    pub fn replace(&mut self, graph: Graph, action: RenderAction) {
        self.graph = graph;
        self.last_action = action;
    }

    /// Lay the projection out in `direction`, which becomes the preferred one
    pub fn relayout(&mut self, direction: LayoutDirection) {
        self.direction = direction;
        self.graph = apply_layout(&self.graph, self.engine.as_ref(), direction);
        self.last_action = RenderAction::SetLayout;
    }

    /// Patch the rendered edges; never touches the DAG
    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) {
        self.graph.edges = apply_edge_changes(changes, &self.graph.edges);
        self.last_action = RenderAction::Nothing;
    }

    /// Apply a batch of node changes reported by the view
    ///
    /// `dag` is the current DAG. When the batch merges or deletes nodes
    /// the returned update carries the new DAG, already reconciled into the
    /// projection and laid out; the caller is expected to adopt and
    /// persist it.
    pub fn apply_node_changes(
        &mut self,
        dag: &DagSpec,
        changes: &[NodeChange],
    ) -> Result<ProjectionUpdate> {
        if self.is_settling() {
            self.graph.nodes = apply_node_changes(changes, &self.graph.nodes);
            self.relayout(self.direction);
            log::debug!("Settled freshly rendered nodes");
            return Ok(ProjectionUpdate::settled(RenderAction::SetLayout));
        }

        let mut working = self.graph.clone();
        let mut current = dag.clone();
        let mut update = ProjectionUpdate::default();
        let mut removals: Vec<ModuleId> = Vec::new();

        for change in changes {
            match change {
                NodeChange::Position {
                    id,
                    position,
                    dragging: false,
                } => {
                    if let Some(pair) =
                        Self::try_merge(&mut working, &mut current, *id, *position, change)?
                    {
                        update.merged.push(pair);
                    }
                }
                NodeChange::Remove { id } => {
                    let node = working
                        .find_node(id)
                        .ok_or(EngineError::MissingNode(*id))?;
                    if node.is_module() {
                        removals.push(*id);
                    } else {
                        log::debug!("Ignoring removal of data node {}", id);
                    }
                }
                other => {
                    working.nodes = apply_node_changes(std::slice::from_ref(other), &working.nodes);
                }
            }
        }

        if !removals.is_empty() {
            if let Some(deletion) = delete_modules(&current, &removals, &working.edges) {
                working.nodes = apply_node_changes(&deletion.edit.node_changes, &working.nodes);
                working.edges = apply_edge_changes(&deletion.edit.edge_changes, &working.edges);
                current = deletion.edit.dag;
                update.removed_modules = deletion.removed_modules;
                update.removed_data = deletion.removed_data;
            }
        }

        self.graph = working;
        if update.merged.is_empty() && update.removed_modules.is_empty() {
            self.last_action = RenderAction::Nothing;
            update.action = RenderAction::Nothing;
            return Ok(update);
        }

        self.graph = render_dag(&current, &self.graph, self.direction, &self.placement);
        self.relayout(self.direction);
        update.action = RenderAction::SetLayout;
        update.dag = Some(current);
        Ok(update)
    }

    /// Handle the end of a drag, merging when the first node hit is data
    ///
    /// Falls back to applying `change` as a plain position update.
    fn try_merge(
        working: &mut Graph,
        dag: &mut DagSpec,
        id: NodeId,
        position: Option<Position>,
        change: &NodeChange,
    ) -> Result<Option<MergedPair>> {
        let dragged = working
            .find_node(&id)
            .ok_or(EngineError::MissingNode(id))?;

        let target = if dragged.is_data() {
            let mut dropped = dragged.clone();
            if let Some(position) = position {
                dropped.position = position;
            }
            // First hit in node order; anything but a data node is no merge
            working
                .intersecting_nodes(&dropped)
                .into_iter()
                .next()
                .filter(|n| n.is_data())
                .map(|n| n.id)
        } else {
            None
        };

        if let Some(target) = target {
            if let MergeOutcome::Merged(edit) = merge_data_nodes(dag, working, id, target)? {
                working.nodes = apply_node_changes(&edit.node_changes, &working.nodes);
                working.edges = apply_edge_changes(&edit.edge_changes, &working.edges);
                *dag = edit.dag;
                return Ok(Some(MergedPair {
                    dragged: id,
                    target,
                }));
            }
        }

        working.nodes = apply_node_changes(std::slice::from_ref(change), &working.nodes);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleSpecBuilder;
    use crate::mutation::add_module;
    use crate::projection::node::Size;
    use crate::types::CType;
    use uuid::Uuid;

    fn measured(projector: &mut GraphProjector, dag: &DagSpec) {
        let changes: Vec<NodeChange> = projector
            .graph()
            .nodes
            .iter()
            .map(|n| NodeChange::Dimensions {
                id: n.id,
                dimensions: Size::new(100.0, 40.0),
            })
            .collect();
        let update = projector.apply_node_changes(dag, &changes).unwrap();
        assert_eq!(update.action, RenderAction::SetLayout);
    }

    fn drop_on(id: NodeId, position: Position) -> NodeChange {
        NodeChange::Position {
            id,
            position: Some(position),
            dragging: false,
        }
    }

    #[test]
    fn test_settle_then_await_input() {
        let added = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("m").consumes("x", CType::Integer).build(),
        );
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&added.dag);
        assert!(projector.is_settling());

        measured(&mut projector, &added.dag);
        assert!(!projector.is_settling());
        assert_eq!(projector.last_action(), RenderAction::SetLayout);

        let update = projector
            .apply_node_changes(
                &added.dag,
                &[NodeChange::Select {
                    id: added.module_id,
                    selected: true,
                }],
            )
            .unwrap();
        assert_eq!(update.action, RenderAction::Nothing);
        assert!(!update.is_structural());
        assert!(projector.node(&added.module_id).unwrap().selected);
    }

    #[test]
    fn test_drop_on_compatible_node_merges() {
        let first = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("a").consumes("x", CType::Integer).build(),
        );
        let second = add_module(
            &first.dag,
            ModuleSpecBuilder::new("b").consumes("y", CType::Integer).build(),
        );
        let dag = second.dag;
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&dag);
        measured(&mut projector, &dag);

        let (dragged, target) = (first.inputs[0], second.inputs[0]);
        let target_pos = projector.node(&target).unwrap().position;
        let update = projector
            .apply_node_changes(&dag, &[drop_on(dragged, target_pos)])
            .unwrap();

        assert_eq!(update.action, RenderAction::SetLayout);
        assert_eq!(update.merged, vec![MergedPair { dragged, target }]);
        let next = update.dag.unwrap();
        assert_eq!(next.data.len(), 1);
        assert!(projector.graph().find_node(&dragged).is_none());
        assert_eq!(projector.graph().edges.len(), 2);
        assert!(projector.graph().edges.iter().all(|e| !e.touches(&dragged)));
    }

    #[test]
    fn test_drop_on_incompatible_node_is_position_only() {
        let first = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("a").consumes("x", CType::Integer).build(),
        );
        let second = add_module(
            &first.dag,
            ModuleSpecBuilder::new("b").consumes("y", CType::String).build(),
        );
        let dag = second.dag;
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&dag);
        measured(&mut projector, &dag);

        let target_pos = projector.node(&second.inputs[0]).unwrap().position;
        let update = projector
            .apply_node_changes(&dag, &[drop_on(first.inputs[0], target_pos)])
            .unwrap();

        assert_eq!(update.action, RenderAction::Nothing);
        assert!(update.dag.is_none());
        assert_eq!(projector.node(&first.inputs[0]).unwrap().position, target_pos);
    }

    #[test]
    fn test_module_hit_first_blocks_merge() {
        let first = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("a").consumes("x", CType::Integer).build(),
        );
        let second = add_module(
            &first.dag,
            ModuleSpecBuilder::new("b").consumes("y", CType::Integer).build(),
        );
        let dag = second.dag;
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&dag);
        measured(&mut projector, &dag);

        // Park module `a` over the target; modules precede data in node order
        let target_pos = projector.node(&second.inputs[0]).unwrap().position;
        projector
            .apply_node_changes(
                &dag,
                &[NodeChange::Position {
                    id: first.module_id,
                    position: Some(target_pos),
                    dragging: true,
                }],
            )
            .unwrap();
        assert!(projector.graph().nodes[0].is_module());

        let update = projector
            .apply_node_changes(&dag, &[drop_on(first.inputs[0], target_pos)])
            .unwrap();
        assert!(update.merged.is_empty());
        assert!(!update.is_structural());
        assert_eq!(update.action, RenderAction::Nothing);
        assert_eq!(projector.node(&first.inputs[0]).unwrap().position, target_pos);
    }

    #[test]
    fn test_unrelated_changes_pass_through_merge() {
        let first = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("a").consumes("x", CType::Float).build(),
        );
        let second = add_module(
            &first.dag,
            ModuleSpecBuilder::new("b").consumes("y", CType::Float).build(),
        );
        let dag = second.dag;
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&dag);
        measured(&mut projector, &dag);

        let target_pos = projector.node(&second.inputs[0]).unwrap().position;
        let update = projector
            .apply_node_changes(
                &dag,
                &[
                    NodeChange::Select {
                        id: first.module_id,
                        selected: true,
                    },
                    drop_on(first.inputs[0], target_pos),
                ],
            )
            .unwrap();
        assert!(update.is_structural());
        assert!(projector.node(&first.module_id).unwrap().selected);
    }

    #[test]
    fn test_remove_module_collects_garbage() {
        let added = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("m")
                .consumes("x", CType::Integer)
                .produces("y", CType::Integer)
                .build(),
        );
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&added.dag);
        measured(&mut projector, &added.dag);

        let update = projector
            .apply_node_changes(&added.dag, &[NodeChange::Remove { id: added.module_id }])
            .unwrap();
        assert_eq!(update.removed_modules, vec![added.module_id]);
        assert_eq!(update.removed_data.len(), 2);
        assert!(projector.graph().nodes.is_empty());
        assert!(projector.graph().edges.is_empty());
    }

    #[test]
    fn test_remove_data_node_is_dropped() {
        let added = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("m").consumes("x", CType::Integer).build(),
        );
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&added.dag);
        measured(&mut projector, &added.dag);

        let update = projector
            .apply_node_changes(&added.dag, &[NodeChange::Remove { id: added.inputs[0] }])
            .unwrap();
        assert!(!update.is_structural());
        assert_eq!(projector.graph().nodes.len(), 2);
    }

    #[test]
    fn test_missing_node_is_a_defect() {
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        let missing = Uuid::new_v4();
        let result = projector.apply_node_changes(
            &DagSpec::empty(),
            &[drop_on(missing, Position::default())],
        );
        assert!(matches!(result, Err(EngineError::MissingNode(id)) if id == missing));
    }

    #[test]
    fn test_relayout_records_direction() {
        let added = add_module(
            &DagSpec::empty(),
            ModuleSpecBuilder::new("m").produces("y", CType::Boolean).build(),
        );
        let mut projector = GraphProjector::new(LayoutDirection::TopToBottom, Default::default());
        projector.render(&added.dag);
        projector.relayout(LayoutDirection::LeftToRight);
        assert_eq!(projector.direction(), LayoutDirection::LeftToRight);
        assert_eq!(projector.last_action(), RenderAction::SetLayout);
    }
}
