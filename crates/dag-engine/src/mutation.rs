//! Graph mutation engine
//!
//! Pure functions turning an editing intent into a new `DagSpec`. Every
//! function takes the current DAG by reference and returns a new one, so a
//! caller either adopts the whole result or keeps what it had.
//!
//! Deletion and merge also return the low-level projection deltas needed
//! to patch the rendered graph without a full re-derivation.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::dag::{DagSpec, DataId, DataNodeSpec, ModuleId, ModuleNodeSpec};
use crate::error::{EngineError, Result};
use crate::projection::changes::{EdgeChange, NodeChange};
use crate::projection::node::{Graph, RenderedEdge};
use crate::validation::has_cycle;

/// A new DAG plus the projection deltas that mirror it
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdit {
    pub dag: DagSpec,
    pub node_changes: Vec<NodeChange>,
    pub edge_changes: Vec<EdgeChange>,
}

/// Result of adding a module
#[derive(Debug, Clone, PartialEq)]
pub struct AddedModule {
    pub dag: DagSpec,
    pub module_id: ModuleId,
    /// Fresh data nodes wired to the module's `consumes`
    pub inputs: Vec<DataId>,
    /// Fresh data nodes wired to the module's `produces`
    pub outputs: Vec<DataId>,
}

/// Add a module, giving every parameter its own fresh data node
///
/// New data nodes are never merged with existing ones here; merging is a
/// separate, explicit operation.
pub fn add_module(dag: &DagSpec, spec: ModuleNodeSpec) -> AddedModule {
    let module_id = Uuid::new_v4();
    let mut next = dag.clone();

    let fresh_data = |param: &String, c_type: &crate::types::CType| DataNodeSpec {
        name: param.clone(),
        nicknames: BTreeMap::from([(module_id, param.clone())]),
        c_type: c_type.clone(),
    };

    let mut inputs = Vec::with_capacity(spec.consumes.len());
    for (param, c_type) in &spec.consumes {
        let data_id = Uuid::new_v4();
        next.data.insert(data_id, fresh_data(param, c_type));
        next.in_edges.push((data_id, module_id));
        inputs.push(data_id);
    }

    let mut outputs = Vec::with_capacity(spec.produces.len());
    for (param, c_type) in &spec.produces {
        let data_id = Uuid::new_v4();
        next.data.insert(data_id, fresh_data(param, c_type));
        next.out_edges.push((module_id, data_id));
        outputs.push(data_id);
    }

    log::debug!(
        "Adding module '{}' as {} with {} inputs and {} outputs",
        spec.metadata.name,
        module_id,
        inputs.len(),
        outputs.len()
    );
    next.modules.insert(module_id, spec);

    AddedModule {
        dag: next,
        module_id,
        inputs,
        outputs,
    }
}

/// Result of deleting modules
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub edit: GraphEdit,
    pub removed_modules: Vec<ModuleId>,
    /// Data nodes that only existed to feed or receive from deleted modules
    pub removed_data: Vec<DataId>,
}

/// Delete modules and the data nodes that become garbage
///
/// Candidate data nodes are the immediate neighbours of the deleted
/// modules in the *rendered* edge list. A candidate is garbage when no
/// module outside the deletion set still produces or consumes it.
///
/// Returns `None` when none of `module_ids` is a module of the DAG.
pub fn delete_modules(
    dag: &DagSpec,
    module_ids: &[ModuleId],
    rendered_edges: &[RenderedEdge],
) -> Option<Deletion> {
    let deleting: BTreeSet<ModuleId> = module_ids
        .iter()
        .filter(|id| dag.modules.contains_key(id))
        .copied()
        .collect();
    if deleting.is_empty() {
        return None;
    }

    let candidates: BTreeSet<DataId> = rendered_edges
        .iter()
        .filter_map(|edge| {
            if deleting.contains(&edge.target) {
                Some(edge.source)
            } else if deleting.contains(&edge.source) {
                Some(edge.target)
            } else {
                None
            }
        })
        .filter(|id| dag.data.contains_key(id))
        .collect();

    let garbage: BTreeSet<DataId> = candidates
        .into_iter()
        .filter(|data_id| is_garbage(dag, data_id, &deleting))
        .collect();

    let mut next = dag.clone();
    next.modules.retain(|id, _| !deleting.contains(id));
    next.data.retain(|id, _| !garbage.contains(id));
    next.in_edges
        .retain(|(data, module)| !deleting.contains(module) && !garbage.contains(data));
    next.out_edges
        .retain(|(module, data)| !deleting.contains(module) && !garbage.contains(data));

    log::debug!(
        "Deleting {} modules, collecting {} data nodes",
        deleting.len(),
        garbage.len()
    );

    let removed: BTreeSet<Uuid> = deleting.iter().chain(garbage.iter()).copied().collect();
    let node_changes = removed
        .iter()
        .map(|id| NodeChange::Remove { id: *id })
        .collect();
    let edge_changes = rendered_edges
        .iter()
        .filter(|edge| removed.contains(&edge.source) || removed.contains(&edge.target))
        .map(|edge| EdgeChange::Remove {
            id: edge.id.clone(),
        })
        .collect();

    Some(Deletion {
        edit: GraphEdit {
            dag: next,
            node_changes,
            edge_changes,
        },
        removed_modules: deleting.into_iter().collect(),
        removed_data: garbage.into_iter().collect(),
    })
}

/// A data node is garbage when every module touching it is being deleted
fn is_garbage(dag: &DagSpec, data_id: &DataId, deleting: &BTreeSet<ModuleId>) -> bool {
    let surviving_producer = dag
        .out_edges
        .iter()
        .any(|(module, data)| data == data_id && !deleting.contains(module));
    let surviving_consumer = dag
        .in_edges
        .iter()
        .any(|(data, module)| data == data_id && !deleting.contains(module));
    !surviving_producer && !surviving_consumer
}

/// Outcome of a drag-to-merge attempt
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The dragged node was folded into the target
    Merged(GraphEdit),
    /// The two data nodes carry different types
    TypeMismatch,
    /// Rewiring would close a cycle
    WouldCycle,
    /// A node was dropped onto itself
    SameNode,
}

impl MergeOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }
}

/// Merge the `dragged` data node into `target`
///
/// Both must be data nodes of `dag`. The target survives: it takes the
/// union of both nickname maps (its own entries win on collision) and
/// every edge that referenced the dragged node is re-pointed at it, one
/// for one. Anything other than `Merged` means the DAG is untouched and
/// the drag is a plain position change.
pub fn merge_data_nodes(
    dag: &DagSpec,
    graph: &Graph,
    dragged: DataId,
    target: DataId,
) -> Result<MergeOutcome> {
    let dragged_spec = dag
        .data
        .get(&dragged)
        .ok_or(EngineError::UnknownData(dragged))?;
    let target_spec = dag
        .data
        .get(&target)
        .ok_or(EngineError::UnknownData(target))?;

    if dragged == target {
        return Ok(MergeOutcome::SameNode);
    }
    if dragged_spec.c_type != target_spec.c_type {
        log::debug!(
            "Not merging {} into {}: {} != {}",
            dragged,
            target,
            dragged_spec.c_type,
            target_spec.c_type
        );
        return Ok(MergeOutcome::TypeMismatch);
    }

    let mut nicknames = dragged_spec.nicknames.clone();
    nicknames.extend(target_spec.nicknames.clone());
    let merged = DataNodeSpec {
        nicknames,
        ..target_spec.clone()
    };

    let mut next = dag.clone();
    next.in_edges = dag
        .in_edges
        .iter()
        .map(|&(data, module)| if data == dragged { (target, module) } else { (data, module) })
        .collect();
    next.out_edges = dag
        .out_edges
        .iter()
        .map(|&(module, data)| if data == dragged { (module, target) } else { (module, data) })
        .collect();
    next.data.remove(&dragged);
    next.data.insert(target, merged);

    if has_cycle(&next) {
        log::debug!("Not merging {} into {}: would create a cycle", dragged, target);
        return Ok(MergeOutcome::WouldCycle);
    }

    let mut edge_changes = Vec::new();
    for edge in graph.edges.iter().filter(|e| e.touches(&dragged)) {
        edge_changes.push(EdgeChange::Remove {
            id: edge.id.clone(),
        });
    }
    for edge in graph.edges.iter().filter(|e| e.target == dragged) {
        edge_changes.push(EdgeChange::Add {
            item: edge.repointed(edge.source, target),
        });
    }
    for edge in graph.edges.iter().filter(|e| e.source == dragged) {
        edge_changes.push(EdgeChange::Add {
            item: edge.repointed(target, edge.target),
        });
    }

    log::debug!("Merged data node {} into {}", dragged, target);
    Ok(MergeOutcome::Merged(GraphEdit {
        dag: next,
        node_changes: vec![NodeChange::Remove { id: dragged }],
        edge_changes,
    }))
}
