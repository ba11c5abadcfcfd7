//! Structural validation of DAG specifications
//!
//! Validates edge references, edge direction and detects cycles.

use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::dag::DagSpec;

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Cycle detected in the graph
    CycleDetected,
    /// An in-edge references a data node that does not exist
    UnknownDataNode { data_id: Uuid, module_id: Uuid },
    /// An edge references a module that does not exist
    UnknownModule { module_id: Uuid, data_id: Uuid },
    /// A data node is not referenced by any edge
    OrphanedData { data_id: Uuid },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "Cycle detected in DAG"),
            Self::UnknownDataNode { data_id, module_id } => {
                write!(
                    f,
                    "Edge between '{}' and module '{}' references unknown data node",
                    data_id, module_id
                )
            }
            Self::UnknownModule { module_id, data_id } => {
                write!(
                    f,
                    "Edge between module '{}' and '{}' references unknown module",
                    module_id, data_id
                )
            }
            Self::OrphanedData { data_id } => {
                write!(f, "Data node '{}' has no connections", data_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a DAG specification
///
/// Returns all validation errors found (not just the first).
pub fn validate_dag(dag: &DagSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_edge_references(dag, &mut errors);
    validate_orphans(dag, &mut errors);
    if has_cycle(dag) {
        errors.push(ValidationError::CycleDetected);
    }

    errors
}

/// Check that every edge endpoint exists on the right side of the graph
///
/// Edge direction is encoded by which list an edge lives in, so a
/// reversed edge shows up as an unknown node on one of its ends.
fn validate_edge_references(dag: &DagSpec, errors: &mut Vec<ValidationError>) {
    for (data_id, module_id) in &dag.in_edges {
        if !dag.data.contains_key(data_id) {
            errors.push(ValidationError::UnknownDataNode {
                data_id: *data_id,
                module_id: *module_id,
            });
        }
        if !dag.modules.contains_key(module_id) {
            errors.push(ValidationError::UnknownModule {
                module_id: *module_id,
                data_id: *data_id,
            });
        }
    }
    for (module_id, data_id) in &dag.out_edges {
        if !dag.modules.contains_key(module_id) {
            errors.push(ValidationError::UnknownModule {
                module_id: *module_id,
                data_id: *data_id,
            });
        }
        if !dag.data.contains_key(data_id) {
            errors.push(ValidationError::UnknownDataNode {
                data_id: *data_id,
                module_id: *module_id,
            });
        }
    }
}

fn validate_orphans(dag: &DagSpec, errors: &mut Vec<ValidationError>) {
    for data_id in dag.data.keys() {
        if !dag.is_consumed(data_id) && !dag.is_produced(data_id) {
            errors.push(ValidationError::OrphanedData { data_id: *data_id });
        }
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
///
/// Modules and data nodes share one id space, so both edge lists are
/// walked as a single directed graph.
pub fn has_cycle(dag: &DagSpec) -> bool {
    let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
    let mut successors: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for id in dag.modules.keys().chain(dag.data.keys()) {
        in_degree.insert(*id, 0);
    }
    let edges = dag
        .in_edges
        .iter()
        .copied()
        .chain(dag.out_edges.iter().copied());
    for (source, target) in edges {
        in_degree.entry(source).or_insert(0);
        *in_degree.entry(target).or_insert(0) += 1;
        successors.entry(source).or_default().push(target);
    }

    let mut queue: VecDeque<Uuid> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(node_id) = queue.pop_front() {
        visited += 1;
        for target in successors.get(&node_id).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(target) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(*target);
                }
            }
        }
    }

    visited < in_degree.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DagBuilder, ModuleSpecBuilder};
    use crate::types::CType;

    #[test]
    fn test_valid_dag_has_no_errors() {
        let dag = DagBuilder::new("ok")
            .add_module(
                ModuleSpecBuilder::new("m")
                    .consumes("x", CType::Integer)
                    .produces("y", CType::Integer)
                    .build(),
            )
            .build();
        assert!(validate_dag(&dag).is_empty());
        assert!(!has_cycle(&dag));
    }

    #[test]
    fn test_cycle_detected() {
        let mut dag = DagBuilder::new("loop")
            .add_module(
                ModuleSpecBuilder::new("m")
                    .consumes("x", CType::Integer)
                    .produces("y", CType::Integer)
                    .build(),
            )
            .build();
        // Feed the output back into the module
        let module_id = *dag.modules.keys().next().unwrap();
        let output = dag.module_outputs(&module_id)[0];
        dag.in_edges.push((output, module_id));

        assert!(has_cycle(&dag));
        assert!(validate_dag(&dag).contains(&ValidationError::CycleDetected));
    }

    #[test]
    fn test_dangling_references() {
        let mut dag = DagSpec::empty();
        let (data_id, module_id) = (Uuid::new_v4(), Uuid::new_v4());
        dag.in_edges.push((data_id, module_id));

        let errors = validate_dag(&dag);
        assert!(errors.contains(&ValidationError::UnknownDataNode { data_id, module_id }));
        assert!(errors.contains(&ValidationError::UnknownModule { module_id, data_id }));
    }

    #[test]
    fn test_orphaned_data() {
        let mut dag = DagSpec::empty();
        let data_id = Uuid::new_v4();
        dag.data.insert(
            data_id,
            crate::dag::DataNodeSpec {
                name: "lonely".to_string(),
                nicknames: Default::default(),
                c_type: CType::String,
            },
        );
        assert_eq!(
            validate_dag(&dag),
            vec![ValidationError::OrphanedData { data_id }]
        );
    }
}
