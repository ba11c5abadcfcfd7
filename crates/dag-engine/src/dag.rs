//! Declarative DAG specification
//!
//! A DAG is bipartite: module nodes (computational units) and data nodes
//! (typed value slots). Edges only ever go data -> module (`in_edges`) or
//! module -> data (`out_edges`). Node identities are the UUID keys of the
//! `modules` and `data` maps, never the human-readable names.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::CType;

/// Identity of a module node
pub type ModuleId = Uuid;

/// Identity of a data node
pub type DataId = Uuid;

/// Name of a module's input or output parameter
pub type ParamName = String;

/// Descriptive metadata shared by DAGs and modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub major_version: u32,
    pub minor_version: u32,
}

impl ComponentMetadata {
    /// Metadata with a name and otherwise placeholder values
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for ComponentMetadata {
    fn default() -> Self {
        Self {
            name: "empty-component".to_string(),
            description: "This is an empty component.".to_string(),
            tags: Vec::new(),
            major_version: 0,
            minor_version: 1,
        }
    }
}

/// Timeouts applied by the executing backend, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRuntimeConfig {
    pub module_timeout: u64,
    pub inputs_timeout: u64,
}

impl Default for ModuleRuntimeConfig {
    fn default() -> Self {
        Self {
            module_timeout: 5000,
            inputs_timeout: 5000,
        }
    }
}

/// A module's structural contract
///
/// `consumes`/`produces` are keyed by parameter name and are independent of
/// which data node ids end up wired to the module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNodeSpec {
    pub metadata: ComponentMetadata,
    pub consumes: BTreeMap<ParamName, CType>,
    pub produces: BTreeMap<ParamName, CType>,
    #[serde(default)]
    pub config: ModuleRuntimeConfig,
    /// Opaque module context forwarded to the backend untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// A typed value slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataNodeSpec {
    pub name: String,
    /// Local parameter name each referencing module uses for this node
    #[serde(default)]
    pub nicknames: BTreeMap<ModuleId, String>,
    pub c_type: CType,
}

/// The declarative graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagSpec {
    pub metadata: ComponentMetadata,
    #[serde(default)]
    pub modules: BTreeMap<ModuleId, ModuleNodeSpec>,
    #[serde(default)]
    pub data: BTreeMap<DataId, DataNodeSpec>,
    /// data node -> module node
    #[serde(default)]
    pub in_edges: Vec<(DataId, ModuleId)>,
    /// module node -> data node
    #[serde(default)]
    pub out_edges: Vec<(ModuleId, DataId)>,
}

impl DagSpec {
    /// A fresh DAG with no nodes and placeholder metadata
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of edges (in + out)
    pub fn edge_count(&self) -> usize {
        self.in_edges.len() + self.out_edges.len()
    }

    /// Check whether a data node is produced by some module
    pub fn is_produced(&self, data_id: &DataId) -> bool {
        self.out_edges.iter().any(|(_, target)| target == data_id)
    }

    /// Check whether a data node is consumed by some module
    pub fn is_consumed(&self, data_id: &DataId) -> bool {
        self.in_edges.iter().any(|(source, _)| source == data_id)
    }

    /// Data nodes consumed by a module
    pub fn module_inputs(&self, module_id: &ModuleId) -> Vec<DataId> {
        self.in_edges
            .iter()
            .filter(|(_, module)| module == module_id)
            .map(|(data, _)| *data)
            .collect()
    }

    /// Data nodes produced by a module
    pub fn module_outputs(&self, module_id: &ModuleId) -> Vec<DataId> {
        self.out_edges
            .iter()
            .filter(|(module, _)| module == module_id)
            .map(|(_, data)| *data)
            .collect()
    }

    /// The DAG inputs: data nodes consumed by some module and produced by none
    ///
    /// Ordered like the `data` map.
    pub fn inputs(&self) -> Vec<(DataId, &DataNodeSpec)> {
        let consumed: BTreeSet<DataId> = self
            .in_edges
            .iter()
            .map(|(source, _)| *source)
            .filter(|source| !self.is_produced(source))
            .collect();
        self.data
            .iter()
            .filter(|(id, _)| consumed.contains(id))
            .map(|(id, spec)| (*id, spec))
            .collect()
    }

    /// The DAG outputs: data nodes produced by some module and consumed by none
    pub fn outputs(&self) -> Vec<(DataId, &DataNodeSpec)> {
        let produced: BTreeSet<DataId> = self
            .out_edges
            .iter()
            .map(|(_, target)| *target)
            .filter(|target| !self.is_consumed(target))
            .collect();
        self.data
            .iter()
            .filter(|(id, _)| produced.contains(id))
            .map(|(id, spec)| (*id, spec))
            .collect()
    }
}

/// Turn a user-typed name into a DAG name the backend accepts
///
/// Keeps ASCII letters and digits only, drops leading digits and
/// capitalizes the first letter. May return an empty string.
pub fn sanitize_dag_name(name: &str) -> String {
    let kept: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    let trimmed = kept.trim_start_matches(|c: char| c.is_ascii_digit());
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
