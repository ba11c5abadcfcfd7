//! Execution snapshots reported back by the executing backend

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dag::{DagSpec, DataId, ModuleId};
use crate::types::CValue;

/// Outcome of one module in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum ModuleStatus {
    Unfired,
    Fired {
        latency: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
    },
    Timed {
        latency: f64,
    },
    Failed {
        error: String,
    },
}

impl ModuleStatus {
    /// Check if the module ran to completion
    pub fn is_fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

/// Result of a whole DAG run
///
/// Replaced wholesale on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub process_uuid: String,
    pub dag: DagSpec,
    #[serde(default)]
    pub module_status: BTreeMap<ModuleId, ModuleStatus>,
    #[serde(default)]
    pub data: BTreeMap<DataId, CValue>,
    pub latency: f64,
}

impl RuntimeState {
    /// A snapshot where nothing fired and only the given data is known
    pub fn unfired(
        process_uuid: impl Into<String>,
        dag: DagSpec,
        data: BTreeMap<DataId, CValue>,
    ) -> Self {
        let module_status = dag
            .modules
            .keys()
            .map(|id| (*id, ModuleStatus::Unfired))
            .collect();
        Self {
            process_uuid: process_uuid.into(),
            dag,
            module_status,
            data,
            latency: 0.0,
        }
    }
}
