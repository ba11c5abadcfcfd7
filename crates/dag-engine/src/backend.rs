//! Backend collaborator
//!
//! The store never talks to a server directly. Anything that can fetch,
//! store and run DAGs implements [`DagBackend`]; the REST implementation
//! lives in the `dag-http-adapter` crate, [`MemoryBackend`] keeps
//! everything in process.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dag::{ComponentMetadata, DagSpec, DataId, ModuleNodeSpec};
use crate::error::BackendError;
use crate::runtime::RuntimeState;
use crate::types::CValue;

/// Answer to a DAG creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum CreateDagResponse {
    /// A fresh empty DAG was stored under the name
    Created { metadata: ComponentMetadata },
    /// The name is taken; nothing was stored
    Exists { message: String },
}

impl CreateDagResponse {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Remote store and executor for DAGs
#[async_trait]
pub trait DagBackend: Send + Sync {
    /// Every stored DAG with its metadata, keyed by name
    async fn list_dags(&self) -> Result<BTreeMap<String, ComponentMetadata>, BackendError>;

    /// Store a fresh empty DAG under `name` unless the name is taken
    async fn create_dag(&self, name: &str) -> Result<CreateDagResponse, BackendError>;

    /// Fetch a DAG by name (`GET /dag/{name}`)
    async fn get_dag(&self, name: &str) -> Result<DagSpec, BackendError>;

    /// Store a DAG under a name (`PUT /dag/{name}`)
    async fn save_dag(&self, name: &str, dag: &DagSpec) -> Result<(), BackendError>;

    /// Execute a stored DAG (`POST /dag/{name}/run`)
    async fn run_dag(
        &self,
        name: &str,
        inputs: &BTreeMap<DataId, CValue>,
    ) -> Result<RuntimeState, BackendError>;

    /// Module catalog for the module picker (`GET /modules`)
    async fn list_modules(&self) -> Result<Vec<ModuleNodeSpec>, BackendError>;
}

/// In-process backend
///
/// Runs never execute anything: a run answers with the configured result,
/// or with an all-`Unfired` snapshot echoing the inputs.
#[derive(Default)]
pub struct MemoryBackend {
    dags: Mutex<HashMap<String, DagSpec>>,
    modules: Mutex<Vec<ModuleNodeSpec>>,
    run_result: Mutex<Option<RuntimeState>>,
    fail_saves: Mutex<bool>,
    saves: Mutex<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored DAG
    pub fn with_dag(self, name: impl Into<String>, dag: DagSpec) -> Self {
        self.dags.lock().insert(name.into(), dag);
        self
    }

    /// Seed the module catalog
    pub fn with_modules(self, modules: Vec<ModuleNodeSpec>) -> Self {
        *self.modules.lock() = modules;
        self
    }

    /// Answer every run with `result`
    pub fn set_run_result(&self, result: RuntimeState) {
        *self.run_result.lock() = Some(result);
    }

    /// Make saves fail with a transport error
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// Stored copy of a DAG
    pub fn stored(&self, name: &str) -> Option<DagSpec> {
        self.dags.lock().get(name).cloned()
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl DagBackend for MemoryBackend {
    async fn list_dags(&self) -> Result<BTreeMap<String, ComponentMetadata>, BackendError> {
        Ok(self
            .dags
            .lock()
            .iter()
            .map(|(name, dag)| (name.clone(), dag.metadata.clone()))
            .collect())
    }

    async fn create_dag(&self, name: &str) -> Result<CreateDagResponse, BackendError> {
        let mut dags = self.dags.lock();
        if dags.contains_key(name) {
            return Ok(CreateDagResponse::Exists {
                message: format!("DAG '{}' already exists", name),
            });
        }
        let metadata = ComponentMetadata::named(name);
        dags.insert(
            name.to_string(),
            DagSpec {
                metadata: metadata.clone(),
                ..DagSpec::empty()
            },
        );
        Ok(CreateDagResponse::Created { metadata })
    }

    async fn get_dag(&self, name: &str) -> Result<DagSpec, BackendError> {
        self.dags
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("dag '{}'", name)))
    }

    async fn save_dag(&self, name: &str, dag: &DagSpec) -> Result<(), BackendError> {
        if *self.fail_saves.lock() {
            return Err(BackendError::Transport("backend unavailable".to_string()));
        }
        self.dags.lock().insert(name.to_string(), dag.clone());
        *self.saves.lock() += 1;
        Ok(())
    }

    async fn run_dag(
        &self,
        name: &str,
        inputs: &BTreeMap<DataId, CValue>,
    ) -> Result<RuntimeState, BackendError> {
        if let Some(result) = self.run_result.lock().clone() {
            return Ok(result);
        }
        let dag = self.get_dag(name).await?;
        Ok(RuntimeState::unfired(
            uuid::Uuid::new_v4().to_string(),
            dag,
            inputs.clone(),
        ))
    }

    async fn list_modules(&self) -> Result<Vec<ModuleNodeSpec>, BackendError> {
        Ok(self.modules.lock().clone())
    }
}
