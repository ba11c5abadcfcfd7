//! Interactive editor state
//!
//! [`EditorStore`] owns the current DAG, its rendered projection, the last
//! run result and the UI preferences. Callers hand it intents (add a
//! module, apply a batch of view changes, run) and read state back; they
//! never mutate the DAG directly.
//!
//! Every method takes `&mut self`, so one store has a single writer. A
//! host sharing it between tasks wraps it in a [`SharedEditorStore`];
//! the lock then serializes
//! structural edits so each one starts from the state the previous one
//! left behind. No method holds the store across a backend round-trip
//! while a run is pending: [`run_shared`] takes the lock only to prepare
//! the run and to apply its result.
//!
//! Structural edits are applied in memory first and handed to a
//! background [`SaveQueue`] that saves snapshots in edit order. A failed
//! save is logged and reported as [`EditorEvent::PersistFailed`]; it never
//! rolls the edit back. [`EditorStore::flush_saves`] waits for the queue.

use std::collections::BTreeMap;
use std::sync::Arc;

use std::future::Future;

use tokio::sync::oneshot;

use crate::backend::{CreateDagResponse, DagBackend};
use crate::config::EditorConfig;
use crate::dag::{
    sanitize_dag_name, ComponentMetadata, DagSpec, DataId, DataNodeSpec, ModuleId, ModuleNodeSpec,
};
use crate::error::{EngineError, Result};
use crate::events::{EditorEvent, EventSink, NullEventSink};
use crate::execution::{apply_result, clear_result};
use crate::layout::{LayeredLayout, LayoutDirection, LayoutEngine};
use crate::mutation;
use crate::persistence::SaveQueue;
use crate::preferences::{SessionStorage, UiPreferences};
use crate::projection::changes::{EdgeChange, NodeChange};
use crate::projection::node::Graph;
use crate::projection::orchestrator::{GraphProjector, ProjectionUpdate, RenderAction};
use crate::runtime::RuntimeState;
use crate::types::CValue;

/// A store shared between tasks
pub type SharedEditorStore = Arc<tokio::sync::Mutex<EditorStore>>;

/// State owner of the editor
pub struct EditorStore {
    backend: Arc<dyn DagBackend>,
    events: Arc<dyn EventSink>,
    engine: Arc<dyn LayoutEngine>,
    config: EditorConfig,
    storage: SessionStorage,
    preferences: UiPreferences,
    projector: GraphProjector,
    dag_name: Option<String>,
    dag: Option<DagSpec>,
    result: Option<RuntimeState>,
    catalog: Vec<ModuleNodeSpec>,
    saves: Option<SaveQueue>,
}

/// A run prepared under the store lock and executed without it
pub struct PendingRun {
    backend: Arc<dyn DagBackend>,
    dag_name: String,
    inputs: BTreeMap<DataId, CValue>,
    saved: Option<oneshot::Receiver<()>>,
}

impl PendingRun {
    pub fn dag_name(&self) -> &str {
        &self.dag_name
    }

    pub fn inputs(&self) -> &BTreeMap<DataId, CValue> {
        &self.inputs
    }

    /// Run the DAG once the saves queued before the run have landed
    pub async fn execute(self) -> Result<RuntimeState> {
        if let Some(saved) = self.saved {
            let _ = saved.await;
        }
        log::info!(
            "Running DAG '{}' with {} inputs",
            self.dag_name,
            self.inputs.len()
        );
        let result = self.backend.run_dag(&self.dag_name, &self.inputs).await?;
        log::info!(
            "Run {} of '{}' finished in {:.1}ms",
            result.process_uuid,
            self.dag_name,
            result.latency
        );
        Ok(result)
    }
}

/// Run the DAG of a shared store without holding its lock during the run
///
/// Edits made while the run is pending go through; the result is projected
/// onto the graph as it stands when the run finishes. A result for a DAG
/// that is no longer loaded is returned but not applied.
pub async fn run_shared(
    store: &SharedEditorStore,
    inputs: BTreeMap<DataId, CValue>,
) -> Result<RuntimeState> {
    let pending = store.lock().await.prepare_run(inputs)?;
    let dag_name = pending.dag_name().to_string();
    let result = pending.execute().await?;

    let mut store = store.lock().await;
    if store.dag_name() == Some(dag_name.as_str()) {
        store.apply_run_result(&result);
    } else {
        log::debug!("Dropping result of '{}', another DAG is loaded", dag_name);
    }
    Ok(result)
}

impl EditorStore {
    /// Create a store with default configuration
    pub fn new(backend: Arc<dyn DagBackend>) -> Self {
        let config = EditorConfig::default();
        let engine: Arc<dyn LayoutEngine> = Arc::new(LayeredLayout::new(config.layout));
        let projector = GraphProjector::with_engine(
            config.preferred_layout,
            config.placement.clone(),
            engine.clone(),
        );
        Self {
            backend,
            events: Arc::new(NullEventSink),
            engine,
            config,
            storage: SessionStorage::new(),
            preferences: UiPreferences::default(),
            projector,
            dag_name: None,
            dag: None,
            result: None,
            catalog: Vec::new(),
            saves: None,
        }
    }

    /// Use `config`; the built-in layout picks up its spacing
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.engine = Arc::new(LayeredLayout::new(config.layout));
        self.config = config;
        self.rebuild_projector();
        self
    }

    /// Use a custom layout engine
    pub fn with_layout_engine(mut self, engine: Arc<dyn LayoutEngine>) -> Self {
        self.engine = engine;
        self.rebuild_projector();
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self.saves = None;
        self
    }

    /// Persist UI preferences in `storage`, restoring what it holds
    pub fn with_storage(mut self, storage: SessionStorage) -> Self {
        self.preferences = storage.load();
        self.storage = storage;
        self.rebuild_projector();
        self
    }

    /// Wrap the store for use from several tasks
    pub fn into_shared(self) -> SharedEditorStore {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    fn rebuild_projector(&mut self) {
        let direction = self
            .preferences
            .preferred_layout
            .unwrap_or(self.config.preferred_layout);
        self.projector = GraphProjector::with_engine(
            direction,
            self.config.placement.clone(),
            self.engine.clone(),
        );
        if let Some(dag) = &self.dag {
            self.projector.render(dag);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn dag(&self) -> Option<&DagSpec> {
        self.dag.as_ref()
    }

    pub fn dag_name(&self) -> Option<&str> {
        self.dag_name.as_deref()
    }

    /// The rendered projection
    pub fn graph(&self) -> &Graph {
        self.projector.graph()
    }

    pub fn last_action(&self) -> RenderAction {
        self.projector.last_action()
    }

    pub fn direction(&self) -> LayoutDirection {
        self.projector.direction()
    }

    /// Result of the last run, until reset
    pub fn result(&self) -> Option<&RuntimeState> {
        self.result.as_ref()
    }

    pub fn catalog(&self) -> &[ModuleNodeSpec] {
        &self.catalog
    }

    pub fn preferences(&self) -> &UiPreferences {
        &self.preferences
    }

    fn current_dag(&self) -> Result<&DagSpec> {
        self.dag.as_ref().ok_or(EngineError::NoDagLoaded)
    }

    /// The DAG inputs with their specs
    pub fn dag_inputs(&self) -> Vec<(DataId, DataNodeSpec)> {
        self.dag
            .as_ref()
            .map(|dag| {
                dag.inputs()
                    .into_iter()
                    .map(|(id, spec)| (id, spec.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch a DAG from the backend and render it
    pub async fn load_dag(&mut self, name: &str) -> Result<()> {
        let dag = self.backend.get_dag(name).await?;
        log::info!(
            "Loaded DAG '{}' ({} modules, {} data nodes)",
            name,
            dag.modules.len(),
            dag.data.len()
        );
        self.emit(EditorEvent::DagLoaded {
            dag_name: name.to_string(),
            modules: dag.modules.len(),
            data: dag.data.len(),
        });

        self.projector.replace(Graph::default(), RenderAction::Nothing);
        self.projector.render(&dag);
        self.dag_name = Some(name.to_string());
        self.dag = Some(dag);
        self.result = None;
        Ok(())
    }

    /// Every DAG the backend stores, keyed by name
    pub async fn list_dags(&self) -> Result<BTreeMap<String, ComponentMetadata>> {
        let dags = self.backend.list_dags().await?;
        log::debug!("Backend holds {} DAGs", dags.len());
        Ok(dags)
    }

    /// Create an empty DAG under the sanitized `name` and load it
    ///
    /// A taken name is not an error: the backend's answer is returned and
    /// the loaded DAG stays as it was.
    pub async fn create_dag(&mut self, name: &str) -> Result<CreateDagResponse> {
        let sanitized = sanitize_dag_name(name);
        if sanitized.is_empty() {
            return Err(EngineError::InvalidDagName(name.to_string()));
        }

        let response = self.backend.create_dag(&sanitized).await?;
        match &response {
            CreateDagResponse::Created { .. } => {
                log::info!("Created DAG '{}'", sanitized);
                self.emit(EditorEvent::DagCreated {
                    dag_name: sanitized.clone(),
                });
                self.load_dag(&sanitized).await?;
            }
            CreateDagResponse::Exists { message } => {
                log::info!("DAG '{}' not created: {}", sanitized, message);
            }
        }
        Ok(response)
    }

    /// Fetch the module catalog for the module picker
    pub async fn load_module_catalog(&mut self) -> Result<&[ModuleNodeSpec]> {
        self.catalog = self.backend.list_modules().await?;
        log::debug!("Loaded {} catalog modules", self.catalog.len());
        Ok(&self.catalog)
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Add a module with fresh data nodes for its parameters
    pub async fn add_module(&mut self, spec: ModuleNodeSpec) -> Result<ModuleId> {
        let name = spec.metadata.name.clone();
        let added = mutation::add_module(self.current_dag()?, spec);

        self.projector.render(&added.dag);
        self.dag = Some(added.dag);
        self.emit(EditorEvent::ModuleAdded {
            module_id: added.module_id,
            name,
        });
        self.persist();
        Ok(added.module_id)
    }

    /// Delete modules and the data nodes only they used
    ///
    /// Returns false when nothing in `module_ids` is a module.
    pub async fn delete_modules(&mut self, module_ids: &[ModuleId]) -> Result<bool> {
        let dag = self.current_dag()?;
        let edges = &self.projector.graph().edges;
        let Some(deletion) = mutation::delete_modules(dag, module_ids, edges) else {
            log::debug!("Nothing deletable among {} ids", module_ids.len());
            return Ok(false);
        };

        self.projector.render(&deletion.edit.dag);
        self.dag = Some(deletion.edit.dag);
        self.emit(EditorEvent::ModulesDeleted {
            module_ids: deletion.removed_modules,
            data_ids: deletion.removed_data,
        });
        self.persist();
        Ok(true)
    }

    /// Delete the currently selected modules
    pub async fn delete_selection(&mut self) -> Result<bool> {
        let selected: Vec<ModuleId> = self
            .projector
            .graph()
            .nodes
            .iter()
            .filter(|n| n.selected && n.is_module())
            .map(|n| n.id)
            .collect();
        if selected.is_empty() {
            return Ok(false);
        }
        self.delete_modules(&selected).await
    }

    /// Apply a batch of node changes reported by the view
    ///
    /// Drops of a data node onto a compatible one merge them, module
    /// removals delete. Structural results are adopted and persisted.
    pub async fn on_nodes_change(&mut self, changes: &[NodeChange]) -> Result<RenderAction> {
        let dag = self.dag.as_ref().ok_or(EngineError::NoDagLoaded)?;
        let update = self.projector.apply_node_changes(dag, changes)?;
        let action = update.action;
        if action == RenderAction::SetLayout {
            self.emit(EditorEvent::LayoutApplied {
                direction: self.projector.direction(),
            });
        }
        if update.is_structural() {
            self.adopt(update);
        }
        Ok(action)
    }

    fn adopt(&mut self, update: ProjectionUpdate) {
        let ProjectionUpdate {
            dag,
            merged,
            removed_modules,
            removed_data,
            ..
        } = update;
        for pair in merged {
            self.emit(EditorEvent::DataNodesMerged {
                dragged: pair.dragged,
                target: pair.target,
            });
        }
        if !removed_modules.is_empty() {
            self.emit(EditorEvent::ModulesDeleted {
                module_ids: removed_modules,
                data_ids: removed_data,
            });
        }
        if dag.is_some() {
            self.dag = dag;
            self.persist();
        }
    }

    /// Apply a batch of edge changes to the projection only
    pub fn on_edges_change(&mut self, changes: &[EdgeChange]) {
        self.projector.apply_edge_changes(changes);
    }

    /// Lay the projection out in `direction` and remember the choice
    pub fn set_layout(&mut self, direction: LayoutDirection) {
        self.projector.relayout(direction);
        self.preferences.preferred_layout = Some(direction);
        self.save_preferences();
        self.emit(EditorEvent::LayoutApplied { direction });
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Runner defaults for every DAG input
    pub fn default_run_inputs(&self) -> BTreeMap<DataId, CValue> {
        self.dag_inputs()
            .into_iter()
            .map(|(id, spec)| (id, spec.c_type.default_value()))
            .collect()
    }

    /// Capture what a run of the loaded DAG needs
    pub fn prepare_run(&mut self, inputs: BTreeMap<DataId, CValue>) -> Result<PendingRun> {
        let dag_name = self.dag_name.clone().ok_or(EngineError::NoDagLoaded)?;
        Ok(PendingRun {
            backend: self.backend.clone(),
            dag_name,
            inputs,
            saved: self.saves.as_ref().map(SaveQueue::flushed),
        })
    }

    /// Prepare a run from raw runner form values
    ///
    /// Each value is parsed with its input's type; inputs without a value
    /// use the type default. The raw values are kept as runner drafts.
    pub fn prepare_raw_run(&mut self, raw: &BTreeMap<DataId, String>) -> Result<PendingRun> {
        let mut inputs = BTreeMap::new();
        for (id, spec) in self.current_dag()?.inputs() {
            let value = match raw.get(&id) {
                Some(text) => CValue::parse(&spec.c_type, text)?,
                None => spec.c_type.default_value(),
            };
            inputs.insert(id, value);
        }

        self.preferences.runner_drafts = raw.clone();
        self.save_preferences();
        self.prepare_run(inputs)
    }

    /// Project a finished run onto the current graph and keep it
    pub fn apply_run_result(&mut self, result: &RuntimeState) {
        let graph = apply_result(self.projector.graph(), result);
        self.projector.replace(graph, RenderAction::GraphRender);
        self.emit(EditorEvent::RunCompleted {
            process_uuid: result.process_uuid.clone(),
            latency: result.latency,
        });
        self.result = Some(result.clone());
    }

    /// Run the DAG and project the result
    ///
    /// Holds `self` for the whole run; a shared store uses [`run_shared`].
    pub async fn run_with_inputs(
        &mut self,
        inputs: BTreeMap<DataId, CValue>,
    ) -> Result<RuntimeState> {
        let result = self.prepare_run(inputs)?.execute().await?;
        self.apply_run_result(&result);
        Ok(result)
    }

    /// Run the DAG with raw runner form values
    pub async fn run_with_raw_inputs(
        &mut self,
        raw: &BTreeMap<DataId, String>,
    ) -> Result<RuntimeState> {
        let result = self.prepare_raw_run(raw)?.execute().await?;
        self.apply_run_result(&result);
        Ok(result)
    }

    /// Forget the last run result
    pub fn reset_execution(&mut self) {
        self.result = None;
        let graph = clear_result(self.projector.graph());
        self.projector.replace(graph, RenderAction::GraphRender);
        self.emit(EditorEvent::ResultCleared);
    }

    // =========================================================================
    // Tool panels
    // =========================================================================

    /// Show the `name` tool panel, or hide it when it is already shown
    pub fn display_tool(&mut self, name: &str) {
        if self.preferences.displayed_tool.as_deref() == Some(name) {
            self.preferences.displayed_tool = None;
        } else {
            self.preferences.displayed_tool = Some(name.to_string());
        }
        self.preferences.panel_shown = self.preferences.displayed_tool.is_some();
        self.save_preferences();
    }

    pub fn hide_tools(&mut self) {
        self.preferences.displayed_tool = None;
        self.preferences.panel_shown = false;
        self.save_preferences();
    }

    // =========================================================================
    // Side effects
    // =========================================================================

    /// Resolves once every save queued so far has been attempted
    ///
    /// The future does not borrow the store, so a shared store can be
    /// unlocked while waiting.
    pub fn flush_saves(&self) -> impl Future<Output = ()> + Send + 'static {
        let flushed = self.saves.as_ref().map(SaveQueue::flushed);
        async move {
            if let Some(flushed) = flushed {
                let _ = flushed.await;
            }
        }
    }

    fn persist(&mut self) {
        let (Some(name), Some(dag)) = (&self.dag_name, &self.dag) else {
            return;
        };
        let backend = &self.backend;
        let events = &self.events;
        self.saves
            .get_or_insert_with(|| SaveQueue::spawn(backend.clone(), events.clone()))
            .enqueue(name, dag);
    }

    fn save_preferences(&self) {
        if let Err(e) = self.storage.save(&self.preferences) {
            log::warn!("Failed to save preferences: {}", e);
        }
    }

    fn emit(&self, event: EditorEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Dropped editor event: {}", e);
        }
    }
}
