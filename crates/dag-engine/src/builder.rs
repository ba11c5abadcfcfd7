//! Fluent builders for module specs and DAGs
//!
//! Provides a fluent API for constructing specs programmatically, mostly
//! for module catalogs and tests.

use std::collections::BTreeMap;

use crate::dag::{ComponentMetadata, DagSpec, ModuleNodeSpec, ModuleRuntimeConfig};
use crate::types::CType;

/// Fluent builder for a module's structural contract
///
/// # Example
///
/// ```
/// use dag_engine::{CType, ModuleSpecBuilder};
///
/// let spec = ModuleSpecBuilder::new("tokenize")
///     .consumes("text", CType::String)
///     .produces("tokens", CType::list(CType::String))
///     .build();
/// assert_eq!(spec.consumes.len(), 1);
/// ```
pub struct ModuleSpecBuilder {
    metadata: ComponentMetadata,
    consumes: BTreeMap<String, CType>,
    produces: BTreeMap<String, CType>,
    config: ModuleRuntimeConfig,
    context: Option<serde_json::Value>,
}

impl ModuleSpecBuilder {
    /// Create a new builder for a module called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ComponentMetadata {
                name: name.into(),
                description: String::new(),
                tags: Vec::new(),
                major_version: 0,
                minor_version: 1,
            },
            consumes: BTreeMap::new(),
            produces: BTreeMap::new(),
            config: ModuleRuntimeConfig::default(),
            context: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    /// Set the version
    pub fn with_version(mut self, major: u32, minor: u32) -> Self {
        self.metadata.major_version = major;
        self.metadata.minor_version = minor;
        self
    }

    /// Set the module and input timeouts (milliseconds)
    pub fn with_timeouts(mut self, module_timeout: u64, inputs_timeout: u64) -> Self {
        self.config = ModuleRuntimeConfig {
            module_timeout,
            inputs_timeout,
        };
        self
    }

    /// Attach an opaque context forwarded to the backend
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Declare an input parameter
    pub fn consumes(mut self, param: impl Into<String>, c_type: CType) -> Self {
        self.consumes.insert(param.into(), c_type);
        self
    }

    /// Declare an output parameter
    pub fn produces(mut self, param: impl Into<String>, c_type: CType) -> Self {
        self.produces.insert(param.into(), c_type);
        self
    }

    pub fn build(self) -> ModuleNodeSpec {
        ModuleNodeSpec {
            metadata: self.metadata,
            consumes: self.consumes,
            produces: self.produces,
            config: self.config,
            context: self.context,
        }
    }
}

/// Build a DAG by repeatedly adding modules
///
/// Every module gets fresh data nodes exactly as the editor's
/// add-module operation creates them.
pub struct DagBuilder {
    dag: DagSpec,
}

impl DagBuilder {
    /// Create a builder for an empty DAG called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            dag: DagSpec {
                metadata: ComponentMetadata::named(name),
                ..DagSpec::empty()
            },
        }
    }

    /// Add a module with fresh data nodes
    pub fn add_module(mut self, spec: ModuleNodeSpec) -> Self {
        self.dag = crate::mutation::add_module(&self.dag, spec).dag;
        self
    }

    pub fn build(self) -> DagSpec {
        self.dag
    }
}
