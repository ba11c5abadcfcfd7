//! REST backend for the DAG editor
//!
//! Implements `dag_engine::DagBackend` against the pipeline server:
//!
//! - `GET /dag/{name}` fetches a DAG
//! - `PUT /dag/{name}` stores a DAG
//! - `POST /dag/{name}/run` executes a DAG with input values
//! - `GET /modules` lists the module catalog
//!
//! Listing and creating DAGs goes to the DAG browser application:
//!
//! - `GET /` lists stored DAGs with their metadata
//! - `POST /{name}` creates an empty DAG unless the name is taken
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dag_engine::EditorStore;
//! use dag_http_adapter::HttpDagBackend;
//!
//! let backend = HttpDagBackend::from_env()?;
//! let mut store = EditorStore::new(Arc::new(backend));
//! store.load_dag("main").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{ApiResponse, HttpDagBackend, TRACE_HEADER};
pub use config::HttpBackendConfig;
pub use error::HttpAdapterError;
