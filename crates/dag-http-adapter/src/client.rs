//! REST implementation of `DagBackend`
//!
//! Every answer from the server is wrapped in a `{"data": ...}` envelope.
//! Each request carries a fresh `Trace-ID` header so server logs can be
//! matched with the editor's.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dag_engine::{
    BackendError, CValue, ComponentMetadata, CreateDagResponse, DagBackend, DagSpec, DataId,
    ModuleNodeSpec, RuntimeState,
};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::HttpBackendConfig;
use crate::error::HttpAdapterError;

/// Header carrying the per-request trace id
pub const TRACE_HEADER: &str = "Trace-ID";

/// Response envelope used by the server
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Backend talking to the pipeline server over HTTP
pub struct HttpDagBackend {
    http_client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpDagBackend {
    /// Create a backend for `config`
    pub fn new(config: HttpBackendConfig) -> Result<Self, HttpAdapterError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create a backend configured from the environment
    pub fn from_env() -> Result<Self, HttpAdapterError> {
        Self::new(HttpBackendConfig::from_env())
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// URL of the editor endpoint made of `segments`, each one escaped
    pub fn url(&self, segments: &[&str]) -> Result<Url, HttpAdapterError> {
        Self::join(&self.config.base_url(), segments)
    }

    /// URL of the DAG browser endpoint made of `segments`
    pub fn browser_url(&self, segments: &[&str]) -> Result<Url, HttpAdapterError> {
        Self::join(&self.config.browser_url(), segments)
    }

    fn join(base: &str, segments: &[&str]) -> Result<Url, HttpAdapterError> {
        let mut url = Url::parse(base)
            .map_err(|e| HttpAdapterError::Config(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| HttpAdapterError::Config("Base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, HttpAdapterError> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        if self.config.is_local() {
            log::debug!("{}: {} trace-id: {}", method, url, trace_id);
        }

        let mut request = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(TRACE_HEADER, trace_id);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HttpAdapterError::Status { code, body });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HttpAdapterError> {
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| HttpAdapterError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl DagBackend for HttpDagBackend {
    async fn list_dags(&self) -> Result<BTreeMap<String, ComponentMetadata>, BackendError> {
        let url = self.browser_url(&[""])?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        Ok(Self::decode(response).await?)
    }

    async fn create_dag(&self, name: &str) -> Result<CreateDagResponse, BackendError> {
        let url = self.browser_url(&[name])?;
        let response = self.send::<()>(Method::POST, url, None).await?;
        Ok(Self::decode(response).await?)
    }

    async fn get_dag(&self, name: &str) -> Result<DagSpec, BackendError> {
        let url = self.url(&["dag", name])?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        Ok(Self::decode(response).await?)
    }

    async fn save_dag(&self, name: &str, dag: &DagSpec) -> Result<(), BackendError> {
        let url = self.url(&["dag", name])?;
        self.send(Method::PUT, url, Some(dag)).await?;
        Ok(())
    }

    async fn run_dag(
        &self,
        name: &str,
        inputs: &BTreeMap<DataId, CValue>,
    ) -> Result<RuntimeState, BackendError> {
        let url = self.url(&["dag", name, "run"])?;
        let response = self.send(Method::POST, url, Some(inputs)).await?;
        Ok(Self::decode(response).await?)
    }

    async fn list_modules(&self) -> Result<Vec<ModuleNodeSpec>, BackendError> {
        let url = self.url(&["modules"])?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        Ok(Self::decode(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_hostname: &str) -> HttpDagBackend {
        HttpDagBackend::new(HttpBackendConfig {
            base_hostname: base_hostname.to_string(),
            timeout_ms: 500,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let backend = backend("http://localhost:1337");
        assert_eq!(
            backend.url(&["dag", "main", "run"]).unwrap().as_str(),
            "http://localhost:1337/api/editor/dag/main/run"
        );
        assert_eq!(
            backend.url(&["modules"]).unwrap().as_str(),
            "http://localhost:1337/api/editor/modules"
        );
    }

    #[test]
    fn test_browser_urls() {
        let backend = backend("http://localhost:1337");
        assert_eq!(
            backend.browser_url(&[""]).unwrap().as_str(),
            "http://localhost:1337/api/browser-dags/"
        );
        assert_eq!(
            backend.browser_url(&["Wordcount"]).unwrap().as_str(),
            "http://localhost:1337/api/browser-dags/Wordcount"
        );
    }

    #[test]
    fn test_create_answers_decode() {
        let created: ApiResponse<CreateDagResponse> = serde_json::from_value(serde_json::json!({
            "data": {
                "tag": "created",
                "metadata": ComponentMetadata::named("Wordcount"),
            }
        }))
        .unwrap();
        assert!(created.data.is_created());

        let exists: ApiResponse<CreateDagResponse> = serde_json::from_value(serde_json::json!({
            "data": { "tag": "exists", "message": "DAG already exists" }
        }))
        .unwrap();
        assert_eq!(
            exists.data,
            CreateDagResponse::Exists {
                message: "DAG already exists".to_string()
            }
        );
    }

    #[test]
    fn test_names_are_escaped() {
        let backend = backend("http://localhost:1337");
        assert_eq!(
            backend.url(&["dag", "my dag/v2"]).unwrap().as_str(),
            "http://localhost:1337/api/editor/dag/my%20dag%2Fv2"
        );
    }

    #[test]
    fn test_invalid_base() {
        let backend = backend("not a url");
        assert!(matches!(
            backend.url(&["modules"]),
            Err(HttpAdapterError::Config(_))
        ));
    }

    #[test]
    fn test_envelope() {
        let envelope: ApiResponse<DagSpec> =
            serde_json::from_value(serde_json::json!({ "data": DagSpec::empty() })).unwrap();
        assert_eq!(envelope.data, DagSpec::empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Nothing listens on the discard port
        let backend = backend("http://127.0.0.1:9");
        let err = backend.get_dag("main").await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
