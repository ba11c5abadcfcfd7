//! Connection settings for the pipeline server

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default values for the HTTP backend
pub mod defaults {
    /// Server used when nothing else is configured
    pub const BASE_HOSTNAME: &str = "http://localhost:1337";
    /// Application segment of the API path
    pub const APP_NAME: &str = "editor";
    /// Application segment of the DAG browser API
    pub const BROWSER_APP_NAME: &str = "browser-dags";
    /// Per-request timeout
    pub const TIMEOUT_MS: u64 = 5000;
    /// Environment variable overriding the server
    pub const HOSTNAME_ENV: &str = "DAG_EDITOR_API_BASE_HOSTNAME";
}

/// Where and how to reach the pipeline server
///
/// Editor requests go to `{base_hostname}/api/{app_name}{endpoint}`,
/// listing and creating DAGs to `{base_hostname}/api/{browser_app_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    pub base_hostname: String,
    pub app_name: String,
    pub browser_app_name: String,
    pub timeout_ms: u64,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_hostname: defaults::BASE_HOSTNAME.to_string(),
            app_name: defaults::APP_NAME.to_string(),
            browser_app_name: defaults::BROWSER_APP_NAME.to_string(),
            timeout_ms: defaults::TIMEOUT_MS,
        }
    }
}

impl HttpBackendConfig {
    /// Defaults, with the server taken from the environment when set
    pub fn from_env() -> Self {
        Self::with_hostname(std::env::var(defaults::HOSTNAME_ENV).ok())
    }

    fn with_hostname(hostname: Option<String>) -> Self {
        match hostname.filter(|h| !h.trim().is_empty()) {
            Some(base_hostname) => Self {
                base_hostname,
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    /// Use another application segment
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL every editor endpoint is appended to
    pub fn base_url(&self) -> String {
        self.app_url(&self.app_name)
    }

    /// Base URL of the DAG browser endpoints
    pub fn browser_url(&self) -> String {
        self.app_url(&self.browser_app_name)
    }

    fn app_url(&self, app: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_hostname.trim_end_matches('/'),
            app.trim_matches('/')
        )
    }

    /// Check if requests target a server on this machine
    pub fn is_local(&self) -> bool {
        self.base_hostname.contains("localhost") || self.base_hostname.contains("127.0.0.1")
    }
}
