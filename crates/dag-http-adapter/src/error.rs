//! Error types for the HTTP adapter

use dag_engine::BackendError;
use thiserror::Error;

/// Errors raised while talking to the pipeline server
#[derive(Debug, Error)]
pub enum HttpAdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("API error {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<HttpAdapterError> for BackendError {
    fn from(err: HttpAdapterError) -> Self {
        match err {
            HttpAdapterError::Status { code: 404, body } => BackendError::NotFound(body),
            HttpAdapterError::Status { code, body } => BackendError::Status {
                code,
                message: body,
            },
            HttpAdapterError::Http(e) if e.is_decode() => BackendError::Decode(e.to_string()),
            HttpAdapterError::Http(e) => BackendError::Transport(e.to_string()),
            HttpAdapterError::Decode(message) => BackendError::Decode(message),
            HttpAdapterError::Config(message) => BackendError::Transport(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found: BackendError = HttpAdapterError::Status {
            code: 404,
            body: "no dag".to_string(),
        }
        .into();
        assert!(matches!(not_found, BackendError::NotFound(body) if body == "no dag"));

        let server: BackendError = HttpAdapterError::Status {
            code: 500,
            body: "boom".to_string(),
        }
        .into();
        assert!(matches!(server, BackendError::Status { code: 500, .. }));
    }

    #[test]
    fn test_decode_mapping() {
        let err: BackendError = HttpAdapterError::Decode("bad".to_string()).into();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
