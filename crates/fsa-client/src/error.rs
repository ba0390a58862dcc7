//! Client error types and their mapping onto collaborator errors.

use fsa_audit::PortError;

/// Errors from backing API or AI service calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The request did not complete within the configured timeout.
    #[error("{endpoint} timed out after {after_ms}ms")]
    Timeout { endpoint: String, after_ms: u64 },
    /// The service returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The response decoded but does not describe a valid record.
    #[error("invalid record from {endpoint}: {reason}")]
    Invalid { endpoint: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl From<ClientError> for PortError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http { endpoint, source } => PortError::Unavailable {
                reason: format!("{endpoint}: {source}"),
            },
            ClientError::Timeout { after_ms, .. } => PortError::Timeout {
                elapsed_ms: after_ms,
            },
            ClientError::ApiError {
                endpoint, status, ..
            } if status == 404 => PortError::NotFound { resource: endpoint },
            ClientError::ApiError {
                endpoint, status, body
            } if status >= 500 => PortError::Unavailable {
                reason: format!("{endpoint} returned {status}: {body}"),
            },
            ClientError::ApiError { status, body, .. } => PortError::Rejected { status, body },
            ClientError::Deserialization { endpoint, source } => PortError::Malformed {
                reason: format!("{endpoint}: {source}"),
            },
            ClientError::Invalid { endpoint, reason } => PortError::Malformed {
                reason: format!("{endpoint}: {reason}"),
            },
            ClientError::Config(e) => PortError::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}
