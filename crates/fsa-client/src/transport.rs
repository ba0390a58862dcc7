//! Shared response handling for both services.

use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ClientError;

/// Base URL with a trailing `/`, so `https://host/base` prefixes paths as
/// `https://host/base/api/v1/...`.
pub(crate) fn directory(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

/// Classify a failed send.
pub(crate) fn send_error(endpoint: &str, timeout_ms: u64, source: reqwest::Error) -> ClientError {
    if source.is_timeout() {
        ClientError::Timeout {
            endpoint: endpoint.to_string(),
            after_ms: timeout_ms,
        }
    } else {
        ClientError::Http {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

/// Turn a non-2xx response into `ClientError::ApiError`.
pub(crate) async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::ApiError {
        endpoint: endpoint.to_string(),
        status,
        body,
    })
}

/// Decode a JSON body.
pub(crate) async fn json<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    resp.json().await.map_err(|e| ClientError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e,
    })
}
