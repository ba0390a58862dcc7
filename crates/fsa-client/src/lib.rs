//! # fsa-client: HTTP adapters for the audit collaborators
//!
//! Typed access to the two remote services an audit session talks to:
//! - **Backing API**: audits, item responses, finalize/reopen, and photo
//!   storage under each item.
//! - **AI service**: checklist image analysis and finding drafts.
//!
//! [`FsaClient::collaborators`] packages both as the trait objects the
//! session controller in `fsa-audit` expects.
//!
//! ## Path Convention
//!
//! Every call goes to `{base_url}/api/v1/{resource}`. Identifiers travel as
//! bare UUIDs; photo ids are opaque strings chosen by the server.

pub mod ai;
pub mod audits;
pub mod config;
pub mod error;
pub(crate) mod retry;
mod transport;
pub mod types;

pub use config::FsaApiConfig;
pub use error::ClientError;

use std::sync::Arc;
use std::time::Duration;

use fsa_audit::Collaborators;

/// Top-level client. Holds one sub-client per service.
#[derive(Debug, Clone)]
pub struct FsaClient {
    audits: audits::AuditApiClient,
    ai: ai::AiClient,
}

impl FsaClient {
    /// Create a client from configuration.
    pub fn new(config: FsaApiConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut value = reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    config.api_token.as_str()
                ))
                .map_err(|_| ClientError::Config(config::ConfigError::InvalidToken))?;
                value.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, value);
                headers
            })
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        let timeout_ms = config.timeout_secs.saturating_mul(1000);

        Ok(Self {
            audits: audits::AuditApiClient::new(http.clone(), config.api_url.clone(), timeout_ms),
            ai: ai::AiClient::new(http, config.ai_url.clone(), timeout_ms),
        })
    }

    /// Access the backing API client.
    pub fn audits(&self) -> &audits::AuditApiClient {
        &self.audits
    }

    /// Access the AI service client.
    pub fn ai(&self) -> &ai::AiClient {
        &self.ai
    }

    /// The collaborator set for an `AuditSessionController`.
    pub fn collaborators(&self) -> Collaborators {
        let audits = Arc::new(self.audits.clone());
        Collaborators {
            backend: audits.clone(),
            store: audits,
            annotator: Arc::new(self.ai.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_token_with_newline() {
        let mut config = FsaApiConfig::local_mock(9, "ok").unwrap();
        config.api_token = zeroize::Zeroizing::new("bad\ntoken".into());
        assert!(matches!(
            FsaClient::new(config),
            Err(ClientError::Config(config::ConfigError::InvalidToken))
        ));
    }

    #[test]
    fn builds_from_local_config() {
        let client = FsaClient::new(FsaApiConfig::local_mock(9, "token").unwrap()).unwrap();
        let _ = client.collaborators();
    }
}
