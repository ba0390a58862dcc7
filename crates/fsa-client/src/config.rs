//! Client configuration.
//!
//! The backing API and the AI service may be deployed apart, so each has its
//! own base URL. Override via environment variables or explicit construction
//! for staging and tests.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for the backing API and the AI service.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct FsaApiConfig {
    /// Base URL of the backing API (audits, responses, photos).
    pub api_url: Url,
    /// Base URL of the AI service.
    pub ai_url: Url,
    /// Bearer token, wiped from memory on drop.
    pub api_token: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for FsaApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsaApiConfig")
            .field("api_url", &self.api_url)
            .field("ai_url", &self.ai_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FsaApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FSA_API_URL` (default: `http://127.0.0.1:8080`)
    /// - `FSA_AI_URL` (default: the value of `FSA_API_URL`)
    /// - `FSA_API_TOKEN` (required)
    /// - `FSA_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("FSA_API_TOKEN").map_err(|_| ConfigError::MissingToken)?;
        let api_url = env_url("FSA_API_URL", DEFAULT_API_URL)?;
        let ai_url = match std::env::var("FSA_AI_URL") {
            Ok(raw) => parse_url("FSA_AI_URL", &raw)?,
            Err(_) => api_url.clone(),
        };
        Ok(Self {
            api_url,
            ai_url,
            api_token: Zeroizing::new(api_token),
            timeout_secs: std::env::var("FSA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Both services on one local port (for testing).
    pub fn local_mock(port: u16, token: &str) -> Result<Self, ConfigError> {
        let url = parse_url("localhost", &format!("http://127.0.0.1:{port}"))?;
        Ok(Self {
            api_url: url.clone(),
            ai_url: url,
            api_token: Zeroizing::new(token.to_string()),
            timeout_secs: 5,
        })
    }
}

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FSA_API_TOKEN environment variable is required")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("API token contains characters not allowed in a header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_points_both_services_at_one_port() {
        let cfg = FsaApiConfig::local_mock(9100, "tok").unwrap();
        assert_eq!(cfg.api_url.as_str(), "http://127.0.0.1:9100/");
        assert_eq!(cfg.ai_url, cfg.api_url);
        assert_eq!(cfg.api_token.as_str(), "tok");
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = FsaApiConfig::local_mock(9100, "segredo-123").unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("segredo-123"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("FSA_NONEXISTENT_VAR_4821", "https://api.example.com").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/");
    }

    #[test]
    fn parse_url_names_the_variable() {
        let err = parse_url("FSA_AI_URL", "not a url").unwrap_err();
        assert!(err.to_string().contains("FSA_AI_URL"));
    }
}
