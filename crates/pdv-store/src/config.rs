//! Store client configuration.
//!
//! Configures the PostgREST endpoint, credentials and the bounds that keep a
//! store call from blocking indefinitely. Override via environment variables
//! or explicit construction for testing.

use url::Url;

/// Default request timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default number of retries on transport errors.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration for connecting to the record store.
///
/// Custom `Debug` implementation redacts the `api_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the PostgREST service (the `/rest/v1` prefix is appended).
    pub base_url: Url,
    /// API key sent both as `apikey` and as the bearer token.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first attempt on transport errors.
    pub max_retries: u32,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PDV_STORE_URL` (required)
    /// - `PDV_STORE_API_KEY` (required)
    /// - `PDV_STORE_TIMEOUT_SECS` (default: 5)
    /// - `PDV_STORE_MAX_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = std::env::var("PDV_STORE_URL").map_err(|_| ConfigError::MissingUrl)?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("PDV_STORE_URL".to_string(), e.to_string()))?;
        let api_key = std::env::var("PDV_STORE_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        Ok(Self {
            base_url,
            api_key,
            timeout_secs: env_parse("PDV_STORE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            max_retries: env_parse("PDV_STORE_MAX_RETRIES", DEFAULT_MAX_RETRIES),
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    ///
    /// Retries are disabled so error-path tests fail fast.
    pub fn local_mock(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            timeout_secs: 2,
            max_retries: 0,
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PDV_STORE_URL environment variable is required")]
    MissingUrl,
    #[error("PDV_STORE_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = StoreConfig::local_mock("http://127.0.0.1:9000", "test-key").unwrap();
        assert_eq!(cfg.api_key, "test-key");
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = StoreConfig::local_mock("http://127.0.0.1:9000", "secret-key").unwrap();
        let dbg = format!("{cfg:?}");
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("secret-key"));
    }

    #[test]
    fn env_parse_uses_default_when_var_absent() {
        assert_eq!(env_parse("NONEXISTENT_PDV_VAR_12345", 7u64), 7);
    }

    #[test]
    fn local_mock_rejects_invalid_url() {
        assert!(StoreConfig::local_mock("not a url", "k").is_err());
    }
}
