//! Store error types.

use pdv_core::TenantId;

/// Errors from config store and ledger calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Backend returned a non-2xx status.
    #[error("store {endpoint} returned {status}: {body}")]
    Api {
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
    /// A stored row could not be mapped onto the domain model.
    #[error("malformed row from {endpoint}: {reason}")]
    MalformedRow { endpoint: String, reason: String },
    /// No configuration exists for the tenant.
    #[error("no configuration found for tenant {0}")]
    NotFound(TenantId),
    /// The backend refused or could not perform the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_tenant() {
        let tenant = TenantId::new();
        let msg = StoreError::NotFound(tenant).to_string();
        assert!(msg.contains(&tenant.to_string()));
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = StoreError::Api {
            endpoint: "PATCH /pdv_config".into(),
            status: 409,
            body: "conflict".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("409"));
        assert!(msg.contains("conflict"));
    }
}
