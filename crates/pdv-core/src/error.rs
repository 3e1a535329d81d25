//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with `thiserror`.
//!
//! Subsystem crates define their own operation-level errors (governance,
//! fiscal, store). This module holds the errors raised while constructing
//! core values from untrusted input: stored strings, JSON rows, user edits.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum PdvError {
    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for domain primitives.
///
/// Each variant carries the rejected input so that a misconfigured tenant
/// row can be diagnosed from the log line alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Monetary amount is not a decimal with at most 2 fractional digits.
    #[error("invalid amount: \"{0}\" (expected decimal with up to 2 fractional digits)")]
    InvalidAmount(String),

    /// Percentage is not a decimal with at most 2 fractional digits.
    #[error("invalid rate: \"{0}\" (expected percentage with up to 2 fractional digits)")]
    InvalidRate(String),

    /// Weight is not a decimal with at most 3 fractional digits.
    #[error("invalid weight: \"{0}\" (expected kilograms with up to 3 fractional digits)")]
    InvalidWeight(String),

    /// Stored tax situation name is not one of the four known situations.
    #[error("unknown tax situation: \"{0}\"")]
    UnknownTaxSituation(String),

    /// Stored toggle column does not map to a known toggle key.
    #[error("unknown toggle key: \"{0}\"")]
    UnknownToggleKey(String),

    /// Tenant identifier is not a UUID.
    #[error("invalid tenant ID: \"{0}\" (expected UUID)")]
    InvalidTenantId(String),
}
