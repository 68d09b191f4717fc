//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier validation and malformed server payloads.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Tracking identifier is empty or otherwise unusable
    #[error("Invalid tracking ID: {0}")]
    InvalidTrackingId(String),

    /// Server timestamp is not a finite number
    #[error("Invalid update timestamp: {0}")]
    InvalidTimestamp(String),

    /// A payload is missing a field the engine cannot default
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
