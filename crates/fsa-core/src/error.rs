//! # Error Types
//!
//! Errors raised while constructing core values from untrusted input
//! (timestamps, coordinates, identifiers coming off the wire).

use thiserror::Error;

/// Top-level error type for core value construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsaError {
    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Latitude/longitude out of range.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// An identifier string was not a valid UUID or was empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}
