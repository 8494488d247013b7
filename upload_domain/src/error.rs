// /////////////////////////////////////////////////////////////////////////////
// Chunked Upload Platform
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single, hierarchical error type shared by the upload engine and the
//! upload server. Errors are categorized so that callers can decide
//! mechanically whether to retry, degrade, or surface a failure to a user,
//! without matching on every variant by hand.
//!
//! ## Error Categories
//!
//! - **Configuration** — `InvalidArgument`, `InvalidConfiguration`
//! - **Network / transport** — `NetworkError`, `TimeoutError` (retryable)
//! - **Integrity** — `IntegrityError` (chunk hash mismatch)
//! - **Storage** — `StorageUnavailable`, `QuotaExceeded`, `OperationFailed`
//! - **Protocol** — `TokenExpired`, `NotFound`, `FileMismatch`,
//!   `InvalidTransition`
//! - **System** — `InternalError`, `PluginError`, `Cancelled`

use thiserror::Error;

/// Domain-specific errors for the chunked upload platform.
///
/// Every variant carries a descriptive message. Helper constructors exist
/// for the variants that are built programmatically rather than from a
/// `From` conversion.
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Integrity check failed: {0}")]
    IntegrityError(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Storage operation failed: {0}")]
    OperationFailed(String),

    #[error("Upload token expired: {0}")]
    TokenExpired(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File mismatch: {0}")]
    FileMismatch(String),

    #[error("Plugin error: {0}")]
    PluginError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl UploadError {
    /// Creates a new invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a new network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates a new integrity error.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityError(msg.into())
    }

    /// Creates a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Whether retrying the operation that produced this error is
    /// reasonable. Used by `UploadTask`'s per-chunk retry loop and by the
    /// progress store's degrade-to-in-memory path.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UploadError::NetworkError(_) | UploadError::TimeoutError(_) | UploadError::IntegrityError(_)
        )
    }

    /// Coarse-grained category, used for logging and for HTTP status mapping
    /// in `upload-server`.
    pub fn category(&self) -> &'static str {
        match self {
            UploadError::InvalidArgument(_) => "argument",
            UploadError::InvalidConfiguration(_) => "configuration",
            UploadError::InvalidTransition(_) => "transition",
            UploadError::NetworkError(_) => "network",
            UploadError::TimeoutError(_) => "timeout",
            UploadError::IntegrityError(_) => "integrity",
            UploadError::StorageUnavailable(_) => "storage",
            UploadError::QuotaExceeded(_) => "storage",
            UploadError::OperationFailed(_) => "storage",
            UploadError::TokenExpired(_) => "token",
            UploadError::NotFound(_) => "not_found",
            UploadError::FileMismatch(_) => "mismatch",
            UploadError::PluginError(_) => "plugin",
            UploadError::Cancelled(_) => "cancelled",
            UploadError::InternalError(_) => "internal",
        }
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::OperationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::InternalError(format!("serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors_are_network_timeout_or_integrity() {
        assert!(UploadError::network("boom").is_recoverable());
        assert!(UploadError::TimeoutError("slow".into()).is_recoverable());
        assert!(UploadError::integrity("mismatch").is_recoverable());
        assert!(!UploadError::invalid_argument("bad").is_recoverable());
        assert!(!UploadError::InternalError("oops".into()).is_recoverable());
    }

    #[test]
    fn category_covers_every_variant() {
        assert_eq!(UploadError::invalid_argument("x").category(), "argument");
        assert_eq!(UploadError::TokenExpired("t".into()).category(), "token");
        assert_eq!(UploadError::NotFound("f".into()).category(), "not_found");
        assert_eq!(UploadError::FileMismatch("m".into()).category(), "mismatch");
    }

    #[test]
    fn io_error_converts_to_operation_failed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: UploadError = io_err.into();
        assert!(matches!(err, UploadError::OperationFailed(_)));
    }
}
