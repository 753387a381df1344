//! Error types for query construction, execution and iteration.
//!
//! Two layers are kept apart:
//! - [`TransportError`] is whatever the catalog service reports for a single request.
//! - [`QueryError`] is what callers of [`crate::Query`] and the iterators see. It wraps
//!   transport failures and adds the configuration errors raised at construction time.

use thiserror::Error;

use crate::transport::messages::END_OF_RESULTSET;

/// Errors raised by the catalog service boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The service rejected a request with a numeric status code.
    #[error("{message} [error_code:{code}]")]
    Service {
        /// Catalog status code (negative on failure)
        code: i32,
        /// Human readable message from the service
        message: String,
    },

    /// The service returned a response that violates the request/response contract.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The shared service handle was poisoned by a panicking holder.
    #[error("Service lock poisoned: {0}")]
    LockPoisoned(String),
}

impl TransportError {
    /// Create a service error from a status code and message.
    pub fn service(code: i32, message: impl Into<String>) -> Self {
        TransportError::Service {
            code,
            message: message.into(),
        }
    }

    /// Whether this error is the handle protocol's end-of-results signal.
    ///
    /// The signal arrives as a generic failure; only its rendered text carries
    /// the marker, so the check is made against the text and not the variant.
    pub fn is_end_of_resultset(&self) -> bool {
        self.to_string().contains(&end_of_resultset_marker())
    }
}

fn end_of_resultset_marker() -> String {
    format!(":{END_OF_RESULTSET}]")
}

/// Errors surfaced by queries and row/page iterators.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Column argument was neither a delimited string nor a sequence of names.
    #[error("Columns type error: {0}")]
    ColumnsType(String),

    /// Output shape marker not recognized.
    #[error("Row return type error: {0}")]
    RowReturnType(String),

    /// Protocol selector not recognized.
    #[error("Invalid parser: {0}")]
    InvalidParser(String),

    /// `copy` was given an override that is not a query parameter.
    #[error("Options spec error: {0}")]
    OptionsSpec(String),

    /// Failure reported by the catalog service.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Parameter (de)serialization failed while applying overrides.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
