//! Query error types
//!
//! Two kinds escape the engine: a syntax error in a transformation call,
//! and a hub failure while rebuilding the catalog. Everything else is
//! absorbed locally (malformed search patterns become empty results,
//! per-metric fetch failures become empty series).

use thiserror::Error;

use crate::hub::HubError;

/// Errors that can escape query evaluation
#[derive(Debug, Error)]
pub enum QueryError {
    /// A transformation call matched by name but its argument list does not
    /// conform to the call's signature
    #[error("{0}")]
    Syntax(String),

    /// The hub failed while listing metrics; without a catalog no leaf
    /// expression can resolve, so the whole request fails
    #[error("hub error: {0}")]
    Hub(#[from] HubError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
