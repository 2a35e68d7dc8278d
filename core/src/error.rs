//! Error types for configuration lookup and data-table loading.
//!
//! # Design
//! Resolution failures are configuration errors, not transport errors: the
//! request never leaves the process. `RequestResolver::resolve` collapses them
//! to `None`; `try_resolve` keeps the variant so callers can log which row is
//! missing.

use thiserror::Error;

use crate::config::RowKey;

/// Errors raised while resolving or loading configuration tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No request row exists under the given key.
    #[error("request row '{0}' not found")]
    RequestNotFound(RowKey),

    /// The request row references a service row that does not exist.
    #[error("service row '{service}' referenced by request '{request}' not found")]
    ServiceNotFound { request: RowKey, service: RowKey },

    /// A data table contained the same row name twice.
    #[error("duplicate row '{0}' in data table")]
    DuplicateRow(RowKey),

    /// A data table export could not be parsed.
    #[error("invalid data table: {0}")]
    InvalidTable(#[from] serde_json::Error),
}
