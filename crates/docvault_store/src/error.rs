//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cluster could not be reached.
    #[error("cluster unreachable: {message}")]
    Unreachable {
        /// Description of the failure.
        message: String,
    },

    /// The cluster rejected the credentials.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Description of the failure.
        message: String,
    },

    /// A document with the same identity already exists.
    #[error("duplicate key in {namespace}: _id {key}")]
    DuplicateKey {
        /// Namespace the insert targeted.
        namespace: String,
        /// Rendered identity value.
        key: String,
    },

    /// An ordered bulk write stopped at a failing operation.
    ///
    /// Operations before `index` were applied and are not rolled back.
    #[error("bulk write failed at operation {index} ({inserted} inserted, {deleted} deleted): {cause}")]
    BulkWrite {
        /// Documents inserted before the failure.
        inserted: u64,
        /// Documents deleted before the failure.
        deleted: u64,
        /// Position of the failing operation.
        index: usize,
        /// The failure itself.
        #[source]
        cause: Box<StoreError>,
    },

    /// A write failed and its partial progress could not be saved either.
    #[error("{write}; saving partial progress also failed: {save}")]
    Unsaved {
        /// The failed write.
        write: Box<StoreError>,
        /// Why saving failed.
        #[source]
        save: Box<StoreError>,
    },

    /// A filter used an operator this store does not interpret.
    #[error("unsupported query operator: {operator}")]
    UnsupportedQuery {
        /// The operator key.
        operator: String,
    },

    /// A database or collection name cannot be used by this store.
    #[error("invalid name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Stored or supplied data is not a valid document.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// The session has been closed.
    #[error("session is closed")]
    Closed,

    /// Error reported by an underlying driver.
    #[error("backend error: {message}")]
    Backend {
        /// Driver message.
        message: String,
    },
}

impl StoreError {
    /// Creates an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns true if this error, or the cause of a failed bulk write, is a
    /// duplicate key violation.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            StoreError::DuplicateKey { .. } => true,
            StoreError::BulkWrite { cause, .. } => cause.is_duplicate_key(),
            StoreError::Unsaved { write, .. } => write.is_duplicate_key(),
            _ => false,
        }
    }

    /// Number of documents a failed write left behind, if known.
    pub fn partially_inserted(&self) -> Option<u64> {
        match self {
            StoreError::BulkWrite { inserted, .. } => Some(*inserted),
            _ => None,
        }
    }
}
