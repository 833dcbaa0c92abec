//! Error types for DocVault core.

use crate::writer::WriteOutcome;
use docvault_store::{Namespace, StoreError};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DocVault core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credentials are missing or malformed, or the config file is unusable.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cluster, database or collection could not be verified.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
        /// Store error behind the failure, if any.
        #[source]
        source: Option<StoreError>,
    },

    /// Snapshot failed. The write was never attempted.
    #[error("backup of {namespace} failed, write not attempted: {source}")]
    Backup {
        /// Collection that was being backed up.
        namespace: Namespace,
        /// Store error from the snapshot.
        source: StoreError,
    },

    /// The write failed and the collection was restored from its backup.
    #[error("write to {namespace} failed and was rolled back: {source}")]
    Write {
        /// Collection that was written.
        namespace: Namespace,
        /// Store error from the write.
        source: StoreError,
        /// Backup collection, if it was kept.
        backup: Option<Namespace>,
    },

    /// The write failed and so did the restore.
    ///
    /// The collection may hold partial data. The backup is always kept.
    #[error(
        "write to {namespace} failed ({write}) and restore failed; original data preserved in {backup}: {restore}"
    )]
    Restore {
        /// Collection that was written.
        namespace: Namespace,
        /// Backup collection holding the pre-write contents.
        backup: Namespace,
        /// Store error from the write.
        write: StoreError,
        /// Store error from the restore.
        #[source]
        restore: StoreError,
    },

    /// A batch could not be turned into documents.
    #[error("invalid batch: {message}")]
    InvalidBatch {
        /// Description of the problem.
        message: String,
    },

    /// Store error outside the write protocol.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error with no underlying store error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection error caused by a store error.
    pub fn connection_failed(message: impl Into<String>, source: StoreError) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates an invalid batch error.
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::InvalidBatch {
            message: message.into(),
        }
    }

    /// The write outcome this error represents, for errors raised after a
    /// write was attempted.
    #[must_use]
    pub fn outcome(&self) -> Option<WriteOutcome> {
        match self {
            Self::Write { .. } => Some(WriteOutcome::Restored),
            Self::Restore { .. } => Some(WriteOutcome::RestoreFailed),
            _ => None,
        }
    }

    /// The backup collection left in place by a failed write, if any.
    #[must_use]
    pub fn preserved_backup(&self) -> Option<&Namespace> {
        match self {
            Self::Write { backup, .. } => backup.as_ref(),
            Self::Restore { backup, .. } => Some(backup),
            _ => None,
        }
    }

    /// Whether the underlying failure was an authentication rejection.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::Connection {
                source: Some(StoreError::Authentication { .. }),
                ..
            }
        )
    }
}
