//! Ordered bulk writes.

use docvault_store::{Document, DocumentStore, Filter, Namespace, StoreResult, WriteOp};
use std::fmt;
use tracing::debug;

/// How a batch is applied to its target collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Insert the batch next to the existing documents.
    Append,
    /// Delete every existing document, then insert the batch.
    ReplaceAll,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => write!(f, "append"),
            Self::ReplaceAll => write!(f, "replace-all"),
        }
    }
}

/// Turns batches into a single ordered bulk request.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkWriter;

impl BulkWriter {
    /// Creates a bulk writer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The operations a batch becomes under `mode`.
    #[must_use]
    pub fn operations(documents: Vec<Document>, mode: WriteMode) -> Vec<WriteOp> {
        let mut ops = Vec::with_capacity(documents.len() + 1);
        if mode == WriteMode::ReplaceAll {
            ops.push(WriteOp::DeleteMany(Filter::all()));
        }
        ops.extend(documents.into_iter().map(WriteOp::InsertOne));
        ops
    }

    /// Writes a batch and returns the number of documents inserted.
    ///
    /// An empty append sends nothing.
    ///
    /// # Errors
    ///
    /// Returns the store error, with partial counts, if any operation fails.
    /// Operations before the failing one stay applied.
    pub fn write<S>(
        &self,
        store: &S,
        target: &Namespace,
        documents: Vec<Document>,
        mode: WriteMode,
    ) -> StoreResult<u64>
    where
        S: DocumentStore + ?Sized,
    {
        let ops = Self::operations(documents, mode);
        if ops.is_empty() {
            debug!("Empty {mode} batch for {target}; nothing to send");
            return Ok(0);
        }
        debug!("Sending {} operations to {target} ({mode})", ops.len());
        let result = store.bulk_write(target, ops)?;
        Ok(result.inserted)
    }
}
