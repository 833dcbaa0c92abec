//! Backup-protected writes.
//!
//! [`Writer`] runs every write as one protocol:
//!
//! ```text
//! START -> SNAPSHOTTING -> WRITING -> COMMITTED
//!                       |          -> RESTORING -> RESTORED
//!                       |                       -> RESTORE_FAILED
//!                       -> ABORTED
//! ```
//!
//! The collection is snapshotted into its backup, the batch is written, and
//! the backup is then discarded on success or copied back over the
//! collection on failure. A failed restore leaves the backup in place.

use crate::backup::{BackupHandle, BackupManager};
use crate::bulk::{BulkWriter, WriteMode};
use crate::connection::ConnectionHandle;
use crate::error::{CoreError, CoreResult};
use crate::table::Batch;
use docvault_store::{Connector, Document, DocumentStore, Namespace};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Final state of a write that got past its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOutcome {
    /// The batch was written.
    Committed,
    /// The write failed and the collection was restored.
    Restored,
    /// The write failed and the restore failed too.
    RestoreFailed,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => write!(f, "committed"),
            Self::Restored => write!(f, "restored"),
            Self::RestoreFailed => write!(f, "restore failed"),
        }
    }
}

/// Protocol states, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// Nothing done yet.
    Start,
    /// Copying the collection into its backup.
    Snapshotting,
    /// Sending the batch.
    Writing,
    /// Batch written.
    Committed,
    /// Copying the backup over the collection.
    Restoring,
    /// Collection restored.
    Restored,
    /// Restore failed.
    RestoreFailed,
    /// Snapshot failed; nothing was written.
    Aborted,
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Snapshotting => "SNAPSHOTTING",
            Self::Writing => "WRITING",
            Self::Committed => "COMMITTED",
            Self::Restoring => "RESTORING",
            Self::Restored => "RESTORED",
            Self::RestoreFailed => "RESTORE_FAILED",
            Self::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// Options for a single write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Keep the backup collection after the write finishes.
    pub preserve_backup: bool,
}

impl WriteOptions {
    /// Default options: the backup is discarded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the backup is kept.
    #[must_use]
    pub fn preserve_backup(mut self, preserve: bool) -> Self {
        self.preserve_backup = preserve;
        self
    }
}

/// Result of a committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// Always [`WriteOutcome::Committed`]; failed writes return errors.
    pub outcome: WriteOutcome,
    /// How the batch was applied.
    pub mode: WriteMode,
    /// The collection written.
    pub namespace: Namespace,
    /// Documents inserted.
    pub inserted: u64,
    /// Documents in the collection before the write.
    pub previous: u64,
    /// The backup collection, if it was kept.
    pub backup: Option<Namespace>,
}

/// Writes batches to the collection selected on a [`ConnectionHandle`].
pub struct Writer<'a, C: Connector> {
    handle: &'a ConnectionHandle<C>,
    backups: BackupManager,
    bulk: BulkWriter,
}

impl<'a, C: Connector> Writer<'a, C> {
    /// Creates a writer over a handle with a collection selected.
    pub fn new(handle: &'a ConnectionHandle<C>) -> Self {
        Self {
            handle,
            backups: BackupManager::new(),
            bulk: BulkWriter::new(),
        }
    }

    /// Appends a batch to the collection.
    ///
    /// # Errors
    ///
    /// See [`Writer::write`].
    pub fn insert(&self, batch: impl Into<Batch>, options: WriteOptions) -> CoreResult<WriteReport> {
        self.write(batch, WriteMode::Append, options)
    }

    /// Replaces the collection's contents with a batch.
    ///
    /// # Errors
    ///
    /// See [`Writer::write`].
    pub fn replace_all(
        &self,
        batch: impl Into<Batch>,
        options: WriteOptions,
    ) -> CoreResult<WriteReport> {
        self.write(batch, WriteMode::ReplaceAll, options)
    }

    /// Writes a batch under backup protection.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Connection`] if no collection is selected or no
    ///   session can be opened
    /// - [`CoreError::Backup`] if the snapshot failed; nothing was written
    /// - [`CoreError::Write`] if the write failed and the collection was
    ///   restored
    /// - [`CoreError::Restore`] if the write and the restore both failed
    pub fn write(
        &self,
        batch: impl Into<Batch>,
        mode: WriteMode,
        options: WriteOptions,
    ) -> CoreResult<WriteReport> {
        let namespace = self.handle.require_namespace()?;
        let documents = batch.into().into_documents();
        let session = self.handle.session()?;
        self.run(&*session, namespace, documents, mode, options)
    }

    fn run<S>(
        &self,
        store: &S,
        namespace: &Namespace,
        documents: Vec<Document>,
        mode: WriteMode,
        options: WriteOptions,
    ) -> CoreResult<WriteReport>
    where
        S: DocumentStore + ?Sized,
    {
        let batch_size = documents.len();
        debug!("{}: {mode} of {batch_size} documents into {namespace}", WritePhase::Start);

        debug!("{}: {namespace}", WritePhase::Snapshotting);
        let backup = match self.backups.snapshot(store, namespace) {
            Ok(backup) => backup,
            Err(e) => {
                debug!("{}: {namespace}", WritePhase::Aborted);
                error!("Backup failed, write to {namespace} not attempted: {e}");
                return Err(e);
            }
        };

        debug!("{}: {namespace}", WritePhase::Writing);
        match self.bulk.write(store, namespace, documents, mode) {
            Ok(inserted) => {
                debug!("{}: {namespace}", WritePhase::Committed);
                info!("Inserted {inserted} documents into {namespace} ({mode})");
                let kept = self.finish(store, &backup, options);
                Ok(WriteReport {
                    outcome: WriteOutcome::Committed,
                    mode,
                    namespace: namespace.clone(),
                    inserted,
                    previous: backup.documents(),
                    backup: kept,
                })
            }
            Err(write) => {
                error!("Write to {namespace} failed: {write}");
                debug!("{}: {namespace}", WritePhase::Restoring);
                match self.backups.restore(store, &backup) {
                    Ok(_) => {
                        debug!("{}: {namespace}", WritePhase::Restored);
                        info!("Rolled back {namespace} from {}", backup.backup());
                        let kept = self.finish(store, &backup, options);
                        Err(CoreError::Write {
                            namespace: namespace.clone(),
                            source: write,
                            backup: kept,
                        })
                    }
                    Err(restore) => {
                        debug!("{}: {namespace}", WritePhase::RestoreFailed);
                        error!("Restore of {namespace} failed: {restore}");
                        warn!(
                            "Backup preserved at {}; {namespace} may hold partial data",
                            backup.backup()
                        );
                        Err(CoreError::Restore {
                            namespace: namespace.clone(),
                            backup: backup.backup().clone(),
                            write,
                            restore,
                        })
                    }
                }
            }
        }
    }

    /// Discards the backup unless asked to keep it. Returns the backup if it
    /// is still there.
    fn finish<S>(&self, store: &S, backup: &BackupHandle, options: WriteOptions) -> Option<Namespace>
    where
        S: DocumentStore + ?Sized,
    {
        if options.preserve_backup {
            info!("Backup preserved at {}", backup.backup());
            return Some(backup.backup().clone());
        }
        match self.backups.discard(store, backup) {
            Ok(()) => None,
            Err(e) => {
                warn!("Could not discard backup {}, leaving it in place: {e}", backup.backup());
                Some(backup.backup().clone())
            }
        }
    }
}
