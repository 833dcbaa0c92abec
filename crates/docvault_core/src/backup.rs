//! Collection snapshots for rollback.
//!
//! A backup is a sibling collection named `<collection>_backup` in the same
//! database. There is at most one per source collection; taking a new
//! snapshot overwrites whatever an earlier run left behind.

use crate::error::{CoreError, CoreResult};
use docvault_store::{DocumentStore, Filter, Namespace, StoreResult, WriteOp};
use tracing::{debug, info};

/// Suffix appended to a collection name to form its backup name.
pub const BACKUP_SUFFIX: &str = "_backup";

/// The backup namespace for a source collection.
#[must_use]
pub fn backup_namespace(source: &Namespace) -> Namespace {
    source.sibling(format!("{}{BACKUP_SUFFIX}", source.collection()))
}

/// A snapshot taken by [`BackupManager::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    source: Namespace,
    backup: Namespace,
    documents: u64,
}

impl BackupHandle {
    /// The collection that was backed up.
    pub fn source(&self) -> &Namespace {
        &self.source
    }

    /// The backup collection.
    pub fn backup(&self) -> &Namespace {
        &self.backup
    }

    /// Documents copied into the backup.
    pub fn documents(&self) -> u64 {
        self.documents
    }
}

/// Creates, discards and restores backups.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupManager;

impl BackupManager {
    /// Creates a backup manager.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Copies the current contents of `source` into its backup collection,
    /// dropping any earlier backup first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backup`] if either step fails. The source is not
    /// modified.
    pub fn snapshot<S>(&self, store: &S, source: &Namespace) -> CoreResult<BackupHandle>
    where
        S: DocumentStore + ?Sized,
    {
        let backup = backup_namespace(source);
        let copy = || -> StoreResult<u64> {
            store.drop_collection(&backup)?;
            store.copy_collection(source, &backup)
        };
        let documents = copy().map_err(|e| CoreError::Backup {
            namespace: source.clone(),
            source: e,
        })?;
        info!("Backed up {documents} documents from {source} to {backup}");
        Ok(BackupHandle {
            source: source.clone(),
            backup,
            documents,
        })
    }

    /// Drops the backup collection. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the store error if the drop fails.
    pub fn discard<S>(&self, store: &S, handle: &BackupHandle) -> CoreResult<()>
    where
        S: DocumentStore + ?Sized,
    {
        store.drop_collection(&handle.backup)?;
        debug!("Discarded backup {}", handle.backup);
        Ok(())
    }

    /// Replaces the contents of the source with the backup.
    ///
    /// Deletes every document in the source, then copies the backup back.
    /// Returns the number of documents restored.
    ///
    /// # Errors
    ///
    /// Returns the store error from whichever step failed. The backup is
    /// left in place.
    pub fn restore<S>(&self, store: &S, handle: &BackupHandle) -> StoreResult<u64>
    where
        S: DocumentStore + ?Sized,
    {
        store.bulk_write(&handle.source, vec![WriteOp::DeleteMany(Filter::all())])?;
        let restored = store.copy_collection(&handle.backup, &handle.source)?;
        info!("Restored {restored} documents into {} from {}", handle.source, handle.backup);
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_store::{doc, Connector, Credentials, InMemoryStore, MemorySession, Projection};

    fn setup() -> (InMemoryStore, MemorySession, Namespace) {
        let store = InMemoryStore::new();
        let ns = Namespace::new("db", "items");
        store
            .seed(&ns, vec![doc! { "_id" => 1, "v" => "a" }, doc! { "_id" => 2, "v" => "b" }])
            .unwrap();
        let session = store.connect(&Credentials::new("local")).unwrap();
        (store, session, ns)
    }

    #[test]
    fn backup_name_uses_suffix() {
        let ns = Namespace::new("db", "items");
        assert_eq!(backup_namespace(&ns), Namespace::new("db", "items_backup"));
    }

    #[test]
    fn snapshot_copies_source() {
        let (store, session, ns) = setup();
        let handle = BackupManager::new().snapshot(&session, &ns).unwrap();
        assert_eq!(handle.documents(), 2);
        assert_eq!(store.documents(handle.backup()), store.documents(&ns));
    }

    #[test]
    fn snapshot_overwrites_leftover_backup() {
        let (store, session, ns) = setup();
        store
            .seed(&backup_namespace(&ns), vec![doc! { "_id" => 99 }])
            .unwrap();

        let handle = BackupManager::new().snapshot(&session, &ns).unwrap();
        assert_eq!(store.documents(handle.backup()), store.documents(&ns));
    }

    #[test]
    fn restore_replaces_modified_source() {
        let (store, session, ns) = setup();
        let manager = BackupManager::new();
        let original = store.documents(&ns).unwrap();
        let handle = manager.snapshot(&session, &ns).unwrap();

        session
            .bulk_write(&ns, vec![WriteOp::InsertOne(doc! { "_id" => 3 })])
            .unwrap();
        assert_eq!(manager.restore(&session, &handle).unwrap(), 2);

        let restored = session.find(&ns, &Filter::all(), &Projection::all()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn discard_is_idempotent() {
        let (store, session, ns) = setup();
        let manager = BackupManager::new();
        let handle = manager.snapshot(&session, &ns).unwrap();

        manager.discard(&session, &handle).unwrap();
        manager.discard(&session, &handle).unwrap();
        assert!(!store.has_collection(handle.backup()));
    }

    #[test]
    fn snapshot_on_closed_session_is_backup_error() {
        let (_store, mut session, ns) = setup();
        session.close().unwrap();
        let err = BackupManager::new().snapshot(&session, &ns).unwrap_err();
        assert!(matches!(err, CoreError::Backup { .. }));
    }
}
