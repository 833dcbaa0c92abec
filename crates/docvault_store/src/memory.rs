//! In-memory store for testing.

use crate::backend::{BulkWriteResult, Connector, Credentials, DocumentStore, WriteOp};
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, Projection};
use crate::namespace::Namespace;
use crate::ops;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Debug, Default)]
struct ClusterState {
    databases: BTreeMap<String, Collections>,
    open_sessions: usize,
    sessions_opened: usize,
}

/// An in-memory cluster.
///
/// This store keeps every database in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral use where nothing needs to persist
///
/// Clones share the same cluster, so a test can hand one clone to the code
/// under test and inspect the data through another.
///
/// # Example
///
/// ```rust
/// use docvault_store::{doc, Connector, Credentials, DocumentStore, InMemoryStore, Namespace};
///
/// let store = InMemoryStore::new();
/// let ns = Namespace::new("db", "items");
/// store.seed(&ns, vec![doc! { "_id" => 1 }]).unwrap();
///
/// let session = store.connect(&Credentials::new("local")).unwrap();
/// assert_eq!(session.count(&ns).unwrap(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<ClusterState>>,
    login: Option<(String, String)>,
}

impl InMemoryStore {
    /// Creates an empty cluster that accepts any credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires this username and password on connect.
    #[must_use]
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some((username.into(), password.into()));
        self
    }

    /// Creates a collection and inserts documents into it directly.
    ///
    /// Useful for setting up test state.
    pub fn seed(&self, namespace: &Namespace, documents: Vec<Document>) -> StoreResult<()> {
        let mut state = self.state.write();
        let collection = collection_mut(&mut state, namespace);
        let ops = documents.into_iter().map(WriteOp::InsertOne).collect();
        ops::apply_bulk(collection, namespace, ops)?;
        Ok(())
    }

    /// Creates an empty database entry.
    pub fn create_database(&self, name: &str) {
        self.state
            .write()
            .databases
            .entry(name.to_string())
            .or_default();
    }

    /// Returns a copy of a collection's documents, or `None` if it does not exist.
    #[must_use]
    pub fn documents(&self, namespace: &Namespace) -> Option<Vec<Document>> {
        self.state
            .read()
            .databases
            .get(namespace.database())
            .and_then(|db| db.get(namespace.collection()))
            .cloned()
    }

    /// Whether a collection exists.
    #[must_use]
    pub fn has_collection(&self, namespace: &Namespace) -> bool {
        self.documents(namespace).is_some()
    }

    /// Sessions connected and not yet closed.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.state.read().open_sessions
    }

    /// Sessions ever connected.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.state.read().sessions_opened
    }
}

fn collection_mut<'a>(state: &'a mut ClusterState, namespace: &Namespace) -> &'a mut Vec<Document> {
    state
        .databases
        .entry(namespace.database().to_string())
        .or_default()
        .entry(namespace.collection().to_string())
        .or_default()
}

impl Connector for InMemoryStore {
    type Session = MemorySession;

    fn connect(&self, credentials: &Credentials) -> StoreResult<MemorySession> {
        if let Some((username, password)) = &self.login {
            let accepted = credentials.username.as_deref() == Some(username.as_str())
                && credentials.password.as_deref() == Some(password.as_str());
            if !accepted {
                return Err(StoreError::authentication(format!(
                    "bad credentials for cluster {}",
                    credentials.cluster
                )));
            }
        }

        let mut state = self.state.write();
        state.open_sessions += 1;
        state.sessions_opened += 1;
        drop(state);

        Ok(MemorySession {
            state: Arc::clone(&self.state),
            open: true,
        })
    }
}

/// A session against an [`InMemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<RwLock<ClusterState>>,
    open: bool,
}

impl MemorySession {
    fn check_open(&self) -> StoreResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }
}

impl DocumentStore for MemorySession {
    fn ping(&self) -> StoreResult<()> {
        self.check_open()
    }

    fn database_names(&self) -> StoreResult<Vec<String>> {
        self.check_open()?;
        Ok(self.state.read().databases.keys().cloned().collect())
    }

    fn collection_names(&self, database: &str) -> StoreResult<Vec<String>> {
        self.check_open()?;
        Ok(self
            .state
            .read()
            .databases
            .get(database)
            .map(|db| db.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn create_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.check_open()?;
        collection_mut(&mut self.state.write(), namespace);
        Ok(())
    }

    fn find(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        self.check_open()?;
        let state = self.state.read();
        let documents = state
            .databases
            .get(namespace.database())
            .and_then(|db| db.get(namespace.collection()))
            .map(Vec::as_slice)
            .unwrap_or_default();
        ops::find(documents, filter, projection)
    }

    fn count(&self, namespace: &Namespace) -> StoreResult<u64> {
        self.check_open()?;
        Ok(self
            .state
            .read()
            .databases
            .get(namespace.database())
            .and_then(|db| db.get(namespace.collection()))
            .map_or(0, |docs| docs.len() as u64))
    }

    fn bulk_write(&self, namespace: &Namespace, ops: Vec<WriteOp>) -> StoreResult<BulkWriteResult> {
        self.check_open()?;
        let mut state = self.state.write();
        ops::apply_bulk(collection_mut(&mut state, namespace), namespace, ops)
    }

    fn copy_collection(&self, from: &Namespace, to: &Namespace) -> StoreResult<u64> {
        self.check_open()?;
        let mut state = self.state.write();
        let copied = state
            .databases
            .get(from.database())
            .and_then(|db| db.get(from.collection()))
            .cloned()
            .unwrap_or_default();
        let count = copied.len() as u64;
        *collection_mut(&mut state, to) = copied;
        Ok(count)
    }

    fn drop_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.check_open()?;
        if let Some(db) = self.state.write().databases.get_mut(namespace.database()) {
            db.remove(namespace.collection());
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        if self.open {
            self.open = false;
            let mut state = self.state.write();
            state.open_sessions = state.open_sessions.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn ns(collection: &str) -> Namespace {
        Namespace::new("db", collection)
    }

    fn connect(store: &InMemoryStore) -> MemorySession {
        store.connect(&Credentials::new("local")).unwrap()
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        let session = connect(&store);
        assert!(session.database_names().unwrap().is_empty());
        assert_eq!(session.count(&ns("c")).unwrap(), 0);
    }

    #[test]
    fn memory_login_is_enforced() {
        let store = InMemoryStore::new().with_login("ada", "pw");
        let err = store.connect(&Credentials::new("c0")).unwrap_err();
        assert!(matches!(err, StoreError::Authentication { .. }));

        let wrong = Credentials::new("c0").with_login("ada", "nope");
        assert!(store.connect(&wrong).is_err());

        let right = Credentials::new("c0").with_login("ada", "pw");
        assert!(store.connect(&right).is_ok());
    }

    #[test]
    fn memory_session_counts() {
        let store = InMemoryStore::new();
        let mut session = connect(&store);
        assert_eq!(store.open_sessions(), 1);

        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(store.open_sessions(), 0);
        assert_eq!(store.sessions_opened(), 1);
    }

    #[test]
    fn memory_closed_session_rejects_operations() {
        let store = InMemoryStore::new();
        let mut session = connect(&store);
        session.close().unwrap();

        assert!(matches!(session.ping(), Err(StoreError::Closed)));
        assert!(matches!(session.count(&ns("c")), Err(StoreError::Closed)));
    }

    #[test]
    fn memory_copy_replaces_target() {
        let store = InMemoryStore::new();
        store.seed(&ns("src"), vec![doc! { "_id" => 1 }]).unwrap();
        store
            .seed(&ns("dst"), vec![doc! { "_id" => 9 }, doc! { "_id" => 8 }])
            .unwrap();

        let session = connect(&store);
        assert_eq!(session.copy_collection(&ns("src"), &ns("dst")).unwrap(), 1);
        assert_eq!(store.documents(&ns("dst")).unwrap(), vec![doc! { "_id" => 1 }]);
    }

    #[test]
    fn memory_copy_of_missing_source_is_empty() {
        let store = InMemoryStore::new();
        let session = connect(&store);
        assert_eq!(session.copy_collection(&ns("nope"), &ns("dst")).unwrap(), 0);
        assert_eq!(store.documents(&ns("dst")), Some(vec![]));
    }

    #[test]
    fn memory_drop_is_idempotent() {
        let store = InMemoryStore::new();
        store.seed(&ns("c"), vec![doc! { "_id" => 1 }]).unwrap();

        let session = connect(&store);
        session.drop_collection(&ns("c")).unwrap();
        session.drop_collection(&ns("c")).unwrap();
        assert!(!store.has_collection(&ns("c")));
    }

    #[test]
    fn memory_names() {
        let store = InMemoryStore::new();
        store.create_database("empty");
        store.seed(&Namespace::new("shop", "b"), vec![]).unwrap();
        store.seed(&Namespace::new("shop", "a"), vec![]).unwrap();

        let session = connect(&store);
        assert_eq!(session.database_names().unwrap(), vec!["empty", "shop"]);
        assert_eq!(session.collection_names("shop").unwrap(), vec!["a", "b"]);
        assert!(session.collection_names("missing").unwrap().is_empty());
    }
}
