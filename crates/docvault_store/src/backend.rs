//! Connector and session trait definitions.

use crate::document::Document;
use crate::error::StoreResult;
use crate::filter::{Filter, Projection};
use crate::namespace::Namespace;
use std::fmt;

/// Resolved credentials for one cluster.
///
/// Username and password may be absent; a store that requires them reports
/// an authentication failure at connect time.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Cluster endpoint or name.
    pub cluster: String,
    /// User to authenticate as.
    pub username: Option<String>,
    /// Password for `username`.
    pub password: Option<String>,
}

impl Credentials {
    /// Credentials for a cluster with no user set.
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            username: None,
            password: None,
        }
    }

    /// Sets the username and password.
    #[must_use]
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cluster", &self.cluster)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// One operation of an ordered bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a document, assigning an identity if it has none.
    InsertOne(Document),
    /// Delete every document matching the filter.
    DeleteMany(Filter),
}

/// Counts reported by a successful bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    /// Documents inserted.
    pub inserted: u64,
    /// Documents deleted.
    pub deleted: u64,
}

/// Opens sessions against a cluster.
///
/// # Implementors
///
/// - [`crate::InMemoryStore`] - For testing
/// - [`crate::FileConnector`] - JSON files on disk
pub trait Connector: Send + Sync {
    /// Session type produced by [`Connector::connect`].
    type Session: DocumentStore;

    /// Opens a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or rejects the
    /// credentials. Implementations may defer either check to the first
    /// operation on the session.
    fn connect(&self, credentials: &Credentials) -> StoreResult<Self::Session>;
}

/// An open session against one cluster.
///
/// # Invariants
///
/// - `bulk_write` applies operations in order and stops at the first
///   failure; earlier operations stay applied
/// - `copy_collection` replaces the target's contents, never merges
/// - `drop_collection` on a missing collection succeeds
/// - every operation after `close` fails with [`crate::StoreError::Closed`]
pub trait DocumentStore {
    /// Round-trips to the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the credentials are
    /// rejected.
    fn ping(&self) -> StoreResult<()>;

    /// Names of all databases in the cluster.
    fn database_names(&self) -> StoreResult<Vec<String>>;

    /// Names of all collections in a database. Unknown databases have none.
    fn collection_names(&self, database: &str) -> StoreResult<Vec<String>>;

    /// Creates an empty collection if it does not exist.
    fn create_collection(&self, namespace: &Namespace) -> StoreResult<()>;

    /// Returns matching documents, projected.
    ///
    /// A missing collection reads as empty.
    fn find(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>>;

    /// Number of documents in a collection.
    fn count(&self, namespace: &Namespace) -> StoreResult<u64>;

    /// Applies an ordered batch of write operations in one request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::BulkWrite`] carrying the partial counts
    /// when an operation fails.
    fn bulk_write(&self, namespace: &Namespace, ops: Vec<WriteOp>) -> StoreResult<BulkWriteResult>;

    /// Replaces the contents of `to` with a copy of `from`. Returns the
    /// number of documents copied.
    fn copy_collection(&self, from: &Namespace, to: &Namespace) -> StoreResult<u64>;

    /// Drops a collection. Idempotent.
    fn drop_collection(&self, namespace: &Namespace) -> StoreResult<()>;

    /// Closes the session. Closing twice is not an error.
    fn close(&mut self) -> StoreResult<()>;
}
