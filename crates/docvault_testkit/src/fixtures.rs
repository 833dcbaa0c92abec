//! Test fixtures and store helpers.
//!
//! Provides seeded stores, temporary file clusters and comparison helpers
//! for common test scenarios.

use docvault_store::{
    doc, Connector, Credentials, Document, DocumentStore, FileConnector, InMemoryStore, Namespace,
    WriteOp,
};
use std::path::Path;
use tempfile::TempDir;

/// Cluster name used by fixtures.
pub const TEST_CLUSTER: &str = "local";

/// Credentials for [`TEST_CLUSTER`] with no login.
pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_CLUSTER)
}

/// The namespace fixtures write to.
pub fn test_namespace() -> Namespace {
    Namespace::new("testdb", "items")
}

/// An in-memory store holding `documents` in `namespace`.
pub fn seeded_store(namespace: &Namespace, documents: Vec<Document>) -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .seed(namespace, documents)
        .expect("Failed to seed in-memory store");
    store
}

/// `count` documents with integer ids `1..=count`.
pub fn numbered_documents(count: usize) -> Vec<Document> {
    numbered_from(1, count)
}

/// `count` documents with integer ids starting at `first`.
pub fn numbered_from(first: i64, count: usize) -> Vec<Document> {
    (0..count as i64)
        .map(|i| {
            let id = first + i;
            doc! { "_id" => id, "name" => format!("item-{id}"), "qty" => id * 10 }
        })
        .collect()
}

/// Documents sorted by their identity, for order-insensitive comparison.
pub fn sorted_by_id(mut documents: Vec<Document>) -> Vec<Document> {
    documents.sort_by_key(|d| d.id().map(|id| id.to_json().to_string()).unwrap_or_default());
    documents
}

/// A file-backed cluster in a temporary directory.
pub struct TempCluster {
    /// Connector for the cluster.
    pub connector: FileConnector,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempCluster {
    /// Creates an empty cluster named [`TEST_CLUSTER`].
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let connector = FileConnector::new(temp_dir.path());
        connector
            .init_cluster(TEST_CLUSTER)
            .expect("Failed to create cluster directory");
        Self {
            connector,
            _temp_dir: temp_dir,
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        self.connector.root()
    }

    /// Writes `documents` into `namespace`, creating it.
    pub fn seed(&self, namespace: &Namespace, documents: Vec<Document>) {
        let mut session = self
            .connector
            .connect(&test_credentials())
            .expect("Failed to connect to temp cluster");
        session
            .create_collection(namespace)
            .expect("Failed to create collection");
        session
            .bulk_write(namespace, documents.into_iter().map(WriteOp::InsertOne).collect())
            .expect("Failed to seed collection");
        session.close().expect("Failed to close session");
    }

    /// Every document in `namespace`, or `None` if it does not exist.
    pub fn documents(&self, namespace: &Namespace) -> Option<Vec<Document>> {
        let mut session = self
            .connector
            .connect(&test_credentials())
            .expect("Failed to connect to temp cluster");
        let exists = session
            .collection_names(namespace.database())
            .expect("Failed to list collections")
            .iter()
            .any(|name| name == namespace.collection());
        let documents = exists.then(|| {
            session
                .find(namespace, &Default::default(), &Default::default())
                .expect("Failed to read collection")
        });
        session.close().expect("Failed to close session");
        documents
    }
}

impl Default for TempCluster {
    fn default() -> Self {
        Self::new()
    }
}
