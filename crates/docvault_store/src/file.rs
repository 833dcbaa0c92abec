//! File-based store for persistent local clusters.

use crate::backend::{BulkWriteResult, Connector, Credentials, DocumentStore, WriteOp};
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, Projection};
use crate::json::documents_from_json;
use crate::namespace::Namespace;
use crate::ops;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

const EXTENSION: &str = "json";

/// Opens sessions against clusters stored as directory trees.
///
/// Layout under the root directory:
///
/// ```text
/// <root>/<cluster>/<database>/<collection>.json
/// ```
///
/// Each collection file holds a JSON array of documents. Writes go to a
/// temporary file that is then renamed over the collection, so a crash never
/// leaves a half-written collection behind. Sessions from the same connector
/// serialize their file access; separate processes are not coordinated.
///
/// # Example
///
/// ```no_run
/// use docvault_store::{Connector, Credentials, DocumentStore, FileConnector};
///
/// let connector = FileConnector::new("/var/lib/docvault");
/// let session = connector.connect(&Credentials::new("main")).unwrap();
/// session.ping().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileConnector {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileConnector {
    /// Creates a connector rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory for a cluster so that it becomes reachable.
    pub fn init_cluster(&self, cluster: &str) -> StoreResult<PathBuf> {
        let dir = self.root.join(checked_name(cluster)?);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Connector for FileConnector {
    type Session = FileSession;

    fn connect(&self, credentials: &Credentials) -> StoreResult<FileSession> {
        let cluster_dir = self.root.join(checked_name(&credentials.cluster)?);
        debug!("Opening file session at {}", cluster_dir.display());
        Ok(FileSession {
            cluster_dir,
            lock: Arc::clone(&self.lock),
            open: true,
        })
    }
}

/// A session against a [`FileConnector`] cluster.
#[derive(Debug)]
pub struct FileSession {
    cluster_dir: PathBuf,
    lock: Arc<Mutex<()>>,
    open: bool,
}

fn checked_name(name: &str) -> StoreResult<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        Err(StoreError::InvalidName {
            name: name.to_string(),
        })
    } else {
        Ok(name)
    }
}

impl FileSession {
    fn check_open(&self) -> StoreResult<()> {
        if !self.open {
            return Err(StoreError::Closed);
        }
        if !self.cluster_dir.is_dir() {
            return Err(StoreError::unreachable(format!(
                "no cluster at {}",
                self.cluster_dir.display()
            )));
        }
        Ok(())
    }

    fn database_dir(&self, database: &str) -> StoreResult<PathBuf> {
        Ok(self.cluster_dir.join(checked_name(database)?))
    }

    fn collection_path(&self, namespace: &Namespace) -> StoreResult<PathBuf> {
        let file = format!("{}.{EXTENSION}", checked_name(namespace.collection())?);
        Ok(self.database_dir(namespace.database())?.join(file))
    }

    fn load(&self, namespace: &Namespace) -> StoreResult<Vec<Document>> {
        let path = self.collection_path(namespace)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path)?;
        let json: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::invalid_document(format!("{}: {e}", path.display()))
        })?;
        documents_from_json(json)
    }

    fn save(&self, namespace: &Namespace, documents: &[Document]) -> StoreResult<()> {
        let path = self.collection_path(namespace)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::Value::Array(documents.iter().map(Document::to_json).collect());
        let bytes = serde_json::to_vec_pretty(&json)
            .map_err(|e| StoreError::invalid_document(e.to_string()))?;

        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!("Saved {} documents to {}", documents.len(), path.display());
        Ok(())
    }
}

fn sorted_entries(dir: &Path, want_dirs: bool) -> StoreResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if want_dirs && path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        } else if !want_dirs
            && path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(EXTENSION)
        {
            if let Some(stem) = path.file_stem().and_then(|n| n.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

impl DocumentStore for FileSession {
    fn ping(&self) -> StoreResult<()> {
        self.check_open()
    }

    fn database_names(&self) -> StoreResult<Vec<String>> {
        self.check_open()?;
        sorted_entries(&self.cluster_dir, true)
    }

    fn collection_names(&self, database: &str) -> StoreResult<Vec<String>> {
        self.check_open()?;
        sorted_entries(&self.database_dir(database)?, false)
    }

    fn create_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.check_open()?;
        let _guard = self.lock.lock();
        if !self.collection_path(namespace)?.exists() {
            self.save(namespace, &[])?;
        }
        Ok(())
    }

    fn find(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        self.check_open()?;
        let _guard = self.lock.lock();
        ops::find(&self.load(namespace)?, filter, projection)
    }

    fn count(&self, namespace: &Namespace) -> StoreResult<u64> {
        self.check_open()?;
        let _guard = self.lock.lock();
        Ok(self.load(namespace)?.len() as u64)
    }

    fn bulk_write(&self, namespace: &Namespace, ops: Vec<WriteOp>) -> StoreResult<BulkWriteResult> {
        self.check_open()?;
        let _guard = self.lock.lock();
        let mut documents = self.load(namespace)?;
        let result = ops::apply_bulk(&mut documents, namespace, ops);
        // Partial progress is persisted too, as a cluster would keep it.
        match (self.save(namespace, &documents), result) {
            (Ok(()), result) => result,
            (Err(save), Ok(_)) => Err(save),
            (Err(save), Err(write)) => {
                error!("Bulk write to {namespace} failed ({write}) and could not be saved: {save}");
                Err(StoreError::Unsaved {
                    write: Box::new(write),
                    save: Box::new(save),
                })
            }
        }
    }

    fn copy_collection(&self, from: &Namespace, to: &Namespace) -> StoreResult<u64> {
        self.check_open()?;
        let _guard = self.lock.lock();
        let documents = self.load(from)?;
        self.save(to, &documents)?;
        Ok(documents.len() as u64)
    }

    fn drop_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.check_open()?;
        let _guard = self.lock.lock();
        let path = self.collection_path(namespace)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.open = false;
        Ok(())
    }
}
