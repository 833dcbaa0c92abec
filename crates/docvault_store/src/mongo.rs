//! MongoDB store over the blocking driver API.

use crate::backend::{BulkWriteResult, Connector, Credentials, DocumentStore, WriteOp};
use crate::document::{Document, ID_FIELD};
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, Projection};
use crate::namespace::Namespace;
use crate::value::{ObjectId, Value};
use bson::{doc, Bson, Document as BsonDocument};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::FindOptions;
use mongodb::sync::{Client, Collection};
use tracing::debug;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Opens driver sessions against an SRV-addressed cluster.
#[derive(Debug, Clone, Default)]
pub struct MongoConnector {
    options: Option<String>,
}

impl MongoConnector {
    /// Creates a connector with the default connection options
    /// (`retryWrites=true&w=majority`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the query string appended to the connection URI.
    #[must_use]
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Builds the connection string for a set of credentials.
    ///
    /// User and password are form-url-encoded.
    pub fn uri(&self, credentials: &Credentials) -> String {
        let options = self
            .options
            .as_deref()
            .unwrap_or("retryWrites=true&w=majority");
        let encode = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
        match (&credentials.username, &credentials.password) {
            (Some(user), Some(password)) => format!(
                "mongodb+srv://{}:{}@{}/?{options}",
                encode(user),
                encode(password),
                credentials.cluster
            ),
            _ => format!("mongodb+srv://{}/?{options}", credentials.cluster),
        }
    }
}

impl Connector for MongoConnector {
    type Session = MongoSession;

    fn connect(&self, credentials: &Credentials) -> StoreResult<MongoSession> {
        let client = Client::with_uri_str(self.uri(credentials)).map_err(map_error)?;
        debug!(cluster = %credentials.cluster, "driver client created");
        Ok(MongoSession {
            client: Some(client),
        })
    }
}

/// A driver session. Dropping the client releases its connection pool.
#[derive(Debug)]
pub struct MongoSession {
    client: Option<Client>,
}

impl MongoSession {
    fn client(&self) -> StoreResult<&Client> {
        self.client.as_ref().ok_or(StoreError::Closed)
    }

    fn collection(&self, namespace: &Namespace) -> StoreResult<Collection<BsonDocument>> {
        Ok(self
            .client()?
            .database(namespace.database())
            .collection::<BsonDocument>(namespace.collection()))
    }
}

fn map_error(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Authentication { message, .. } => StoreError::authentication(message.clone()),
        ErrorKind::ServerSelection { message, .. } | ErrorKind::DnsResolve { message, .. } => {
            StoreError::unreachable(message.clone())
        }
        ErrorKind::Io(_) => StoreError::unreachable(err.to_string()),
        _ => StoreError::backend(err.to_string()),
    }
}

/// Splits an insert-many failure into (documents inserted, cause).
fn insert_failure(err: MongoError, namespace: &Namespace) -> (u64, StoreError) {
    if let ErrorKind::BulkWrite(failure) = err.kind.as_ref() {
        if let Some(first) = failure.write_errors.as_ref().and_then(|errors| errors.first()) {
            let cause = if first.code == DUPLICATE_KEY_CODE {
                StoreError::DuplicateKey {
                    namespace: namespace.to_string(),
                    key: first.message.clone(),
                }
            } else {
                StoreError::backend(first.message.clone())
            };
            return (first.index as u64, cause);
        }
    }
    (0, map_error(err))
}

fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(n) => Bson::Int64(*n),
        Value::Float(n) => Bson::Double(*n),
        Value::Text(s) => Bson::String(s.clone()),
        Value::ObjectId(id) => Bson::ObjectId((*id).into()),
        Value::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        Value::Document(d) => Bson::Document(to_bson_document(d)),
    }
}

fn to_bson_document(document: &Document) -> BsonDocument {
    let mut out = BsonDocument::new();
    for (key, value) in document.iter() {
        out.insert(key, to_bson(value));
    }
    out
}

fn from_bson(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::Int(i64::from(n)),
        Bson::Int64(n) => Value::Int(n),
        Bson::Double(n) => Value::Float(n),
        Bson::String(s) => Value::Text(s),
        Bson::ObjectId(oid) => Value::ObjectId(ObjectId::from(oid)),
        Bson::Array(items) => Value::Array(items.into_iter().map(from_bson).collect()),
        Bson::Document(d) => Value::Document(from_bson_document(d)),
        other => Value::Text(other.to_string()),
    }
}

fn from_bson_document(document: BsonDocument) -> Document {
    document
        .into_iter()
        .map(|(key, value)| (key, from_bson(value)))
        .collect()
}

fn projection_document(projection: &Projection) -> Option<BsonDocument> {
    let mut out = BsonDocument::new();
    if projection.field_names().is_empty() {
        if projection.includes_id() {
            return None;
        }
        out.insert(ID_FIELD, 0);
        return Some(out);
    }
    for field in projection.field_names() {
        out.insert(field.as_str(), 1);
    }
    if !projection.includes_id() {
        out.insert(ID_FIELD, 0);
    }
    Some(out)
}

impl DocumentStore for MongoSession {
    fn ping(&self) -> StoreResult<()> {
        self.client()?
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .map_err(map_error)?;
        Ok(())
    }

    fn database_names(&self) -> StoreResult<Vec<String>> {
        self.client()?
            .list_database_names(None, None)
            .map_err(map_error)
    }

    fn collection_names(&self, database: &str) -> StoreResult<Vec<String>> {
        self.client()?
            .database(database)
            .list_collection_names(None)
            .map_err(map_error)
    }

    fn create_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        if self
            .collection_names(namespace.database())?
            .iter()
            .any(|name| name == namespace.collection())
        {
            return Ok(());
        }
        self.client()?
            .database(namespace.database())
            .create_collection(namespace.collection(), None)
            .map_err(map_error)
    }

    fn find(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        let options = FindOptions::builder()
            .projection(projection_document(projection))
            .build();
        let cursor = self
            .collection(namespace)?
            .find(to_bson_document(filter.as_document()), options)
            .map_err(map_error)?;

        let mut documents = Vec::new();
        for item in cursor {
            documents.push(from_bson_document(item.map_err(map_error)?));
        }
        Ok(documents)
    }

    fn count(&self, namespace: &Namespace) -> StoreResult<u64> {
        self.collection(namespace)?
            .count_documents(None, None)
            .map_err(map_error)
    }

    fn bulk_write(&self, namespace: &Namespace, ops: Vec<WriteOp>) -> StoreResult<BulkWriteResult> {
        let collection = self.collection(namespace)?;
        let mut result = BulkWriteResult::default();
        let mut pending: Vec<BsonDocument> = Vec::new();
        let mut pending_start = 0usize;

        // Consecutive inserts go out as one ordered insert_many.
        let flush = |pending: &mut Vec<BsonDocument>,
                     start: usize,
                     result: &mut BulkWriteResult|
         -> StoreResult<()> {
            if pending.is_empty() {
                return Ok(());
            }
            let batch = std::mem::take(pending);
            let size = batch.len() as u64;
            match collection.insert_many(batch, None) {
                Ok(_) => {
                    result.inserted += size;
                    Ok(())
                }
                Err(err) => {
                    let (landed, cause) = insert_failure(err, namespace);
                    result.inserted += landed;
                    Err(StoreError::BulkWrite {
                        inserted: result.inserted,
                        deleted: result.deleted,
                        index: start + landed as usize,
                        cause: Box::new(cause),
                    })
                }
            }
        };

        for (index, op) in ops.into_iter().enumerate() {
            match op {
                WriteOp::InsertOne(document) => {
                    if pending.is_empty() {
                        pending_start = index;
                    }
                    pending.push(to_bson_document(&document));
                }
                WriteOp::DeleteMany(filter) => {
                    flush(&mut pending, pending_start, &mut result)?;
                    match collection.delete_many(to_bson_document(filter.as_document()), None) {
                        Ok(deleted) => result.deleted += deleted.deleted_count,
                        Err(err) => {
                            return Err(StoreError::BulkWrite {
                                inserted: result.inserted,
                                deleted: result.deleted,
                                index,
                                cause: Box::new(map_error(err)),
                            })
                        }
                    }
                }
            }
        }
        flush(&mut pending, pending_start, &mut result)?;
        Ok(result)
    }

    fn copy_collection(&self, from: &Namespace, to: &Namespace) -> StoreResult<u64> {
        let pipeline = vec![doc! {
            "$out": { "db": to.database(), "coll": to.collection() }
        }];
        let cursor = self
            .collection(from)?
            .aggregate(pipeline, None)
            .map_err(map_error)?;
        for item in cursor {
            item.map_err(map_error)?;
        }
        self.count(to)
    }

    fn drop_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.collection(namespace)?.drop(None).map_err(map_error)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.client.take();
        Ok(())
    }
}
