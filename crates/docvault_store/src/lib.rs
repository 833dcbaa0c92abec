//! # DocVault Store
//!
//! Document model and store backends for DocVault.
//!
//! This crate provides the lowest-level abstraction DocVault writes through.
//! A [`Connector`] opens sessions against a cluster; a session implements
//! [`DocumentStore`] and exposes the handful of collection-level operations
//! the backup-and-write protocol needs.
//!
//! ## Design Principles
//!
//! - Stores are schemaless: a [`Document`] is an ordered map over a closed
//!   [`Value`] enum
//! - Bulk writes are ordered and stop at the first failing operation,
//!   reporting how much already landed
//! - Copying a collection replaces the target (no merge)
//! - Dropping a collection is idempotent
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and ephemeral clusters
//! - [`FileConnector`] - JSON files in a directory tree
//! - `MongoConnector` - MongoDB via the blocking driver (`mongodb` feature)
//!
//! ## Example
//!
//! ```rust
//! use docvault_store::{doc, Connector, Credentials, DocumentStore, Filter, InMemoryStore, Namespace, Projection, WriteOp};
//!
//! let store = InMemoryStore::new();
//! let mut session = store.connect(&Credentials::new("local")).unwrap();
//! let ns = Namespace::new("shop", "orders");
//!
//! session
//!     .bulk_write(&ns, vec![WriteOp::InsertOne(doc! { "sku" => "A-1", "qty" => 3 })])
//!     .unwrap();
//! let found = session.find(&ns, &Filter::eq("sku", "A-1"), &Projection::all()).unwrap();
//! assert_eq!(found.len(), 1);
//! session.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod document;
mod error;
mod file;
mod filter;
mod json;
mod memory;
#[cfg(feature = "mongodb")]
mod mongo;
mod namespace;
mod ops;
mod value;

pub use backend::{BulkWriteResult, Connector, Credentials, DocumentStore, WriteOp};
pub use document::{Document, ID_FIELD};
pub use error::{StoreError, StoreResult};
pub use file::{FileConnector, FileSession};
pub use filter::{Filter, Projection};
pub use json::documents_from_json;
pub use memory::{InMemoryStore, MemorySession};
#[cfg(feature = "mongodb")]
pub use mongo::{MongoConnector, MongoSession};
pub use namespace::Namespace;
pub use value::{ObjectId, Value};
