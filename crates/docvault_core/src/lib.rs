//! # DocVault Core
//!
//! Backup-protected bulk writes for document collections.
//!
//! This crate provides:
//! - Credential resolution from explicit values and a TOML config file
//! - A verified [`ConnectionHandle`] with scoped session acquisition
//! - A [`BackupManager`] that snapshots a collection into a sibling
//!   `<name>_backup` collection and restores from it
//! - A [`BulkWriter`] for ordered append and replace-all writes
//! - A [`Writer`] that runs snapshot → write → discard/restore as one
//!   operation and reports a [`WriteOutcome`]
//! - A [`Reader`] with projection and [`Table`] output
//!
//! ## Usage
//!
//! ```rust
//! use docvault_core::{ConnectionHandle, ConnectionSettings, WriteOptions, Writer};
//! use docvault_store::{doc, Credentials, InMemoryStore, Namespace};
//!
//! let store = InMemoryStore::new();
//! store.seed(&Namespace::new("shop", "orders"), vec![doc! { "_id" => 1, "v" => "a" }]).unwrap();
//!
//! let settings = ConnectionSettings::new(Credentials::new("local"))
//!     .with_database("shop")
//!     .with_collection("orders");
//! let handle = ConnectionHandle::open(store.clone(), settings).unwrap();
//!
//! let report = Writer::new(&handle)
//!     .insert(vec![doc! { "v" => "b" }], WriteOptions::default())
//!     .unwrap();
//! assert_eq!(report.inserted, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backup;
pub mod bulk;
pub mod config;
pub mod connection;
pub mod error;
pub mod reader;
pub mod table;
pub mod writer;

pub use backup::{backup_namespace, BackupHandle, BackupManager, BACKUP_SUFFIX};
pub use bulk::{BulkWriter, WriteMode};
pub use config::{resolve_credentials, ConfigFile, ConnectionSettings, CredentialSet, CONFIG_SECTION};
pub use connection::{ConnectionHandle, SessionGuard};
pub use error::{CoreError, CoreResult};
pub use reader::{Query, Reader};
pub use table::{Batch, Table};
pub use writer::{WriteOptions, WriteOutcome, WritePhase, WriteReport, Writer};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
