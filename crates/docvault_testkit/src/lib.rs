//! # DocVault Testkit
//!
//! Test utilities for DocVault.
//!
//! This crate provides:
//! - A fault-injecting connector for exercising failure paths
//! - Seeded stores and temporary file clusters
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use docvault_testkit::prelude::*;
//! use docvault_store::{Connector, DocumentStore};
//!
//! let ns = test_namespace();
//! let store = seeded_store(&ns, numbered_documents(3));
//! let faulty = FaultyConnector::new(store);
//! faulty.fail_on(StoreOp::CopyCollection, 1);
//!
//! let session = faulty.connect(&test_credentials()).unwrap();
//! assert!(session.copy_collection(&ns, &ns.sibling("copy")).is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fault::*;
pub use fixtures::*;
pub use generators::*;
