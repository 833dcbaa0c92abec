//! Verify command implementation.

use super::{CliResult, Context, HandleTask};
use docvault_core::ConnectionHandle;
use docvault_store::Connector;
use tracing::info;

struct Verify;

impl HandleTask for Verify {
    type Output = ();

    fn run<C: Connector>(self, handle: ConnectionHandle<C>) -> CliResult<()> {
        println!("✓ Connected to cluster {}", handle.credentials().cluster);
        if let Some(database) = handle.database() {
            println!("✓ Database {database} exists");
        }
        if let Some(namespace) = handle.namespace() {
            println!("✓ Collection {} exists", namespace.collection());
        }
        Ok(())
    }
}

/// Runs the verify command.
///
/// Opening the handle does the checking; any failure is returned as the
/// connection error.
pub fn run(ctx: &Context, database: Option<String>, collection: Option<String>) -> CliResult<()> {
    info!("Verifying connection ({:?} backend)", ctx.backend());
    ctx.with_handle(database.as_deref(), collection.as_deref(), Verify)
}
