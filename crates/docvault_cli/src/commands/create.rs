//! Init and create command implementations.

use super::{Backend, CliResult, Context, HandleTask};
use docvault_core::ConnectionHandle;
use docvault_store::{Connector, Namespace};
use tracing::info;

/// Creates the local file cluster.
pub fn init(ctx: &Context) -> CliResult<()> {
    if ctx.backend() != Backend::File {
        return Err("init only applies to the file backend".into());
    }
    let credentials = ctx.credentials()?;
    let dir = ctx.file_connector().init_cluster(&credentials.cluster)?;
    println!("✓ Cluster {} ready at {:?}", credentials.cluster, dir);
    Ok(())
}

struct Create {
    namespace: Namespace,
}

impl HandleTask for Create {
    type Output = ();

    fn run<C: Connector>(self, handle: ConnectionHandle<C>) -> CliResult<()> {
        handle.create_collection(&self.namespace)?;
        println!("✓ Collection {} ready", self.namespace);
        Ok(())
    }
}

/// Runs the create command.
pub fn run(ctx: &Context, database: &str, collection: &str) -> CliResult<()> {
    info!("Creating collection {database}.{collection}");
    let task = Create {
        namespace: Namespace::new(database, collection),
    };
    ctx.with_handle(None, None, task)
}
