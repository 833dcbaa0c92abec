//! CLI command implementations.

pub mod config;
pub mod create;
pub mod read;
pub mod verify;
pub mod write;

use docvault_core::{
    resolve_credentials, ConfigFile, ConnectionHandle, ConnectionSettings, CredentialSet,
};
use docvault_store::{Connector, Credentials, FileConnector};
use std::path::PathBuf;
use tracing::debug;

/// Result type for commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Which store the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Local JSON-file clusters under --store-dir
    File,
    /// A MongoDB Atlas cluster
    #[cfg(feature = "mongodb")]
    Mongodb,
}

/// How `read` prints documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// A JSON array
    Json,
    /// Aligned columns
    Table,
}

/// Work that needs an open handle, whatever the backend.
pub trait HandleTask {
    /// What the task returns.
    type Output;

    /// Runs the task.
    fn run<C: Connector>(self, handle: ConnectionHandle<C>) -> CliResult<Self::Output>;
}

/// Settings shared by every command.
pub struct Context {
    config: ConfigFile,
    store_dir: PathBuf,
    backend: Backend,
    explicit: CredentialSet,
}

impl Context {
    /// Builds the context from global arguments.
    pub fn new(
        config: Option<PathBuf>,
        store_dir: Option<PathBuf>,
        backend: Backend,
        explicit: CredentialSet,
    ) -> CliResult<Self> {
        let config = match config {
            Some(path) => ConfigFile::new(path),
            None => ConfigFile::default_location()?,
        };
        let store_dir = match store_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .ok_or("no data directory for this user; pass --store-dir")?
                .join("docvault"),
        };
        Ok(Self {
            config,
            store_dir,
            backend,
            explicit,
        })
    }

    /// The config file in use.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Connector for local file clusters.
    pub fn file_connector(&self) -> FileConnector {
        FileConnector::new(&self.store_dir)
    }

    /// The backend in use.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Credentials from explicit arguments layered over the config file.
    pub fn credentials(&self) -> CliResult<Credentials> {
        let stored = self.config.load()?;
        let credentials = resolve_credentials(&self.explicit, &stored)?;
        debug!("Resolved credentials {credentials:?}");
        Ok(credentials)
    }

    /// Opens a verified handle on the selected backend and runs `task`.
    pub fn with_handle<T: HandleTask>(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        task: T,
    ) -> CliResult<T::Output> {
        let mut settings = ConnectionSettings::new(self.credentials()?);
        settings.database = database.map(str::to_string);
        settings.collection = collection.map(str::to_string);

        match self.backend {
            Backend::File => task.run(ConnectionHandle::open(self.file_connector(), settings)?),
            #[cfg(feature = "mongodb")]
            Backend::Mongodb => task.run(ConnectionHandle::open(
                docvault_store::MongoConnector::new(),
                settings,
            )?),
        }
    }
}
