//! Credential configuration.
//!
//! Credentials come from two places: values given explicitly by the caller
//! and a TOML config file. Explicit values win field by field.
//!
//! ```toml
//! [docvault]
//! username = "ada"
//! password = "s3cret"
//! cluster = "cluster0.example.net"
//! ```

use crate::error::{CoreError, CoreResult};
use docvault_store::Credentials;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the TOML table holding credentials.
pub const CONFIG_SECTION: &str = "docvault";

const APP_DIR: &str = "docvault";
const FILE_NAME: &str = "config.toml";

/// A partial set of credentials. Every field may be unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    /// User to authenticate as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for `username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Cluster endpoint or name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

impl CredentialSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the cluster.
    #[must_use]
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.cluster.is_none()
    }

    /// Layers `self` over `fallback`: fields set here win.
    #[must_use]
    pub fn merged_over(self, fallback: &CredentialSet) -> CredentialSet {
        CredentialSet {
            username: self.username.or_else(|| fallback.username.clone()),
            password: self.password.or_else(|| fallback.password.clone()),
            cluster: self.cluster.or_else(|| fallback.cluster.clone()),
        }
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("cluster", &self.cluster)
            .finish()
    }
}

/// A TOML config file at an explicit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Uses the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `<config_dir>/docvault/config.toml` for the current user.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the platform has no config directory.
    pub fn default_location() -> CoreResult<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CoreError::config("no configuration directory for this user"))?;
        Ok(Self::new(dir.join(APP_DIR).join(FILE_NAME)))
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the whole file. Tables other than [`CONFIG_SECTION`] are kept
    /// on update.
    fn read_table(&self) -> CoreResult<toml::Table> {
        if !self.exists() {
            return Ok(toml::Table::new());
        }
        let text = fs::read_to_string(&self.path)?;
        toml::from_str(&text).map_err(|e| self.parse_error(e))
    }

    fn parse_error(&self, e: impl fmt::Display) -> CoreError {
        CoreError::config(format!("{}: {e}", self.path.display()))
    }

    /// Loads the credentials stored in the file.
    ///
    /// A missing file or section yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be parsed.
    pub fn load(&self) -> CoreResult<CredentialSet> {
        match self.read_table()?.remove(CONFIG_SECTION) {
            Some(section) => section.try_into().map_err(|e| self.parse_error(e)),
            None => Ok(CredentialSet::default()),
        }
    }

    /// Stores the fields set in `updates`, keeping the others.
    ///
    /// Creates the file and its parent directories when missing. Returns the
    /// credentials now stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing file cannot be parsed or the new one
    /// cannot be written.
    pub fn update(&self, updates: &CredentialSet) -> CoreResult<CredentialSet> {
        let mut table = self.read_table()?;
        let current: CredentialSet = match table.remove(CONFIG_SECTION) {
            Some(section) => section.try_into().map_err(|e| self.parse_error(e))?,
            None => CredentialSet::default(),
        };
        let stored = updates.clone().merged_over(&current);

        let section = toml::Value::try_from(&stored)
            .map_err(|e| CoreError::config(format!("cannot serialize config: {e}")))?;
        table.insert(CONFIG_SECTION.to_string(), section);
        let text = toml::to_string_pretty(&table)
            .map_err(|e| CoreError::config(format!("cannot serialize config: {e}")))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, text)?;
        Ok(stored)
    }
}

/// Resolves the credentials for a connection.
///
/// Explicit values win over file values. A missing or blank cluster is a
/// configuration error since there is nothing to connect to. A missing
/// username or password is left unset and surfaces when the cluster rejects
/// the connection.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if no usable cluster is set.
pub fn resolve_credentials(
    explicit: &CredentialSet,
    file: &CredentialSet,
) -> CoreResult<Credentials> {
    let merged = explicit.clone().merged_over(file);
    let cluster = match merged.cluster {
        Some(cluster) if !cluster.trim().is_empty() => cluster,
        Some(_) => return Err(CoreError::config("cluster name is blank")),
        None => {
            return Err(CoreError::config(
                "no cluster configured; pass one explicitly or store it in the config file",
            ))
        }
    };
    Ok(Credentials {
        cluster,
        username: merged.username,
        password: merged.password,
    })
}

/// What a [`crate::ConnectionHandle`] connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Resolved credentials.
    pub credentials: Credentials,
    /// Database to select on open.
    pub database: Option<String>,
    /// Collection to select on open. Requires `database`.
    pub collection: Option<String>,
}

impl ConnectionSettings {
    /// Settings for a cluster with no database selected.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            database: None,
            collection: None,
        }
    }

    /// Selects a database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Selects a collection.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}
