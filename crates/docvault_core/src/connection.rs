//! Verified connections and scoped sessions.

use crate::config::ConnectionSettings;
use crate::error::{CoreError, CoreResult};
use docvault_store::{Connector, Credentials, DocumentStore, Namespace, StoreError};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::ops::Deref;
use tracing::{debug, info, warn};

/// A verified handle to a cluster, and optionally a database and collection
/// within it.
///
/// Opening a handle checks that the cluster accepts the credentials and that
/// the selected database and collection exist. Work against the store goes
/// through [`ConnectionHandle::session`], which yields a guard that closes
/// its session when dropped.
///
/// A handle can also hold one long-lived session opened with
/// [`ConnectionHandle::connect`] and released with
/// [`ConnectionHandle::close`]. Scoped sessions borrow it while it is open.
pub struct ConnectionHandle<C: Connector> {
    connector: C,
    credentials: Credentials,
    database: Option<String>,
    namespace: Option<Namespace>,
    session: Mutex<Option<C::Session>>,
}

impl<C: Connector> ConnectionHandle<C> {
    /// Opens and verifies a handle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if the cluster cannot be reached,
    /// rejects the credentials, or lacks the selected database or collection.
    pub fn open(connector: C, settings: ConnectionSettings) -> CoreResult<Self> {
        let ConnectionSettings {
            credentials,
            database,
            collection,
        } = settings;

        let mut handle = Self {
            connector,
            credentials,
            database: None,
            namespace: None,
            session: Mutex::new(None),
        };
        handle.check_connection()?;

        match (database, collection) {
            (Some(database), collection) => {
                handle.set_database(&database)?;
                if let Some(collection) = collection {
                    handle.set_collection(&collection)?;
                }
            }
            (None, Some(collection)) => {
                return Err(CoreError::connection(format!(
                    "collection {collection} selected without a database"
                )))
            }
            (None, None) => {}
        }
        Ok(handle)
    }

    fn probe<T>(&self, f: impl FnOnce(&C::Session) -> Result<T, StoreError>) -> CoreResult<T> {
        let session = self.session()?;
        f(&*session).map_err(|e| match e {
            StoreError::Authentication { .. } => {
                CoreError::connection_failed("authentication failed", e)
            }
            StoreError::Unreachable { .. } => {
                CoreError::connection_failed(format!("cannot reach cluster {}", self.credentials.cluster), e)
            }
            other => CoreError::connection_failed("verification failed", other),
        })
    }

    /// Checks that the cluster is reachable and accepts the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] on failure.
    pub fn check_connection(&self) -> CoreResult<()> {
        self.probe(|session| session.ping())?;
        info!("Authenticated connection to cluster {}", self.credentials.cluster);
        Ok(())
    }

    /// Checks that a database exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if it does not.
    pub fn check_database(&self, database: &str) -> CoreResult<()> {
        let names = self.probe(|session| session.database_names())?;
        if names.iter().any(|name| name == database) {
            Ok(())
        } else {
            Err(CoreError::connection(format!(
                "database {database} does not exist in cluster {}",
                self.credentials.cluster
            )))
        }
    }

    /// Checks that a collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if it does not.
    pub fn check_collection(&self, namespace: &Namespace) -> CoreResult<()> {
        let names = self.probe(|session| session.collection_names(namespace.database()))?;
        if names.iter().any(|name| name == namespace.collection()) {
            Ok(())
        } else {
            Err(CoreError::connection(format!(
                "collection {} does not exist in database {}",
                namespace.collection(),
                namespace.database()
            )))
        }
    }

    /// Selects and verifies a database. Clears any selected collection from
    /// a different database.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if the database does not exist.
    pub fn set_database(&mut self, database: &str) -> CoreResult<()> {
        self.check_database(database)?;
        if self
            .namespace
            .as_ref()
            .is_some_and(|ns| ns.database() != database)
        {
            debug!("Clearing collection selection for database change");
            self.namespace = None;
        }
        self.database = Some(database.to_string());
        info!("Verified database {database}");
        Ok(())
    }

    /// Selects and verifies a collection in the selected database.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if no database is selected or the
    /// collection does not exist.
    pub fn set_collection(&mut self, collection: &str) -> CoreResult<()> {
        let database = self
            .database
            .as_deref()
            .ok_or_else(|| CoreError::connection("no database selected"))?;
        let namespace = Namespace::new(database, collection);
        self.check_collection(&namespace)?;
        info!("Verified collection {namespace}");
        self.namespace = Some(namespace);
        Ok(())
    }

    /// Creates a collection if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a store error if the cluster refuses.
    pub fn create_collection(&self, namespace: &Namespace) -> CoreResult<()> {
        let session = self.session()?;
        session.create_collection(namespace)?;
        info!("Created collection {namespace}");
        Ok(())
    }

    /// The credentials this handle connects with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The selected database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// The selected collection.
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// The selected collection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if none is selected.
    pub fn require_namespace(&self) -> CoreResult<&Namespace> {
        self.namespace.as_ref().ok_or_else(|| {
            CoreError::connection(match &self.database {
                Some(_) => "no collection selected",
                None => "no database selected",
            })
        })
    }

    /// Opens the handle's long-lived session if it is not already open.
    ///
    /// Scoped sessions borrow it until [`ConnectionHandle::close`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if the connector fails.
    pub fn connect(&self) -> CoreResult<()> {
        // Held by a guard means it is already open.
        let Some(mut slot) = self.session.try_lock() else {
            return Ok(());
        };
        if slot.is_none() {
            *slot = Some(self.open_session()?);
        }
        Ok(())
    }

    /// Closes the handle's long-lived session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if a scoped session is still
    /// borrowing it, or the store error raised while closing.
    pub fn close(&self) -> CoreResult<()> {
        let Some(mut slot) = self.session.try_lock() else {
            return Err(CoreError::connection("session is in use"));
        };
        if let Some(mut session) = slot.take() {
            session.close()?;
            debug!("Closed session to {}", self.credentials.cluster);
        }
        Ok(())
    }

    /// Whether the long-lived session is open.
    pub fn is_connected(&self) -> bool {
        self.session.try_lock().is_none_or(|slot| slot.is_some())
    }

    /// Acquires a session for the current scope.
    ///
    /// Borrows the long-lived session if one is open and free. Otherwise a
    /// new session is opened and closed when the guard goes out of scope.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] if the connector fails.
    pub fn session(&self) -> CoreResult<SessionGuard<'_, C::Session>> {
        if let Some(slot) = self.session.try_lock() {
            if let Ok(shared) = MutexGuard::try_map(slot, Option::as_mut) {
                return Ok(SessionGuard {
                    held: Held::Shared(shared),
                    closed: false,
                });
            }
        }
        Ok(SessionGuard {
            held: Held::Owned(self.open_session()?),
            closed: false,
        })
    }

    /// Runs `f` with a scoped session.
    ///
    /// # Errors
    ///
    /// Returns the connection error or whatever `f` returns.
    pub fn with_session<T>(&self, f: impl FnOnce(&C::Session) -> CoreResult<T>) -> CoreResult<T> {
        let session = self.session()?;
        f(&*session)
    }

    fn open_session(&self) -> CoreResult<C::Session> {
        let session = self.connector.connect(&self.credentials).map_err(|e| {
            CoreError::connection_failed(
                format!("cannot connect to cluster {}", self.credentials.cluster),
                e,
            )
        })?;
        debug!("Opened session to {}", self.credentials.cluster);
        Ok(session)
    }
}

impl<C: Connector> Drop for ConnectionHandle<C> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.get_mut().take() {
            if let Err(e) = session.close() {
                warn!("Failed to close session: {e}");
            }
        }
    }
}

enum Held<'a, S> {
    Owned(S),
    Shared(MappedMutexGuard<'a, S>),
}

/// A session scoped to a guard.
///
/// A session the guard opened itself is closed when the guard is dropped.
/// A borrowed long-lived session goes back to its handle. Dereferences to
/// the underlying [`DocumentStore`].
pub struct SessionGuard<'a, S: DocumentStore> {
    held: Held<'a, S>,
    closed: bool,
}

impl<S: DocumentStore> SessionGuard<'_, S> {
    /// Whether this guard borrows the handle's long-lived session.
    pub fn is_shared(&self) -> bool {
        matches!(self.held, Held::Shared(_))
    }

    /// Ends the scope now, returning any error from closing.
    ///
    /// A borrowed long-lived session stays open for its handle.
    ///
    /// # Errors
    ///
    /// Returns the store error raised while closing.
    pub fn close(mut self) -> CoreResult<()> {
        self.closed = true;
        if let Held::Owned(session) = &mut self.held {
            session.close()?;
        }
        Ok(())
    }
}

impl<S: DocumentStore> Deref for SessionGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.held {
            Held::Owned(session) => session,
            Held::Shared(session) => session,
        }
    }
}

impl<S: DocumentStore> Drop for SessionGuard<'_, S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Held::Owned(session) = &mut self.held {
            if let Err(e) = session.close() {
                warn!("Failed to close session: {e}");
            }
        }
    }
}
