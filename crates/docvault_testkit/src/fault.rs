//! Fault injection for store sessions.
//!
//! [`FaultyConnector`] wraps any connector and fails chosen calls on the
//! sessions it opens. A rule names an operation and which call of it fails
//! (counted across all sessions from the connector, starting at 1). Calls
//! without a matching rule go straight to the wrapped session.
//!
//! ## Test Strategy
//!
//! 1. **Snapshot failure** - fail `DropCollection` or `CopyCollection`
//!    during the backup step
//! 2. **Write failure** - fail `BulkWrite`, optionally after applying part
//!    of the batch
//! 3. **Restore failure** - fail the second `BulkWrite` or `CopyCollection`
//! 4. **Connect failure** - refuse new sessions

use docvault_store::{
    BulkWriteResult, Connector, Credentials, Document, DocumentStore, Filter, Namespace,
    Projection, StoreError, StoreResult, WriteOp,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Session operations a fault can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// [`DocumentStore::ping`]
    Ping,
    /// [`DocumentStore::database_names`]
    DatabaseNames,
    /// [`DocumentStore::collection_names`]
    CollectionNames,
    /// [`DocumentStore::create_collection`]
    CreateCollection,
    /// [`DocumentStore::find`]
    Find,
    /// [`DocumentStore::count`]
    Count,
    /// [`DocumentStore::bulk_write`]
    BulkWrite,
    /// [`DocumentStore::copy_collection`]
    CopyCollection,
    /// [`DocumentStore::drop_collection`]
    DropCollection,
    /// [`DocumentStore::close`]
    Close,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    op: StoreOp,
    call: usize,
    /// For bulk writes: operations applied before failing.
    applied: usize,
}

#[derive(Debug, Default)]
struct FaultState {
    rules: Vec<Rule>,
    calls: HashMap<StoreOp, usize>,
    injected: Vec<(StoreOp, usize)>,
    refuse_connect: bool,
}

impl FaultState {
    /// Counts a call. Returns its number and the rule that fires on it.
    fn record(&mut self, op: StoreOp) -> (usize, Option<Rule>) {
        let call = {
            let count = self.calls.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        let rule = self
            .rules
            .iter()
            .find(|r| r.op == op && r.call == call)
            .copied();
        if rule.is_some() {
            self.injected.push((op, call));
        }
        (call, rule)
    }
}

fn injected_error(op: StoreOp, call: usize) -> StoreError {
    StoreError::backend(format!("injected fault: {op} call {call}"))
}

/// A connector wrapper that can fail chosen session calls.
#[derive(Debug, Clone)]
pub struct FaultyConnector<C> {
    inner: C,
    state: Arc<Mutex<FaultState>>,
}

impl<C> FaultyConnector<C> {
    /// Wraps a connector. No faults are armed.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            state: Arc::new(Mutex::new(FaultState::default())),
        }
    }

    /// The wrapped connector.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Fails the `call`-th call of `op`.
    pub fn fail_on(&self, op: StoreOp, call: usize) -> &Self {
        self.state.lock().rules.push(Rule { op, call, applied: 0 });
        self
    }

    /// Fails the `call`-th bulk write after applying its first `applied`
    /// operations, like an ordered write that stops partway.
    pub fn fail_bulk_write_after(&self, call: usize, applied: usize) -> &Self {
        self.state.lock().rules.push(Rule {
            op: StoreOp::BulkWrite,
            call,
            applied,
        });
        self
    }

    /// Makes `connect` fail until reset.
    pub fn refuse_connections(&self, refuse: bool) -> &Self {
        self.state.lock().refuse_connect = refuse;
        self
    }

    /// Number of calls of `op` so far.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Faults that fired, in order, as (operation, call number).
    pub fn injected(&self) -> Vec<(StoreOp, usize)> {
        self.state.lock().injected.clone()
    }

    /// Whether any fault fired.
    pub fn has_failed(&self) -> bool {
        !self.state.lock().injected.is_empty()
    }

    /// Clears all rules and counters.
    pub fn reset(&self) {
        *self.state.lock() = FaultState::default();
    }
}

impl<C: Connector> Connector for FaultyConnector<C> {
    type Session = FaultySession<C::Session>;

    fn connect(&self, credentials: &Credentials) -> StoreResult<Self::Session> {
        if self.state.lock().refuse_connect {
            return Err(StoreError::unreachable("injected fault: connect refused"));
        }
        Ok(FaultySession {
            inner: self.inner.connect(credentials)?,
            state: Arc::clone(&self.state),
        })
    }
}

/// A session opened by a [`FaultyConnector`].
#[derive(Debug)]
pub struct FaultySession<S> {
    inner: S,
    state: Arc<Mutex<FaultState>>,
}

impl<S> FaultySession<S> {
    fn check(&self, op: StoreOp) -> StoreResult<()> {
        match self.state.lock().record(op) {
            (call, Some(_)) => Err(injected_error(op, call)),
            (_, None) => Ok(()),
        }
    }
}

impl<S: DocumentStore> DocumentStore for FaultySession<S> {
    fn ping(&self) -> StoreResult<()> {
        self.check(StoreOp::Ping)?;
        self.inner.ping()
    }

    fn database_names(&self) -> StoreResult<Vec<String>> {
        self.check(StoreOp::DatabaseNames)?;
        self.inner.database_names()
    }

    fn collection_names(&self, database: &str) -> StoreResult<Vec<String>> {
        self.check(StoreOp::CollectionNames)?;
        self.inner.collection_names(database)
    }

    fn create_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.check(StoreOp::CreateCollection)?;
        self.inner.create_collection(namespace)
    }

    fn find(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        self.check(StoreOp::Find)?;
        self.inner.find(namespace, filter, projection)
    }

    fn count(&self, namespace: &Namespace) -> StoreResult<u64> {
        self.check(StoreOp::Count)?;
        self.inner.count(namespace)
    }

    fn bulk_write(&self, namespace: &Namespace, ops: Vec<WriteOp>) -> StoreResult<BulkWriteResult> {
        let (call, rule) = self.state.lock().record(StoreOp::BulkWrite);
        let Some(rule) = rule else {
            return self.inner.bulk_write(namespace, ops);
        };

        let applied: Vec<WriteOp> = ops.into_iter().take(rule.applied).collect();
        let index = applied.len();
        let partial = if applied.is_empty() {
            BulkWriteResult::default()
        } else {
            self.inner.bulk_write(namespace, applied)?
        };
        Err(StoreError::BulkWrite {
            inserted: partial.inserted,
            deleted: partial.deleted,
            index,
            cause: Box::new(injected_error(StoreOp::BulkWrite, call)),
        })
    }

    fn copy_collection(&self, from: &Namespace, to: &Namespace) -> StoreResult<u64> {
        self.check(StoreOp::CopyCollection)?;
        self.inner.copy_collection(from, to)
    }

    fn drop_collection(&self, namespace: &Namespace) -> StoreResult<()> {
        self.check(StoreOp::DropCollection)?;
        self.inner.drop_collection(namespace)
    }

    fn close(&mut self) -> StoreResult<()> {
        let fault = self.check(StoreOp::Close);
        // The wrapped session is released either way.
        self.inner.close()?;
        fault
    }
}
