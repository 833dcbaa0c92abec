//! Reading documents back out.

use crate::connection::ConnectionHandle;
use crate::error::CoreResult;
use crate::table::Table;
use docvault_store::{Connector, Document, DocumentStore, Filter, Projection, Value};
use tracing::{debug, warn};

/// What to read: a filter and an optional field list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filter: Filter,
    fields: Option<Vec<String>>,
}

impl Query {
    /// Every document, every field.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = self.filter.and(field, value);
        self
    }

    /// Restricts the fields returned. Naming `_id` here returns it even when
    /// the reader excludes it.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// The filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

/// Reads from the collection selected on a [`ConnectionHandle`].
///
/// `_id` is left out of results unless the reader includes it or a query
/// names it.
pub struct Reader<'a, C: Connector> {
    handle: &'a ConnectionHandle<C>,
    include_id: bool,
}

impl<'a, C: Connector> Reader<'a, C> {
    /// Creates a reader that leaves `_id` out.
    pub fn new(handle: &'a ConnectionHandle<C>) -> Self {
        Self {
            handle,
            include_id: false,
        }
    }

    /// Sets whether `_id` is returned.
    #[must_use]
    pub fn with_id(mut self, include_id: bool) -> Self {
        self.include_id = include_id;
        self
    }

    fn projection(&self, query: &Query) -> Projection {
        match &query.fields {
            Some(fields) => Projection::fields(fields.iter().cloned()).with_id(self.include_id),
            None => Projection::all().with_id(self.include_id),
        }
    }

    /// Returns the matching documents.
    ///
    /// # Errors
    ///
    /// Returns a connection error if no collection is selected, or the store
    /// error if the query fails.
    pub fn get_data(&self, query: &Query) -> CoreResult<Vec<Document>> {
        let namespace = self.handle.require_namespace()?;
        let projection = self.projection(query);
        let documents = self
            .handle
            .with_session(|session| Ok(session.find(namespace, query.filter(), &projection)?))?;
        if documents.is_empty() {
            warn!("No data found in {namespace}");
        } else {
            debug!("Read {} documents from {namespace}", documents.len());
        }
        Ok(documents)
    }

    /// Returns the matching documents as a table.
    ///
    /// # Errors
    ///
    /// See [`Reader::get_data`].
    pub fn get_table(&self, query: &Query) -> CoreResult<Table> {
        Ok(Table::from_documents(&self.get_data(query)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionSettings;
    use docvault_store::{doc, Credentials, InMemoryStore, Namespace};

    fn open() -> ConnectionHandle<InMemoryStore> {
        let store = InMemoryStore::new();
        store
            .seed(
                &Namespace::new("db", "people"),
                vec![
                    doc! { "_id" => 1, "name" => "ada", "team" => "core" },
                    doc! { "_id" => 2, "name" => "bob", "team" => "web" },
                ],
            )
            .unwrap();
        let settings = ConnectionSettings::new(Credentials::new("local"))
            .with_database("db")
            .with_collection("people");
        ConnectionHandle::open(store, settings).unwrap()
    }

    #[test]
    fn id_excluded_by_default() {
        let handle = open();
        let docs = Reader::new(&handle).get_data(&Query::all()).unwrap();
        assert_eq!(docs[0], doc! { "name" => "ada", "team" => "core" });
    }

    #[test]
    fn id_included_when_asked() {
        let handle = open();
        let docs = Reader::new(&handle).with_id(true).get_data(&Query::all()).unwrap();
        assert_eq!(docs[0].id(), Some(&Value::Int(1)));

        let named = Reader::new(&handle)
            .get_data(&Query::all().with_fields(["_id", "name"]))
            .unwrap();
        assert_eq!(named[1], doc! { "_id" => 2, "name" => "bob" });
    }

    #[test]
    fn filter_and_projection() {
        let handle = open();
        let docs = Reader::new(&handle)
            .get_data(&Query::all().eq("team", "web").with_fields(["name"]))
            .unwrap();
        assert_eq!(docs, vec![doc! { "name" => "bob" }]);
    }

    #[test]
    fn empty_result_is_ok() {
        let handle = open();
        let docs = Reader::new(&handle)
            .get_data(&Query::all().eq("team", "none"))
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn table_output() {
        let handle = open();
        let table = Reader::new(&handle)
            .get_table(&Query::all().with_fields(["name"]))
            .unwrap();
        assert_eq!(table.columns(), ["name"]);
        assert_eq!(table.len(), 2);
    }
}
