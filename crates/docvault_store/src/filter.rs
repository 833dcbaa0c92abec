//! Query filters and field projections.

use crate::document::{Document, ID_FIELD};
use crate::error::{StoreError, StoreResult};
use crate::value::Value;

/// A conjunction of field equality clauses.
///
/// Keys may be dotted paths into nested documents. Keys starting with `$`
/// are store-native operators; they are forwarded untouched to backends that
/// understand them and rejected by the bundled stores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Document,
}

impl Filter {
    /// A filter that matches every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A single equality clause.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(field, value);
        self
    }

    /// Wraps a filter document as-is, operators included.
    pub fn from_document(clauses: Document) -> Self {
        Self { clauses }
    }

    /// The filter as a document.
    pub fn as_document(&self) -> &Document {
        &self.clauses
    }

    /// Whether the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The first store-native operator key, if any.
    pub fn native_operator(&self) -> Option<&str> {
        self.clauses.keys().find(|k| k.starts_with('$'))
    }

    /// Evaluates the filter against a document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedQuery`] if the filter contains a
    /// store-native operator.
    pub fn matches(&self, document: &Document) -> StoreResult<bool> {
        if let Some(operator) = self.native_operator() {
            return Err(StoreError::UnsupportedQuery {
                operator: operator.to_string(),
            });
        }
        Ok(self.clauses.iter().all(|(path, expected)| {
            document
                .get_path(path)
                .map_or(expected.is_null(), |actual| actual.query_eq(expected))
        }))
    }
}

/// Which fields a read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
    include_id: bool,
}

impl Projection {
    /// Every field, identity included.
    #[must_use]
    pub fn all() -> Self {
        Self {
            fields: Vec::new(),
            include_id: true,
        }
    }

    /// Only the named top-level fields. The identity is kept only if it is
    /// listed or [`Projection::with_id`] is set.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let include_id = fields.iter().any(|f| f == ID_FIELD);
        Self { fields, include_id }
    }

    /// Sets whether the identity field is returned.
    #[must_use]
    pub fn with_id(mut self, include_id: bool) -> Self {
        self.include_id = include_id || self.fields.iter().any(|f| f == ID_FIELD);
        self
    }

    /// Named fields; empty means all fields.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// Whether the identity field is returned.
    pub fn includes_id(&self) -> bool {
        self.include_id
    }

    /// Applies the projection to a document, keeping the document's field order.
    pub fn apply(&self, document: Document) -> Document {
        document
            .into_iter()
            .filter(|(key, _)| {
                if key == ID_FIELD {
                    self.include_id
                } else {
                    self.fields.is_empty() || self.fields.iter().any(|f| f == key)
                }
            })
            .collect()
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::all()
    }
}
