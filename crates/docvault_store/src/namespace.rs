//! Collection references.

use std::fmt;

/// Identifies one collection inside one database.
///
/// The cluster is implied by the session the namespace is used with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Creates a namespace.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// A sibling collection in the same database.
    #[must_use]
    pub fn sibling(&self, collection: impl Into<String>) -> Self {
        Self::new(self.database.clone(), collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_sibling() {
        let ns = Namespace::new("shop", "orders");
        assert_eq!(ns.to_string(), "shop.orders");

        let sibling = ns.sibling("orders_backup");
        assert_eq!(sibling.database(), "shop");
        assert_eq!(sibling.collection(), "orders_backup");
    }
}
