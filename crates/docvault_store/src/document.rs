//! Ordered, schemaless documents.

use crate::value::{ObjectId, Value};

/// Name of the identity field.
pub const ID_FIELD: &str = "_id";

/// An ordered mapping from field name to [`Value`].
///
/// Field order is preserved as inserted; replacing an existing field keeps
/// its position. Equality is order-sensitive, like the stores it models.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Looks up a field by dotted path (`"address.city"`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.as_document()?.get(part)?;
        }
        Some(current)
    }

    /// Whether a top-level field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a field, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The identity value, if present.
    pub fn id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
    }

    /// Assigns a fresh [`ObjectId`] as the first field when no identity is
    /// present, and returns the identity.
    pub fn ensure_id(&mut self) -> &Value {
        let index = match self.fields.iter().position(|(k, _)| k == ID_FIELD) {
            Some(index) => index,
            None => {
                self.fields
                    .insert(0, (ID_FIELD.to_string(), Value::ObjectId(ObjectId::new())));
                0
            }
        };
        &self.fields[index].1
    }

    /// Returns this document without the identity field.
    #[must_use]
    pub fn without_id(mut self) -> Self {
        self.remove(ID_FIELD);
        self
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut document = Document::new();
        for (k, v) in iter {
            document.insert(k, v);
        }
        document
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```
/// use docvault_store::doc;
///
/// let d = doc! { "name" => "Ada", "age" => 36 };
/// assert_eq!(d.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::Document::new();
        $( document.insert($key, $value); )+
        document
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn insert_preserves_order_and_replaces_in_place() {
        let mut d = doc! { "a" => 1, "b" => 2 };
        assert_eq!(d.insert("a", 10), Some(Value::Int(1)));
        d.insert("c", 3);

        let keys: Vec<_> = d.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(d.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn ensure_id_prepends_object_id() {
        let mut d = doc! { "v" => "b" };
        assert!(matches!(d.ensure_id(), Value::ObjectId(_)));
        assert_eq!(d.keys().next(), Some(ID_FIELD));
    }

    #[test]
    fn ensure_id_keeps_caller_identity() {
        let mut d = doc! { "_id" => 1, "v" => "a" };
        assert_eq!(d.ensure_id(), &Value::Int(1));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn dotted_path_lookup() {
        let d = doc! { "address" => doc! { "city" => "Lima" } };
        assert_eq!(d.get_path("address.city"), Some(&Value::from("Lima")));
        assert_eq!(d.get_path("address.zip"), None);
        assert_eq!(d.get_path("missing"), None);
    }

    #[test]
    fn without_id_strips_identity() {
        let d = doc! { "_id" => 7, "v" => "x" }.without_id();
        assert!(d.id().is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn collect_from_pairs() {
        let d: Document = vec![("x", 1), ("y", 2)].into_iter().collect();
        assert_eq!(d, doc! { "x" => 1, "y" => 2 });
    }
}
