//! Conversions between documents and JSON.
//!
//! Object ids use the extended-JSON form `{"$oid": "<24 hex chars>"}` so that
//! identities survive a trip through a JSON file.

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::value::{ObjectId, Value};
use serde_json::{Map, Number, Value as Json};

const OID_KEY: &str = "$oid";

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some(id) = map
                        .get(OID_KEY)
                        .and_then(Json::as_str)
                        .and_then(ObjectId::parse_hex)
                    {
                        return Value::ObjectId(id);
                    }
                }
                Value::Document(map.into_iter().collect())
            }
        }
    }
}

impl Value {
    /// Renders this value as JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::Number(Number::from(*n)),
            Value::Float(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::Text(s) => Json::String(s.clone()),
            Value::ObjectId(id) => {
                let mut map = Map::new();
                map.insert(OID_KEY.to_string(), Json::String(id.to_hex()));
                Json::Object(map)
            }
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Document(d) => d.to_json(),
        }
    }
}

impl Document {
    /// Builds a document from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDocument`] if `json` is not an object.
    pub fn from_json(json: Json) -> StoreResult<Self> {
        match Value::from(json) {
            Value::Document(d) => Ok(d),
            other => Err(StoreError::invalid_document(format!(
                "expected a JSON object, found {}",
                other.type_name()
            ))),
        }
    }

    /// Renders this document as a JSON object.
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        )
    }
}

/// Parses a JSON array of objects into documents.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDocument`] if `json` is not an array or any
/// element is not an object.
pub fn documents_from_json(json: Json) -> StoreResult<Vec<Document>> {
    match json {
        Json::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                Document::from_json(item).map_err(|e| {
                    StoreError::invalid_document(format!("element {i}: {e}"))
                })
            })
            .collect(),
        _ => Err(StoreError::invalid_document(
            "expected a JSON array of objects",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use serde_json::json;

    #[test]
    fn object_id_uses_extended_json() {
        let id = ObjectId::from_bytes([1; 12]);
        let json = Value::ObjectId(id).to_json();
        assert_eq!(json, json!({ "$oid": "010101010101010101010101" }));
        assert_eq!(Value::from(json), Value::ObjectId(id));
    }

    #[test]
    fn malformed_oid_stays_a_document() {
        let value = Value::from(json!({ "$oid": "nope" }));
        assert!(matches!(value, Value::Document(_)));
    }

    #[test]
    fn numbers_map_to_int_or_float() {
        assert_eq!(Value::from(json!(3)), Value::Int(3));
        assert_eq!(Value::from(json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::Float(f64::NAN).to_json(), Json::Null);
    }

    #[test]
    fn document_from_object_preserves_fields() {
        let d = Document::from_json(json!({ "v": "a", "n": [1, null] })).unwrap();
        assert_eq!(d.get("v"), Some(&Value::from("a")));
        assert_eq!(
            d.get("n"),
            Some(&Value::Array(vec![Value::Int(1), Value::Null]))
        );
        assert_eq!(Document::from_json(d.to_json()).unwrap(), d);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(Document::from_json(json!([1, 2])).is_err());
        assert!(documents_from_json(json!({ "a": 1 })).is_err());

        let err = documents_from_json(json!([{ "a": 1 }, 5])).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn documents_from_array() {
        let docs = documents_from_json(json!([{ "_id": 1, "v": "a" }, { "v": "b" }])).unwrap();
        assert_eq!(docs[0], doc! { "_id" => 1, "v" => "a" });
        assert_eq!(docs.len(), 2);
    }
}
