//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random documents and batches that
//! keep the invariants the stores rely on.

use docvault_store::{Document, Value, ID_FIELD};
use proptest::prelude::*;

/// Strategy for field names. Never the identity field.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for scalar values. Floats are finite so documents compare equal
/// to themselves.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        prop::string::string_regex("[ -~]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for values, with arrays and nested documents up to three
/// levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((field_name_strategy(), inner), 0..4)
                .prop_map(|fields| Value::Document(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for documents without an identity.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::vec((field_name_strategy(), value_strategy()), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for a batch of documents without identities.
pub fn batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(document_strategy(), 0..=max_len)
}

/// Strategy for a batch whose documents carry distinct integer identities
/// starting at `first_id`.
pub fn identified_batch_strategy(first_id: i64, max_len: usize) -> impl Strategy<Value = Vec<Document>> {
    batch_strategy(max_len).prop_map(move |documents| with_ids(first_id, documents))
}

/// Puts integer identities `first_id..` at the front of each document.
pub fn with_ids(first_id: i64, documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .zip(first_id..)
        .map(|(document, id)| {
            std::iter::once((ID_FIELD.to_string(), Value::Int(id)))
                .chain(document.without_id())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn documents_never_carry_ids(doc in document_strategy()) {
            prop_assert!(doc.id().is_none());
        }

        #[test]
        fn identified_batches_have_distinct_ids(batch in identified_batch_strategy(100, 8)) {
            let ids: Vec<_> = batch.iter().map(|d| d.id().cloned()).collect();
            for (i, id) in ids.iter().enumerate() {
                prop_assert_eq!(id, &Some(Value::Int(100 + i as i64)));
            }
        }
    }
}
