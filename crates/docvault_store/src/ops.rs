//! Collection semantics shared by the bundled stores.
//!
//! Both the in-memory and the file store keep a collection as a plain
//! `Vec<Document>`; these helpers give them identical query and bulk-write
//! behavior.

use crate::backend::{BulkWriteResult, WriteOp};
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, Projection};
use crate::namespace::Namespace;
use crate::value::Value;
use std::collections::HashSet;

/// Identity as compared for uniqueness.
///
/// Integers and integral floats share a key. Everything else keys on its
/// own variant, so distinct values never collide through a common rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Oid([u8; 12]),
    Array(Vec<IdKey>),
    Document(Vec<(String, IdKey)>),
}

// 2^63 as f64; floats in [-2^63, 2^63) convert to i64 exactly.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn id_key(id: &Value) -> IdKey {
    match id {
        Value::Null => IdKey::Null,
        Value::Bool(b) => IdKey::Bool(*b),
        Value::Int(n) => IdKey::Int(*n),
        Value::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f) => {
            IdKey::Int(*f as i64)
        }
        Value::Float(f) => IdKey::Float(f.to_bits()),
        Value::Text(s) => IdKey::Text(s.clone()),
        Value::ObjectId(oid) => IdKey::Oid(oid.bytes()),
        Value::Array(items) => IdKey::Array(items.iter().map(id_key).collect()),
        Value::Document(d) => IdKey::Document(
            d.iter()
                .map(|(field, value)| (field.to_string(), id_key(value)))
                .collect(),
        ),
    }
}

fn id_keys(documents: &[Document]) -> HashSet<IdKey> {
    documents.iter().filter_map(Document::id).map(id_key).collect()
}

/// Returns the projected documents matching `filter`.
pub(crate) fn find(
    documents: &[Document],
    filter: &Filter,
    projection: &Projection,
) -> StoreResult<Vec<Document>> {
    let mut found = Vec::new();
    for document in documents {
        if filter.matches(document)? {
            found.push(projection.apply(document.clone()));
        }
    }
    Ok(found)
}

/// Applies `ops` in order to `documents`.
///
/// On failure the collection keeps every operation applied before the
/// failing one, mirroring an ordered bulk write against a real cluster.
pub(crate) fn apply_bulk(
    documents: &mut Vec<Document>,
    namespace: &Namespace,
    ops: Vec<WriteOp>,
) -> StoreResult<BulkWriteResult> {
    let mut result = BulkWriteResult::default();
    let mut ids = id_keys(documents);

    for (index, op) in ops.into_iter().enumerate() {
        let step = match op {
            WriteOp::DeleteMany(filter) => delete_many(documents, &filter).map(|deleted| {
                result.deleted += deleted;
                ids = id_keys(documents);
            }),
            WriteOp::InsertOne(mut document) => {
                let id = document.ensure_id();
                if ids.insert(id_key(id)) {
                    documents.push(document);
                    result.inserted += 1;
                    Ok(())
                } else {
                    Err(StoreError::DuplicateKey {
                        namespace: namespace.to_string(),
                        key: id.to_json().to_string(),
                    })
                }
            }
        };

        if let Err(cause) = step {
            return Err(StoreError::BulkWrite {
                inserted: result.inserted,
                deleted: result.deleted,
                index,
                cause: Box::new(cause),
            });
        }
    }

    Ok(result)
}

fn delete_many(documents: &mut Vec<Document>, filter: &Filter) -> StoreResult<u64> {
    // Evaluate first so an unsupported filter deletes nothing.
    let mut keep = Vec::with_capacity(documents.len());
    for document in documents.iter() {
        keep.push(!filter.matches(document)?);
    }
    let before = documents.len();
    let mut flags = keep.into_iter();
    documents.retain(|_| flags.next().unwrap_or(true));
    Ok((before - documents.len()) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::value::ObjectId;

    fn ns() -> Namespace {
        Namespace::new("db", "c")
    }

    #[test]
    fn insert_assigns_ids() {
        let mut docs = Vec::new();
        let result = apply_bulk(&mut docs, &ns(), vec![WriteOp::InsertOne(doc! { "v" => 1 })])
            .unwrap();
        assert_eq!(result.inserted, 1);
        assert!(docs[0].id().is_some());
    }

    #[test]
    fn duplicate_key_stops_the_batch_after_partial_insert() {
        let mut docs = vec![doc! { "_id" => 1, "v" => "a" }];
        let err = apply_bulk(
            &mut docs,
            &ns(),
            vec![
                WriteOp::InsertOne(doc! { "_id" => 2 }),
                WriteOp::InsertOne(doc! { "_id" => 1, "v" => "dup" }),
                WriteOp::InsertOne(doc! { "_id" => 3 }),
            ],
        )
        .unwrap_err();

        assert!(err.is_duplicate_key());
        assert!(matches!(err, StoreError::BulkWrite { index: 1, inserted: 1, .. }));
        // the first insert landed, the third never ran
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn float_and_int_ids_collide() {
        let mut docs = vec![doc! { "_id" => 1 }];
        let err = apply_bulk(&mut docs, &ns(), vec![WriteOp::InsertOne(doc! { "_id" => 1.0 })])
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn large_float_ids_stay_distinct() {
        let mut docs = vec![doc! { "_id" => 1e19 }];
        apply_bulk(&mut docs, &ns(), vec![WriteOp::InsertOne(doc! { "_id" => 2e19 })]).unwrap();
        assert_eq!(docs.len(), 2);

        let err = apply_bulk(&mut docs, &ns(), vec![WriteOp::InsertOne(doc! { "_id" => 2e19 })])
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn object_id_and_oid_shaped_document_differ() {
        let mut docs = vec![doc! { "_id" => ObjectId::from_bytes([1; 12]) }];
        let lookalike = doc! { "$oid" => "010101010101010101010101" };
        apply_bulk(&mut docs, &ns(), vec![WriteOp::InsertOne(doc! { "_id" => lookalike })])
            .unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn delete_then_insert_reuses_ids() {
        let mut docs = vec![doc! { "_id" => 1, "v" => "old" }];
        let result = apply_bulk(
            &mut docs,
            &ns(),
            vec![
                WriteOp::DeleteMany(Filter::all()),
                WriteOp::InsertOne(doc! { "_id" => 1, "v" => "new" }),
            ],
        )
        .unwrap();

        assert_eq!(result, BulkWriteResult { inserted: 1, deleted: 1 });
        assert_eq!(docs, vec![doc! { "_id" => 1, "v" => "new" }]);
    }

    #[test]
    fn unsupported_delete_filter_deletes_nothing() {
        let mut docs = vec![doc! { "_id" => 1 }];
        let filter = Filter::from_document(doc! { "$expr" => true });
        assert!(apply_bulk(&mut docs, &ns(), vec![WriteOp::DeleteMany(filter)]).is_err());
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn find_filters_and_projects() {
        let docs = vec![
            doc! { "_id" => 1, "k" => "a", "v" => 1 },
            doc! { "_id" => 2, "k" => "b", "v" => 2 },
        ];
        let found = find(&docs, &Filter::eq("k", "b"), &Projection::fields(["v"])).unwrap();
        assert_eq!(found, vec![doc! { "v" => 2 }]);
    }
}
