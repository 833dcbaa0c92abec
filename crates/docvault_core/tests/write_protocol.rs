//! Integration tests for the backup-protected write protocol.

use docvault_core::{
    backup_namespace, BackupManager, ConnectionHandle, ConnectionSettings, CoreError, WriteMode,
    WriteOptions, WriteOutcome, Writer,
};
use docvault_store::{doc, Connector, Document, DocumentStore, InMemoryStore, Namespace, WriteOp};
use docvault_testkit::prelude::*;
use proptest::prelude::*;

fn open<C: Connector>(connector: C) -> ConnectionHandle<C> {
    let ns = test_namespace();
    let settings = ConnectionSettings::new(test_credentials())
        .with_database(ns.database())
        .with_collection(ns.collection());
    ConnectionHandle::open(connector, settings).expect("Failed to open handle")
}

fn contents(store: &InMemoryStore, ns: &Namespace) -> Vec<Document> {
    store.documents(ns).unwrap_or_default()
}

fn strip_ids(documents: &[Document]) -> Vec<Document> {
    documents.iter().cloned().map(Document::without_id).collect()
}

#[test]
fn insert_example_commits() {
    let ns = test_namespace();
    let store = seeded_store(&ns, vec![doc! { "_id" => 1, "v" => "a" }]);
    let handle = open(store.clone());

    let report = Writer::new(&handle)
        .insert(vec![doc! { "v" => "b" }], WriteOptions::default())
        .unwrap();

    assert_eq!(report.outcome, WriteOutcome::Committed);
    let docs = contents(&store, &ns);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0], doc! { "_id" => 1, "v" => "a" });
    assert_eq!(docs[1].clone().without_id(), doc! { "v" => "b" });
    assert!(!store.has_collection(&backup_namespace(&ns)));
}

#[test]
fn duplicate_example_restores() {
    let ns = test_namespace();
    let store = seeded_store(&ns, vec![doc! { "_id" => 1, "v" => "a" }]);
    let handle = open(store.clone());

    let err = Writer::new(&handle)
        .insert(vec![doc! { "_id" => 1, "v" => "dup" }], WriteOptions::default())
        .unwrap_err();

    assert_eq!(err.outcome(), Some(WriteOutcome::Restored));
    assert!(matches!(&err, CoreError::Write { source, .. } if source.is_duplicate_key()));
    assert_eq!(contents(&store, &ns), vec![doc! { "_id" => 1, "v" => "a" }]);
    assert!(!store.has_collection(&backup_namespace(&ns)));
}

#[test]
fn failed_write_with_preserved_backup_keeps_it() {
    let ns = test_namespace();
    let original = numbered_documents(3);
    let store = seeded_store(&ns, original.clone());
    let handle = open(store.clone());

    let err = Writer::new(&handle)
        .insert(numbered_documents(1), WriteOptions::new().preserve_backup(true))
        .unwrap_err();

    assert_eq!(err.preserved_backup(), Some(&backup_namespace(&ns)));
    assert_eq!(contents(&store, &backup_namespace(&ns)), original);
    assert_eq!(contents(&store, &ns), original);
}

#[test]
fn snapshot_failure_aborts_before_writing() {
    let ns = test_namespace();
    let original = numbered_documents(3);
    let store = seeded_store(&ns, original.clone());
    let faulty = FaultyConnector::new(store.clone());
    faulty.fail_on(StoreOp::CopyCollection, 1);
    let handle = open(faulty.clone());

    let err = Writer::new(&handle)
        .replace_all(numbered_from(10, 2), WriteOptions::default())
        .unwrap_err();

    assert!(matches!(err, CoreError::Backup { .. }));
    assert_eq!(err.outcome(), None);
    assert_eq!(faulty.calls(StoreOp::BulkWrite), 0);
    assert_eq!(contents(&store, &ns), original);
    assert_eq!(store.open_sessions(), 0);
}

#[test]
fn partial_replace_all_is_rolled_back() {
    let ns = test_namespace();
    let original = numbered_documents(4);
    let store = seeded_store(&ns, original.clone());
    let faulty = FaultyConnector::new(store.clone());
    // Delete-all plus one insert land before the failure.
    faulty.fail_bulk_write_after(1, 2);
    let handle = open(faulty);

    let err = Writer::new(&handle)
        .replace_all(numbered_from(10, 3), WriteOptions::default())
        .unwrap_err();

    assert_eq!(err.outcome(), Some(WriteOutcome::Restored));
    assert_eq!(contents(&store, &ns), original);
    assert!(!store.has_collection(&backup_namespace(&ns)));
}

#[test]
fn failed_restore_copy_preserves_backup() {
    let ns = test_namespace();
    let original = numbered_documents(3);
    let store = seeded_store(&ns, original.clone());
    let faulty = FaultyConnector::new(store.clone());
    faulty.fail_bulk_write_after(1, 1);
    faulty.fail_on(StoreOp::CopyCollection, 2);
    let handle = open(faulty);

    let err = Writer::new(&handle)
        .insert(numbered_from(10, 2), WriteOptions::default())
        .unwrap_err();

    assert_eq!(err.outcome(), Some(WriteOutcome::RestoreFailed));
    let backup = backup_namespace(&ns);
    assert_eq!(err.preserved_backup(), Some(&backup));
    assert_eq!(contents(&store, &backup), original);
    match err {
        CoreError::Restore { write, restore, .. } => {
            assert!(matches!(write, docvault_store::StoreError::BulkWrite { .. }));
            assert!(restore.to_string().contains("CopyCollection"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.open_sessions(), 0);
}

#[test]
fn failed_restore_delete_preserves_backup() {
    let ns = test_namespace();
    let original = numbered_documents(2);
    let store = seeded_store(&ns, original.clone());
    let faulty = FaultyConnector::new(store.clone());
    faulty.fail_on(StoreOp::BulkWrite, 1);
    faulty.fail_on(StoreOp::BulkWrite, 2);
    let handle = open(faulty);

    let err = Writer::new(&handle)
        .insert(numbered_from(10, 1), WriteOptions::default())
        .unwrap_err();

    assert_eq!(err.outcome(), Some(WriteOutcome::RestoreFailed));
    assert_eq!(contents(&store, &backup_namespace(&ns)), original);
}

#[test]
fn failed_discard_after_commit_reports_leftover_backup() {
    let ns = test_namespace();
    let store = seeded_store(&ns, numbered_documents(1));
    let faulty = FaultyConnector::new(store.clone());
    // Drop #1 clears any old backup during the snapshot; drop #2 is the discard.
    faulty.fail_on(StoreOp::DropCollection, 2);
    let handle = open(faulty);

    let report = Writer::new(&handle)
        .insert(numbered_from(10, 1), WriteOptions::default())
        .unwrap();

    assert_eq!(report.outcome, WriteOutcome::Committed);
    assert_eq!(report.backup, Some(backup_namespace(&ns)));
    assert_eq!(contents(&store, &ns).len(), 2);
}

#[test]
fn refused_session_touches_nothing() {
    let ns = test_namespace();
    let original = numbered_documents(2);
    let store = seeded_store(&ns, original.clone());
    let faulty = FaultyConnector::new(store.clone());
    let handle = open(faulty.clone());
    faulty.refuse_connections(true);

    let err = Writer::new(&handle)
        .insert(numbered_from(10, 1), WriteOptions::default())
        .unwrap_err();

    assert!(matches!(err, CoreError::Connection { .. }));
    assert_eq!(contents(&store, &ns), original);
    assert!(!store.has_collection(&backup_namespace(&ns)));
}

#[test]
fn leftover_backup_is_overwritten() {
    let ns = test_namespace();
    let store = seeded_store(&ns, numbered_documents(2));
    store
        .seed(&backup_namespace(&ns), numbered_from(50, 5))
        .unwrap();
    let handle = open(store.clone());

    Writer::new(&handle)
        .insert(numbered_from(10, 1), WriteOptions::new().preserve_backup(true))
        .unwrap();

    assert_eq!(contents(&store, &backup_namespace(&ns)), numbered_documents(2));
}

#[test]
fn empty_batch_goes_through_backup_lifecycle() {
    let ns = test_namespace();
    let store = seeded_store(&ns, numbered_documents(2));
    let faulty = FaultyConnector::new(store.clone());
    let handle = open(faulty.clone());

    let report = Writer::new(&handle)
        .write(Vec::<Document>::new(), WriteMode::Append, WriteOptions::default())
        .unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(faulty.calls(StoreOp::CopyCollection), 1);
    assert_eq!(faulty.calls(StoreOp::DropCollection), 2);
    assert_eq!(contents(&store, &ns).len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn snapshot_then_restore_is_identity(
        seed in identified_batch_strategy(1, 8),
        noise in batch_strategy(6),
    ) {
        let ns = test_namespace();
        let store = seeded_store(&ns, seed.clone());
        let mut session = store.connect(&test_credentials()).unwrap();
        let manager = BackupManager::new();

        let handle = manager.snapshot(&session, &ns).unwrap();
        let mut ops = vec![WriteOp::DeleteMany(Default::default())];
        ops.extend(noise.into_iter().map(WriteOp::InsertOne));
        session.bulk_write(&ns, ops).unwrap();
        manager.restore(&session, &handle).unwrap();
        session.close().unwrap();

        prop_assert_eq!(sorted_by_id(contents(&store, &ns)), sorted_by_id(seed));
    }

    #[test]
    fn failing_batch_leaves_collection_unchanged(
        existing in 1usize..5,
        batch in identified_batch_strategy(1000, 6),
        position in any::<prop::sample::Index>(),
    ) {
        let ns = test_namespace();
        let original = numbered_documents(existing);
        let store = seeded_store(&ns, original.clone());
        let handle = open(store.clone());

        let mut batch = batch;
        let at = position.index(batch.len() + 1);
        batch.insert(at, doc! { "_id" => 1, "v" => "dup" });

        let err = Writer::new(&handle).insert(batch, WriteOptions::default()).unwrap_err();
        prop_assert_eq!(err.outcome(), Some(WriteOutcome::Restored));
        prop_assert_eq!(sorted_by_id(contents(&store, &ns)), sorted_by_id(original));
        prop_assert!(!store.has_collection(&backup_namespace(&ns)));
    }

    #[test]
    fn append_yields_union(existing in 0usize..5, batch in batch_strategy(6)) {
        let ns = test_namespace();
        let original = numbered_documents(existing);
        let store = seeded_store(&ns, original.clone());
        let handle = open(store.clone());

        let report = Writer::new(&handle).insert(batch.clone(), WriteOptions::default()).unwrap();
        prop_assert_eq!(report.inserted, batch.len() as u64);

        let docs = contents(&store, &ns);
        prop_assert_eq!(&docs[..existing], &original[..]);
        prop_assert_eq!(strip_ids(&docs[existing..]), batch);
    }

    #[test]
    fn replace_all_yields_batch(
        existing in 0usize..5,
        batch in batch_strategy(6),
        preserve in any::<bool>(),
    ) {
        let ns = test_namespace();
        let original = numbered_documents(existing);
        let store = seeded_store(&ns, original.clone());
        let handle = open(store.clone());

        let options = WriteOptions::new().preserve_backup(preserve);
        let report = Writer::new(&handle).replace_all(batch.clone(), options).unwrap();

        prop_assert_eq!(strip_ids(&contents(&store, &ns)), batch);
        prop_assert_eq!(report.backup.is_some(), preserve);
        if preserve {
            prop_assert_eq!(contents(&store, &backup_namespace(&ns)), original);
        } else {
            prop_assert!(!store.has_collection(&backup_namespace(&ns)));
        }
        prop_assert_eq!(store.open_sessions(), 0);
    }
}
