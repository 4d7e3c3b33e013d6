//! End-to-end record lifecycle on the filesystem backend.

use planillas::mirror::DisabledMirror;
use planillas::model::SyncStatus;
use planillas::store::backend::StorageBackend;
use planillas::store::snapshot::SnapshotRef;
use planillas::store::{DoctorOptions, RecordStore, StoreOptions};
use planillas::test_utils::{payload, TestEnv};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_full_lifecycle_with_unreachable_mirror() {
    let env = TestEnv::new();
    env.mirror.set_failing(true);

    // Create with one attachment while the mirror is down.
    let a = env.store.store_upload("frente.png", b"front").unwrap().to_attachment();
    let created = env
        .store
        .create_record(payload(json!({"title": "A"})), vec![a.clone()])
        .await
        .unwrap();
    assert_eq!(created.sync_status, SyncStatus::Pending);
    assert_eq!(env.store.list_records().len(), 1);

    // An upstream sync confirms it.
    let acked = env
        .store
        .acknowledge_sync(&created.id, Some("R1".into()))
        .await
        .unwrap();
    assert_eq!(acked.sync_status, SyncStatus::Synced);
    assert_eq!(acked.remote_id.as_deref(), Some("R1"));

    // Update keeping A and adding C.
    let c = env.store.store_upload("dorso.jpg", b"back").unwrap().to_attachment();
    let keep_a = serde_json::to_value(&acked.images[0]).unwrap();
    let updated = env
        .store
        .update_record(
            &created.id,
            payload(json!({"title": "B", "images": [keep_a]})),
            vec![c.clone()],
        )
        .await
        .unwrap();
    let names: Vec<_> = updated.images.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, vec![a.filename.as_str(), c.filename.as_str()]);
    assert_eq!(updated.sync_status, SyncStatus::Error);
    assert_eq!(updated.remote_id.as_deref(), Some("R1"));

    let old = SnapshotRef::from_filename(&created.snapshot_filename).unwrap();
    let new = SnapshotRef::from_filename(&updated.snapshot_filename).unwrap();
    let backend = env.store.backend();
    assert!(!backend.snapshot_path(&old).exists());
    assert!(backend.snapshot_path(&new).exists());

    // The state survives a restart.
    let reopened = env.reopen();
    assert_eq!(reopened.get_record(&created.id).unwrap(), updated);

    // Delete removes files; the mirror failure is only reported.
    let report = env.store.delete_record(&created.id).await.unwrap();
    assert!(report.mirror_error.is_some());
    assert!(report.cleanup_warnings.is_empty());
    assert!(!backend.snapshot_path(&new).exists());
    assert!(!backend.attachment_exists(&a.filename));
    assert!(!backend.attachment_exists(&c.filename));
    assert!(env.store.list_records().is_empty());
}

#[tokio::test]
async fn test_snapshot_file_matches_record() {
    let env = TestEnv::new();
    let record = env
        .store
        .create_record(payload(json!({"b": 1, "a": 2})), vec![])
        .await
        .unwrap();

    let path = env
        .root
        .join("uploads")
        .join("planillas")
        .join(&record.snapshot_filename);
    let raw = fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["meta"], record.meta);
    assert!(raw.find("\"b\"").unwrap() < raw.find("\"a\"").unwrap());
    assert_eq!(
        record.snapshot_path,
        format!("/uploads/planillas/{}", record.snapshot_filename)
    );
}

#[tokio::test]
async fn test_disabled_mirror_keeps_records_pending() {
    let env = TestEnv::new();
    let store = RecordStore::open(
        TestEnv::backend_at(&env.root.join("other")),
        Arc::new(DisabledMirror),
        StoreOptions::default(),
    )
    .unwrap();

    let created = store.create_record(payload(json!({})), vec![]).await.unwrap();
    assert_eq!(created.sync_status, SyncStatus::Pending);
    let updated = store
        .update_record(&created.id, payload(json!({"x": 1})), vec![])
        .await
        .unwrap();
    assert_eq!(updated.sync_status, SyncStatus::Pending);
    assert!(store.delete_record(&created.id).await.unwrap().is_clean());
}

#[tokio::test]
async fn test_concurrent_creates_are_all_durable() {
    let env = TestEnv::new();
    let store = Arc::new(env.reopen());

    let mut tasks = Vec::new();
    for n in 0..16 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.create_record(payload(json!({"n": n})), vec![]).await.unwrap()
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let reopened = env.reopen();
    assert_eq!(reopened.list_records().len(), 16);
    assert_eq!(reopened.backend().list_snapshots().unwrap().len(), 16);
}

#[tokio::test]
async fn test_doctor_sweeps_snapshot_left_by_crash() {
    let env = TestEnv::new();
    let record = env
        .store
        .create_record(payload(json!({})), vec![])
        .await
        .unwrap();

    // A crash between snapshot write and index commit leaves this behind.
    let stray = env.root.join("uploads/planillas/planilla_1_00000000-0000-0000-0000-000000000000.json");
    fs::write(&stray, "{\"meta\":{},\"images\":[]}").unwrap();

    let report = env
        .store
        .doctor(&DoctorOptions {
            prune_attachments: false,
            grace: Duration::from_secs(60),
        })
        .unwrap();
    assert_eq!(report.removed_snapshots.len(), 1);
    assert!(!stray.exists());
    assert!(env
        .root
        .join("uploads/planillas")
        .join(&record.snapshot_filename)
        .exists());
}
