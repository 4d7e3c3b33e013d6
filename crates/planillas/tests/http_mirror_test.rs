use planillas::mirror::http::HttpMirror;
use planillas::mirror::{MirrorDocument, MirrorError, RemoteMirror};
use planillas::model::SyncStatus;
use planillas::store::mem_backend::MemBackend;
use planillas::store::{RecordStore, StoreOptions};
use planillas::test_utils::payload;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn document() -> MirrorDocument {
    serde_json::from_value(json!({
        "id": "7d0bb3a1-1c8e-4a7f-9b6e-2a4b8f1f0c11",
        "filename": "planilla_1_7d0bb3a1-1c8e-4a7f-9b6e-2a4b8f1f0c11.json",
        "filePath": "/uploads/planillas/planilla_1_7d0bb3a1-1c8e-4a7f-9b6e-2a4b8f1f0c11.json",
        "createdAt": "2024-03-01T12:00:00Z",
        "updatedAt": "2024-03-01T12:00:00Z",
        "images": [],
        "meta": {"title": "A"}
    }))
    .unwrap()
}

fn client(server: &MockServer, token: Option<&str>) -> HttpMirror {
    HttpMirror::new(
        &server.uri(),
        "planillas",
        token.map(str::to_string),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_posts_document_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/planillas"))
        .and(header("authorization", "Bearer s3cret"))
        .and(body_partial_json(json!({"meta": {"title": "A"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "remote-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let remote_id = client(&server, Some("s3cret")).create(&document()).await.unwrap();
    assert_eq!(remote_id, "remote-1");
}

#[tokio::test]
async fn test_create_without_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let err = client(&server, None).create(&document()).await.unwrap_err();
    assert!(matches!(err, MirrorError::Malformed(_)));
}

#[tokio::test]
async fn test_update_patches_document() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/planillas/remote-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, None).update("remote-1", &document()).await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .update("remote-1", &document())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        MirrorError::Rejected {
            status: 503,
            body: "maintenance".to_string()
        }
    );
}

#[tokio::test]
async fn test_delete_of_missing_document_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/planillas/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client(&server, None).delete("gone").await.unwrap();
}

#[tokio::test]
async fn test_unreachable_mirror_is_transport_error() {
    let mirror = HttpMirror::new(
        "http://127.0.0.1:9",
        "planillas",
        None,
        Duration::from_millis(500),
    )
    .unwrap();
    let err = mirror.delete("x").await.unwrap_err();
    assert!(matches!(err, MirrorError::Transport(_)));
}

#[tokio::test]
async fn test_slow_mirror_leaves_record_pending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let store = RecordStore::open(
        MemBackend::new(),
        Arc::new(client(&server, None)),
        StoreOptions {
            mirror_timeout: Duration::from_millis(100),
            ..Default::default()
        },
    )
    .unwrap();

    let record = store.create_record(payload(json!({})), vec![]).await.unwrap();
    assert_eq!(record.sync_status, SyncStatus::Pending);
    assert!(record.remote_id.is_none());
}

#[tokio::test]
async fn test_store_mirrors_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "projects/p/documents/planillas/abc"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/planillas/abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = RecordStore::open(
        MemBackend::new(),
        Arc::new(client(&server, None)),
        StoreOptions::default(),
    )
    .unwrap();

    let record = store.create_record(payload(json!({})), vec![]).await.unwrap();
    assert_eq!(record.remote_id.as_deref(), Some("abc"));
    let report = store.delete_record(&record.id).await.unwrap();
    assert!(report.is_clean());
}
