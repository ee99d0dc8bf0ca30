//! HTTP API Tests
//!
//! Drives the full router in-process:
//! - status mapping (201, 207, 400, 404, 409)
//! - single and comma-separated id paths
//! - bulk reports and the `{error, code, kind}` error body
//! - songs grouped by book

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use songlib::http_server::{HttpServer, HttpServerConfig};
use songlib::records::{StoreError, StoreResult};
use songlib::sequence::CounterStore;
use songlib::Library;
use tower::ServiceExt;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_test_app() -> Router {
    HttpServer::with_config(HttpServerConfig::default(), Arc::new(Library::in_memory())).router()
}

/// Counter store whose backend is gone
struct DownCounters;

impl CounterStore for DownCounters {
    fn increment_and_fetch(&self, _key: &str) -> StoreResult<u64> {
        Err(StoreError::Unavailable("counter backend down".to_string()))
    }

    fn current(&self, _key: &str) -> StoreResult<u64> {
        Err(StoreError::Unavailable("counter backend down".to_string()))
    }

    fn raise_to(&self, _key: &str, _floor: u64) -> StoreResult<u64> {
        Err(StoreError::Unavailable("counter backend down".to_string()))
    }

    fn snapshot(&self) -> StoreResult<Vec<(String, u64)>> {
        Err(StoreError::Unavailable("counter backend down".to_string()))
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn seed_songs(app: &Router, songs: Value) {
    let (status, _) = send(app, "POST", "/api/songs", Some(songs)).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Liveness Tests
// =============================================================================

#[tokio::test]
async fn test_health_and_home() {
    let app = setup_test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("live"));

    let (status, _) = send(&app, "GET", "/api", None).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Single Record Tests
// =============================================================================

/// Object body creates one record with 201.
#[tokio::test]
async fn test_create_and_fetch_one() {
    let app = setup_test_app();

    let song = json!({"title": "Abide With Me"});
    let (status, body) = send(&app, "POST", "/api/songs", Some(song)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["songId"], 1);
    assert_eq!(body["views"], 0);
    assert!(body["created"].is_string());

    let (status, body) = send(&app, "GET", "/api/songs/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Abide With Me");

    let (status, body) = send(&app, "GET", "/api/songs/next-id", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"kind": "songs", "next": 2}));
}

/// Duplicate natural key is 409 with the error body.
#[tokio::test]
async fn test_duplicate_is_conflict() {
    let app = setup_test_app();
    send(&app, "POST", "/api/users", Some(json!({"username": "jo"}))).await;

    let (status, body) = send(&app, "POST", "/api/users", Some(json!({"username": "jo"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
    assert_eq!(body["kind"], "DUPLICATE_KEY");
    assert!(body["error"].as_str().unwrap().contains("username"));
}

/// Changing the id on update is 400; other fields update.
#[tokio::test]
async fn test_update_one() {
    let app = setup_test_app();
    send(&app, "POST", "/api/books", Some(json!({"title": "Hymns", "subTitle": "Old"}))).await;

    let (status, body) = send(&app, "PUT", "/api/books/1", Some(json!({"bookId": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION_FAILED");

    let (status, body) = send(&app, "PUT", "/api/books/1", Some(json!({"subTitle": "New"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookId"], 1);
    assert_eq!(body["subTitle"], "New");

    let (status, _) = send(&app, "PUT", "/api/books/5", Some(json!({"subTitle": "X"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// POST on a single id updates like PUT.
#[tokio::test]
async fn test_post_to_id_updates() {
    let app = setup_test_app();
    let (status, _) = send(&app, "POST", "/api/drafts", Some(json!({"title": "Sketch"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send(&app, "POST", "/api/drafts/1", Some(json!({"alias": "first pass"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draftId"], 1);
    assert_eq!(body["title"], "Sketch");
    assert_eq!(body["alias"], "first pass");

    let (status, _) = send(&app, "POST", "/api/drafts/9", Some(json!({"alias": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/drafts", None).await;
    assert_eq!(body["count"], 1);
}

/// Delete of a missing id is 404; a present id returns a receipt.
#[tokio::test]
async fn test_delete_one() {
    let app = setup_test_app();
    send(&app, "POST", "/api/listings", Some(json!({"title": "Sunday"}))).await;

    let (status, body) = send(&app, "DELETE", "/api/listings/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Listing 9 not found");

    let (status, body) = send(&app, "DELETE", "/api/listings/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"listingId": 1, "deleted": true}));
}

// =============================================================================
// Bulk Tests
// =============================================================================

/// Array body with a duplicate is 207 with the failing index.
#[tokio::test]
async fn test_bulk_create_partial() {
    let app = setup_test_app();
    seed_songs(&app, json!([{"title": "A"}, {"title": "B"}])).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/songs",
        Some(json!([{"title": "C"}, {"title": "A"}])),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["data"][0]["songId"], 3);
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["errors"][0]["error"], "DUPLICATE_KEY");

    let (_, body) = send(&app, "GET", "/api/songs/next-id", None).await;
    assert_eq!(body["next"], 4);
}

/// Comma-separated ids read and delete as sets.
#[tokio::test]
async fn test_id_sets() {
    let app = setup_test_app();
    seed_songs(&app, json!([{"title": "A"}, {"title": "B"}, {"title": "C"}])).await;

    let (status, body) = send(&app, "GET", "/api/songs/3,1,42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["songId"], 1);

    let (status, body) = send(&app, "DELETE", "/api/songs/2,42", None).await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["operation"], "delete");
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["errors"][0]["error"], "NOT_FOUND");

    let (_, body) = send(&app, "GET", "/api/songs", None).await;
    assert_eq!(body["count"], 2);
}

/// PUT on the collection runs a bulk update keyed by the id field.
#[tokio::test]
async fn test_bulk_update() {
    let app = setup_test_app();
    seed_songs(&app, json!([{"title": "A"}, {"title": "B"}])).await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/songs",
        Some(json!([{"songId": 1, "likes": 4}, {"songId": 2, "views": 10}])),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complete");
    assert_eq!(body["data"][0]["likes"], 4);
    assert_eq!(body["data"][1]["views"], 10);
}

// =============================================================================
// Songs by Book Tests
// =============================================================================

#[tokio::test]
async fn test_songs_by_book() {
    let app = setup_test_app();

    let (status, _) = send(&app, "GET", "/api/songs/book/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed_songs(
        &app,
        json!([
            {"title": "A", "book": 3},
            {"title": "B", "book": 4},
            {"title": "C", "book": 3}
        ]),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/songs/book/3,4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = send(&app, "DELETE", "/api/songs/book/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 2);

    let (status, _) = send(&app, "GET", "/api/books/book/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[tokio::test]
async fn test_malformed_requests() {
    let app = setup_test_app();

    let (status, body) = send(&app, "GET", "/api/albums", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("albums"));

    let (status, _) = send(&app, "GET", "/api/songs/one", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/songs", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION_FAILED");

    let (status, _) = send(&app, "POST", "/api/songs", Some(json!("just a string"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, metrics) = send(&app, "GET", "/observability/metrics", None).await;
    assert_eq!(metrics["requests_rejected"], 4);
}

#[tokio::test]
async fn test_metrics_track_writes() {
    let app = setup_test_app();
    seed_songs(&app, json!([{"title": "A"}, {"title": "B"}])).await;
    send(&app, "DELETE", "/api/songs/1", None).await;

    let (status, body) = send(&app, "GET", "/observability/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records_created"], 2);
    assert_eq!(body["records_deleted"], 1);
    assert_eq!(body["bulk_batches"], 1);

    let (_, body) = send(&app, "GET", "/observability/counters", None).await;
    assert_eq!(body["counters"][0], json!({"kind": "songs", "seq": 2}));
}

#[tokio::test]
async fn test_counter_failure_uses_error_body() {
    let library = Library::new(Arc::new(DownCounters), Vec::new());
    let app = HttpServer::with_config(HttpServerConfig::default(), Arc::new(library)).router();

    let (status, body) = send(&app, "GET", "/observability/counters", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["kind"], "STORAGE_UNAVAILABLE");
    assert_eq!(body["error"], "Storage unavailable: counter backend down");

    let (status, body) = send(&app, "GET", "/api/songs/next-id", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "STORAGE_UNAVAILABLE");
}
