//! Record HTTP Routes
//!
//! CRUD and bulk endpoints for every entity kind, nested under `/api`.
//!
//! - `POST` with an object creates one record, with an array runs a bulk create
//! - `{ids}` path segments take one id or a comma-separated set
//! - `PUT` and `POST` on a single id both update that record
//! - bulk responses are 200 when every item succeeded, 207 otherwise

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::errors::{ApiError, ApiResult};
use crate::bulk::{Applied, BulkOutcome, UpdateRequest};
use crate::error::ErrorKind;
use crate::library::Library;
use crate::records::EntityKind;
use crate::report::{ResultReporter, SingleReport};

#[derive(Debug, Serialize)]
pub struct NextIdResponse {
    pub kind: EntityKind,
    pub next: u64,
}

// ==================
// Record Routes
// ==================

/// Create record routes
pub fn record_routes(library: Arc<Library>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route(
            "/:kind",
            get(list_handler)
                .post(create_handler)
                .put(update_many_handler),
        )
        .route("/:kind/next-id", get(next_id_handler))
        .route(
            "/:kind/:ids",
            get(get_handler)
                .put(update_one_handler)
                .post(update_one_handler)
                .delete(delete_handler),
        )
        .route(
            "/:kind/book/:books",
            get(songs_by_books_handler).delete(delete_by_book_handler),
        )
        .with_state(library)
}

/// Liveness message, also served at `/`
pub async fn home_handler() -> impl IntoResponse {
    Json(json!({
        "message": "songlib API is live",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ==================
// Helper Functions
// ==================

fn parse_kind(library: &Library, raw: &str) -> ApiResult<EntityKind> {
    raw.parse::<EntityKind>()
        .map_err(|e| ApiError::from(e).reject(library.metrics()))
}

fn parse_ids(library: &Library, raw: &str) -> ApiResult<Vec<u64>> {
    raw.split(',')
        .map(|s| s.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::InvalidIds(raw.to_string()).reject(library.metrics()))
}

fn parse_id(library: &Library, raw: &str) -> ApiResult<u64> {
    match parse_ids(library, raw)?.as_slice() {
        [id] => Ok(*id),
        _ => Err(ApiError::InvalidIds(raw.to_string()).reject(library.metrics())),
    }
}

fn parse_body(library: &Library, body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::InvalidBody(e.body_text()).reject(library.metrics()))
}

fn settle(report: SingleReport) -> ApiResult<Value> {
    let (kind, details) = match report {
        SingleReport::Done(value) => return Ok(value),
        SingleReport::BadInput(details) => (ErrorKind::ValidationFailed, details),
        SingleReport::NotFound(details) => (ErrorKind::NotFound, details),
        SingleReport::Conflict(details) => (ErrorKind::DuplicateKey, details),
        SingleReport::Unavailable(details) => (ErrorKind::StorageUnavailable, details),
    };
    Err(ApiError::Rejected { kind, details })
}

fn bulk_response(outcome: &BulkOutcome) -> Response {
    let report = ResultReporter::bulk(outcome);
    let status = if report.is_partial() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };
    (status, Json(report)).into_response()
}

// ==================
// Read Handlers
// ==================

async fn list_handler(
    State(library): State<Arc<Library>>,
    Path(kind): Path<String>,
) -> ApiResult<Response> {
    let kind = parse_kind(&library, &kind)?;
    let records = library.list(kind)?;
    Ok(Json(ResultReporter::list(&records)).into_response())
}

async fn next_id_handler(
    State(library): State<Arc<Library>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<NextIdResponse>> {
    let kind = parse_kind(&library, &kind)?;
    let next = library.next_id(kind)?;
    Ok(Json(NextIdResponse { kind, next }))
}

async fn get_handler(
    State(library): State<Arc<Library>>,
    Path((kind, ids)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind = parse_kind(&library, &kind)?;
    match parse_ids(&library, &ids)?.as_slice() {
        [id] => Ok(Json(library.get_one(kind, *id)?.to_json()).into_response()),
        many => {
            let set: BTreeSet<u64> = many.iter().copied().collect();
            let records = library.get_many(kind, &set)?;
            Ok(Json(ResultReporter::list(&records)).into_response())
        }
    }
}

async fn songs_by_books_handler(
    State(library): State<Arc<Library>>,
    Path((kind, books)): Path<(String, String)>,
) -> ApiResult<Response> {
    if parse_kind(&library, &kind)? != EntityKind::Songs {
        return Err(ApiError::NotGrouped(kind));
    }
    let ids = parse_ids(&library, &books)?;
    let songs = library.songs_by_books(&ids)?;
    if songs.is_empty() {
        return Err(ApiError::NoSongs(books));
    }
    Ok(Json(ResultReporter::list(&songs)).into_response())
}

// ==================
// Write Handlers
// ==================

async fn create_handler(
    State(library): State<Arc<Library>>,
    Path(kind): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&library, &kind)?;
    match parse_body(&library, body)? {
        Value::Array(items) => Ok(bulk_response(&library.create_many(kind, items))),
        payload @ Value::Object(_) => {
            let result = library.create_one(kind, payload).map(Applied::Stored);
            let record = settle(ResultReporter::single(result))?;
            Ok((StatusCode::CREATED, Json(record)).into_response())
        }
        _ => Err(
            ApiError::InvalidBody("expected an object or an array of objects".to_string())
                .reject(library.metrics()),
        ),
    }
}

async fn update_one_handler(
    State(library): State<Arc<Library>>,
    Path((kind, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&library, &kind)?;
    let id = parse_id(&library, &id)?;
    let payload = parse_body(&library, body)?;

    let result = library.update_one(kind, id, payload).map(Applied::Stored);
    Ok(Json(settle(ResultReporter::single(result))?).into_response())
}

async fn update_many_handler(
    State(library): State<Arc<Library>>,
    Path(kind): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let kind = parse_kind(&library, &kind)?;
    let Value::Array(items) = parse_body(&library, body)? else {
        return Err(ApiError::InvalidBody("expected an array of objects".to_string())
            .reject(library.metrics()));
    };

    let requests = items
        .into_iter()
        .map(|item| UpdateRequest::from_payload(kind, item))
        .collect();
    Ok(bulk_response(&library.update_many(kind, requests)))
}

async fn delete_handler(
    State(library): State<Arc<Library>>,
    Path((kind, ids)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind = parse_kind(&library, &kind)?;
    match parse_ids(&library, &ids)?.as_slice() {
        [id] => {
            let id = *id;
            let result = library
                .delete_one(kind, id)
                .map(|_| Applied::Deleted { kind, id });
            Ok(Json(settle(ResultReporter::single(result))?).into_response())
        }
        many => Ok(bulk_response(&library.delete_many(kind, many.to_vec()))),
    }
}

async fn delete_by_book_handler(
    State(library): State<Arc<Library>>,
    Path((kind, book)): Path<(String, String)>,
) -> ApiResult<Response> {
    if parse_kind(&library, &kind)? != EntityKind::Songs {
        return Err(ApiError::NotGrouped(kind));
    }
    let book_id = parse_id(&library, &book)?;
    match library.delete_songs_by_book(book_id) {
        Ok(outcome) => Ok(bulk_response(&outcome)),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(ApiError::NoSongs(book)),
        Err(err) => Err(err.into()),
    }
}
