//! # HTTP Server Module
//!
//! JSON API over the record library, built on Axum.
//!
//! # Endpoints
//!
//! - `/` and `/api` - Liveness message
//! - `/health` - Health check
//! - `/api/{kind}` - List, create, bulk update
//! - `/api/{kind}/{ids}` - Read, update, delete one id or a comma-separated set
//! - `/api/{kind}/next-id` - Next id without consuming it
//! - `/api/songs/book/{books}` - Songs grouped by book
//! - `/observability/*` - Metrics and counters

pub mod config;
pub mod errors;
pub mod observability_routes;
pub mod record_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::HttpServer;
