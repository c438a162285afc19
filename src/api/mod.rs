//! API layer - HTTP handlers and routing
//!
//! Every resource is served by the generic handlers in [`resources`]:
//! - `/platforms`, `/languages` (numeric ids on single-record reads)
//! - `/games`, `/ranks`, `/lobbies`
//! - `/health`

pub mod common;
pub mod error;
pub mod resources;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::repositories::SqlxRecordRepository;
use crate::db::DynDatabasePool;
use crate::models::{Game, Language, Lobby, Platform, Rank};
use crate::services::{IdGenerator, ListService, RecordService};

pub use error::ApiError;
use resources::IdEncoding;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub list_service: Arc<ListService>,
    pub record_service: Arc<RecordService>,
}

impl AppState {
    /// Wire the services onto one repository over `pool`
    pub fn new(pool: DynDatabasePool, ids: Arc<IdGenerator>) -> Self {
        let repo = SqlxRecordRepository::boxed(pool.clone());
        Self {
            pool,
            list_service: Arc::new(ListService::new(repo.clone())),
            record_service: Arc::new(RecordService::new(repo, ids)),
        }
    }
}

/// Build the main API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/platforms", resources::router::<Platform>(IdEncoding::Numeric))
        .nest("/languages", resources::router::<Language>(IdEncoding::Numeric))
        .nest("/games", resources::router::<Game>(IdEncoding::Safe))
        .nest("/ranks", resources::router::<Rank>(IdEncoding::Safe))
        .nest("/lobbies", resources::router::<Lobby>(IdEncoding::Safe))
        .route("/health", get(health))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .nest("/api/v1", build_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.pool.ping().await.map_err(|e| ApiError::internal(&e))?;
    Ok(Json(json!({ "status": "ok" })))
}
