//! Generic CRUD handlers
//!
//! One set of handlers serves every resource; the resource type supplies
//! the table, sortable columns, list filters and accepted inputs.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, MethodRouter},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::common::ListQuery;
use super::error::ApiError;
use super::AppState;
use crate::models::validation::parse_id;
use crate::models::{filter_from_params, PaginatedEnvelope, Resource};
use crate::services::{serialize_bigint_as_number, serialize_bigint_safe};

/// How single records leave the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdEncoding {
    /// 64-bit integers above 2^53 become strings
    Safe,
    /// Integers stay JSON numbers; a value outside the safe range is a 500
    Numeric,
}

/// Build the router for one resource.
///
/// - `GET /` - paginated list
/// - `POST /` - create
/// - `GET /{id}` - fetch one
/// - `PUT /{id}` - partial update
/// - `DELETE /{id}` - delete (soft where supported)
pub fn router<R: Resource>(encoding: IdEncoding) -> Router<AppState> {
    let fetch: MethodRouter<AppState> = match encoding {
        IdEncoding::Safe => get(get_one::<R>),
        IdEncoding::Numeric => get(get_one_numeric::<R>),
    };

    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/{id}", fetch.put(update::<R>).delete(remove::<R>))
}

fn path_id(raw: &str) -> Result<i64, ApiError> {
    Ok(parse_id("id", raw)?)
}

/// GET / - list with pagination, sorting and equality filters
async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PaginatedEnvelope>, ApiError> {
    let filter = filter_from_params::<R>(&params)?;
    let envelope = state
        .list_service
        .find_all_paginated::<R>(&query.pagination(), filter, query.include_deleted())
        .await
        .map_err(|e| ApiError::internal(&e))?;
    Ok(Json(envelope))
}

async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.record_service.get::<R>(path_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": serialize_bigint_safe(&record) })))
}

/// GET /{id} for tables whose ids never leave the safe integer range
async fn get_one_numeric<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.record_service.get::<R>(path_id(&id)?).await?;
    let data = serialize_bigint_as_number(&record)?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    payload: Result<Json<R::Create>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(input) = payload?;
    let record = state.record_service.create::<R>(input).await?;
    tracing::debug!("Created {}", R::NAME);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": serialize_bigint_safe(&record) })),
    ))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<R::Update>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id)?;
    let Json(input) = payload?;
    let record = state.record_service.update::<R>(id, input).await?;
    Ok(Json(json!({ "success": true, "data": serialize_bigint_safe(&record) })))
}

async fn remove<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.record_service.delete::<R>(path_id(&id)?).await?;
    Ok(Json(json!({ "success": true })))
}
