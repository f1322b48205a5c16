//! Request handlers, grouped by audience.

pub mod admin;
pub mod auth;
pub mod public;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use domains::DomainError;
use serde_json::{json, Value};
use services::ListParams;

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn export_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| DomainError::Internal(format!("metrics encoding failed: {e}")))?;
    Ok(([(header::CONTENT_TYPE, metrics::CONTENT_TYPE)], body))
}

/// Undecodable query strings fall back to defaults rather than failing.
pub(crate) fn list_params(query: Result<Query<ListParams>, QueryRejection>) -> ListParams {
    query.map(|Query(params)| params).unwrap_or_default()
}
