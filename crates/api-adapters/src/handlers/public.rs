use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use domains::{Paginated, Photo};
use services::{ListParams, VisitOutcome};

use super::list_params;
use crate::error::ApiError;
use crate::extract::ClientIp;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Paginated<Photo>>, ApiError> {
    let page = state.gallery.list(&list_params(query)).await?;
    Ok(Json(page))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Photo>, ApiError> {
    Ok(Json(state.gallery.detail(&id).await?))
}

pub async fn visit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ClientIp(ip): ClientIp,
) -> Result<Json<VisitOutcome>, ApiError> {
    let outcome = state.gallery.visit(&id, &ip).await?;
    if outcome.visits_incremented {
        state.metrics.record_visit();
    }
    Ok(Json(outcome))
}
