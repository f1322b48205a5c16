//! Authenticated photo management. Every handler takes [`AuthUser`], so an
//! invalid token is rejected before the body is read.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use domains::{Paginated, PageRequest, Photo, PhotoHistoryEntry, ValidationErrors};
use serde_json::Value;
use services::{ListParams, PhotoInput, ReorderOutcome};

use super::list_params;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::AppState;
use crate::upload::read_photo_form;

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Create and update accept either a multipart form or a JSON object.
async fn photo_input(state: &AppState, request: Request) -> Result<PhotoInput, ApiError> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, state).await?;
        return read_photo_form(multipart, &state.upload).await;
    }
    let Json(body) = Json::<Value>::from_request(request, state).await?;
    match body {
        Value::Object(fields) => Ok(PhotoInput {
            fields,
            ..PhotoInput::default()
        }),
        _ => Err(ValidationErrors::single("body", "expected a JSON object").into()),
    }
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Paginated<Photo>>, ApiError> {
    Ok(Json(state.photos.list(&list_params(query)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    request: Request,
) -> Result<(StatusCode, Json<Photo>), ApiError> {
    let input = photo_input(&state, request).await?;
    let photo = state.photos.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Photo>, ApiError> {
    let input = photo_input(&state, request).await?;
    Ok(Json(state.photos.update(&principal, &id, input).await?))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Photo>, ApiError> {
    let Json(body) = body?;
    Ok(Json(state.photos.set_visibility(&principal, &id, &body).await?))
}

pub async fn set_featured(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Photo>, ApiError> {
    let Json(body) = body?;
    Ok(Json(state.photos.set_featured(&principal, &id, &body).await?))
}

pub async fn set_archived(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Photo>, ApiError> {
    let Json(body) = body?;
    Ok(Json(state.photos.set_archived(&principal, &id, &body).await?))
}

pub async fn reorder(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReorderOutcome>, ApiError> {
    let Json(body) = body?;
    Ok(Json(state.photos.reorder(&principal, &body).await?))
}

pub async fn history(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Paginated<PhotoHistoryEntry>>, ApiError> {
    let params = list_params(query);
    let page = PageRequest::history(params.page.as_deref(), params.limit.as_deref());
    Ok(Json(state.photos.history(&id, page).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn with_type(ct: &'static str) -> Request {
        Request::builder()
            .header(CONTENT_TYPE, ct)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn multipart_detection() {
        assert!(is_multipart(&with_type("multipart/form-data; boundary=x")));
        assert!(is_multipart(&with_type("Multipart/Form-Data; boundary=x")));
        assert!(!is_multipart(&with_type("application/json")));
        assert!(!is_multipart(&Request::new(Body::empty())));
    }
}
