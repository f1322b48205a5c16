use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use services::{LoginRequest, LoginResult};

use crate::error::ApiError;
use crate::extract::{AuthUser, ClientIp};
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    client: ClientIp,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResult>, ApiError> {
    let Json(req) = body?;
    // The captcha provider gains nothing from a placeholder address.
    let remote_ip = client.ip().filter(|ip| !ip.is_unspecified());
    let result = state.auth.login(req, remote_ip).await?;
    Ok(Json(result))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = state.auth.me(&principal).await?;
    Ok(Json(json!({ "user": user })))
}
