// handlers/public/auth/sign_in.rs - POST /auth/sign-in handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Session;
use crate::state::AppState;

use super::Credentials;

/// POST /auth/sign-in - Exchange credentials for a JWT token (401 on mismatch)
pub async fn sign_in_post(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(credentials) = payload?;
    let session = state
        .accounts
        .sign_in(&credentials.username, &credentials.password)
        .await?;
    Ok(ApiResponse::success(session))
}
