// handlers/public/auth/sign_up.rs - POST /auth/sign-up handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Session;
use crate::state::AppState;

use super::Credentials;

/**
 * POST /auth/sign-up - Create an account and receive a JWT token
 *
 * Expected Input:
 * ```json
 * { "username": "alice", "password": "at least 8 chars" }
 * ```
 *
 * Responds 201 with `{ token, user }`, 400 on invalid input and 409 when the
 * username is taken.
 */
pub async fn sign_up_post(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(credentials) = payload?;
    let session = state
        .accounts
        .sign_up(&credentials.username, &credentials.password)
        .await?;
    Ok(ApiResponse::created(session))
}
