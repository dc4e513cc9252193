// handlers/protected/users/whoami.rs - GET /users/me handler

use axum::{extract::State, Extension};

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /users/me - The account behind the bearer token
pub async fn whoami_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<User> {
    let user = state.accounts.current_user(auth.user_id).await?;
    Ok(ApiResponse::success(user))
}
