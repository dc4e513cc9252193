// handlers/protected/dashboard/list.rs - lists under /dashboard/:boardId

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{BoardId, List, ListId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewList {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListUpdate {
    pub name: Option<String>,
}

/// POST /dashboard/:boardId - Append a list to the board
pub async fn list_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<BoardId>, PathRejection>,
    payload: Result<Json<NewList>, JsonRejection>,
) -> ApiResult<List> {
    let Path(board_id) = path?;
    let Json(body) = payload?;
    let list = state.boards.create_list(auth.user_id, board_id, &body.name).await?;
    Ok(ApiResponse::created(list))
}

/// PUT /dashboard/:boardId/:listId
pub async fn list_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, ListId)>, PathRejection>,
    payload: Result<Json<ListUpdate>, JsonRejection>,
) -> ApiResult<List> {
    let Path((board_id, list_id)) = path?;
    let Json(body) = payload?;
    let list = state
        .boards
        .update_list(auth.user_id, board_id, list_id, body.name)
        .await?;
    Ok(ApiResponse::success(list))
}

/// DELETE /dashboard/:boardId/:listId - Delete the list and its cards
pub async fn list_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, ListId)>, PathRejection>,
) -> ApiResult<()> {
    let Path((board_id, list_id)) = path?;
    state.boards.delete_list(auth.user_id, board_id, list_id).await?;
    Ok(ApiResponse::no_content())
}
