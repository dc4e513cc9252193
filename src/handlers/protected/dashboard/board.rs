// handlers/protected/dashboard/board.rs - /dashboard and /dashboard/:boardId

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{Board, BoardId, UserId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{BoardDetail, BoardUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoard {
    pub name: String,
    #[serde(default)]
    pub authorized_user_ids: Vec<UserId>,
}

/// GET /dashboard - Boards owned by or shared with the requester
pub async fn boards_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<Board>> {
    let boards = state.boards.list_boards(auth.user_id).await?;
    Ok(ApiResponse::success(boards))
}

/// POST /dashboard - Create a board owned by the requester
pub async fn boards_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<NewBoard>, JsonRejection>,
) -> ApiResult<Board> {
    let Json(body) = payload?;
    let board = state
        .boards
        .create_board(auth.user_id, &body.name, body.authorized_user_ids)
        .await?;
    Ok(ApiResponse::created(board))
}

/// GET /dashboard/:boardId - Board with its lists and cards
pub async fn board_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<BoardId>, PathRejection>,
) -> ApiResult<BoardDetail> {
    let Path(board_id) = path?;
    let detail = state.boards.get_board(auth.user_id, board_id).await?;
    Ok(ApiResponse::success(detail))
}

/// PUT /dashboard/:boardId - Rename or re-share (owner only)
pub async fn board_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<BoardId>, PathRejection>,
    payload: Result<Json<BoardUpdate>, JsonRejection>,
) -> ApiResult<Board> {
    let Path(board_id) = path?;
    let Json(update) = payload?;
    let board = state.boards.update_board(auth.user_id, board_id, update).await?;
    Ok(ApiResponse::success(board))
}

/// DELETE /dashboard/:boardId - Delete the board with its lists and cards (owner only)
pub async fn board_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<BoardId>, PathRejection>,
) -> ApiResult<()> {
    let Path(board_id) = path?;
    state.boards.delete_board(auth.user_id, board_id).await?;
    Ok(ApiResponse::no_content())
}
