// handlers/protected/dashboard/card.rs - cards under /dashboard/:boardId/:listId

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};

use crate::database::models::{BoardId, Card, CardId, ListId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{CardDraft, CardUpdate};
use crate::state::AppState;

use super::MoveRequest;

/// POST /dashboard/:boardId/:listId - Append a card to the list
pub async fn card_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, ListId)>, PathRejection>,
    payload: Result<Json<CardDraft>, JsonRejection>,
) -> ApiResult<Card> {
    let Path((board_id, list_id)) = path?;
    let Json(draft) = payload?;
    let card = state
        .boards
        .create_card(auth.user_id, board_id, list_id, draft)
        .await?;
    Ok(ApiResponse::created(card))
}

/// PUT /dashboard/:boardId/:listId/:cardId - Edit fields; `listId` in the body is ignored
pub async fn card_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, ListId, CardId)>, PathRejection>,
    payload: Result<Json<CardUpdate>, JsonRejection>,
) -> ApiResult<Card> {
    let Path((board_id, list_id, card_id)) = path?;
    let Json(update) = payload?;
    let card = state
        .boards
        .update_card(auth.user_id, board_id, list_id, card_id, update)
        .await?;
    Ok(ApiResponse::success(card))
}

/// PUT /dashboard/:boardId/:listId/:cardId/move - Move a card out of `listId`
pub async fn card_move(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, ListId, CardId)>, PathRejection>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<Card> {
    let Path((board_id, list_id, card_id)) = path?;
    let Json(body) = payload?;
    let card = state
        .boards
        .move_card(auth.user_id, board_id, card_id, body.new_list_id, Some(list_id))
        .await?;
    Ok(ApiResponse::success(card))
}

/// PUT /dashboard/cards/:boardId/move/:cardId - Move a card from wherever it is on the board
pub async fn card_move_by_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, CardId)>, PathRejection>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<Card> {
    let Path((board_id, card_id)) = path?;
    let Json(body) = payload?;
    let card = state
        .boards
        .move_card(auth.user_id, board_id, card_id, body.new_list_id, None)
        .await?;
    Ok(ApiResponse::success(card))
}

/// DELETE /dashboard/:boardId/:listId/:cardId
pub async fn card_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<(BoardId, ListId, CardId)>, PathRejection>,
) -> ApiResult<()> {
    let Path((board_id, list_id, card_id)) = path?;
    state
        .boards
        .delete_card(auth.user_id, board_id, list_id, card_id)
        .await?;
    Ok(ApiResponse::no_content())
}
