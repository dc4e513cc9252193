// handlers/protected/dashboard/mod.rs - /dashboard board, list and card routes

use serde::Deserialize;

use crate::database::models::ListId;

pub mod board;
pub mod card;
pub mod list;

pub use board::{board_delete, board_get, board_put, boards_get, boards_post};
pub use card::{card_delete, card_move, card_move_by_board, card_post, card_put};
pub use list::{list_delete, list_post, list_put};

/// Body of both move routes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub new_list_id: ListId,
}
