//! Ownership and membership checks.
//!
//! Every lookup fails closed: a missing document and a document the requester
//! may not see both end the operation before anything is written.

use crate::database::models::{Board, BoardId, Card, CardId, List, ListId, UserId};
use crate::database::Store;

use super::{ServiceError, ServiceResult};

/// True when the user owns the board or the owner shared it with them.
pub fn can_access(user_id: UserId, board: &Board) -> bool {
    board.owner_id == user_id || board.authorized_user_ids.contains(&user_id)
}

/// Board for board-level reads. Inaccessible boards are reported as missing.
pub async fn visible_board(
    store: &dyn Store,
    user_id: UserId,
    board_id: BoardId,
) -> ServiceResult<Board> {
    match store.find_board(board_id).await? {
        Some(board) if can_access(user_id, &board) => Ok(board),
        _ => Err(ServiceError::not_found(format!("Board {} not found", board_id))),
    }
}

/// Board for owner-only changes (rename, sharing, delete).
pub async fn owned_board(
    store: &dyn Store,
    user_id: UserId,
    board_id: BoardId,
) -> ServiceResult<Board> {
    let board = visible_board(store, user_id, board_id).await?;
    if !board.is_owner(user_id) {
        return Err(ServiceError::forbidden(format!(
            "Only the owner may change board {}",
            board_id
        )));
    }
    Ok(board)
}

/// Board that owns a list or card being changed.
pub async fn accessible_board(
    store: &dyn Store,
    user_id: UserId,
    board_id: BoardId,
) -> ServiceResult<Board> {
    let board = store
        .find_board(board_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Board {} not found", board_id)))?;

    if !can_access(user_id, &board) {
        tracing::warn!(%user_id, %board_id, "board access denied");
        return Err(ServiceError::forbidden(format!(
            "Not authorized for board {}",
            board_id
        )));
    }
    Ok(board)
}

/// List that belongs to `board`.
pub async fn list_in_board(store: &dyn Store, board: &Board, list_id: ListId) -> ServiceResult<List> {
    match store.find_list(list_id).await? {
        Some(list) if list.board_id == board.id => Ok(list),
        _ => Err(ServiceError::not_found(format!(
            "List {} not found in board {}",
            list_id, board.id
        ))),
    }
}

/// Card that sits in `list`.
pub async fn card_in_list(store: &dyn Store, list: &List, card_id: CardId) -> ServiceResult<Card> {
    match store.find_card(card_id).await? {
        Some(card) if card.list_id == list.id => Ok(card),
        _ => Err(ServiceError::not_found(format!(
            "Card {} not found in list {}",
            card_id, list.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ChangeSet, MemoryStore};
    use uuid::Uuid;

    #[test]
    fn owner_and_authorized_users_can_access() {
        let owner = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let mut board = Board::new(owner, "Sprint".into());
        board.set_authorized_users(vec![friend]);

        assert!(can_access(owner, &board));
        assert!(can_access(friend, &board));
        assert!(!can_access(stranger, &board));
    }

    #[tokio::test]
    async fn inaccessible_board_is_hidden_for_reads_but_forbidden_for_writes() {
        let store = MemoryStore::new();
        let board = Board::new(Uuid::new_v4(), "Sprint".into());
        let board_id = board.id;
        store.apply(ChangeSet::new().put_board(board)).await.unwrap();
        let stranger = Uuid::new_v4();

        let read = visible_board(&store, stranger, board_id).await.unwrap_err();
        assert!(matches!(read, ServiceError::NotFound(_)));

        let write = accessible_board(&store, stranger, board_id).await.unwrap_err();
        assert!(matches!(write, ServiceError::Forbidden(_)));

        let missing = accessible_board(&store, stranger, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn shared_user_cannot_act_as_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let mut board = Board::new(owner, "Sprint".into());
        board.set_authorized_users(vec![friend]);
        let board_id = board.id;
        store.apply(ChangeSet::new().put_board(board)).await.unwrap();

        assert!(owned_board(&store, owner, board_id).await.is_ok());
        let err = owned_board(&store, friend, board_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn list_of_other_board_is_not_found() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let board = Board::new(owner, "A".into());
        let other = Board::new(owner, "B".into());
        let foreign_list = List::new(other.id, "Todo".into());
        let foreign_id = foreign_list.id;
        store
            .apply(ChangeSet::new().put_board(board.clone()).put_board(other).put_list(foreign_list))
            .await
            .unwrap();

        let err = list_in_board(&store, &board, foreign_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
