//! Board / list / card operations that keep both directions of every
//! reference consistent: `board.list_ids` against `list.board_id` and
//! `list.card_ids` against `card.list_id`.
//!
//! Each operation validates first and then hands the complete set of changed
//! documents to [`Store::apply`], so a failure leaves nothing half written.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::models::{Board, BoardId, Card, CardId, List, ListId, UserId};
use crate::database::{ChangeSet, Store, StoreError};

use super::access::{
    accessible_board, can_access, card_in_list, list_in_board, owned_board, visible_board,
};
use super::{require_name, ServiceError, ServiceResult};

/// Partial board update. `ownerId` and `listIds` are not accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate {
    pub name: Option<String>,
    pub authorized_user_ids: Option<Vec<UserId>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
}

/// Partial card update. An explicit `null` clears `description`/`assignedTo`;
/// a missing field leaves it alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to: Option<Option<UserId>>,
}

fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDetail {
    #[serde(flatten)]
    pub list: List,
    pub cards: Vec<Card>,
}

/// A board with its lists and their cards, in display order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<ListDetail>,
}

/// Orders `docs` by their position in `order`; ids missing from it go last.
fn in_order<T>(mut docs: Vec<T>, order: &[uuid::Uuid], id: impl Fn(&T) -> uuid::Uuid) -> Vec<T> {
    let rank: HashMap<_, _> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    docs.sort_by_key(|doc| rank.get(&id(doc)).copied().unwrap_or(usize::MAX));
    docs
}

/// Appends that lose a revision race are re-read and retried this many times
/// in total before the conflict reaches the caller.
const APPEND_ATTEMPTS: u32 = 3;

fn lost_append_race(result: &ServiceResult<impl Sized>) -> bool {
    matches!(result, Err(ServiceError::Store(StoreError::Conflict { .. })))
}

#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn Store>,
}

impl BoardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Every user id must exist; used for sharing and assignment.
    async fn require_users(&self, user_ids: &[UserId]) -> ServiceResult<()> {
        for user_id in user_ids {
            if self.store().find_user(*user_id).await?.is_none() {
                return Err(ServiceError::validation(format!("Unknown user {}", user_id)));
            }
        }
        Ok(())
    }

    pub async fn list_boards(&self, user_id: UserId) -> ServiceResult<Vec<Board>> {
        Ok(self.store().boards_for_user(user_id).await?)
    }

    pub async fn create_board(
        &self,
        user_id: UserId,
        name: &str,
        authorized_user_ids: Vec<UserId>,
    ) -> ServiceResult<Board> {
        let name = require_name("Board", name)?;
        self.require_users(&authorized_user_ids).await?;

        let mut board = Board::new(user_id, name);
        board.set_authorized_users(authorized_user_ids);
        let board_id = board.id;

        let mut committed = self.store().apply(ChangeSet::new().put_board(board)).await?;
        tracing::info!(%user_id, %board_id, "board created");
        Ok(committed.take_board(board_id)?)
    }

    /// The board, its lists and their cards are separate reads, so a move
    /// landing in between can show a card in neither or both of its lists.
    /// Clients refetch after a 409 or a move of their own.
    pub async fn get_board(&self, user_id: UserId, board_id: BoardId) -> ServiceResult<BoardDetail> {
        let board = visible_board(self.store(), user_id, board_id).await?;

        let lists = self.store().lists_for_board(board.id).await?;
        let list_ids: Vec<ListId> = lists.iter().map(|l| l.id).collect();
        let mut cards_by_list: HashMap<ListId, Vec<Card>> = HashMap::new();
        for card in self.store().cards_for_lists(&list_ids).await? {
            cards_by_list.entry(card.list_id).or_default().push(card);
        }

        let lists = in_order(lists, &board.list_ids, |l| l.id)
            .into_iter()
            .map(|list| {
                let cards = cards_by_list.remove(&list.id).unwrap_or_default();
                let cards = in_order(cards, &list.card_ids, |c| c.id);
                ListDetail { list, cards }
            })
            .collect();

        Ok(BoardDetail { board, lists })
    }

    pub async fn update_board(
        &self,
        user_id: UserId,
        board_id: BoardId,
        update: BoardUpdate,
    ) -> ServiceResult<Board> {
        let mut board = owned_board(self.store(), user_id, board_id).await?;

        if let Some(name) = update.name {
            board.rename(require_name("Board", &name)?);
        }
        if let Some(authorized) = update.authorized_user_ids {
            self.require_users(&authorized).await?;
            board.set_authorized_users(authorized);
        }

        let mut committed = self.store().apply(ChangeSet::new().put_board(board)).await?;
        tracing::info!(%user_id, %board_id, "board updated");
        Ok(committed.take_board(board_id)?)
    }

    /// Deletes the board together with its lists and their cards.
    pub async fn delete_board(&self, user_id: UserId, board_id: BoardId) -> ServiceResult<()> {
        let board = owned_board(self.store(), user_id, board_id).await?;

        let lists = self.store().lists_for_board(board.id).await?;
        let list_ids: Vec<ListId> = lists.iter().map(|l| l.id).collect();
        let cards = self.store().cards_for_lists(&list_ids).await?;

        let mut changes = ChangeSet::new();
        for card in &cards {
            changes = changes.delete_card(card);
        }
        for list in &lists {
            changes = changes.delete_list(list);
        }
        changes = changes.delete_board(&board);

        self.store().apply(changes).await?;
        tracing::info!(
            %user_id,
            %board_id,
            lists = lists.len(),
            cards = cards.len(),
            "board deleted"
        );
        Ok(())
    }

    pub async fn create_list(
        &self,
        user_id: UserId,
        board_id: BoardId,
        name: &str,
    ) -> ServiceResult<List> {
        let mut attempt = 1;
        loop {
            let result = self.append_list(user_id, board_id, name).await;
            if attempt < APPEND_ATTEMPTS && lost_append_race(&result) {
                tracing::debug!(%board_id, attempt, "list append raced, retrying");
                attempt += 1;
                continue;
            }
            return result;
        }
    }

    async fn append_list(
        &self,
        user_id: UserId,
        board_id: BoardId,
        name: &str,
    ) -> ServiceResult<List> {
        let mut board = accessible_board(self.store(), user_id, board_id).await?;
        let name = require_name("List", name)?;

        let list = List::new(board.id, name);
        let list_id = list.id;
        board.attach_list(list_id);

        let mut committed = self
            .store()
            .apply(ChangeSet::new().put_board(board).put_list(list))
            .await?;
        tracing::info!(%user_id, %board_id, %list_id, "list created");
        Ok(committed.take_list(list_id)?)
    }

    pub async fn update_list(
        &self,
        user_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        name: Option<String>,
    ) -> ServiceResult<List> {
        let board = accessible_board(self.store(), user_id, board_id).await?;
        let mut list = list_in_board(self.store(), &board, list_id).await?;

        if let Some(name) = name {
            list.rename(require_name("List", &name)?);
        }

        let mut committed = self.store().apply(ChangeSet::new().put_list(list)).await?;
        Ok(committed.take_list(list_id)?)
    }

    /// Deletes the list and its cards and drops it from the board.
    pub async fn delete_list(
        &self,
        user_id: UserId,
        board_id: BoardId,
        list_id: ListId,
    ) -> ServiceResult<()> {
        let mut board = accessible_board(self.store(), user_id, board_id).await?;
        let list = list_in_board(self.store(), &board, list_id).await?;
        let cards = self.store().cards_for_lists(&[list.id]).await?;

        board.detach_list(list.id);
        let mut changes = ChangeSet::new().put_board(board);
        for card in &cards {
            changes = changes.delete_card(card);
        }
        changes = changes.delete_list(&list);

        self.store().apply(changes).await?;
        tracing::info!(%user_id, %board_id, %list_id, cards = cards.len(), "list deleted");
        Ok(())
    }

    pub async fn create_card(
        &self,
        user_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        draft: CardDraft,
    ) -> ServiceResult<Card> {
        let mut attempt = 1;
        loop {
            let result = self.append_card(user_id, board_id, list_id, &draft).await;
            if attempt < APPEND_ATTEMPTS && lost_append_race(&result) {
                tracing::debug!(%list_id, attempt, "card append raced, retrying");
                attempt += 1;
                continue;
            }
            return result;
        }
    }

    async fn append_card(
        &self,
        user_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        draft: &CardDraft,
    ) -> ServiceResult<Card> {
        let board = accessible_board(self.store(), user_id, board_id).await?;
        let mut list = list_in_board(self.store(), &board, list_id).await?;
        let name = require_name("Card", &draft.name)?;
        if let Some(assignee) = draft.assigned_to {
            require_assignable(&board, assignee)?;
        }

        let mut card = Card::new(list.id, name);
        card.description = draft.description.clone();
        card.assigned_to = draft.assigned_to;
        let card_id = card.id;
        list.push_card(card_id);

        let mut committed = self
            .store()
            .apply(ChangeSet::new().put_list(list).put_card(card))
            .await?;
        tracing::info!(%user_id, %board_id, %list_id, %card_id, "card created");
        Ok(committed.take_card(card_id)?)
    }

    pub async fn update_card(
        &self,
        user_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        card_id: CardId,
        update: CardUpdate,
    ) -> ServiceResult<Card> {
        let board = accessible_board(self.store(), user_id, board_id).await?;
        let list = list_in_board(self.store(), &board, list_id).await?;
        let mut card = card_in_list(self.store(), &list, card_id).await?;

        if let Some(name) = update.name {
            card.name = require_name("Card", &name)?;
        }
        if let Some(description) = update.description {
            card.description = description;
        }
        if let Some(assigned_to) = update.assigned_to {
            if let Some(assignee) = assigned_to {
                require_assignable(&board, assignee)?;
            }
            card.assigned_to = assigned_to;
        }
        card.touch();

        let mut committed = self.store().apply(ChangeSet::new().put_card(card)).await?;
        Ok(committed.take_card(card_id)?)
    }

    /// Re-parents a card within its board and records the move.
    ///
    /// `expected_list` is the list the caller believes the card is in; when
    /// given it has to match. The old list, the new list and the card are
    /// committed together.
    pub async fn move_card(
        &self,
        user_id: UserId,
        board_id: BoardId,
        card_id: CardId,
        new_list_id: ListId,
        expected_list: Option<ListId>,
    ) -> ServiceResult<Card> {
        let board = accessible_board(self.store(), user_id, board_id).await?;
        let mut card = self
            .store()
            .find_card(card_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Card {} not found", card_id)))?;

        if let Some(expected) = expected_list {
            if expected != card.list_id {
                return Err(ServiceError::not_found(format!(
                    "Card {} not found in list {}",
                    card_id, expected
                )));
            }
        }

        let mut old_list = list_in_board(self.store(), &board, card.list_id).await?;
        let mut new_list = list_in_board(self.store(), &board, new_list_id).await?;

        if old_list.id == new_list.id {
            return Ok(card);
        }

        let from_list_id = old_list.id;
        old_list.remove_card(card.id);
        new_list.push_card(card.id);
        card.move_to_list(new_list.id);

        let mut committed = self
            .store()
            .apply(
                ChangeSet::new()
                    .put_list(old_list)
                    .put_list(new_list)
                    .put_card(card),
            )
            .await?;
        tracing::info!(
            %user_id,
            %board_id,
            %card_id,
            from = %from_list_id,
            to = %new_list_id,
            "card moved"
        );
        Ok(committed.take_card(card_id)?)
    }

    pub async fn delete_card(
        &self,
        user_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        card_id: CardId,
    ) -> ServiceResult<()> {
        let board = accessible_board(self.store(), user_id, board_id).await?;
        let mut list = list_in_board(self.store(), &board, list_id).await?;
        let card = card_in_list(self.store(), &list, card_id).await?;

        list.remove_card(card.id);
        self.store()
            .apply(ChangeSet::new().put_list(list).delete_card(&card))
            .await?;
        tracing::info!(%user_id, %board_id, %list_id, %card_id, "card deleted");
        Ok(())
    }
}

fn require_assignable(board: &Board, assignee: UserId) -> ServiceResult<()> {
    if !can_access(assignee, board) {
        return Err(ServiceError::validation(format!(
            "User {} has no access to board {}",
            assignee, board.id
        )));
    }
    Ok(())
}
