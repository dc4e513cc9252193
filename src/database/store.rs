use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Board, BoardId, Card, CardId, List, ListId, User, UserId};

/// Errors surfaced by a [`Store`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document in a change set was written by someone else since it was read.
    #[error("Write conflict on {collection} {id}")]
    Conflict { collection: &'static str, id: Uuid },

    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Identity and read revision of a document scheduled for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocRef {
    pub id: Uuid,
    pub revision: i64,
}

/// A set of writes across the board, list and card collections that a store
/// commits as one unit.
///
/// Upserted documents with `revision == 0` are inserts; any other revision must
/// equal the stored revision or the whole set is rejected with
/// [`StoreError::Conflict`]. Deletions are checked the same way. Committed
/// documents come back with their revision incremented.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub boards: Vec<Board>,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub deleted_boards: Vec<DocRef>,
    pub deleted_lists: Vec<DocRef>,
    pub deleted_cards: Vec<DocRef>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_board(mut self, board: Board) -> Self {
        self.boards.push(board);
        self
    }

    pub fn put_list(mut self, list: List) -> Self {
        self.lists.push(list);
        self
    }

    pub fn put_card(mut self, card: Card) -> Self {
        self.cards.push(card);
        self
    }

    pub fn delete_board(mut self, board: &Board) -> Self {
        self.deleted_boards.push(DocRef { id: board.id, revision: board.revision });
        self
    }

    pub fn delete_list(mut self, list: &List) -> Self {
        self.deleted_lists.push(DocRef { id: list.id, revision: list.revision });
        self
    }

    pub fn delete_card(mut self, card: &Card) -> Self {
        self.deleted_cards.push(DocRef { id: card.id, revision: card.revision });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
            && self.lists.is_empty()
            && self.cards.is_empty()
            && self.deleted_boards.is_empty()
            && self.deleted_lists.is_empty()
            && self.deleted_cards.is_empty()
    }

    pub fn take_board(&mut self, id: BoardId) -> Result<Board, StoreError> {
        take(&mut self.boards, |b| b.id == id, "board", id)
    }

    pub fn take_list(&mut self, id: ListId) -> Result<List, StoreError> {
        take(&mut self.lists, |l| l.id == id, "list", id)
    }

    pub fn take_card(&mut self, id: CardId) -> Result<Card, StoreError> {
        take(&mut self.cards, |c| c.id == id, "card", id)
    }

    /// Bumps the revision of every upserted document, as the store does on commit.
    pub(crate) fn committed(mut self) -> Self {
        self.boards.iter_mut().for_each(|b| b.revision += 1);
        self.lists.iter_mut().for_each(|l| l.revision += 1);
        self.cards.iter_mut().for_each(|c| c.revision += 1);
        self
    }
}

fn take<T>(
    docs: &mut Vec<T>,
    matches: impl Fn(&T) -> bool,
    collection: &str,
    id: Uuid,
) -> Result<T, StoreError> {
    docs.iter()
        .position(matches)
        .map(|idx| docs.remove(idx))
        .ok_or_else(|| StoreError::Inconsistent(format!("{} {} missing from committed changes", collection, id)))
}

/// Persistent collections for users, boards, lists and cards
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip proving the backend is reachable
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Inserts a new user; usernames are unique
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Boards owned by or shared with the user, oldest first
    async fn boards_for_user(&self, user_id: UserId) -> Result<Vec<Board>, StoreError>;

    async fn find_board(&self, id: BoardId) -> Result<Option<Board>, StoreError>;

    async fn find_list(&self, id: ListId) -> Result<Option<List>, StoreError>;

    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StoreError>;

    /// Lists whose `board_id` is the given board, by foreign key
    async fn lists_for_board(&self, board_id: BoardId) -> Result<Vec<List>, StoreError>;

    /// Cards whose `list_id` is any of the given lists, by foreign key
    async fn cards_for_lists(&self, list_ids: &[ListId]) -> Result<Vec<Card>, StoreError>;

    /// Commits every write in `changes` atomically, or none of them
    async fn apply(&self, changes: ChangeSet) -> Result<ChangeSet, StoreError>;
}
