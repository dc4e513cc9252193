use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Board, BoardId, Card, CardId, List, ListId, User, UserId};
use super::store::{ChangeSet, DocRef, Store, StoreError};

#[derive(Default)]
struct Collections {
    users: HashMap<UserId, User>,
    boards: HashMap<BoardId, Board>,
    lists: HashMap<ListId, List>,
    cards: HashMap<CardId, Card>,
}

/// Process-local store used in development and tests.
///
/// A change set is validated and committed under one write lock, so readers
/// never observe half of it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

trait Revisioned {
    fn id(&self) -> Uuid;
    fn revision(&self) -> i64;
    fn set_revision(&mut self, revision: i64);
}

macro_rules! revisioned {
    ($ty:ty) => {
        impl Revisioned for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
            fn revision(&self) -> i64 {
                self.revision
            }
            fn set_revision(&mut self, revision: i64) {
                self.revision = revision;
            }
        }
    };
}

revisioned!(Board);
revisioned!(List);
revisioned!(Card);

fn check_upserts<T: Revisioned>(
    stored: &HashMap<Uuid, T>,
    docs: &[T],
    collection: &'static str,
) -> Result<(), StoreError> {
    for doc in docs {
        let current = stored.get(&doc.id()).map(Revisioned::revision);
        let fresh = match current {
            None => doc.revision() == 0,
            Some(revision) => doc.revision() != 0 && revision == doc.revision(),
        };
        if !fresh {
            return Err(StoreError::Conflict { collection, id: doc.id() });
        }
    }
    Ok(())
}

fn check_deletions<T: Revisioned>(
    stored: &HashMap<Uuid, T>,
    refs: &[DocRef],
    collection: &'static str,
) -> Result<(), StoreError> {
    for doc_ref in refs {
        match stored.get(&doc_ref.id) {
            Some(doc) if doc.revision() == doc_ref.revision => {}
            _ => return Err(StoreError::Conflict { collection, id: doc_ref.id }),
        }
    }
    Ok(())
}

fn write_upserts<T: Revisioned + Clone>(stored: &mut HashMap<Uuid, T>, docs: &[T]) {
    for doc in docs {
        let mut doc = doc.clone();
        doc.set_revision(doc.revision() + 1);
        stored.insert(doc.id(), doc);
    }
}

fn sorted_by_creation<T, K: Ord>(mut docs: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    docs.sort_by_key(|doc| key(doc));
    docs
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, mut user: User) -> Result<User, StoreError> {
        let mut data = self.inner.write().await;
        if data.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername(user.username));
        }
        if data.users.contains_key(&user.id) {
            return Err(StoreError::Conflict { collection: "user", id: user.id });
        }
        user.revision += 1;
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let data = self.inner.read().await;
        Ok(data.users.values().find(|u| u.username == username).cloned())
    }

    async fn boards_for_user(&self, user_id: UserId) -> Result<Vec<Board>, StoreError> {
        let data = self.inner.read().await;
        let boards = data
            .boards
            .values()
            .filter(|b| b.owner_id == user_id || b.authorized_user_ids.contains(&user_id))
            .cloned()
            .collect();
        Ok(sorted_by_creation(boards, |b: &Board| (b.created_at, b.id)))
    }

    async fn find_board(&self, id: BoardId) -> Result<Option<Board>, StoreError> {
        Ok(self.inner.read().await.boards.get(&id).cloned())
    }

    async fn find_list(&self, id: ListId) -> Result<Option<List>, StoreError> {
        Ok(self.inner.read().await.lists.get(&id).cloned())
    }

    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StoreError> {
        Ok(self.inner.read().await.cards.get(&id).cloned())
    }

    async fn lists_for_board(&self, board_id: BoardId) -> Result<Vec<List>, StoreError> {
        let data = self.inner.read().await;
        let lists = data.lists.values().filter(|l| l.board_id == board_id).cloned().collect();
        Ok(sorted_by_creation(lists, |l: &List| (l.created_at, l.id)))
    }

    async fn cards_for_lists(&self, list_ids: &[ListId]) -> Result<Vec<Card>, StoreError> {
        let data = self.inner.read().await;
        let cards = data
            .cards
            .values()
            .filter(|c| list_ids.contains(&c.list_id))
            .cloned()
            .collect();
        Ok(sorted_by_creation(cards, |c: &Card| (c.created_at, c.id)))
    }

    async fn apply(&self, changes: ChangeSet) -> Result<ChangeSet, StoreError> {
        if changes.is_empty() {
            return Ok(changes);
        }
        let mut data = self.inner.write().await;

        check_upserts(&data.boards, &changes.boards, "board")?;
        check_upserts(&data.lists, &changes.lists, "list")?;
        check_upserts(&data.cards, &changes.cards, "card")?;
        check_deletions(&data.boards, &changes.deleted_boards, "board")?;
        check_deletions(&data.lists, &changes.deleted_lists, "list")?;
        check_deletions(&data.cards, &changes.deleted_cards, "card")?;

        write_upserts(&mut data.boards, &changes.boards);
        write_upserts(&mut data.lists, &changes.lists);
        write_upserts(&mut data.cards, &changes.cards);
        for doc_ref in &changes.deleted_cards {
            data.cards.remove(&doc_ref.id);
        }
        for doc_ref in &changes.deleted_lists {
            data.lists.remove(&doc_ref.id);
        }
        for doc_ref in &changes.deleted_boards {
            data.boards.remove(&doc_ref.id);
        }

        tracing::trace!(
            boards = changes.boards.len(),
            lists = changes.lists.len(),
            cards = changes.cards.len(),
            "committed change set"
        );

        Ok(changes.committed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(User::new("alice".into(), "hash".into())).await.unwrap();

        let err = store
            .insert_user(User::new("alice".into(), "hash".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateUsername(name) if name == "alice"));
    }

    #[tokio::test]
    async fn apply_inserts_and_bumps_revision() {
        let store = MemoryStore::new();
        let board = Board::new(Uuid::new_v4(), "Sprint".into());
        let id = board.id;

        let mut committed = store.apply(ChangeSet::new().put_board(board)).await.unwrap();

        assert_eq!(committed.take_board(id).unwrap().revision, 1);
        assert_eq!(store.find_board(id).await.unwrap().unwrap().revision, 1);
    }

    #[tokio::test]
    async fn stale_write_is_rejected_without_partial_effects() {
        let store = MemoryStore::new();
        let board = Board::new(Uuid::new_v4(), "Sprint".into());
        let list = List::new(board.id, "Todo".into());
        let (board_id, list_id) = (board.id, list.id);
        store.apply(ChangeSet::new().put_board(board).put_list(list)).await.unwrap();

        let stale_board = store.find_board(board_id).await.unwrap().unwrap();
        let mut winner = stale_board.clone();
        winner.rename("Sprint 2".into());
        store.apply(ChangeSet::new().put_board(winner)).await.unwrap();

        // Same read revision, plus a list write that must not land either.
        let mut loser = stale_board;
        loser.rename("Sprint 3".into());
        let mut list = store.find_list(list_id).await.unwrap().unwrap();
        list.rename("Doing".into());
        let err = store
            .apply(ChangeSet::new().put_list(list).put_board(loser))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict { collection: "board", .. }));
        assert_eq!(store.find_board(board_id).await.unwrap().unwrap().name, "Sprint 2");
        assert_eq!(store.find_list(list_id).await.unwrap().unwrap().name, "Todo");
    }

    #[tokio::test]
    async fn reinserting_existing_document_conflicts() {
        let store = MemoryStore::new();
        let board = Board::new(Uuid::new_v4(), "Sprint".into());
        store.apply(ChangeSet::new().put_board(board.clone())).await.unwrap();

        let err = store.apply(ChangeSet::new().put_board(board)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn deletion_requires_current_revision() {
        let store = MemoryStore::new();
        let board = Board::new(Uuid::new_v4(), "Sprint".into());
        let list = List::new(board.id, "Todo".into());
        let mut committed = store
            .apply(ChangeSet::new().put_board(board).put_list(list.clone()))
            .await
            .unwrap();
        let stored = committed.take_list(list.id).unwrap();

        let err = store.apply(ChangeSet::new().delete_list(&list)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { collection: "list", .. }));

        store.apply(ChangeSet::new().delete_list(&stored)).await.unwrap();
        assert!(store.find_list(list.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn boards_for_user_includes_shared_boards() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let mut shared = Board::new(owner, "Shared".into());
        shared.set_authorized_users(vec![friend]);
        let private = Board::new(owner, "Private".into());
        store
            .apply(ChangeSet::new().put_board(shared).put_board(private))
            .await
            .unwrap();

        assert_eq!(store.boards_for_user(owner).await.unwrap().len(), 2);
        let visible = store.boards_for_user(friend).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Shared");
    }
}
