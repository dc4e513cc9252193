use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgQueryResult, types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::models::{Board, BoardId, Card, CardId, CardMovement, List, ListId, User, UserId};
use super::store::{ChangeSet, DocRef, Store, StoreError};

const USER_COLUMNS: &str = "id, username, password_hash, created_at, updated_at, revision";
const BOARD_COLUMNS: &str =
    "id, name, owner_id, authorized_user_ids, list_ids, created_at, updated_at, revision";
const LIST_COLUMNS: &str = "id, name, board_id, card_ids, created_at, updated_at, revision";
const CARD_COLUMNS: &str =
    "id, name, description, list_id, assigned_to, movement_history, created_at, updated_at, revision";

/// Row shape of `cards`; the history lives in a JSONB column.
#[derive(FromRow)]
struct CardRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    list_id: Uuid,
    assigned_to: Option<Uuid>,
    movement_history: Json<Vec<CardMovement>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    revision: i64,
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Card {
            id: row.id,
            name: row.name,
            description: row.description,
            list_id: row.list_id,
            assigned_to: row.assigned_to,
            movement_history: row.movement_history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revision: row.revision,
        }
    }
}

/// Store backed by PostgreSQL. Change sets run inside one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ensure_written(
    result: PgQueryResult,
    collection: &'static str,
    id: Uuid,
) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict { collection, id });
    }
    Ok(())
}

async fn upsert_board(conn: &mut PgConnection, board: &Board) -> Result<(), StoreError> {
    let result = if board.revision == 0 {
        sqlx::query(
            "INSERT INTO boards (id, name, owner_id, authorized_user_ids, list_ids, created_at, updated_at, revision)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(board.id)
        .bind(&board.name)
        .bind(board.owner_id)
        .bind(board.authorized_user_ids.as_slice())
        .bind(board.list_ids.as_slice())
        .bind(board.created_at)
        .bind(board.updated_at)
        .execute(&mut *conn)
        .await?
    } else {
        sqlx::query(
            "UPDATE boards
             SET name = $2, owner_id = $3, authorized_user_ids = $4, list_ids = $5,
                 updated_at = $6, revision = revision + 1
             WHERE id = $1 AND revision = $7",
        )
        .bind(board.id)
        .bind(&board.name)
        .bind(board.owner_id)
        .bind(board.authorized_user_ids.as_slice())
        .bind(board.list_ids.as_slice())
        .bind(board.updated_at)
        .bind(board.revision)
        .execute(&mut *conn)
        .await?
    };
    ensure_written(result, "board", board.id)
}

async fn upsert_list(conn: &mut PgConnection, list: &List) -> Result<(), StoreError> {
    let result = if list.revision == 0 {
        sqlx::query(
            "INSERT INTO lists (id, name, board_id, card_ids, created_at, updated_at, revision)
             VALUES ($1, $2, $3, $4, $5, $6, 1)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(list.id)
        .bind(&list.name)
        .bind(list.board_id)
        .bind(list.card_ids.as_slice())
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&mut *conn)
        .await?
    } else {
        sqlx::query(
            "UPDATE lists
             SET name = $2, board_id = $3, card_ids = $4, updated_at = $5, revision = revision + 1
             WHERE id = $1 AND revision = $6",
        )
        .bind(list.id)
        .bind(&list.name)
        .bind(list.board_id)
        .bind(list.card_ids.as_slice())
        .bind(list.updated_at)
        .bind(list.revision)
        .execute(&mut *conn)
        .await?
    };
    ensure_written(result, "list", list.id)
}

async fn upsert_card(conn: &mut PgConnection, card: &Card) -> Result<(), StoreError> {
    let result = if card.revision == 0 {
        sqlx::query(
            "INSERT INTO cards (id, name, description, list_id, assigned_to, movement_history, created_at, updated_at, revision)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(card.id)
        .bind(&card.name)
        .bind(card.description.as_deref())
        .bind(card.list_id)
        .bind(card.assigned_to)
        .bind(Json(&card.movement_history))
        .bind(card.created_at)
        .bind(card.updated_at)
        .execute(&mut *conn)
        .await?
    } else {
        sqlx::query(
            "UPDATE cards
             SET name = $2, description = $3, list_id = $4, assigned_to = $5,
                 movement_history = $6, updated_at = $7, revision = revision + 1
             WHERE id = $1 AND revision = $8",
        )
        .bind(card.id)
        .bind(&card.name)
        .bind(card.description.as_deref())
        .bind(card.list_id)
        .bind(card.assigned_to)
        .bind(Json(&card.movement_history))
        .bind(card.updated_at)
        .bind(card.revision)
        .execute(&mut *conn)
        .await?
    };
    ensure_written(result, "card", card.id)
}

async fn delete_doc(
    conn: &mut PgConnection,
    table: &'static str,
    collection: &'static str,
    doc_ref: &DocRef,
) -> Result<(), StoreError> {
    let sql = format!("DELETE FROM {} WHERE id = $1 AND revision = $2", table);
    let result = sqlx::query(&sql)
        .bind(doc_ref.id)
        .bind(doc_ref.revision)
        .execute(&mut *conn)
        .await?;
    ensure_written(result, collection, doc_ref.id)
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, 1) RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::DuplicateUsername(user.username.clone())
                }
                other => StoreError::from(other),
            })
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn boards_for_user(&self, user_id: UserId) -> Result<Vec<Board>, StoreError> {
        let sql = format!(
            "SELECT {} FROM boards
             WHERE owner_id = $1 OR $1 = ANY(authorized_user_ids)
             ORDER BY created_at, id",
            BOARD_COLUMNS
        );
        Ok(sqlx::query_as::<_, Board>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn find_board(&self, id: BoardId) -> Result<Option<Board>, StoreError> {
        let sql = format!("SELECT {} FROM boards WHERE id = $1", BOARD_COLUMNS);
        Ok(sqlx::query_as::<_, Board>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_list(&self, id: ListId) -> Result<Option<List>, StoreError> {
        let sql = format!("SELECT {} FROM lists WHERE id = $1", LIST_COLUMNS);
        Ok(sqlx::query_as::<_, List>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StoreError> {
        let sql = format!("SELECT {} FROM cards WHERE id = $1", CARD_COLUMNS);
        let row = sqlx::query_as::<_, CardRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Card::from))
    }

    async fn lists_for_board(&self, board_id: BoardId) -> Result<Vec<List>, StoreError> {
        let sql = format!(
            "SELECT {} FROM lists WHERE board_id = $1 ORDER BY created_at, id",
            LIST_COLUMNS
        );
        Ok(sqlx::query_as::<_, List>(&sql).bind(board_id).fetch_all(&self.pool).await?)
    }

    async fn cards_for_lists(&self, list_ids: &[ListId]) -> Result<Vec<Card>, StoreError> {
        if list_ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM cards WHERE list_id = ANY($1) ORDER BY created_at, id",
            CARD_COLUMNS
        );
        let rows = sqlx::query_as::<_, CardRow>(&sql)
            .bind(list_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Card::from).collect())
    }

    async fn apply(&self, changes: ChangeSet) -> Result<ChangeSet, StoreError> {
        if changes.is_empty() {
            return Ok(changes);
        }
        let mut tx = self.pool.begin().await?;

        // Parents before children on the way in, children first on the way out.
        for board in &changes.boards {
            upsert_board(&mut tx, board).await?;
        }
        for list in &changes.lists {
            upsert_list(&mut tx, list).await?;
        }
        for card in &changes.cards {
            upsert_card(&mut tx, card).await?;
        }
        for doc_ref in &changes.deleted_cards {
            delete_doc(&mut tx, "cards", "card", doc_ref).await?;
        }
        for doc_ref in &changes.deleted_lists {
            delete_doc(&mut tx, "lists", "list", doc_ref).await?;
        }
        for doc_ref in &changes.deleted_boards {
            delete_doc(&mut tx, "boards", "board", doc_ref).await?;
        }

        tx.commit().await?;
        Ok(changes.committed())
    }
}
