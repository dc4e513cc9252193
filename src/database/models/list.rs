use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::board::BoardId;
use super::card::CardId;

pub type ListId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub board_id: BoardId,
    /// Cards of this list in display order.
    #[serde(default)]
    pub card_ids: Vec<CardId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: i64,
}

impl List {
    pub fn new(board_id: BoardId, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            board_id,
            card_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn push_card(&mut self, card_id: CardId) {
        if !self.card_ids.contains(&card_id) {
            self.card_ids.push(card_id);
        }
        self.touch();
    }

    pub fn remove_card(&mut self, card_id: CardId) {
        self.card_ids.retain(|id| *id != card_id);
        self.touch();
    }

    pub fn rename(&mut self, name: String) {
        self.name = name;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
