use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::list::ListId;
use super::user::UserId;

pub type CardId = Uuid;

/// One entry of a card's movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMovement {
    pub from_list_id: ListId,
    pub to_list_id: ListId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub description: Option<String>,
    pub list_id: ListId,
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub movement_history: Vec<CardMovement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: i64,
}

impl Card {
    pub fn new(list_id: ListId, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            list_id,
            assigned_to: None,
            movement_history: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Re-parents the card and records the move.
    pub fn move_to_list(&mut self, to_list_id: ListId) {
        let now = Utc::now();
        self.movement_history.push(CardMovement {
            from_list_id: self.list_id,
            to_list_id,
            timestamp: now,
        });
        self.list_id = to_list_id;
        self.updated_at = now;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
