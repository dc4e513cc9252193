use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::list::ListId;
use super::user::UserId;

pub type BoardId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub owner_id: UserId,
    /// Users the owner has shared the board with. Never contains the owner.
    #[serde(default)]
    pub authorized_user_ids: Vec<UserId>,
    /// Lists of this board in display order.
    #[serde(default)]
    pub list_ids: Vec<ListId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: i64,
}

impl Board {
    pub fn new(owner_id: UserId, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            owner_id,
            authorized_user_ids: Vec::new(),
            list_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Replaces the shared-with set, dropping the owner and duplicates.
    pub fn set_authorized_users(&mut self, user_ids: Vec<UserId>) {
        let mut authorized: Vec<UserId> = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if user_id != self.owner_id && !authorized.contains(&user_id) {
                authorized.push(user_id);
            }
        }
        self.authorized_user_ids = authorized;
        self.touch();
    }

    pub fn attach_list(&mut self, list_id: ListId) {
        if !self.list_ids.contains(&list_id) {
            self.list_ids.push(list_id);
        }
        self.touch();
    }

    pub fn detach_list(&mut self, list_id: ListId) {
        self.list_ids.retain(|id| *id != list_id);
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
