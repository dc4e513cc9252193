pub mod board;
pub mod card;
pub mod list;
pub mod user;

pub use board::{Board, BoardId};
pub use card::{Card, CardId, CardMovement};
pub use list::{List, ListId};
pub use user::{User, UserId};
