// handlers/public/auth/mod.rs - Public authentication handlers

use serde::Deserialize;

pub mod sign_in; // POST /auth/sign-in - authenticate and get JWT
pub mod sign_up; // POST /auth/sign-up - create account and get JWT

pub use sign_in::sign_in_post;
pub use sign_up::sign_up_post;

/// Body shared by sign-up and sign-in
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
