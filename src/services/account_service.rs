use serde::Serialize;
use std::sync::Arc;

use crate::auth::{generate_jwt, hash_password, validate_jwt, verify_password, Claims};
use crate::config::SecurityConfig;
use crate::database::models::{User, UserId};
use crate::database::{Store, StoreError};

use super::{ServiceError, ServiceResult};

const MIN_PASSWORD_LEN: usize = 8;

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// 3-30 characters, a leading letter, then letters, digits or underscores.
fn is_valid_username(username: &str) -> bool {
    if username.len() < 3 || username.len() > 30 {
        return false;
    }

    let mut chars = username.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sign-up, sign-in and bearer token verification.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    jwt_secret: Arc<str>,
    jwt_expiry_hours: u64,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, security: &SecurityConfig) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(security.jwt_secret.as_str()),
            jwt_expiry_hours: security.jwt_expiry_hours,
            bcrypt_cost: security.bcrypt_cost,
        }
    }

    fn issue(&self, user: User) -> ServiceResult<Session> {
        let claims = Claims::new(user.id, user.username.clone(), self.jwt_expiry_hours);
        let token = generate_jwt(&claims, &self.jwt_secret)?;
        Ok(Session { token, user })
    }

    pub async fn sign_up(&self, username: &str, password: &str) -> ServiceResult<Session> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(ServiceError::validation(
                "Username must be 3-30 chars, start with a letter, and contain only letters, numbers, and underscores",
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        // bcrypt is CPU bound; keep it off the async workers.
        let cost = self.bcrypt_cost;
        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {}", e)))??;

        let user = self
            .store
            .insert_user(User::new(username.to_string(), password_hash))
            .await
            .map_err(|e| match e {
                StoreError::DuplicateUsername(name) => {
                    tracing::warn!(username = %name, "username already taken");
                    ServiceError::Conflict("Username already taken".to_string())
                }
                other => ServiceError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "user signed up");
        self.issue(user)
    }

    /// Unknown usernames and wrong passwords fail the same way.
    pub async fn sign_in(&self, username: &str, password: &str) -> ServiceResult<Session> {
        let invalid = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let user = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        let plain = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("verification task failed: {}", e)))?;
        if !matches {
            tracing::warn!(username = %user.username, "sign-in rejected");
            return Err(invalid());
        }

        tracing::info!(user_id = %user.id, "user signed in");
        self.issue(user)
    }

    /// Claims of a valid, unexpired token
    pub fn verify_token(&self, token: &str) -> ServiceResult<Claims> {
        validate_jwt(token, &self.jwt_secret)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))
    }

    pub async fn current_user(&self, user_id: UserId) -> ServiceResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;

    fn service() -> AccountService {
        let mut security = AppConfig::development().security;
        security.bcrypt_cost = 4;
        AccountService::new(Arc::new(MemoryStore::new()), &security)
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("alice_01"));
        assert!(!is_valid_username("al"));
        assert!(!is_valid_username("1alice"));
        assert!(!is_valid_username("alice-smith"));
        assert!(!is_valid_username(&"a".repeat(31)));
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let accounts = service();
        let created = accounts.sign_up("alice", "correct horse").await.unwrap();

        let session = accounts.sign_in("alice", "correct horse").await.unwrap();
        assert_eq!(session.user.id, created.user.id);

        let claims = accounts.verify_token(&session.token).unwrap();
        assert_eq!(claims.sub, created.user.id);
        assert_eq!(accounts.current_user(claims.sub).await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let accounts = service();
        accounts.sign_up("alice", "correct horse").await.unwrap();

        let err = accounts.sign_up("alice", "another pass").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let err = service().sign_up("alice", "short").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_alike() {
        let accounts = service();
        accounts.sign_up("alice", "correct horse").await.unwrap();

        let wrong = accounts.sign_in("alice", "wrong horse!").await.unwrap_err();
        let unknown = accounts.sign_in("bob", "correct horse").await.unwrap_err();

        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(
            service().verify_token("not.a.jwt"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
