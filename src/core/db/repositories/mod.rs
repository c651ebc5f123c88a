//! Storage layer for the wallet backend
//!
//! The credential store is expressed as the narrow [`UserStore`] trait so the
//! storage engine is pluggable: [`PgUserStore`] backs production, and the
//! tests drive the session lifecycle against an in-memory implementation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::db::models::{NewUser, ProfileChanges, User, UserSummary, Wallet};

pub mod user;

#[cfg(test)]
pub mod memory;

pub use user::PgUserStore;

/// Cost factor for bcrypt hashing (12 is recommended for production)
pub const BCRYPT_COST: u32 = 12;

/// Store error types shared by every [`UserStore`] implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found")]
    NotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Persistence contract for user records and their wallets.
///
/// Every method persists durably before returning; there is no caching
/// layer. `create` inserts the user and the wallet as one unit, and
/// `set_refresh_token` is a single-statement overwrite, so two concurrent
/// rotations for the same user resolve to whichever writer lands last.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Create a user together with its wallet. The plain-text password in
    /// `new_user` is bcrypt-hashed before it is stored. Fails with
    /// `EmailAlreadyExists` when the email is taken.
    async fn create(
        &self,
        new_user: NewUser,
        initial_balance: f64,
    ) -> Result<(User, Wallet), StoreError>;

    /// Overwrite the stored refresh token. `Some(token)` stores the SHA-256
    /// hex of the raw token; `None` clears it.
    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        token: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Apply profile changes. A new password is re-hashed; verifying the old
    /// one is the caller's responsibility.
    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<User, StoreError>;

    /// Case-insensitive substring match on the display name. An empty
    /// pattern matches everyone.
    async fn search_by_name(&self, pattern: &str) -> Result<Vec<UserSummary>, StoreError>;

    async fn find_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError>;
}

/// Hash a password using bcrypt with automatic salt generation
pub fn hash_password(password: &str, cost: u32) -> Result<String, StoreError> {
    bcrypt::hash(password, cost).map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Verify a password against a bcrypt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
    bcrypt::verify(password, hash).map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Hash a refresh token for at-rest storage (SHA-256, hex-encoded)
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
