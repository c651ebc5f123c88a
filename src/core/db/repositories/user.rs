//! PostgreSQL-backed user store
//!
//! Implements [`UserStore`] over sqlx. Registration inserts the user row and
//! the wallet row in a single transaction; refresh-token rotation is a
//! single-statement overwrite.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{NewUser, ProfileChanges, User, UserSummary, Wallet};
use crate::core::db::repositories::{
    BCRYPT_COST, StoreError, UserStore, hash_password, hash_refresh_token,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, avatar_url, refresh_token_hash, created_at, updated_at";

/// PostgreSQL user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so a user-supplied filter is a literal substring
/// match rather than a pattern.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(
        &self,
        new_user: NewUser,
        initial_balance: f64,
    ) -> Result<(User, Wallet), StoreError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(StoreError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&new_user.password, BCRYPT_COST)?;

        // User and wallet land together or not at all.
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, avatar_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(&new_user.avatar_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            // The unique index catches a register/register race the
            // pre-check above cannot see.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::EmailAlreadyExists
            }
            _ => StoreError::from(e),
        })?;

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (user_id, balance)
            VALUES ($1, $2)
            RETURNING id, user_id, balance, created_at
            "#,
        )
        .bind(user.id)
        .bind(initial_balance)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, wallet))
    }

    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let token_hash = token.map(hash_refresh_token);

        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<User, StoreError> {
        let password_hash = match &changes.password {
            Some(password) => Some(hash_password(password, BCRYPT_COST)?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                password_hash = COALESCE($3, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&changes.name)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(StoreError::NotFound)
    }

    async fn search_by_name(&self, pattern: &str) -> Result<Vec<UserSummary>, StoreError> {
        let like = format!("%{}%", escape_like(pattern));

        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE name ILIKE $1
            ORDER BY name ASC
            "#,
        )
        .bind(&like)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance, created_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }
}
