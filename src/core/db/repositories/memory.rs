//! In-memory user store for tests
//!
//! Mirrors the semantics of [`PgUserStore`] without a database so the
//! session lifecycle can be exercised in plain unit tests. Uses a low bcrypt
//! cost to keep test runtime reasonable.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::db::models::{NewUser, ProfileChanges, User, UserSummary, Wallet};
use crate::core::db::repositories::{
    StoreError, UserStore, hash_password, hash_refresh_token,
};

const TEST_BCRYPT_COST: u32 = 4;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
}

/// In-memory [`UserStore`] implementation
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wallet rows held; lets tests assert nothing leaked out of a
    /// failed registration.
    pub fn wallet_count(&self) -> usize {
        self.inner.lock().unwrap().wallets.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&id).cloned())
    }

    async fn create(
        &self,
        new_user: NewUser,
        initial_balance: f64,
    ) -> Result<(User, Wallet), StoreError> {
        let password_hash = hash_password(&new_user.password, TEST_BCRYPT_COST)?;

        let mut inner = self.inner.lock().unwrap();

        if inner.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash,
            avatar_url: new_user.avatar_url,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id: user.id,
            balance: initial_balance,
            created_at: now,
        };

        inner.users.insert(user.id, user.clone());
        inner.wallets.insert(wallet.id, wallet.clone());

        Ok((user, wallet))
    }

    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        user.refresh_token_hash = token.map(hash_refresh_token);
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<User, StoreError> {
        let password_hash = match &changes.password {
            Some(password) => Some(hash_password(password, TEST_BCRYPT_COST)?),
            None => None,
        };

        let mut inner = self.inner.lock().unwrap();
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn search_by_name(&self, pattern: &str) -> Result<Vec<UserSummary>, StoreError> {
        let needle = pattern.to_lowercase();
        let inner = self.inner.lock().unwrap();

        let mut matches: Vec<UserSummary> = inner
            .users
            .values()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .map(|u| UserSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(matches)
    }

    async fn find_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .wallets
            .values()
            .find(|w| w.user_id == user_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryUserStore::new();

        let (user, wallet) = store
            .create(new_user("Ann Lee", "ann@x.com"), 42.0)
            .await
            .unwrap();

        assert_eq!(wallet.user_id, user.id);
        assert!(store.find_by_email("ann@x.com").await.unwrap().is_some());
        assert!(store.find_by_id(user.id).await.unwrap().is_some());
        assert_eq!(store.wallet_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_no_wallet_behind() {
        let store = InMemoryUserStore::new();

        store
            .create(new_user("Ann Lee", "ann@x.com"), 42.0)
            .await
            .unwrap();
        let result = store.create(new_user("Other Ann", "ann@x.com"), 10.0).await;

        assert!(matches!(result, Err(StoreError::EmailAlreadyExists)));
        assert_eq!(store.wallet_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_token_overwrite_and_clear() {
        let store = InMemoryUserStore::new();
        let (user, _) = store
            .create(new_user("Ann Lee", "ann@x.com"), 42.0)
            .await
            .unwrap();

        store.set_refresh_token(user.id, Some("one")).await.unwrap();
        store.set_refresh_token(user.id, Some("two")).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash, Some(hash_refresh_token("two")));

        store.set_refresh_token(user.id, None).await.unwrap();
        let cleared = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(cleared.refresh_token_hash.is_none());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let store = InMemoryUserStore::new();
        store
            .create(new_user("Annabel", "annabel@x.com"), 1.0)
            .await
            .unwrap();
        store
            .create(new_user("Joanne", "joanne@x.com"), 1.0)
            .await
            .unwrap();
        store
            .create(new_user("Bob", "bob@x.com"), 1.0)
            .await
            .unwrap();

        let matches = store.search_by_name("ANN").await.unwrap();
        let names: Vec<&str> = matches.iter().map(|u| u.name.as_str()).collect();

        assert_eq!(names, vec!["Annabel", "Joanne"]);
    }
}
