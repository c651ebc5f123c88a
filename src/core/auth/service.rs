//! Session lifecycle service
//!
//! Business logic for user registration, login, logout, token refresh,
//! profile updates, and user listing. Coordinates the user store and the JWT
//! service; transport (cookies vs. bodies) is the API layer's concern.

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::core::auth::jwt::{JwtError, JwtService, TokenPair};
use crate::core::db::models::{NewUser, ProfileChanges, UserResponse, UserSummary, Wallet};
use crate::core::db::repositories::{
    StoreError, UserStore, hash_refresh_token, verify_password,
};
use crate::core::validation::FieldError;

/// Session lifecycle error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User with email already exists")]
    EmailAlreadyExists,

    /// Deliberately covers both unknown email and wrong password
    #[error("Email and password do not match")]
    InvalidCredentials,

    #[error("Unauthorized request")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    /// The presented refresh token verified but is no longer the stored one
    #[error("Refresh token is expired or used")]
    RefreshTokenReused,

    #[error("Not found")]
    NotFound,

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::EmailAlreadyExists => AuthError::EmailAlreadyExists,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired
            | JwtError::InvalidToken
            | JwtError::InvalidTokenKind
            | JwtError::DecodingError(_) => AuthError::InvalidToken,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

/// Registration request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update request data
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// Authentication response with user data and tokens
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// Session lifecycle service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    jwt: JwtService,
}

impl AuthService {
    /// Create a new session lifecycle service
    pub fn new(store: Arc<dyn UserStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    /// Register a new user: create the user and its wallet, then start a
    /// session by issuing and persisting a fresh token pair.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let avatar_url = avatar_url_for(&request.name);
        let initial_balance = rand::thread_rng().gen_range(1.0..=1000.0);

        let (user, _wallet) = self
            .store
            .create(
                NewUser {
                    name: request.name,
                    email: request.email,
                    password: request.password,
                    avatar_url: Some(avatar_url),
                },
                initial_balance,
            )
            .await?;

        let tokens = self.jwt.issue_pair(user.id)?;
        self.store
            .set_refresh_token(user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::info!("User registered: {}", user.email);

        Ok(AuthResponse {
            user: user.into(),
            tokens,
        })
    }

    /// Login an existing user, rotating any previously stored refresh token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .store
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let is_valid = verify_password(&request.password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.jwt.issue_pair(user.id)?;
        self.store
            .set_refresh_token(user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::info!("User logged in: {}", user.email);

        Ok(AuthResponse {
            user: user.into(),
            tokens,
        })
    }

    /// Exchange a still-valid refresh token for a new pair.
    ///
    /// The presented token must match the single stored one; a superseded
    /// token is rejected even if its signature and expiry are fine. That
    /// comparison is the sole revocation mechanism.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let claims = self.jwt.verify_refresh(presented)?;
        let user_id = claims.user_id()?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let matches_stored = user
            .refresh_token_hash
            .as_deref()
            .is_some_and(|stored| stored == hash_refresh_token(presented));
        if !matches_stored {
            return Err(AuthError::RefreshTokenReused);
        }

        let tokens = self.jwt.issue_pair(user.id)?;
        self.store
            .set_refresh_token(user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::debug!("Tokens rotated for user {}", user.id);

        Ok(tokens)
    }

    /// Clear the stored refresh token. Idempotent.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store.set_refresh_token(user_id, None).await?;

        tracing::info!("User logged out: {}", user_id);

        Ok(())
    }

    /// Update display name and/or password. A password change requires the
    /// old password to verify. The stored refresh token is left untouched.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if request.new_password.is_some() {
            let old_password = request
                .old_password
                .as_deref()
                .ok_or(AuthError::InvalidCredentials)?;

            let is_valid = verify_password(old_password, &user.password_hash)
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            if !is_valid {
                return Err(AuthError::InvalidCredentials);
            }
        }

        let updated = self
            .store
            .update_profile(
                user_id,
                ProfileChanges {
                    name: request.name,
                    password: request.new_password,
                },
            )
            .await?;

        Ok(updated.into())
    }

    /// List users whose name contains the pattern, case-insensitively
    pub async fn list_users(&self, pattern: &str) -> Result<Vec<UserSummary>, AuthError> {
        Ok(self.store.search_by_name(pattern).await?)
    }

    /// Fetch the caller's wallet
    pub async fn wallet(&self, user_id: Uuid) -> Result<Wallet, AuthError> {
        self.store
            .find_wallet(user_id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Validate an access token and return the user ID if valid
    pub fn validate_access_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = self.jwt.verify_access(token)?;
        Ok(claims.user_id()?)
    }
}

/// Initials used in the generated avatar: first two characters of a single
/// word, otherwise first character of the first and last words.
fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(2).collect(),
        [first, .., last] => first
            .chars()
            .take(1)
            .chain(last.chars().take(1))
            .collect(),
    }
}

fn avatar_url_for(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&size=250&background=4d2be2&color=ffffff",
        initials(name)
    )
}
