//! Auth API endpoints
//!
//! REST endpoints for the session lifecycle:
//! - POST /api/auth/register - Register a new user
//! - POST /api/auth/login - Login and get tokens
//! - POST /api/auth/logout - Logout (invalidate the refresh token)
//! - POST /api/auth/refresh - Refresh the token pair
//!
//! Tokens travel both in the JSON body and as `accessToken`/`refreshToken`
//! cookies (http-only; `Secure` in production). Lifecycle errors map 1:1 to
//! a uniform `{error, code, details?}` envelope.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use crate::core::auth::jwt::TokenPair;
use crate::core::auth::service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest,
};
use crate::core::validation::{self, FieldError};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Shared state for the API routers
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
    /// Mark session cookies `Secure`; enabled in production environments
    pub secure_cookies: bool,
}

/// Uniform API error envelope
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }
}

/// Convert AuthError to an API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "EMAIL_EXISTS"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::RefreshTokenReused => (StatusCode::UNAUTHORIZED, "REFRESH_TOKEN_REUSED"),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            AuthError::Internal(detail) => {
                // The detail stays in the log; the client gets a generic line.
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            AuthError::Internal(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        };

        let details = match self {
            AuthError::Validation(errors) => Some(errors),
            _ => None,
        };

        let body = ApiError {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Refresh request body; the cookie takes precedence when both are present
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Response for token refresh
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub tokens: TokenPair,
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/refresh", post(refresh_handler))
        .with_state(state)
}

/// POST /api/auth/register
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validation::validate_register(&request).map_err(AuthError::Validation)?;

    tracing::info!("Registration attempt for email: {}", request.email);

    let response = state.auth_service.register(request).await?;
    let jar = with_session_cookies(jar, &response.tokens, state.secure_cookies);

    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// POST /api/auth/login
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AuthError> {
    validation::validate_login(&request).map_err(AuthError::Validation)?;

    tracing::info!("Login attempt for email: {}", request.email);

    let response = state.auth_service.login(request).await?;
    let jar = with_session_cookies(jar, &response.tokens, state.secure_cookies);

    Ok((jar, Json(response)))
}

/// POST /api/auth/logout
async fn logout_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<serde_json::Value>), AuthError> {
    let token = access_token_from(&jar, &headers)?;
    let user_id = state.auth_service.validate_access_token(&token)?;

    state.auth_service.logout(user_id).await?;

    Ok((clear_session_cookies(jar), Json(serde_json::json!({}))))
}

/// POST /api/auth/refresh
///
/// The token is taken from the `refreshToken` cookie, falling back to a
/// `refresh_token` body field. The body is optional, so it is read as raw
/// bytes rather than through the JSON extractor.
async fn refresh_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    body: axum::body::Bytes,
) -> Result<(CookieJar, Json<RefreshResponse>), AuthError> {
    let body_token = serde_json::from_slice::<RefreshRequest>(&body)
        .ok()
        .and_then(|b| b.refresh_token);

    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or(body_token)
        .ok_or(AuthError::MissingToken)?;

    tracing::debug!("Token refresh request");

    let tokens = state.auth_service.refresh(&presented).await?;
    let jar = with_session_cookies(jar, &tokens, state.secure_cookies);

    Ok((jar, Json(RefreshResponse { tokens })))
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

/// Attach both session cookies for a freshly issued pair
fn with_session_cookies(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        secure,
    ))
}

/// Expire both session cookies
fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/").build())
}

/// Extract the access token from the session cookie or the Authorization
/// header. A missing token and a malformed one are distinct failures.
pub(crate) fn access_token_from(
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<String, AuthError> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        let value = cookie.value();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?;

    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(token.to_string())
}
