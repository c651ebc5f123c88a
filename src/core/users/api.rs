//! User and wallet API endpoints
//!
//! Access-token-protected endpoints:
//! - GET /api/users?filter= - List users matching a name filter
//! - PATCH /api/users/me - Update the caller's profile
//! - GET /api/wallet - Fetch the caller's wallet

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, patch},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::core::auth::api::{AuthApiState, access_token_from};
use crate::core::auth::service::{AuthError, UpdateProfileRequest};
use crate::core::db::models::{UserResponse, UserSummary, Wallet};
use crate::core::validation;

/// Query parameters for user listing
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Case-insensitive substring to match against display names
    #[serde(default)]
    pub filter: String,
}

/// Response for user listing
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

/// Create the users API router
pub fn users_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/users", get(list_users_handler))
        .route("/api/users/me", patch(update_profile_handler))
        .route("/api/wallet", get(wallet_handler))
        .with_state(state)
}

/// GET /api/users?filter=
async fn list_users_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UsersResponse>, AuthError> {
    let token = access_token_from(&jar, &headers)?;
    state.auth_service.validate_access_token(&token)?;

    let users = state.auth_service.list_users(&query.filter).await?;

    Ok(Json(UsersResponse { users }))
}

/// PATCH /api/users/me
async fn update_profile_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    validation::validate_update(&request).map_err(AuthError::Validation)?;

    let token = access_token_from(&jar, &headers)?;
    let user_id = state.auth_service.validate_access_token(&token)?;

    let user = state.auth_service.update_profile(user_id, request).await?;

    tracing::info!("Profile updated for user: {}", user_id);

    Ok(Json(user))
}

/// GET /api/wallet
async fn wallet_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<Wallet>, AuthError> {
    let token = access_token_from(&jar, &headers)?;
    let user_id = state.auth_service.validate_access_token(&token)?;

    let wallet = state.auth_service.wallet(user_id).await?;

    Ok(Json(wallet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::api::auth_api_router;
    use crate::core::auth::jwt::{JwtConfig, JwtService};
    use crate::core::auth::service::AuthService;
    use crate::core::db::repositories::memory::InMemoryUserStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let store = Arc::new(InMemoryUserStore::new());
        let jwt = JwtService::new(JwtConfig::new(
            "access_secret_for_tests",
            "refresh_secret_for_tests",
        ));
        let state = AuthApiState {
            auth_service: AuthService::new(store, jwt),
            secure_cookies: false,
        };
        Router::new()
            .merge(auth_api_router(state.clone()))
            .merge(users_api_router(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Register a user through the API, returning their access token
    async fn register(router: &Router, name: &str, email: &str) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(&serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": "secret1"
                }))
                .unwrap(),
            ))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        body["tokens"]["access_token"].as_str().unwrap().to_string()
    }

    fn authorized(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    // ========================================================================
    // List Users Tests
    // ========================================================================

    #[tokio::test]
    async fn test_list_users_requires_access_token() {
        let router = test_router();

        let request = Request::builder()
            .method("GET")
            .uri("/api/users")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_users_filter_projection() {
        let router = test_router();
        let token = register(&router, "Ann Lee", "ann@x.com").await;
        register(&router, "Joanne Doe", "joanne@x.com").await;
        register(&router, "Bob Ray", "bob@x.com").await;

        let response = router
            .oneshot(authorized("GET", "/api/users?filter=ann", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let users = body["users"].as_array().unwrap();

        assert_eq!(users.len(), 2);
        for user in users {
            let object = user.as_object().unwrap();
            assert_eq!(object.len(), 3);
            assert!(object.contains_key("id"));
            assert!(object.contains_key("name"));
            assert!(object.contains_key("email"));
        }
    }

    #[tokio::test]
    async fn test_list_users_without_filter_returns_everyone() {
        let router = test_router();
        let token = register(&router, "Ann Lee", "ann@x.com").await;
        register(&router, "Bob Ray", "bob@x.com").await;

        let response = router
            .oneshot(authorized("GET", "/api/users", &token))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
    }

    // ========================================================================
    // Update Profile Tests
    // ========================================================================

    #[tokio::test]
    async fn test_update_profile_name() {
        let router = test_router();
        let token = register(&router, "Ann Lee", "ann@x.com").await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(&serde_json::json!({"name": "Ann B. Lee"})).unwrap(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "Ann B. Lee");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_update_profile_wrong_old_password() {
        let router = test_router();
        let token = register(&router, "Ann Lee", "ann@x.com").await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(&serde_json::json!({
                    "old_password": "wrong_password",
                    "new_password": "brand_new1"
                }))
                .unwrap(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_update_profile_empty_payload_rejected() {
        let router = test_router();
        let token = register(&router, "Ann Lee", "ann@x.com").await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b"{}".to_vec()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // Wallet Tests
    // ========================================================================

    #[tokio::test]
    async fn test_wallet_returns_balance_in_range() {
        let router = test_router();
        let token = register(&router, "Ann Lee", "ann@x.com").await;

        let response = router
            .oneshot(authorized("GET", "/api/wallet", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let balance = body["balance"].as_f64().unwrap();
        assert!(balance >= 1.0 && balance <= 1000.0);
    }

    #[tokio::test]
    async fn test_wallet_requires_access_token() {
        let router = test_router();

        let request = Request::builder()
            .method("GET")
            .uri("/api/wallet")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
