use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use walletd::core::auth::{AuthApiState, AuthService, JwtService, auth_api_router};
use walletd::core::config::Config;
use walletd::core::db::pool::{DbConfig, create_pool_with_migrations};
use walletd::core::db::repositories::PgUserStore;
use walletd::core::users::users_api_router;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load application config from environment variables
    let config = Config::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, production={}",
        config.has_database(),
        config.is_production()
    );

    let db_config = DbConfig::from_env().expect("DATABASE_URL environment variable is not set");
    let pool = create_pool_with_migrations(&db_config)
        .await
        .expect("Failed to connect to database");

    let jwt_service = JwtService::from_env().expect("JWT secrets are not configured");
    let store = Arc::new(PgUserStore::new(pool));
    let auth_service = AuthService::new(store, jwt_service);

    let state = AuthApiState {
        auth_service,
        secure_cookies: config.is_production(),
    };

    let app = Router::new()
        .merge(auth_api_router(state.clone()))
        .merge(users_api_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
