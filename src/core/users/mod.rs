//! User-facing account endpoints (listing, profile, wallet)

pub mod api;

pub use api::users_api_router;
