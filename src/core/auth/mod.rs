//! Authentication module for the wallet backend
//!
//! This module provides the session-token lifecycle:
//! - JWT token generation and validation (two secrets, one per token kind)
//! - User registration and login
//! - Single-refresh-token rotation and revocation
//! - REST API endpoints for auth operations

pub mod api;
pub mod jwt;
pub mod service;

pub use api::{AuthApiState, auth_api_router};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, TokenKind, TokenPair};
pub use service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
