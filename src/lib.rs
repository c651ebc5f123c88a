//! walletd - personal wallet backend
//!
//! An HTTP backend for a small personal-wallet application: JWT-based
//! sign-up/sign-in with rotating refresh tokens, a per-user wallet created at
//! registration, and simple account endpoints.

pub mod core;
