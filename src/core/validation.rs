//! Request payload validation
//!
//! Shape checks for the auth payloads, run by the API layer before anything
//! reaches the session lifecycle. Each validator collects every problem it
//! finds so the client can surface them all at once.

use serde::Serialize;

use crate::core::auth::service::{LoginRequest, RegisterRequest, UpdateProfileRequest};

/// Minimum password length, matching what the sign-up form enforces
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum display name length
pub const MAX_NAME_LENGTH: usize = 100;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Basic structural email check: local@domain with a dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    // Every dot-separated domain label must be non-empty
    domain.split('.').all(|label| !label.is_empty())
}

fn check_name(errors: &mut Vec<FieldError>, name: &str) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name cannot be empty"));
    } else if name.len() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
}

fn check_email(errors: &mut Vec<FieldError>, email: &str) {
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
}

fn check_password(errors: &mut Vec<FieldError>, field: &str, password: &str) {
    if password.len() < MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            field,
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
}

/// Validate a registration payload
pub fn validate_register(request: &RegisterRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_name(&mut errors, &request.name);
    check_email(&mut errors, &request.email);
    check_password(&mut errors, "password", &request.password);

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validate a login payload
pub fn validate_login(request: &LoginRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_email(&mut errors, &request.email);
    if request.password.is_empty() {
        errors.push(FieldError::new("password", "Password cannot be empty"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validate a profile update payload
pub fn validate_update(request: &UpdateProfileRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if request.name.is_none() && request.new_password.is_none() {
        errors.push(FieldError::new(
            "name",
            "Nothing to update: provide a name or a new password",
        ));
    }

    if let Some(name) = &request.name {
        check_name(&mut errors, name);
    }

    if let Some(new_password) = &request.new_password {
        check_password(&mut errors, "new_password", new_password);

        if request.old_password.is_none() {
            errors.push(FieldError::new(
                "old_password",
                "Old password is required to change the password",
            ));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
