//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, non-empty secrets)
//! - Check the database URI scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.host must not be empty")]
    EmptyHost,

    #[error("database.uri '{0}' must start with mongodb:// or mongodb+srv://")]
    DatabaseScheme(String),

    #[error("session.secret must not be empty")]
    EmptySessionSecret,

    #[error("session.cookie_name must not be empty")]
    EmptyCookieName,

    #[error("session.max_age_secs must be greater than 0")]
    ZeroSessionAge,

    #[error("http.body_limit_bytes must be greater than 0")]
    ZeroBodyLimit,
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    let uri = &config.database.uri;
    if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
        errors.push(ValidationError::DatabaseScheme(uri.clone()));
    }

    if config.session.secret.is_empty() {
        errors.push(ValidationError::EmptySessionSecret);
    }
    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }
    if config.session.max_age_secs == 0 {
        errors.push(ValidationError::ZeroSessionAge);
    }

    if config.http.body_limit_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
