//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (parsing handles shape)
//! - Validate value ranges (port, window, capacity)
//! - Check the database URI names a supported backend
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::AppConfig;

/// URI schemes the database connector understands.
pub const SUPPORTED_DATABASE_SCHEMES: &[&str] = &["mongodb://", "mongodb+srv://", "memory://"];

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("PORT", "must be between 1 and 65535"));
    }

    match config.database.uri.as_deref() {
        None => errors.push(ValidationError::new("MONGO_URI", "is required")),
        Some(uri) if !SUPPORTED_DATABASE_SCHEMES.iter().any(|s| uri.starts_with(s)) => {
            errors.push(ValidationError::new(
                "MONGO_URI",
                format!("unsupported scheme, expected one of {:?}", SUPPORTED_DATABASE_SCHEMES),
            ));
        }
        Some(_) => {}
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("RATE_LIMIT_MAX", "must be greater than zero"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("RATE_LIMIT_WINDOW_SECS", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
