// Common validation types and traits

use uuid::Uuid;

use super::error::ApiError;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// `Ok(())` when nothing was recorded, the collected errors otherwise.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

/// Records an error unless `email` looks like `local@domain`.
pub fn check_email(result: &mut ValidationResult, field: &str, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        result.add_error(field, "is required");
        return;
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => result.add_error(field, "must be a valid email address"),
    }
}

/// Parses an opaque user identifier, rejecting anything that is not a UUID.
pub fn parse_user_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id.trim())
        .map_err(|e| ApiError::ValidationError(format!("invalid user ID: {}", e)))
}
