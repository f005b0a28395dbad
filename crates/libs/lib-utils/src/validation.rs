//! # Validation Utilities
//!
//! Input validation helpers.

use uuid::Uuid;

/// Validate that a string is not empty.
pub fn validate_not_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate email format (basic check).
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.contains('@') && email.contains('.') {
        Ok(())
    } else {
        Err("Invalid email format".to_string())
    }
}

/// Validate that `value` is a well-formed entity identifier and return it parsed.
pub fn validate_identifier(value: &str, field_name: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("Invalid {}", field_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(validate_identifier(&id.to_string(), "projectId").unwrap(), id);
    }

    #[test]
    fn test_identifier_rejects_garbage() {
        assert_eq!(
            validate_identifier("not-an-id", "projectId").unwrap_err(),
            "Invalid projectId"
        );
        assert!(validate_identifier("", "projectId").is_err());
    }
}
