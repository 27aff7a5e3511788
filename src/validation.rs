// Validation utilities module
// Custom validators and normalisation shared by the auth and user endpoints

use validator::ValidationError;

/// Rejects values made only of whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Canonical form of an email identifier: trimmed and lower-cased.
/// Lookups and inserts both go through this so uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("secret123").is_ok());
        assert!(validate_not_blank("  pass  ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("        ").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }
}
