//! Identifier legality checks for class, attribute and constraint names.

use crate::error::SchemaError;

/// Longest identifier the server accepts.
pub const MAX_IDENTIFIER_LENGTH: usize = 254;

/// Decides whether a name can be used as an identifier.
pub trait IdentifierValidator {
    /// Checks the syntax of `name`.
    fn validate(&self, name: &str) -> Result<(), SchemaError>;

    /// Returns true if `name` only uses ASCII characters.
    fn is_ascii(&self, name: &str) -> bool {
        name.is_ascii()
    }

    /// Checks syntax, then rejects multibyte names unless they are allowed.
    fn check(&self, name: &str, allow_multibyte: bool) -> Result<(), SchemaError> {
        self.validate(name)?;
        if !allow_multibyte && !self.is_ascii(name) {
            return Err(SchemaError::MultibyteIdentifier {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdentifierValidator;

impl IdentifierValidator for DefaultIdentifierValidator {
    fn validate(&self, name: &str) -> Result<(), SchemaError> {
        let invalid = |reason: &str| {
            Err(SchemaError::InvalidIdentifier {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };

        if name.trim().is_empty() {
            return invalid("empty");
        }
        if name.chars().count() > MAX_IDENTIFIER_LENGTH {
            return invalid("longer than 254 characters");
        }
        if name.contains('"') {
            return invalid("contains a double quote");
        }
        if name.chars().any(char::is_control) {
            return invalid("contains a control character");
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return invalid("starts with a digit");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[timeout(1000)]
    #[test]
    fn test_default_validator() {
        let v = DefaultIdentifierValidator;
        assert!(v.validate("person").is_ok());
        assert!(v.validate("order line").is_ok());
        assert!(v.validate("").is_err());
        assert!(v.validate("   ").is_err());
        assert!(v.validate("1st").is_err());
        assert!(v.validate("a\"b").is_err());
        assert!(v.validate("a\tb").is_err());
        assert!(v.validate(&"x".repeat(254)).is_ok());
        assert!(v.validate(&"x".repeat(255)).is_err());
    }

    #[timeout(1000)]
    #[test]
    fn test_multibyte_check() {
        let v = DefaultIdentifierValidator;
        assert!(matches!(
            v.check("café", false),
            Err(SchemaError::MultibyteIdentifier { .. })
        ));
        assert!(v.check("café", true).is_ok());
        assert!(v.check("cafe", false).is_ok());
    }
}
