//! Validation contract for inbound request shapes.
//!
//! Every request body accepted by the API implements [`Validate`], turning an
//! untrusted wire shape into a typed value the stores can persist as-is.
//! Validation is pure: it never touches the database, and it reports every
//! failing field at once rather than stopping at the first.

use serde::Serialize;
use thiserror::Error;

/// Maximum length of an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;
/// Maximum length of a user's display name, in characters.
pub const MAX_NAME_LEN: usize = 100;
/// Maximum length of a message subject, in characters.
pub const MAX_SUBJECT_LEN: usize = 255;
/// Maximum length of a message body, in characters.
pub const MAX_CONTENT_LEN: usize = 10_000;
/// Maximum number of recipients on a single message.
pub const MAX_RECIPIENTS: usize = 100;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the field as it appears on the wire.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

/// Structured validation failure carrying one entry per rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Builds an error for a single field.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            fields: vec![FieldError {
                field,
                message: message.into(),
            }],
        }
    }

    /// Returns `true` if the named field was rejected.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

/// Converts a wire shape into its validated form.
pub trait Validate {
    /// The typed value produced on success.
    type Valid;

    /// Checks every field, returning the validated value or all failures.
    fn validate(self) -> Result<Self::Valid, ValidationError>;
}

/// Accumulates field failures while a shape is being validated.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    fields: Vec<FieldError>,
}

impl Collector {
    /// Records the outcome of a single field check, returning the value on success.
    pub(crate) fn check<T>(&mut self, field: &'static str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.fields.push(FieldError { field, message });
                None
            }
        }
    }

    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Finishes validation. `build` only runs when no field failed.
    pub(crate) fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationError> {
        if !self.fields.is_empty() {
            return Err(ValidationError {
                fields: self.fields,
            });
        }
        build().ok_or_else(|| ValidationError::single("body", "invalid request"))
    }
}

/// Normalizes and checks an email address.
///
/// The address is trimmed and lowercased. Only structural checks are made:
/// one `@`, a non-empty local part, and a dotted domain without empty labels.
pub fn validate_email(raw: &str) -> Result<String, String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err("email cannot be empty".to_string());
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(format!("email too long (max {} chars)", MAX_EMAIL_LEN));
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("email cannot contain whitespace".to_string());
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return Err("email must contain '@'".to_string()),
    };
    if local.is_empty() {
        return Err("email is missing the part before '@'".to_string());
    }
    if domain.contains('@') {
        return Err("email must contain exactly one '@'".to_string());
    }
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err("email domain is invalid".to_string());
    }

    Ok(email)
}

/// Trims and checks a display name.
pub fn validate_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("name too long (max {} chars)", MAX_NAME_LEN));
    }
    if name.chars().any(char::is_control) {
        return Err("name cannot contain control characters".to_string());
    }
    Ok(name.to_string())
}

/// Checks an optional subject. Blank subjects collapse to `None`.
pub fn validate_subject(raw: Option<String>) -> Result<Option<String>, String> {
    let subject = match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Ok(None),
    };
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(format!("subject too long (max {} chars)", MAX_SUBJECT_LEN));
    }
    Ok(Some(subject))
}

/// Checks a message body. Surrounding whitespace is preserved.
pub fn validate_content(raw: String) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("content cannot be empty".to_string());
    }
    if raw.chars().count() > MAX_CONTENT_LEN {
        return Err(format!("content too long (max {} chars)", MAX_CONTENT_LEN));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            validate_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        for bad in [
            "",
            "   ",
            "alice",
            "@example.com",
            "alice@",
            "alice@example",
            "alice@@example.com",
            "alice@exa mple.com",
            "alice@example..com",
            "alice@.example.com",
        ] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn email_length_is_bounded() {
        let long = format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn name_bounds() {
        assert_eq!(validate_name("  Alice ").unwrap(), "Alice");
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(validate_name("Al\u{0007}ice").is_err());
    }

    #[test]
    fn subject_blank_collapses_to_none() {
        assert_eq!(validate_subject(None).unwrap(), None);
        assert_eq!(validate_subject(Some("   ".to_string())).unwrap(), None);
        assert_eq!(
            validate_subject(Some(" Hi ".to_string())).unwrap(),
            Some("Hi".to_string())
        );
        assert!(validate_subject(Some("s".repeat(MAX_SUBJECT_LEN + 1))).is_err());
    }

    #[test]
    fn content_must_not_be_blank() {
        assert!(validate_content(" \n ".to_string()).is_err());
        assert_eq!(validate_content(" hi ".to_string()).unwrap(), " hi ");
        assert!(validate_content("c".repeat(MAX_CONTENT_LEN + 1)).is_err());
    }

    #[test]
    fn error_display_lists_fields() {
        let err = ValidationError {
            fields: vec![
                FieldError {
                    field: "email",
                    message: "bad".to_string(),
                },
                FieldError {
                    field: "name",
                    message: "empty".to_string(),
                },
            ],
        };
        assert_eq!(err.to_string(), "validation failed: email: bad; name: empty");
        assert!(err.has_field("name"));
        assert!(!err.has_field("content"));
    }
}
