//! Request and response shapes for users.

use crate::validation::{validate_email, validate_name, Collector, Validate, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /users`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub name: String,
}

/// Request body for `PATCH /users/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Query string for `GET /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Restrict the listing to the user with this email.
    pub email: Option<String>,
}

/// A validated user ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Normalized (trimmed, lowercase) email.
    pub email: String,
    pub name: String,
}

/// A validated set of column changes for an existing user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserChanges {
    /// Returns `true` when no column would change.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none()
    }
}

/// Public view of a user returned by every user endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Validate for UserCreate {
    type Valid = NewUser;

    fn validate(self) -> Result<NewUser, ValidationError> {
        let mut errors = Collector::default();
        let email = errors.check("email", validate_email(&self.email));
        let name = errors.check("name", validate_name(&self.name));
        errors.finish(|| Some(NewUser {
            email: email?,
            name: name?,
        }))
    }
}

impl Validate for UserUpdate {
    type Valid = UserChanges;

    fn validate(self) -> Result<UserChanges, ValidationError> {
        let mut errors = Collector::default();
        let email = self
            .email
            .and_then(|e| errors.check("email", validate_email(&e)));
        let name = self
            .name
            .and_then(|n| errors.check("name", validate_name(&n)));
        errors.finish(|| Some(UserChanges { email, name }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_validates_every_field() {
        let err = UserCreate {
            email: "not-an-email".to_string(),
            name: " ".to_string(),
        }
        .validate()
        .expect_err("both fields are invalid");
        assert_eq!(err.fields.len(), 2);
        assert!(err.has_field("email"));
        assert!(err.has_field("name"));
    }

    #[test]
    fn create_normalizes_input() {
        let user = UserCreate {
            email: " Alice@Example.com".to_string(),
            name: " Alice ".to_string(),
        }
        .validate()
        .expect("valid input");
        assert_eq!(
            user,
            NewUser {
                email: "alice@example.com".to_string(),
                name: "Alice".to_string(),
            }
        );
    }

    #[test]
    fn update_allows_partial_and_empty_payloads() {
        let changes = UserUpdate::default().validate().expect("empty is valid");
        assert!(changes.is_empty());

        let changes = UserUpdate {
            email: None,
            name: Some("Bob".to_string()),
        }
        .validate()
        .expect("partial is valid");
        assert_eq!(changes.name.as_deref(), Some("Bob"));
        assert_eq!(changes.email, None);
    }

    #[test]
    fn update_rejects_present_but_invalid_fields() {
        let err = UserUpdate {
            email: Some("nope".to_string()),
            name: None,
        }
        .validate()
        .expect_err("bad email");
        assert!(err.has_field("email"));
    }

    #[test]
    fn create_requires_both_fields_on_the_wire() {
        let missing: Result<UserCreate, _> =
            serde_json::from_value(serde_json::json!({ "name": "Alice" }));
        assert!(missing.is_err());
    }
}
