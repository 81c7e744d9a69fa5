//! Request and response shapes for messages.

use crate::validation::{
    validate_content, validate_subject, Collector, Validate, ValidationError, MAX_RECIPIENTS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreate {
    #[serde(alias = "sender")]
    pub sender_id: Uuid,
    #[serde(default)]
    pub recipient_ids: Vec<Uuid>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(alias = "body")]
    pub content: String,
}

/// A validated message ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: Uuid,
    /// Distinct recipients in the order they were first listed.
    pub recipient_ids: Vec<Uuid>,
    pub subject: Option<String>,
    pub content: String,
}

impl Validate for MessageCreate {
    type Valid = NewMessage;

    fn validate(self) -> Result<NewMessage, ValidationError> {
        let mut errors = Collector::default();

        let mut recipient_ids: Vec<Uuid> = Vec::with_capacity(self.recipient_ids.len());
        for id in self.recipient_ids {
            if !recipient_ids.contains(&id) {
                recipient_ids.push(id);
            }
        }
        if recipient_ids.len() > MAX_RECIPIENTS {
            errors.push(
                "recipient_ids",
                format!("too many recipients (max {})", MAX_RECIPIENTS),
            );
        }

        let subject = errors.check("subject", validate_subject(self.subject));
        let content = errors.check("content", validate_content(self.content));
        let sender_id = self.sender_id;

        errors.finish(|| {
            Some(NewMessage {
                sender_id,
                recipient_ids,
                subject: subject?,
                content: content?,
            })
        })
    }
}

/// Query string for `PATCH /messages/{id}/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadReceiptParams {
    pub recipient_id: Uuid,
}

/// Response for a sent message (`POST /messages`, `GET /users/{id}/messages/sent`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_ids: Vec<Uuid>,
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message as seen from one recipient's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// Delivery state of a message for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientStatus {
    pub message_id: Uuid,
    pub recipient_id: Uuid,
    pub email: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// Full view of a message including per-recipient read state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub recipients: Vec<RecipientStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(content: &str, recipients: Vec<Uuid>) -> MessageCreate {
        MessageCreate {
            sender_id: Uuid::new_v4(),
            recipient_ids: recipients,
            subject: None,
            content: content.to_string(),
        }
    }

    #[test]
    fn duplicate_recipients_are_collapsed_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let msg = create("hi", vec![b, a, b, a]).validate().expect("valid");
        assert_eq!(msg.recipient_ids, vec![b, a]);
    }

    #[test]
    fn blank_content_is_rejected() {
        let err = create("   ", vec![]).validate().expect_err("blank content");
        assert!(err.has_field("content"));
    }

    #[test]
    fn too_many_recipients_is_rejected() {
        let recipients = (0..=MAX_RECIPIENTS).map(|_| Uuid::new_v4()).collect();
        let err = create("hi", recipients).validate().expect_err("over the cap");
        assert!(err.has_field("recipient_ids"));
    }

    #[test]
    fn wire_aliases_are_accepted() {
        let sender = Uuid::new_v4();
        let parsed: MessageCreate = serde_json::from_value(serde_json::json!({
            "sender": sender,
            "body": "hi"
        }))
        .expect("aliases should deserialize");
        assert_eq!(parsed.sender_id, sender);
        assert_eq!(parsed.content, "hi");
        assert!(parsed.recipient_ids.is_empty());
    }
}
