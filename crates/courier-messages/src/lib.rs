//! Message records, delivery and read receipts for Courier.
//!
//! A message has exactly one sender and any number of recipients. Each
//! recipient gets a row in `message_recipients` carrying its read state.
//! Messages are immutable once sent; only the per-recipient read flag
//! changes, and the whole message can be deleted.
//!
//! [`send_message`] performs several writes and must run inside a
//! transaction so that a failure leaves nothing behind.

use chrono::{DateTime, Utc};
use courier_db::{
    constraint_violation, format_timestamp, get_optional_timestamp, get_timestamp, get_uuid,
    ConstraintViolation,
};
use courier_types::{InboxMessage, MessageDetail, NewMessage, Page, RecipientStatus, SentMessage};
use courier_users::UserError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during message operations.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("message not found: {0}")]
    NotFound(Uuid),
    #[error("user does not exist: {0}")]
    UnknownUser(Uuid),
    #[error("user {recipient_id} is not a recipient of message {message_id}")]
    NotRecipient { message_id: Uuid, recipient_id: Uuid },
    #[error("message {message_id} already marked as read by {recipient_id}")]
    AlreadyRead { message_id: Uuid, recipient_id: Uuid },
    #[error(transparent)]
    User(#[from] UserError),
}

/// A row of the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message together with the recipients it was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub message: Message,
    pub recipient_ids: Vec<Uuid>,
}

/// A message as delivered to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub message: Message,
    pub sender_email: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// A `message_recipients` row joined with the recipient's email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRecord {
    pub message_id: Uuid,
    pub recipient_id: Uuid,
    pub email: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// A message with its sender's email and every recipient's read state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetailRecord {
    pub message: Message,
    pub sender_email: String,
    pub recipients: Vec<RecipientRecord>,
}

impl From<SentRecord> for SentMessage {
    fn from(record: SentRecord) -> Self {
        let SentRecord {
            message,
            recipient_ids,
        } = record;
        SentMessage {
            id: message.id,
            sender_id: message.sender_id,
            recipient_ids,
            subject: message.subject,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

impl From<InboxEntry> for InboxMessage {
    fn from(entry: InboxEntry) -> Self {
        InboxMessage {
            id: entry.message.id,
            sender_id: entry.message.sender_id,
            sender_email: entry.sender_email,
            subject: entry.message.subject,
            content: entry.message.content,
            created_at: entry.message.created_at,
            read: entry.read,
            read_at: entry.read_at,
        }
    }
}

impl From<RecipientRecord> for RecipientStatus {
    fn from(record: RecipientRecord) -> Self {
        RecipientStatus {
            message_id: record.message_id,
            recipient_id: record.recipient_id,
            email: record.email,
            read: record.read,
            read_at: record.read_at,
        }
    }
}

impl From<MessageDetailRecord> for MessageDetail {
    fn from(record: MessageDetailRecord) -> Self {
        MessageDetail {
            id: record.message.id,
            sender_id: record.message.sender_id,
            sender_email: record.sender_email,
            subject: record.message.subject,
            content: record.message.content,
            created_at: record.message.created_at,
            recipients: record.recipients.into_iter().map(Into::into).collect(),
        }
    }
}

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.subject, m.content, m.created_at";

/// Sends a message from an existing user to zero or more existing users.
///
/// The sender and every recipient are checked before anything is written,
/// so an unknown user is reported as [`MessageError::UnknownUser`]. Foreign
/// keys catch the same condition if a user disappears concurrently.
pub fn send_message(
    conn: &Connection,
    new_message: &NewMessage,
) -> Result<SentRecord, MessageError> {
    ensure_user(conn, new_message.sender_id)?;
    for recipient_id in &new_message.recipient_ids {
        ensure_user(conn, *recipient_id)?;
    }

    let message = Message {
        id: Uuid::new_v4(),
        sender_id: new_message.sender_id,
        subject: new_message.subject.clone(),
        content: new_message.content.clone(),
        created_at: courier_db::now(),
    };

    conn.execute(
        "INSERT INTO messages (id, sender_id, subject, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            message.id.to_string(),
            message.sender_id.to_string(),
            message.subject,
            message.content,
            format_timestamp(message.created_at),
        ],
    )
    .map_err(|e| map_reference_error(e, message.sender_id))?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO message_recipients (id, message_id, recipient_id) VALUES (?1, ?2, ?3)",
    )?;
    for recipient_id in &new_message.recipient_ids {
        stmt.execute(params![
            Uuid::new_v4().to_string(),
            message.id.to_string(),
            recipient_id.to_string(),
        ])
        .map_err(|e| map_reference_error(e, *recipient_id))?;
    }

    tracing::debug!(
        message_id = %message.id,
        recipients = new_message.recipient_ids.len(),
        "message inserted"
    );

    Ok(SentRecord {
        message,
        recipient_ids: new_message.recipient_ids.clone(),
    })
}

/// Retrieves a message by id.
pub fn get_message(conn: &Connection, id: Uuid) -> Result<Message, MessageError> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1"),
        [id.to_string()],
        map_row_to_message,
    )
    .optional()?
    .ok_or(MessageError::NotFound(id))
}

/// Retrieves a message with its sender's email and every recipient's state.
pub fn get_message_detail(
    conn: &Connection,
    id: Uuid,
) -> Result<MessageDetailRecord, MessageError> {
    let (message, sender_email) = conn
        .query_row(
            &format!(
                "SELECT {MESSAGE_COLUMNS}, u.email
                 FROM messages m JOIN users u ON u.id = m.sender_id
                 WHERE m.id = ?1"
            ),
            [id.to_string()],
            |row| Ok((map_row_to_message(row)?, row.get::<_, String>(5)?)),
        )
        .optional()?
        .ok_or(MessageError::NotFound(id))?;

    let mut stmt = conn.prepare(
        "SELECT r.message_id, r.recipient_id, u.email, r.read, r.read_at
         FROM message_recipients r JOIN users u ON u.id = r.recipient_id
         WHERE r.message_id = ?1
         ORDER BY r.rowid ASC",
    )?;
    let rows = stmt.query_map([id.to_string()], map_row_to_recipient)?;
    let mut recipients = Vec::new();
    for row in rows {
        recipients.push(row?);
    }

    Ok(MessageDetailRecord {
        message,
        sender_email,
        recipients,
    })
}

/// Lists messages sent by a user, oldest first.
pub fn list_sent(
    conn: &Connection,
    sender_id: Uuid,
    page: Page,
) -> Result<Vec<SentRecord>, MessageError> {
    ensure_user(conn, sender_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m
         WHERE m.sender_id = ?1
         ORDER BY m.created_at ASC, m.rowid ASC
         LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(
        params![sender_id.to_string(), page.limit, page.offset],
        map_row_to_message,
    )?;

    let mut recipients_stmt = conn.prepare_cached(
        "SELECT recipient_id FROM message_recipients WHERE message_id = ?1 ORDER BY rowid ASC",
    )?;

    let mut sent = Vec::new();
    for row in rows {
        let message = row?;
        let ids = recipients_stmt.query_map([message.id.to_string()], |row| get_uuid(row, 0))?;
        let mut recipient_ids = Vec::new();
        for id in ids {
            recipient_ids.push(id?);
        }
        sent.push(SentRecord {
            message,
            recipient_ids,
        });
    }
    Ok(sent)
}

/// Lists every message delivered to a user, oldest first.
pub fn list_inbox(
    conn: &Connection,
    recipient_id: Uuid,
    page: Page,
) -> Result<Vec<InboxEntry>, MessageError> {
    query_inbox(conn, recipient_id, page, false)
}

/// Lists messages delivered to a user that they have not read yet.
pub fn list_unread(
    conn: &Connection,
    recipient_id: Uuid,
    page: Page,
) -> Result<Vec<InboxEntry>, MessageError> {
    query_inbox(conn, recipient_id, page, true)
}

fn query_inbox(
    conn: &Connection,
    recipient_id: Uuid,
    page: Page,
    unread_only: bool,
) -> Result<Vec<InboxEntry>, MessageError> {
    ensure_user(conn, recipient_id)?;

    let unread_filter = if unread_only { "AND r.read = 0" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS}, u.email, r.read, r.read_at
         FROM message_recipients r
         JOIN messages m ON m.id = r.message_id
         JOIN users u ON u.id = m.sender_id
         WHERE r.recipient_id = ?1 {unread_filter}
         ORDER BY m.created_at ASC, m.rowid ASC
         LIMIT ?2 OFFSET ?3"
    ))?;

    let rows = stmt.query_map(
        params![recipient_id.to_string(), page.limit, page.offset],
        |row| {
            Ok(InboxEntry {
                message: map_row_to_message(row)?,
                sender_email: row.get(5)?,
                read: row.get(6)?,
                read_at: get_optional_timestamp(row, 7)?,
            })
        },
    )?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Marks a message as read for one recipient.
///
/// Returns [`MessageError::NotFound`] if the message does not exist,
/// [`MessageError::NotRecipient`] if the user was not addressed, and
/// [`MessageError::AlreadyRead`] on a second call.
pub fn mark_read(
    conn: &Connection,
    message_id: Uuid,
    recipient_id: Uuid,
) -> Result<RecipientRecord, MessageError> {
    let current = conn
        .query_row(
            "SELECT r.message_id, r.recipient_id, u.email, r.read, r.read_at
             FROM message_recipients r JOIN users u ON u.id = r.recipient_id
             WHERE r.message_id = ?1 AND r.recipient_id = ?2",
            [message_id.to_string(), recipient_id.to_string()],
            map_row_to_recipient,
        )
        .optional()?;

    let current = match current {
        Some(record) => record,
        None => {
            // Distinguish a missing message from a missing delivery.
            get_message(conn, message_id)?;
            return Err(MessageError::NotRecipient {
                message_id,
                recipient_id,
            });
        }
    };

    if current.read {
        return Err(MessageError::AlreadyRead {
            message_id,
            recipient_id,
        });
    }

    let read_at = courier_db::now();
    conn.execute(
        "UPDATE message_recipients SET read = 1, read_at = ?1
         WHERE message_id = ?2 AND recipient_id = ?3",
        params![
            format_timestamp(read_at),
            message_id.to_string(),
            recipient_id.to_string(),
        ],
    )?;

    Ok(RecipientRecord {
        read: true,
        read_at: Some(read_at),
        ..current
    })
}

/// Deletes a message and its deliveries.
pub fn delete_message(conn: &Connection, id: Uuid) -> Result<(), MessageError> {
    let count = conn.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
    if count == 0 {
        return Err(MessageError::NotFound(id));
    }
    Ok(())
}

fn ensure_user(conn: &Connection, id: Uuid) -> Result<(), MessageError> {
    if !courier_users::user_exists(conn, id)? {
        return Err(MessageError::UnknownUser(id));
    }
    Ok(())
}

fn map_reference_error(e: rusqlite::Error, user_id: Uuid) -> MessageError {
    match constraint_violation(&e) {
        Some(ConstraintViolation::ForeignKey) => MessageError::UnknownUser(user_id),
        _ => MessageError::Database(e),
    }
}

fn map_row_to_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: get_uuid(row, 0)?,
        sender_id: get_uuid(row, 1)?,
        subject: row.get(2)?,
        content: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
    })
}

fn map_row_to_recipient(row: &Row) -> rusqlite::Result<RecipientRecord> {
    Ok(RecipientRecord {
        message_id: get_uuid(row, 0)?,
        recipient_id: get_uuid(row, 1)?,
        email: row.get(2)?,
        read: row.get(3)?,
        read_at: get_optional_timestamp(row, 4)?,
    })
}
