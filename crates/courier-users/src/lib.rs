//! User records and persistence for Courier.
//!
//! Users own the messages they send. Every function takes a plain
//! [`Connection`]; callers pass a transaction when the operation belongs to a
//! larger unit of work.

use chrono::{DateTime, Utc};
use courier_db::{
    constraint_violation, format_timestamp, get_timestamp, get_uuid, ConstraintViolation,
};
use courier_types::{NewUser, Page, UserChanges, UserPublic};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("user not found: {0}")]
    NotFound(Uuid),
    #[error("email already registered: {0}")]
    EmailTaken(String),
}

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Unique, stored lowercase.
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, email, name, created_at";

/// Inserts a new user with a fresh id and the current time.
pub fn create_user(conn: &Connection, new_user: &NewUser) -> Result<User, UserError> {
    let user = User {
        id: Uuid::new_v4(),
        email: new_user.email.clone(),
        name: new_user.name.clone(),
        created_at: courier_db::now(),
    };

    conn.execute(
        "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            user.id.to_string(),
            user.email,
            user.name,
            format_timestamp(user.created_at),
        ],
    )
    .map_err(|e| map_write_error(e, &new_user.email))?;

    tracing::debug!(user_id = %user.id, "user inserted");
    Ok(user)
}

/// Retrieves a user by id.
pub fn get_user(conn: &Connection, id: Uuid) -> Result<User, UserError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id.to_string()],
        map_row_to_user,
    )
    .optional()?
    .ok_or(UserError::NotFound(id))
}

/// Looks up a user by email. The email is compared in its normalized form.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, UserError> {
    let email = email.trim().to_lowercase();
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email],
            map_row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Returns `true` if a user with this id exists.
pub fn user_exists(conn: &Connection, id: Uuid) -> Result<bool, UserError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Lists users in creation order.
pub fn list_users(conn: &Connection, page: Page) -> Result<Vec<User>, UserError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         ORDER BY created_at ASC, rowid ASC
         LIMIT ?1 OFFSET ?2"
    ))?;

    let rows = stmt.query_map(params![page.limit, page.offset], map_row_to_user)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Updates an existing user using a single atomic UPDATE statement.
///
/// Only fields that are `Some` in `changes` are modified. An empty change set
/// returns the current record unchanged. Applying the same changes twice
/// leaves the same row.
pub fn update_user(conn: &Connection, id: Uuid, changes: &UserChanges) -> Result<User, UserError> {
    if changes.is_empty() {
        return get_user(conn, id);
    }

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

    if let Some(email) = &changes.email {
        values.push(email);
        set_parts.push(format!("email = ?{}", values.len()));
    }
    if let Some(name) = &changes.name {
        values.push(name);
        set_parts.push(format!("name = ?{}", values.len()));
    }

    let id_text = id.to_string();
    values.push(&id_text);
    let sql = format!(
        "UPDATE users SET {} WHERE id = ?{} RETURNING {USER_COLUMNS}",
        set_parts.join(", "),
        values.len()
    );

    let taken_email = changes.email.as_deref().unwrap_or_default();
    conn.query_row(&sql, values.as_slice(), map_row_to_user)
        .optional()
        .map_err(|e| map_write_error(e, taken_email))?
        .ok_or(UserError::NotFound(id))
}

/// Deletes a user. Their sent messages and inbox entries go with them.
pub fn delete_user(conn: &Connection, id: Uuid) -> Result<(), UserError> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
    if count == 0 {
        return Err(UserError::NotFound(id));
    }
    Ok(())
}

fn map_write_error(e: rusqlite::Error, email: &str) -> UserError {
    match constraint_violation(&e) {
        Some(ConstraintViolation::Unique) => UserError::EmailTaken(email.to_string()),
        _ => UserError::Database(e),
    }
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: get_timestamp(row, 3)?,
    })
}
