//! Data transfer shapes and the validation contract for the Courier API.
//!
//! The types here are deliberately distinct from the persisted records in
//! `courier-users` and `courier-messages`: inbound shapes are validated into
//! typed values before any database work starts, and outbound shapes decide
//! which columns leave the service.

mod messages;
mod users;
pub mod validation;

pub use messages::{
    InboxMessage, MessageCreate, MessageDetail, NewMessage, ReadReceiptParams, RecipientStatus,
    SentMessage,
};
pub use users::{NewUser, UserChanges, UserCreate, UserFilter, UserPublic, UserUpdate};
pub use validation::{FieldError, Validate, ValidationError};

use serde::Deserialize;

/// Page size used when a listing request does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Upper bound on a listing page, regardless of what the client asks for.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Query string accepted by every listing endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl From<ListParams> for Page {
    fn from(params: ListParams) -> Self {
        Self {
            limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            offset: params.offset.unwrap_or(0),
        }
    }
}
