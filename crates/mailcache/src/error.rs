//! Errors surfaced by list operations

use crate::models::EmailId;

/// A remote call made on behalf of the list failed
///
/// The repository is left untouched for the affected record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Failed to load messages for {query}: {message}")]
    Fetch { query: String, message: String },

    #[error("Failed to delete message {id}: {message}")]
    Delete { id: EmailId, message: String },

    #[error("Failed to mark message {id} as {}: {message}", read_state(.is_read))]
    MarkRead {
        id: EmailId,
        is_read: bool,
        message: String,
    },

    #[error("{failed} of {total} messages could not be {action}")]
    Partial {
        action: &'static str,
        failed: usize,
        total: usize,
    },
}

fn read_state(is_read: &bool) -> &'static str {
    if *is_read { "read" } else { "unread" }
}

impl ActionError {
    pub(crate) fn fetch(query: &str, err: &anyhow::Error) -> Self {
        Self::Fetch {
            query: query.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn delete(id: &EmailId, err: &anyhow::Error) -> Self {
        Self::Delete {
            id: id.clone(),
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn mark_read(id: &EmailId, is_read: bool, err: &anyhow::Error) -> Self {
        Self::MarkRead {
            id: id.clone(),
            is_read,
            message: format!("{:#}", err),
        }
    }
}
