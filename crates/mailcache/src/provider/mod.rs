//! Remote mail provider abstraction
//!
//! The cache never talks to a mail service directly; it goes through
//! [`MailProvider`]. [`GmailProvider`](crate::gmail::GmailProvider) is the
//! production implementation, [`InMemoryProvider`] backs tests and offline runs.

mod memory;

use anyhow::Result;

use crate::models::{EmailId, EmailRecord};

pub use memory::{InMemoryProvider, ProviderCall};

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<EmailRecord>,
    pub next_page_token: Option<String>,
}

/// Operations the cache needs from a remote mail service
///
/// Calls block until the remote answers; callers decide which thread that is.
pub trait MailProvider: Send + Sync {
    /// Fetch one page of messages matching a provider search query
    fn fetch_page(&self, query: &str, page_size: usize, page_token: Option<&str>) -> Result<Page>;

    /// Delete (move to trash) a message
    fn delete(&self, id: &EmailId) -> Result<()>;

    /// Set the read state of a message
    fn mark_read(&self, id: &EmailId, is_read: bool) -> Result<()>;
}
