//! Mailcache - client-side mail cache for a webmail list UI
//!
//! This crate provides:
//! - Domain models (EmailRecord, MailView, labels)
//! - An in-memory repository with label indices kept consistent on every write
//! - Paged, deduplicating fetches from a remote provider
//! - A list manager tying tab state, selection and mutations together
//! - A Gmail-backed provider and an in-memory one
//! - Read-side helpers for rendering rows
//!
//! Nothing here depends on a UI toolkit or an async runtime; provider calls
//! block, and callers choose the thread.

pub mod config;
pub mod error;
pub mod gmail;
pub mod list;
pub mod models;
pub mod provider;
pub mod query;
pub mod storage;
pub mod sync;

pub use self::config::{AccessToken, MailSettings};
pub use error::ActionError;
pub use gmail::{GmailProvider, StaticToken, TokenSource, normalize_message};
pub use list::{ListAction, ListListener, ListManager, ListState};
pub use models::{
    Attachment, Category, EmailAddress, EmailId, EmailRecord, FolderType, MailView, ThreadId,
    labels,
};
pub use provider::{InMemoryProvider, MailProvider, Page, ProviderCall};
pub use query::{EmailSummary, PageSlice, SortOrder, filter_text, paginate, sort_by_date, tab_counts};
pub use storage::{
    ChangeListener, ConsistencyError, EmailRepository, RecordPatch, ValidationReport,
};
pub use sync::{
    PageContext, PageOutcome, PaginationController, PaginationState, ScrollPosition,
    ScrollTrigger,
};
