//! Domain models for cached mail

mod label;
mod record;

pub use label::{Category, FolderType, MailView, UnknownViewError, labels};
pub use record::{Attachment, EmailAddress, EmailId, EmailRecord, EmailRecordBuilder, ThreadId};
