//! Email record model: the value type held by the repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::label::labels;

/// Unique identifier for an email (provider message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmailId(pub String);

impl EmailId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EmailId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmailId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Conversation identifier. Informational only, never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "Jane Buyer")
    pub name: Option<String>,
    /// Email address (e.g., "jane@example.com")
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an address from a header value like `"Jane Buyer" <jane@example.com>`
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: email.to_string(),
            };
        }

        Self::new(s)
    }

    /// Name if present, otherwise the bare address
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Attachment metadata. The cache never inspects the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: Option<String>,
    pub size: Option<u32>,
}

/// One email message as known to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: EmailId,
    pub thread_id: ThreadId,
    /// Label tokens; treated as a set
    pub label_ids: Vec<String>,
    pub is_read: bool,
    pub is_starred: bool,
    pub is_important: bool,
    /// Sort key for derived views
    pub date: DateTime<Utc>,
    pub subject: String,
    pub from: EmailAddress,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl EmailRecord {
    pub fn builder(id: impl Into<EmailId>) -> EmailRecordBuilder {
        EmailRecordBuilder::new(id.into())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().any(|l| l == label)
    }

    pub fn has_any_label(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|label| self.has_label(label))
    }

    /// Unread by flag or by label
    pub fn is_unread(&self) -> bool {
        !self.is_read || self.has_label(labels::UNREAD)
    }

    pub(crate) fn add_label(&mut self, label: &str) {
        if !self.has_label(label) {
            self.label_ids.push(label.to_string());
        }
    }

    pub(crate) fn remove_label(&mut self, label: &str) {
        self.label_ids.retain(|l| l != label);
    }
}

/// Builder for creating EmailRecord instances
pub struct EmailRecordBuilder {
    record: EmailRecord,
}

impl EmailRecordBuilder {
    fn new(id: EmailId) -> Self {
        Self {
            record: EmailRecord {
                id,
                thread_id: ThreadId::default(),
                label_ids: Vec::new(),
                is_read: false,
                is_starred: false,
                is_important: false,
                date: Utc::now(),
                subject: String::new(),
                from: EmailAddress::default(),
                to: Vec::new(),
                snippet: String::new(),
                attachments: Vec::new(),
            },
        }
    }

    pub fn thread_id(mut self, thread_id: impl Into<ThreadId>) -> Self {
        self.record.thread_id = thread_id.into();
        self
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.record.label_ids = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<String>) -> Self {
        self.record.label_ids = label_ids;
        self
    }

    pub fn read(mut self, is_read: bool) -> Self {
        self.record.is_read = is_read;
        self
    }

    pub fn starred(mut self, is_starred: bool) -> Self {
        self.record.is_starred = is_starred;
        self
    }

    pub fn important(mut self, is_important: bool) -> Self {
        self.record.is_important = is_important;
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.record.date = date;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.record.subject = subject.into();
        self
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.record.from = from;
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.record.to = to;
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.record.snippet = snippet.into();
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.record.attachments = attachments;
        self
    }

    pub fn build(self) -> EmailRecord {
        self.record
    }
}
