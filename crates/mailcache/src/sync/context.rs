//! Pagination context: which list is being paged, and the provider query for it

use std::fmt;

use crate::models::{FolderType, MailView};

/// Normalized identity of a pagination context
///
/// Two contexts with the same key page the same list, even if the raw
/// route differed (e.g. the message-detail sub-view of the same folder).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey(String);

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the pagination controller is currently fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub view: MailView,
    /// User label scope; takes priority over the view when building queries
    pub label: Option<String>,
    /// Route the list is shown under
    pub base_path: Option<String>,
}

impl PageContext {
    pub fn new(view: MailView) -> Self {
        Self {
            view,
            label: None,
            base_path: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn key(&self) -> ContextKey {
        let path = self
            .base_path
            .as_deref()
            .map(normalize_base_path)
            .unwrap_or_default();
        ContextKey(format!(
            "{}|{}|{}",
            self.view.name(),
            self.label.as_deref().unwrap_or(""),
            path
        ))
    }

    /// Provider search query; a label scope wins over the view
    pub fn query(&self) -> String {
        match &self.label {
            Some(label) => label_query(label),
            None => view_query(&self.view),
        }
    }
}

/// Fixed view -> provider query table
pub fn view_query(view: &MailView) -> String {
    match view {
        MailView::Inbox => "in:inbox -has:userlabels".to_string(),
        MailView::Unread => "in:inbox -has:userlabels is:unread".to_string(),
        MailView::Sent => "label:SENT".to_string(),
        MailView::Trash => "in:trash".to_string(),
        MailView::Spam => "in:spam".to_string(),
        MailView::Starred => "is:starred".to_string(),
        MailView::Important => "is:important".to_string(),
        MailView::Archive => "-in:inbox -in:spam -in:trash".to_string(),
        MailView::Drafts => "in:drafts".to_string(),
        MailView::AllMail => "-in:spam -in:trash".to_string(),
        MailView::Category(category, folder) => {
            let scope = match folder {
                FolderType::All => "-in:spam -in:trash",
                FolderType::Archive => "-in:inbox -in:spam -in:trash",
                FolderType::Spam => "in:spam",
                FolderType::Trash => "in:trash",
            };
            format!("category:{} {}", category.query_name(), scope)
        }
        MailView::Label(name) => label_query(name),
    }
}

/// `label:<name>` with whitespace and slashes folded to dashes, as Gmail expects
pub fn label_query(label: &str) -> String {
    let name: String = label
        .trim()
        .split(|c: char| c.is_whitespace() || c == '/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    format!("label:{}", name)
}

/// Strip query string, trailing slash, and any message/thread detail suffix
pub fn normalize_base_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment.eq_ignore_ascii_case("message") || segment.eq_ignore_ascii_case("thread") {
            break;
        }
        segments.push(segment);
    }

    format!("/{}", segments.join("/"))
}
