//! Label tokens, inbox categories and the derived mail views built on them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known Gmail system labels
pub mod labels {
    pub const INBOX: &str = "INBOX";
    pub const SENT: &str = "SENT";
    pub const DRAFT: &str = "DRAFT";
    pub const DRAFTS: &str = "DRAFTS";
    pub const TRASH: &str = "TRASH";
    pub const SPAM: &str = "SPAM";
    pub const UNREAD: &str = "UNREAD";
    pub const STARRED: &str = "STARRED";
    pub const IMPORTANT: &str = "IMPORTANT";
    pub const CATEGORY_PERSONAL: &str = "CATEGORY_PERSONAL";
    pub const CATEGORY_SOCIAL: &str = "CATEGORY_SOCIAL";
    pub const CATEGORY_PROMOTIONS: &str = "CATEGORY_PROMOTIONS";
    pub const CATEGORY_UPDATES: &str = "CATEGORY_UPDATES";

    /// Indices driven by record flags rather than `label_ids`
    pub const SYNTHETIC: [&str; 2] = [STARRED, IMPORTANT];

    /// Index keys created up front by a fresh repository
    pub const SYSTEM: [&str; 13] = [
        INBOX,
        SENT,
        DRAFT,
        DRAFTS,
        TRASH,
        SPAM,
        UNREAD,
        STARRED,
        IMPORTANT,
        CATEGORY_PERSONAL,
        CATEGORY_SOCIAL,
        CATEGORY_PROMOTIONS,
        CATEGORY_UPDATES,
    ];

    pub fn is_synthetic(label: &str) -> bool {
        SYNTHETIC.contains(&label)
    }
}

/// Gmail inbox category tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Primary,
    Social,
    Promotions,
    Updates,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Primary,
        Category::Social,
        Category::Promotions,
        Category::Updates,
    ];

    /// The `CATEGORY_<NAME>` label carried by member records
    pub fn label(self) -> &'static str {
        match self {
            Category::Primary => labels::CATEGORY_PERSONAL,
            Category::Social => labels::CATEGORY_SOCIAL,
            Category::Promotions => labels::CATEGORY_PROMOTIONS,
            Category::Updates => labels::CATEGORY_UPDATES,
        }
    }

    /// Name used in provider search queries (`category:<name>`)
    pub fn query_name(self) -> &'static str {
        match self {
            Category::Primary => "primary",
            Category::Social => "social",
            Category::Promotions => "promotions",
            Category::Updates => "updates",
        }
    }
}

/// Folder dimension of the category matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    All,
    Archive,
    Spam,
    Trash,
}

impl FolderType {
    pub const ALL: [FolderType; 4] = [
        FolderType::All,
        FolderType::Archive,
        FolderType::Spam,
        FolderType::Trash,
    ];
}

/// A derived view over the repository; doubles as the list tab identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailView {
    Inbox,
    Unread,
    Sent,
    Trash,
    Spam,
    Starred,
    Important,
    Archive,
    Drafts,
    AllMail,
    Category(Category, FolderType),
    /// Membership in a user-defined label
    Label(String),
}

impl MailView {
    /// The folder type a tab contributes when combined with a category
    pub fn folder_type(&self) -> Option<FolderType> {
        match self {
            MailView::Inbox | MailView::AllMail => Some(FolderType::All),
            MailView::Archive => Some(FolderType::Archive),
            MailView::Spam => Some(FolderType::Spam),
            MailView::Trash => Some(FolderType::Trash),
            MailView::Category(_, folder) => Some(*folder),
            _ => None,
        }
    }

    /// Stable tab name, also accepted by [`MailView::from_str`]
    pub fn name(&self) -> String {
        match self {
            MailView::Inbox => "all".to_string(),
            MailView::Unread => "unread".to_string(),
            MailView::Sent => "sent".to_string(),
            MailView::Trash => "trash".to_string(),
            MailView::Spam => "spam".to_string(),
            MailView::Starred => "starred".to_string(),
            MailView::Important => "important".to_string(),
            MailView::Archive => "archive".to_string(),
            MailView::Drafts => "drafts".to_string(),
            MailView::AllMail => "all-mail".to_string(),
            MailView::Category(category, folder) => {
                format!("{}-{}", category.query_name(), folder_name(*folder))
            }
            MailView::Label(name) => format!("label:{}", name),
        }
    }
}

fn folder_name(folder: FolderType) -> &'static str {
    match folder {
        FolderType::All => "all",
        FolderType::Archive => "archive",
        FolderType::Spam => "spam",
        FolderType::Trash => "trash",
    }
}

impl fmt::Display for MailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Error for unknown tab names
#[derive(Debug, thiserror::Error)]
#[error("unknown mail view: {0}")]
pub struct UnknownViewError(pub String);

impl FromStr for MailView {
    type Err = UnknownViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let view = match s {
            "all" | "inbox" => MailView::Inbox,
            "unread" => MailView::Unread,
            "sent" => MailView::Sent,
            "trash" => MailView::Trash,
            "spam" => MailView::Spam,
            "starred" => MailView::Starred,
            "important" => MailView::Important,
            "archive" => MailView::Archive,
            "drafts" => MailView::Drafts,
            "all-mail" => MailView::AllMail,
            other => {
                if let Some(name) = other.strip_prefix("label:") {
                    return Ok(MailView::Label(name.to_string()));
                }
                let (category, folder) = other
                    .split_once('-')
                    .ok_or_else(|| UnknownViewError(other.to_string()))?;
                let category = Category::ALL
                    .into_iter()
                    .find(|c| c.query_name() == category)
                    .ok_or_else(|| UnknownViewError(other.to_string()))?;
                let folder = FolderType::ALL
                    .into_iter()
                    .find(|f| folder_name(*f) == folder)
                    .ok_or_else(|| UnknownViewError(other.to_string()))?;
                MailView::Category(category, folder)
            }
        };
        Ok(view)
    }
}
