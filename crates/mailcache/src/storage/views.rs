//! Membership rules for derived views
//!
//! `view` and `count` on the repository both go through [`select`], so a
//! tab's badge can never disagree with its list.

use std::collections::HashMap;

use super::LabelIndex;
use crate::models::{EmailId, EmailRecord, FolderType, MailView, labels};

/// Whether `record` belongs to `view`, judged from the record alone
pub fn matches(view: &MailView, record: &EmailRecord) -> bool {
    match view {
        MailView::Inbox => {
            record.has_label(labels::INBOX)
                && !record.has_any_label(&[labels::SENT, labels::SPAM, labels::TRASH])
        }
        MailView::Unread => record.is_unread(),
        MailView::Sent => record.has_label(labels::SENT),
        MailView::Trash => record.has_label(labels::TRASH),
        MailView::Spam => record.has_label(labels::SPAM),
        MailView::Starred => record.is_starred || record.has_label(labels::STARRED),
        MailView::Important => record.is_important || record.has_label(labels::IMPORTANT),
        MailView::Archive => !record.has_any_label(&[labels::INBOX, labels::SPAM, labels::TRASH]),
        MailView::Drafts => record.has_any_label(&[labels::DRAFT, labels::DRAFTS]),
        MailView::AllMail => !record.has_any_label(&[labels::SPAM, labels::TRASH]),
        MailView::Category(category, folder) => {
            record.has_label(category.label()) && matches_folder(*folder, record)
        }
        MailView::Label(name) => record.has_label(name),
    }
}

fn matches_folder(folder: FolderType, record: &EmailRecord) -> bool {
    match folder {
        FolderType::All => matches(&MailView::AllMail, record),
        FolderType::Archive => matches(&MailView::Archive, record),
        FolderType::Spam => matches(&MailView::Spam, record),
        FolderType::Trash => matches(&MailView::Trash, record),
    }
}

/// Label whose index alone answers `view`
fn backing_label(view: &MailView) -> Option<&str> {
    match view {
        MailView::Sent => Some(labels::SENT),
        MailView::Trash => Some(labels::TRASH),
        MailView::Spam => Some(labels::SPAM),
        MailView::Label(name) => Some(name.as_str()),
        _ => None,
    }
}

/// Records currently in `view`
pub(crate) fn select<'a>(
    records: &'a HashMap<EmailId, EmailRecord>,
    index: &LabelIndex,
    view: &MailView,
) -> Vec<&'a EmailRecord> {
    match backing_label(view) {
        Some(label) => index
            .members(label)
            .map(|ids| ids.iter().filter_map(|id| records.get(id)).collect())
            .unwrap_or_default(),
        None => records.values().filter(|r| matches(view, r)).collect(),
    }
}
