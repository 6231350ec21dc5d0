//! Row projection, ordering and slicing for list rendering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EmailId, EmailRecord, MailView, ThreadId};
use crate::storage::EmailRepository;

/// What a list row shows for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: EmailId,
    pub thread_id: ThreadId,
    pub subject: String,
    pub snippet: String,
    pub date: DateTime<Utc>,
    /// Display name of the sender, falling back to the address
    pub sender: String,
    pub sender_email: String,
    pub is_unread: bool,
    pub is_starred: bool,
    pub is_important: bool,
    pub has_attachments: bool,
}

impl From<&EmailRecord> for EmailSummary {
    fn from(record: &EmailRecord) -> Self {
        Self {
            id: record.id.clone(),
            thread_id: record.thread_id.clone(),
            subject: record.subject.clone(),
            snippet: record.snippet.clone(),
            date: record.date,
            sender: record.from.display_name().to_string(),
            sender_email: record.from.email.clone(),
            is_unread: record.is_unread(),
            is_starred: record.is_starred,
            is_important: record.is_important,
            has_attachments: !record.attachments.is_empty(),
        }
    }
}

impl From<EmailRecord> for EmailSummary {
    fn from(record: EmailRecord) -> Self {
        Self::from(&record)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Sort by date; ties fall back to id so the order is stable across calls
pub fn sort_by_date(records: &mut [EmailRecord], order: SortOrder) {
    records.sort_by(|a, b| {
        let by_date = match order {
            SortOrder::NewestFirst => b.date.cmp(&a.date),
            SortOrder::OldestFirst => a.date.cmp(&b.date),
        };
        by_date.then_with(|| a.id.cmp(&b.id))
    });
}

/// Keep records whose subject, snippet or sender contains `needle`
///
/// Case-insensitive. A blank needle keeps everything.
pub fn filter_text(records: Vec<EmailRecord>, needle: &str) -> Vec<EmailRecord> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|r| {
            r.subject.to_lowercase().contains(&needle)
                || r.snippet.to_lowercase().contains(&needle)
                || r.from.email.to_lowercase().contains(&needle)
                || r
                    .from
                    .name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .collect()
}

/// One page of an in-memory list
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    /// 1-based page number actually returned
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Slice `items` into pages of `page_size` and return page `page` (1-based)
///
/// Out-of-range pages are clamped to the last page; an empty list has one
/// empty page.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> PageSlice<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    PageSlice {
        items,
        page,
        total_pages,
        total,
    }
}

/// Record count per view, in the order given
pub fn tab_counts(repository: &EmailRepository, views: &[MailView]) -> Vec<(MailView, usize)> {
    views
        .iter()
        .map(|view| (view.clone(), repository.count(view)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailAddress;
    use chrono::{Duration, TimeZone};

    fn make_test_record(id: &str, hours_ago: i64, subject: &str) -> EmailRecord {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        EmailRecord::builder(id)
            .labels(&["INBOX"])
            .subject(subject)
            .from(EmailAddress::with_name("Ada Lovelace", "ada@example.com"))
            .date(base - Duration::hours(hours_ago))
            .build()
    }

    #[test]
    fn test_sort_newest_first() {
        let mut records = vec![
            make_test_record("a", 5, "old"),
            make_test_record("b", 1, "new"),
            make_test_record("c", 3, "mid"),
        ];
        sort_by_date(&mut records, SortOrder::NewestFirst);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        sort_by_date(&mut records, SortOrder::OldestFirst);
        assert_eq!(records[0].id.as_str(), "a");
    }

    #[test]
    fn test_sort_ties_by_id() {
        let mut records = vec![make_test_record("z", 1, "x"), make_test_record("a", 1, "x")];
        sort_by_date(&mut records, SortOrder::NewestFirst);
        assert_eq!(records[0].id.as_str(), "a");
    }

    #[test]
    fn test_filter_text() {
        let records = vec![
            make_test_record("a", 1, "Quarterly Report"),
            make_test_record("b", 2, "Lunch?"),
        ];
        let hits = filter_text(records.clone(), "report");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "a");

        // Sender name matches every record
        assert_eq!(filter_text(records.clone(), "lovelace").len(), 2);
        assert_eq!(filter_text(records, "  ").len(), 2);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=7).collect();

        let slice = paginate(items.clone(), 1, 3);
        assert_eq!(slice.items, vec![1, 2, 3]);
        assert_eq!(slice.total_pages, 3);
        assert_eq!(slice.total, 7);

        let slice = paginate(items.clone(), 3, 3);
        assert_eq!(slice.items, vec![7]);

        let slice = paginate(items, 10, 3);
        assert_eq!(slice.page, 3);

        let empty = paginate(Vec::<u32>::new(), 1, 3);
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_pages, 1);
    }

    #[test]
    fn test_summary_projection() {
        let record = make_test_record("a", 1, "Hello");
        let summary = EmailSummary::from(&record);
        assert_eq!(summary.sender, "Ada Lovelace");
        assert_eq!(summary.sender_email, "ada@example.com");
        assert!(summary.is_unread);
        assert!(!summary.has_attachments);
    }

    #[test]
    fn test_tab_counts() {
        let repository = EmailRepository::new();
        repository.add_record(make_test_record("a", 1, "x"));
        repository.add_record(
            EmailRecord::builder("b")
                .labels(&["SENT"])
                .read(true)
                .build(),
        );

        let counts = tab_counts(&repository, &[MailView::Inbox, MailView::Sent, MailView::Trash]);
        assert_eq!(
            counts,
            vec![(MailView::Inbox, 1), (MailView::Sent, 1), (MailView::Trash, 0)]
        );
    }
}
