//! The email repository: master record map plus label indices
//!
//! Every mutation runs under a single write lock and finishes its index
//! updates before returning, so readers never observe a half-applied change.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::validate::{self, ValidationReport};
use super::views;
use super::LabelIndex;
use crate::models::{EmailId, EmailRecord, MailView, labels};

/// Receives a signal after every repository mutation that changed state
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, revision: u64);
}

/// Flag changes applied through [`EmailRepository::update_record`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub is_read: Option<bool>,
    pub is_starred: Option<bool>,
    pub is_important: Option<bool>,
}

impl RecordPatch {
    pub fn read(is_read: bool) -> Self {
        Self {
            is_read: Some(is_read),
            ..Self::default()
        }
    }

    pub fn starred(is_starred: bool) -> Self {
        Self {
            is_starred: Some(is_starred),
            ..Self::default()
        }
    }

    pub fn important(is_important: bool) -> Self {
        Self {
            is_important: Some(is_important),
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct RepositoryState {
    records: HashMap<EmailId, EmailRecord>,
    index: LabelIndex,
}

impl RepositoryState {
    /// Put `record` into the master map and every index it belongs to.
    /// The caller must have removed any previous version first.
    fn install(&mut self, mut record: EmailRecord) {
        let mut seen = Vec::with_capacity(record.label_ids.len());
        record.label_ids.retain(|label| {
            if seen.contains(label) {
                false
            } else {
                seen.push(label.clone());
                true
            }
        });

        // A synthetic label in label_ids implies the flag
        record.is_starred |= record.has_label(labels::STARRED);
        record.is_important |= record.has_label(labels::IMPORTANT);

        for label in &record.label_ids {
            if !labels::is_synthetic(label) {
                self.index.insert(label, &record.id);
            }
        }
        if record.is_starred {
            self.index.insert(labels::STARRED, &record.id);
        }
        if record.is_important {
            self.index.insert(labels::IMPORTANT, &record.id);
        }

        self.records.insert(record.id.clone(), record);
    }

    /// Take `id` out of the master map and every index
    fn uninstall(&mut self, id: &EmailId) -> Option<EmailRecord> {
        let record = self.records.remove(id);
        self.index.remove_everywhere(id);
        record
    }
}

/// Shared in-memory cache of email records
///
/// Hand out as `Arc<EmailRepository>`; each holder sees the same state.
pub struct EmailRepository {
    state: RwLock<RepositoryState>,
    revision: AtomicU64,
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
}

impl EmailRepository {
    /// Create an empty repository with the system label indices in place
    pub fn new() -> Self {
        let repository = Self {
            state: RwLock::new(RepositoryState::default()),
            revision: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
        };
        repository.init_label_indices(&labels::SYSTEM);
        repository
    }

    fn read(&self) -> RwLockReadGuard<'_, RepositoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RepositoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn changed(&self) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_change(revision);
        }
    }

    /// Register a listener for change notifications
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of state-changing mutations so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Create empty indices for `labels` if they don't exist yet
    pub fn init_label_indices(&self, labels: &[&str]) {
        let mut state = self.write();
        for label in labels {
            state.index.ensure(label);
        }
    }

    // === Mutations ===

    /// Insert or replace a record
    ///
    /// Replacing drops every index membership of the old version before the
    /// new version's memberships are installed. Records with an empty id are
    /// logged and skipped. Returns whether the record was stored.
    pub fn add_record(&self, record: EmailRecord) -> bool {
        if record.id.is_empty() {
            warn!(
                "Skipping email record without id (subject: {:?})",
                record.subject
            );
            return false;
        }

        {
            let mut state = self.write();
            if state.uninstall(&record.id).is_some() {
                debug!("Replacing cached record {}", record.id);
            }
            state.install(record);
        }
        self.changed();
        true
    }

    /// Bulk [`add_record`](Self::add_record). Returns how many were stored.
    pub fn add_records(&self, records: impl IntoIterator<Item = EmailRecord>) -> usize {
        let mut stored = 0;
        let mut skipped = 0;
        {
            let mut state = self.write();
            for record in records {
                if record.id.is_empty() {
                    skipped += 1;
                    continue;
                }
                state.uninstall(&record.id);
                state.install(record);
                stored += 1;
            }
        }
        if skipped > 0 {
            warn!("Skipped {} email records without id", skipped);
        }
        if stored > 0 {
            self.changed();
        }
        stored
    }

    /// Remove a record and all its index memberships. Unknown ids are a no-op.
    pub fn delete_record(&self, id: &EmailId) -> Option<EmailRecord> {
        let removed = self.write().uninstall(id);
        if removed.is_some() {
            self.changed();
        }
        removed
    }

    /// Relabel a record: `label_ids` becomes `(old - from) ∪ to`
    ///
    /// `STARRED` and `IMPORTANT` in either list set or clear the matching flag.
    /// Returns false (and logs) when the id is unknown.
    pub fn move_record(&self, id: &EmailId, from: &[&str], to: &[&str]) -> bool {
        {
            let mut state = self.write();
            let Some(mut record) = state.uninstall(id) else {
                drop(state);
                warn!("Cannot move unknown record {}", id);
                return false;
            };

            record.label_ids.retain(|label| !from.contains(&label.as_str()));
            for label in from {
                match *label {
                    labels::STARRED => record.is_starred = false,
                    labels::IMPORTANT => record.is_important = false,
                    _ => {}
                }
            }
            for label in to {
                record.add_label(label);
            }

            state.install(record);
        }
        debug!("Moved record {} from {:?} to {:?}", id, from, to);
        self.changed();
        true
    }

    /// Apply flag changes, keeping labels and synthetic indices in step
    ///
    /// Marking read drops `UNREAD`; clearing starred/important drops the
    /// matching label. Returns false when the id is unknown.
    pub fn update_record(&self, id: &EmailId, patch: RecordPatch) -> bool {
        {
            let mut state = self.write();
            let Some(mut record) = state.uninstall(id) else {
                drop(state);
                warn!("Cannot update unknown record {}", id);
                return false;
            };

            if let Some(is_read) = patch.is_read {
                record.is_read = is_read;
                if is_read {
                    record.remove_label(labels::UNREAD);
                }
            }
            if let Some(is_starred) = patch.is_starred {
                record.is_starred = is_starred;
                if !is_starred {
                    record.remove_label(labels::STARRED);
                }
            }
            if let Some(is_important) = patch.is_important {
                record.is_important = is_important;
                if !is_important {
                    record.remove_label(labels::IMPORTANT);
                }
            }

            state.install(record);
        }
        self.changed();
        true
    }

    /// Drop every record and every index key
    ///
    /// Call [`init_label_indices`](Self::init_label_indices) afterwards if
    /// empty keys are needed.
    pub fn clear(&self) {
        {
            let mut state = self.write();
            state.records.clear();
            state.index.clear();
        }
        info!("Cleared email repository");
        self.changed();
    }

    // === Queries ===

    pub fn get(&self, id: &EmailId) -> Option<EmailRecord> {
        self.read().records.get(id).cloned()
    }

    pub fn has(&self, id: &EmailId) -> bool {
        self.read().records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Records in `view`, freshly materialized in no particular order
    pub fn view(&self, view: &MailView) -> Vec<EmailRecord> {
        let state = self.read();
        views::select(&state.records, &state.index, view)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Ids in `view`
    pub fn view_ids(&self, view: &MailView) -> Vec<EmailId> {
        let state = self.read();
        views::select(&state.records, &state.index, view)
            .into_iter()
            .map(|r| r.id.clone())
            .collect()
    }

    /// Size of `view`; same rule as [`view`](Self::view)
    pub fn count(&self, view: &MailView) -> usize {
        let state = self.read();
        views::select(&state.records, &state.index, view).len()
    }

    /// Every index key, including empty ones
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.read().index.labels().map(str::to_string).collect();
        labels.sort();
        labels
    }

    /// Ids in the index for `label`
    pub fn label_members(&self, label: &str) -> Vec<EmailId> {
        self.read()
            .index
            .members(label)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check every index/master invariant against the current state
    pub fn validate(&self) -> ValidationReport {
        let state = self.read();
        let report = validate::check(&state.records, &state.index);
        drop(state);

        if !report.valid {
            for error in &report.errors {
                warn!("Repository consistency violation: {}", error);
            }
        }
        report
    }
}

impl Default for EmailRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn record(id: &str, labels: &[&str]) -> EmailRecord {
        EmailRecord::builder(id).labels(labels).read(true).build()
    }

    #[test]
    fn test_add_and_get() {
        let repo = EmailRepository::new();
        assert!(repo.add_record(record("m1", &["INBOX"])));

        assert!(repo.has(&EmailId::new("m1")));
        assert_eq!(repo.get(&EmailId::new("m1")).unwrap().label_ids, vec!["INBOX"]);
        assert_eq!(repo.label_members("INBOX"), vec![EmailId::new("m1")]);
    }

    #[test]
    fn test_add_without_id_is_skipped() {
        let repo = EmailRepository::new();
        assert!(!repo.add_record(record("", &["INBOX"])));
        assert!(repo.is_empty());
        assert!(repo.label_members("INBOX").is_empty());
    }

    #[test]
    fn test_upsert_replaces_memberships() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["Label_A"]));
        repo.add_record(record("m1", &["Label_B"]));

        assert!(repo.label_members("Label_A").is_empty());
        assert_eq!(repo.label_members("Label_B"), vec![EmailId::new("m1")]);
        assert_eq!(repo.len(), 1);
        assert!(repo.validate().valid);
    }

    #[test]
    fn test_upsert_clears_synthetic_memberships() {
        let repo = EmailRepository::new();
        let mut starred = record("m1", &["INBOX"]);
        starred.is_starred = true;
        repo.add_record(starred);
        assert_eq!(repo.count(&MailView::Starred), 1);

        repo.add_record(record("m1", &["INBOX"]));
        assert!(repo.label_members("STARRED").is_empty());
        assert_eq!(repo.count(&MailView::Starred), 0);
    }

    #[test]
    fn test_duplicate_labels_collapsed() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX", "INBOX", "UNREAD"]));
        assert_eq!(
            repo.get(&EmailId::new("m1")).unwrap().label_ids,
            vec!["INBOX", "UNREAD"]
        );
    }

    #[test]
    fn test_starred_label_sets_flag() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX", "STARRED"]));

        let stored = repo.get(&EmailId::new("m1")).unwrap();
        assert!(stored.is_starred);
        assert_eq!(repo.label_members("STARRED"), vec![EmailId::new("m1")]);
        assert!(repo.validate().valid);
    }

    #[test]
    fn test_delete_removes_everywhere() {
        let repo = EmailRepository::new();
        let mut r = record("m1", &["INBOX", "Label_9", "CATEGORY_SOCIAL"]);
        r.is_important = true;
        repo.add_record(r);

        assert!(repo.delete_record(&EmailId::new("m1")).is_some());
        assert!(!repo.has(&EmailId::new("m1")));
        for label in repo.labels() {
            assert!(repo.label_members(&label).is_empty(), "{} still has m1", label);
        }
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let repo = EmailRepository::new();
        let before = repo.revision();
        assert!(repo.delete_record(&EmailId::new("missing")).is_none());
        assert_eq!(repo.revision(), before);
    }

    #[test]
    fn test_move_record() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX", "UNREAD"]));

        assert!(repo.move_record(&EmailId::new("m1"), &["INBOX"], &["TRASH"]));

        let moved = repo.get(&EmailId::new("m1")).unwrap();
        assert_eq!(moved.label_ids, vec!["UNREAD", "TRASH"]);
        assert_eq!(repo.count(&MailView::Inbox), 0);
        assert_eq!(repo.count(&MailView::Trash), 1);
        assert!(repo.validate().valid);
    }

    #[test]
    fn test_move_creates_new_index() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX"]));
        repo.move_record(&EmailId::new("m1"), &[], &["Label_new"]);

        assert!(repo.labels().contains(&"Label_new".to_string()));
        assert_eq!(repo.label_members("Label_new"), vec![EmailId::new("m1")]);
    }

    #[test]
    fn test_move_synthetic_label_flips_flag() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX"]));

        repo.move_record(&EmailId::new("m1"), &[], &["STARRED"]);
        assert!(repo.get(&EmailId::new("m1")).unwrap().is_starred);

        repo.move_record(&EmailId::new("m1"), &["STARRED"], &[]);
        let stored = repo.get(&EmailId::new("m1")).unwrap();
        assert!(!stored.is_starred);
        assert!(!stored.has_label("STARRED"));
        assert!(repo.validate().valid);
    }

    #[test]
    fn test_move_unknown_is_noop() {
        let repo = EmailRepository::new();
        assert!(!repo.move_record(&EmailId::new("missing"), &["INBOX"], &["TRASH"]));
        assert!(repo.label_members("TRASH").is_empty());
    }

    #[test]
    fn test_update_flags() {
        let repo = EmailRepository::new();
        repo.add_record(
            EmailRecord::builder("m1")
                .labels(&["INBOX", "UNREAD", "STARRED"])
                .build(),
        );
        let id = EmailId::new("m1");

        repo.update_record(&id, RecordPatch::read(true));
        let stored = repo.get(&id).unwrap();
        assert!(stored.is_read);
        assert!(!stored.has_label("UNREAD"));
        assert_eq!(repo.count(&MailView::Unread), 0);

        repo.update_record(&id, RecordPatch::starred(false));
        assert_eq!(repo.count(&MailView::Starred), 0);
        assert!(repo.label_members("STARRED").is_empty());

        repo.update_record(&id, RecordPatch::important(true));
        assert_eq!(repo.label_members("IMPORTANT"), vec![id.clone()]);
        assert!(repo.validate().valid);
    }

    #[test]
    fn test_update_unknown() {
        let repo = EmailRepository::new();
        assert!(!repo.update_record(&EmailId::new("missing"), RecordPatch::read(true)));
    }

    #[test]
    fn test_clear_drops_index_keys() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX"]));
        repo.clear();

        assert!(repo.is_empty());
        assert!(repo.labels().is_empty());

        repo.init_label_indices(&["INBOX"]);
        assert_eq!(repo.labels(), vec!["INBOX"]);
    }

    #[test]
    fn test_count_matches_view() {
        let repo = EmailRepository::new();
        repo.add_record(record("m1", &["INBOX"]));
        repo.add_record(record("m2", &["SENT"]));
        repo.add_record(record("m3", &["INBOX", "SPAM"]));

        for view in [MailView::Inbox, MailView::Sent, MailView::Spam, MailView::AllMail] {
            assert_eq!(repo.count(&view), repo.view(&view).len());
        }
        assert_eq!(repo.count(&MailView::AllMail), 2);
    }

    #[test]
    fn test_listener_notified_on_change() {
        struct Counter(AtomicUsize);
        impl ChangeListener for Counter {
            fn on_change(&self, _revision: u64) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let repo = EmailRepository::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        repo.subscribe(counter.clone());

        repo.add_record(record("m1", &["INBOX"]));
        repo.delete_record(&EmailId::new("m1"));
        repo.delete_record(&EmailId::new("m1"));

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(repo.revision(), 2);
    }
}
