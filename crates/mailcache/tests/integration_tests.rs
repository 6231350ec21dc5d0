//! Integration tests for the mail cache
//!
//! These drive the public API end to end: provider pages into the
//! repository, list manager state on top.

use std::sync::Arc;

use mailcache::{
    Category, EmailId, EmailRecord, EmailRepository, FolderType, InMemoryProvider, ListManager,
    MailSettings, MailView, PageContext, PageOutcome, PaginationController, RecordPatch, labels,
};

const INBOX_QUERY: &str = "in:inbox -has:userlabels";

/// Helper to create test records
fn make_record(id: &str, label_ids: &[&str]) -> EmailRecord {
    EmailRecord::builder(id)
        .labels(label_ids)
        .subject(format!("Subject {}", id))
        .build()
}

fn make_manager() -> (Arc<InMemoryProvider>, Arc<EmailRepository>, ListManager) {
    let provider = Arc::new(InMemoryProvider::new());
    let repository = Arc::new(EmailRepository::new());
    let manager = ListManager::new(repository.clone(), provider.clone(), &MailSettings::default());
    (provider, repository, manager)
}

fn ids(records: &[EmailRecord]) -> Vec<&str> {
    let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    ids
}

fn every_view() -> Vec<MailView> {
    let mut views = vec![
        MailView::Inbox,
        MailView::Unread,
        MailView::Sent,
        MailView::Trash,
        MailView::Spam,
        MailView::Starred,
        MailView::Important,
        MailView::Archive,
        MailView::Drafts,
        MailView::AllMail,
        MailView::Label("Receipts".to_string()),
    ];
    for category in Category::ALL {
        for folder in FolderType::ALL {
            views.push(MailView::Category(category, folder));
        }
    }
    views
}

/// Minimal linear congruential generator so the op sequence is reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn test_mutation_sequences_stay_consistent() {
    const LABELS: [&str; 8] = [
        "INBOX",
        "SENT",
        "TRASH",
        "STARRED",
        "IMPORTANT",
        "UNREAD",
        "CATEGORY_SOCIAL",
        "Receipts",
    ];

    let repository = EmailRepository::new();
    repository.init_label_indices(&labels::SYSTEM);

    for seed in 1..=8u64 {
        let mut rng = Lcg(seed);
        for _ in 0..300 {
            let id = EmailId::new(format!("m{}", rng.next(12)));
            let pick = |rng: &mut Lcg| -> Vec<&str> {
                (0..rng.next(3)).map(|_| LABELS[rng.next(LABELS.len())]).collect()
            };

            match rng.next(5) {
                0 | 1 => {
                    let label_ids = pick(&mut rng);
                    let record = EmailRecord::builder(id.clone())
                        .labels(&label_ids)
                        .starred(rng.next(2) == 0)
                        .important(rng.next(3) == 0)
                        .read(rng.next(2) == 0)
                        .build();
                    repository.add_record(record);
                }
                2 => {
                    repository.delete_record(&id);
                }
                3 => {
                    let from = pick(&mut rng);
                    let to = pick(&mut rng);
                    repository.move_record(&id, &from, &to);
                }
                _ => {
                    let patch = match rng.next(3) {
                        0 => RecordPatch::read(rng.next(2) == 0),
                        1 => RecordPatch::starred(rng.next(2) == 0),
                        _ => RecordPatch::important(rng.next(2) == 0),
                    };
                    repository.update_record(&id, patch);
                }
            }

            let report = repository.validate();
            assert!(report.valid, "seed {}: {:?}", seed, report.errors);
        }

        // Flags and synthetic indices agree for every record
        let starred = repository.label_members(labels::STARRED);
        let important = repository.label_members(labels::IMPORTANT);
        for n in 0..12 {
            if let Some(record) = repository.get(&EmailId::new(format!("m{}", n))) {
                assert_eq!(record.is_starred, starred.contains(&record.id));
                assert_eq!(record.is_important, important.contains(&record.id));
            }
        }

        // Derived views never reference ids outside the master map
        for view in every_view() {
            for record in repository.view(&view) {
                assert!(repository.has(&record.id), "{} dangling in {}", record.id, view);
            }
            assert_eq!(repository.view(&view).len(), repository.count(&view));
        }

        repository.clear();
    }
}

#[test]
fn test_upsert_replaces_labels() {
    let repository = EmailRepository::new();
    repository.add_record(make_record("x", &["A"]));
    repository.add_record(make_record("x", &["B"]));

    assert!(repository.label_members("A").is_empty());
    assert_eq!(repository.label_members("B"), vec![EmailId::new("x")]);
    assert_eq!(repository.len(), 1);
    assert!(repository.validate().valid);
}

#[test]
fn test_delete_removes_from_every_index() {
    let repository = EmailRepository::new();
    repository.add_record(
        EmailRecord::builder("m1")
            .labels(&["INBOX", "Receipts", "CATEGORY_SOCIAL"])
            .starred(true)
            .important(true)
            .build(),
    );

    assert!(repository.delete_record(&EmailId::new("m1")).is_some());
    for label in repository.labels() {
        assert!(
            repository.label_members(&label).is_empty(),
            "m1 left in {}",
            label
        );
    }
    assert!(repository.delete_record(&EmailId::new("m1")).is_none());
}

#[test]
fn test_same_page_twice_counts_duplicates() {
    let provider = Arc::new(InMemoryProvider::new());
    let repository = Arc::new(EmailRepository::new());
    let page: Vec<EmailRecord> = (0..4).map(|i| make_record(&format!("m{}", i), &["INBOX"])).collect();
    provider.push_page(INBOX_QUERY, page.clone());
    provider.push_page(INBOX_QUERY, page);

    let pager = PaginationController::new(
        provider.clone(),
        repository.clone(),
        50,
        PageContext::new(MailView::Inbox),
    );

    let first = pager.load_page(None, true).unwrap();
    assert!(matches!(first, PageOutcome::Loaded { added: 4, duplicates: 0, .. }));
    let after_first = pager.accumulated();

    let second = pager.load_more().unwrap();
    assert!(matches!(second, PageOutcome::Loaded { added: 0, duplicates: 4, .. }));
    assert_eq!(pager.accumulated(), after_first);
    assert_eq!(repository.len(), 4);
}

#[test]
fn test_select_all_on_sent_is_scoped() {
    let (_, repository, manager) = make_manager();
    repository.add_record(make_record("in1", &["INBOX"]));
    repository.add_record(make_record("sent1", &["SENT"]));
    repository.add_record(make_record("sent2", &["SENT", "INBOX"]));

    manager.set_tab(MailView::Sent);
    manager.select_all();

    assert_eq!(
        manager.selected_ids(),
        vec![EmailId::new("sent1"), EmailId::new("sent2")]
    );
}

// === Scenarios ===

#[test]
fn test_scenario_lifecycle() {
    let repository = EmailRepository::new();
    let m1 = EmailId::new("m1");

    // 1. Add an unread inbox message
    repository.add_record(EmailRecord::builder("m1").labels(&["INBOX"]).read(false).build());
    assert_eq!(ids(&repository.view(&MailView::Inbox)), vec!["m1"]);
    assert_eq!(ids(&repository.view(&MailView::Unread)), vec!["m1"]);
    assert_eq!(repository.count(&"all".parse().unwrap()), 1);
    assert_eq!(repository.count(&"unread".parse().unwrap()), 1);

    // 2. Star it
    assert!(repository.update_record(&m1, RecordPatch::starred(true)));
    assert_eq!(ids(&repository.view(&MailView::Starred)), vec!["m1"]);
    assert!(repository.validate().valid);

    // 3. Move it to trash
    assert!(repository.move_record(&m1, &["INBOX"], &["TRASH"]));
    assert!(repository.view(&MailView::Inbox).is_empty());
    assert_eq!(ids(&repository.view(&MailView::Trash)), vec!["m1"]);
    assert_eq!(repository.get(&m1).unwrap().label_ids, vec!["TRASH".to_string()]);

    // 5. Delete it
    repository.delete_record(&m1);
    assert!(!repository.has(&m1));
    assert!(repository.get(&m1).is_none());
    for view in every_view() {
        assert_eq!(repository.count(&view), 0, "{} not empty", view);
    }
    assert!(repository.validate().valid);
}

#[test]
fn test_scenario_append_with_existing_id() {
    let (provider, _, manager) = make_manager();
    provider.push_page(INBOX_QUERY, vec![make_record("m1", &["INBOX"])]);
    provider.push_page(
        INBOX_QUERY,
        vec![make_record("m1", &["INBOX"]), make_record("m2", &["INBOX"])],
    );

    manager.load().unwrap();
    let outcome = manager.load_more().unwrap();

    assert_eq!(
        outcome,
        PageOutcome::Loaded {
            fetched: 2,
            added: 1,
            duplicates: 1,
            next_page_token: None,
        }
    );
    assert_eq!(
        manager.pager().accumulated(),
        vec![EmailId::new("m1"), EmailId::new("m2")]
    );
}

#[test]
fn test_scenario_tab_switch_clears_selection() {
    let (_, repository, manager) = make_manager();
    repository.add_record(make_record("m1", &["INBOX"]));
    repository.add_record(make_record("m2", &["INBOX"]));

    manager.set_tab("all".parse().unwrap());
    manager.toggle_select(&EmailId::new("m1"));
    manager.toggle_select(&EmailId::new("m2"));
    assert_eq!(manager.state().selected.len(), 2);

    manager.set_tab("sent".parse().unwrap());
    assert!(manager.state().selected.is_empty());
}

#[test]
fn test_failed_remote_mutation_is_reported_not_applied() {
    let (provider, repository, manager) = make_manager();
    repository.add_record(make_record("m1", &["INBOX", "UNREAD"]));
    provider.fail_for(&EmailId::new("m1"));

    let err = manager.mark_read(&EmailId::new("m1"), true).unwrap_err();
    assert!(err.to_string().contains("m1"));

    let record = repository.get(&EmailId::new("m1")).unwrap();
    assert!(!record.is_read);
    assert!(record.has_label("UNREAD"));
    assert_eq!(manager.state().error, Some(err.to_string()));
}

#[test]
fn test_label_scope_pages_by_label_query() {
    let (provider, repository, manager) = make_manager();
    provider.push_page("label:Travel-Plans", vec![make_record("t1", &["Travel/Plans"])]);

    manager.set_label(Some("Travel Plans".to_string()));
    manager.load().unwrap();

    assert!(repository.has(&EmailId::new("t1")));
    assert_eq!(manager.state().active_label.as_deref(), Some("Travel Plans"));
    assert_eq!(ids(&manager.visible()), vec!["t1"]);

    manager.select_all();
    assert_eq!(manager.selected_ids(), vec![EmailId::new("t1")]);
}

#[test]
fn test_reselecting_same_tab_keeps_paging_consistent() {
    let (provider, _, manager) = make_manager();
    provider.push_page(INBOX_QUERY, vec![make_record("m1", &["INBOX"])]);
    provider.push_page(INBOX_QUERY, vec![make_record("m2", &["INBOX"])]);
    manager.load().unwrap();

    manager.set_tab(MailView::Inbox);
    assert_eq!(manager.state().active_pagination(), manager.pager().state());

    manager.load_more().unwrap();
    assert_eq!(ids(&manager.visible()), vec!["m1", "m2"]);
    assert!(!manager.state().active_pagination().has_more);
}
