//! Switchboard - terminal view of the cached mail list
//!
//! Usage: `switchboard [tab] [label]`
//!
//! Loads the first page of `tab` (default `all`), optionally scoped to a user
//! label, then prints tab counts and the visible rows.

use anyhow::{Context, Result};
use chrono::Local;
use log::{error, info, warn};
use std::sync::Arc;

use mailcache::{
    AccessToken, EmailRecord, EmailRepository, EmailSummary, GmailProvider, InMemoryProvider,
    ListManager, MailProvider, MailSettings, MailView, StaticToken, tab_counts,
};

/// Tabs whose counts are shown above the list
const TABS: [MailView; 6] = [
    MailView::Inbox,
    MailView::Unread,
    MailView::Starred,
    MailView::Sent,
    MailView::Spam,
    MailView::Trash,
];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let mut args = std::env::args().skip(1);
    let tab: MailView = match args.next() {
        Some(name) => name.parse().context("Invalid tab")?,
        None => MailView::Inbox,
    };
    let label = args.next();

    let settings = MailSettings::load();
    let provider = build_provider(&settings);
    let repository = Arc::new(EmailRepository::new());
    let manager = ListManager::new(repository.clone(), provider, &settings);

    manager.set_tab(tab);
    manager.set_label(label);

    match manager.load() {
        Ok(outcome) => info!("Loaded first page: {:?}", outcome),
        Err(e) => error!("{}", e),
    }

    let counts = tab_counts(&repository, &TABS)
        .into_iter()
        .map(|(view, count)| format!("{} {}", view, count))
        .collect::<Vec<_>>()
        .join(" | ");
    println!("{}", counts);
    println!();

    let rows = manager.visible();
    if rows.is_empty() {
        println!("(no messages in {})", manager.visible_view());
    }
    for record in &rows {
        println!("{}", format_row(&EmailSummary::from(record)));
    }

    let state = manager.state();
    if state.active_pagination().has_more {
        println!();
        println!("More messages available.");
    }
    if let Some(err) = state.error {
        println!("Error: {}", err);
    }

    Ok(())
}

/// Gmail when a token is available, canned demo data otherwise
fn build_provider(settings: &MailSettings) -> Arc<dyn MailProvider> {
    match AccessToken::load() {
        Ok(token) => {
            info!("Using Gmail provider");
            Arc::new(
                GmailProvider::new(StaticToken::new(token.access_token))
                    .with_max_retries(settings.max_retries),
            )
        }
        Err(e) => {
            warn!("No Gmail access token ({:#}); using offline demo data", e);
            Arc::new(demo_provider())
        }
    }
}

fn demo_provider() -> InMemoryProvider {
    let provider = InMemoryProvider::new();
    let now = chrono::Utc::now();
    let demo = |id: &str, labels: &[&str], hours: i64, subject: &str| -> EmailRecord {
        EmailRecord::builder(id)
            .labels(labels)
            .read(!labels.contains(&"UNREAD"))
            .date(now - chrono::Duration::hours(hours))
            .subject(subject)
            .from(mailcache::EmailAddress::with_name("Switchboard", "demo@example.com"))
            .build()
    };

    provider.push_page(
        "in:inbox -has:userlabels",
        vec![
            demo("demo-1", &["INBOX", "UNREAD"], 1, "Welcome to Switchboard"),
            demo("demo-2", &["INBOX", "STARRED"], 5, "Keyboard shortcuts"),
        ],
    );
    provider.push_page(
        "in:inbox -has:userlabels",
        vec![demo("demo-3", &["INBOX"], 30, "Older message")],
    );
    provider.push_page(
        "label:SENT",
        vec![demo("demo-4", &["SENT"], 2, "Re: Welcome to Switchboard")],
    );
    provider
}

fn format_row(row: &EmailSummary) -> String {
    let marker = match (row.is_unread, row.is_starred) {
        (true, true) => "*★",
        (true, false) => "* ",
        (false, true) => " ★",
        (false, false) => "  ",
    };
    format!(
        "{} {}  {:<24.24}  {}",
        marker,
        row.date.with_timezone(&Local).format("%b %d %H:%M"),
        row.sender,
        row.subject
    )
}
