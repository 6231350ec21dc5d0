//! In-memory provider implementation
//!
//! Serves canned pages per query and records every call, with switchable
//! failures. Used by tests and by the binary's offline mode.

use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{MailProvider, Page};
use crate::models::{EmailId, EmailRecord};

/// A call received by [`InMemoryProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Fetch {
        query: String,
        page_token: Option<String>,
    },
    Delete(EmailId),
    MarkRead(EmailId, bool),
}

#[derive(Default)]
struct ProviderState {
    /// query -> pages, addressed by position; the token is the page index
    pages: HashMap<String, Vec<Vec<EmailRecord>>>,
    failing_ids: HashSet<EmailId>,
    fail_fetches: bool,
    calls: Vec<ProviderCall>,
}

/// Canned-response implementation of [`MailProvider`]
#[derive(Default)]
pub struct InMemoryProvider {
    state: Mutex<ProviderState>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a page of results for `query`
    pub fn push_page(&self, query: &str, items: Vec<EmailRecord>) {
        self.lock()
            .pages
            .entry(query.to_string())
            .or_default()
            .push(items);
    }

    /// Make delete/mark-read calls for `id` fail
    pub fn fail_for(&self, id: &EmailId) {
        self.lock().failing_ids.insert(id.clone());
    }

    /// Make every fetch fail (or succeed again)
    pub fn set_fail_fetches(&self, fail: bool) {
        self.lock().fail_fetches = fail;
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }
}

impl MailProvider for InMemoryProvider {
    fn fetch_page(&self, query: &str, page_size: usize, page_token: Option<&str>) -> Result<Page> {
        let mut state = self.lock();
        state.calls.push(ProviderCall::Fetch {
            query: query.to_string(),
            page_token: page_token.map(str::to_string),
        });

        if state.fail_fetches {
            bail!("provider unavailable");
        }

        let page_index = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("invalid page token: {}", token))?,
            None => 0,
        };

        let Some(pages) = state.pages.get(query) else {
            return Ok(Page::default());
        };

        let items = pages
            .get(page_index)
            .map(|items| items.iter().take(page_size).cloned().collect())
            .unwrap_or_default();
        let next_page_token = (page_index + 1 < pages.len()).then(|| (page_index + 1).to_string());

        Ok(Page {
            items,
            next_page_token,
        })
    }

    fn delete(&self, id: &EmailId) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(ProviderCall::Delete(id.clone()));
        if state.failing_ids.contains(id) {
            bail!("delete rejected for {}", id);
        }
        Ok(())
    }

    fn mark_read(&self, id: &EmailId, is_read: bool) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(ProviderCall::MarkRead(id.clone(), is_read));
        if state.failing_ids.contains(id) {
            bail!("modify rejected for {}", id);
        }
        Ok(())
    }
}
