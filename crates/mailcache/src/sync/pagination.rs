//! Incremental fetch-and-merge of paged provider results
//!
//! Each load is `Idle -> Loading -> Idle`; success merges the page into the
//! repository and the accumulated list, failure leaves the state as it was.
//!
//! Every load carries a generation number. Starting a replacing load, a
//! reset, or a context switch bumps the generation; a load that finishes
//! under an older generation only caches its records and leaves the list,
//! the token, and the loading flags to whichever load is current.

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::context::{ContextKey, PageContext};
use crate::error::ActionError;
use crate::models::EmailId;
use crate::provider::MailProvider;
use crate::storage::EmailRepository;

/// Pagination progress for one tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page_token: Option<String>,
    /// Number of pages loaded into the current context
    pub page_index: usize,
    pub has_more: bool,
    pub is_loading: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_token: None,
            page_index: 0,
            has_more: true,
            is_loading: false,
        }
    }
}

/// What a load call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Loaded {
        fetched: usize,
        added: usize,
        /// Records dropped because their id was already accumulated
        duplicates: usize,
        next_page_token: Option<String>,
    },
    /// A guard rejected the call (already loading, or nothing left to load)
    Skipped,
    /// The context changed or a newer load started while the fetch was
    /// running; records were cached but the current list was left alone
    Stale { fetched: usize },
}

struct PagerState {
    context: PageContext,
    key: ContextKey,
    page: PaginationState,
    accumulated: Vec<EmailId>,
    seen: HashSet<EmailId>,
    /// Bumped whenever running loads stop being current
    generation: u64,
}

impl PagerState {
    fn new(context: PageContext) -> Self {
        Self {
            key: context.key(),
            context,
            page: PaginationState::default(),
            accumulated: Vec::new(),
            seen: HashSet::new(),
            generation: 0,
        }
    }

    fn reset(&mut self) {
        self.page = PaginationState::default();
        self.accumulated.clear();
        self.seen.clear();
    }

    /// Append ids not yet accumulated. Returns (added, duplicates).
    fn merge(&mut self, ids: Vec<EmailId>) -> (usize, usize) {
        let mut added = 0;
        let mut duplicates = 0;
        for id in ids {
            if self.seen.insert(id.clone()) {
                self.accumulated.push(id);
                added += 1;
            } else {
                duplicates += 1;
            }
        }
        (added, duplicates)
    }
}

/// Clears the loading flags when the load it belongs to is still current
struct LoadGuard<'a> {
    controller: &'a PaginationController,
    generation: u64,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        if state.generation == self.generation {
            state.page.is_loading = false;
            self.controller.in_flight.store(false, Ordering::SeqCst);
        }
    }
}

/// Drives paged fetches for one list context at a time
pub struct PaginationController {
    provider: Arc<dyn MailProvider>,
    repository: Arc<EmailRepository>,
    page_size: usize,
    state: Mutex<PagerState>,
    /// Claimed before the state flag is visible to other callers; closes the
    /// window where two scroll events both see `is_loading == false`.
    /// Only written with the state lock held.
    in_flight: AtomicBool,
}

impl PaginationController {
    pub fn new(
        provider: Arc<dyn MailProvider>,
        repository: Arc<EmailRepository>,
        page_size: usize,
        context: PageContext,
    ) -> Self {
        Self {
            provider,
            repository,
            page_size: page_size.max(1),
            state: Mutex::new(PagerState::new(context)),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Orphan every running load and return to the initial state
    fn supersede(&self, state: &mut PagerState) {
        state.generation += 1;
        state.reset();
        self.in_flight.store(false, Ordering::SeqCst);
    }

    pub fn context(&self) -> PageContext {
        self.lock().context.clone()
    }

    /// Switch to `context`, resetting pagination if its key differs
    ///
    /// Returns true when a reset happened.
    pub fn set_context(&self, context: PageContext) -> bool {
        let mut state = self.lock();
        let key = context.key();
        if key == state.key {
            state.context = context;
            return false;
        }

        debug!("Pagination context changed: {} -> {}", state.key, key);
        state.key = key;
        state.context = context;
        self.supersede(&mut state);
        true
    }

    /// Back to the initial state for the current context
    pub fn reset(&self) {
        let mut state = self.lock();
        self.supersede(&mut state);
    }

    pub fn state(&self) -> PaginationState {
        self.lock().page.clone()
    }

    /// Ids loaded for the current context, in arrival order
    pub fn accumulated(&self) -> Vec<EmailId> {
        self.lock().accumulated.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// A next page exists and nothing is loading
    pub fn can_load_more(&self) -> bool {
        let state = self.lock();
        state.page.page_token.is_some() && !state.page.is_loading && !self.is_in_flight()
    }

    /// Fetch one page for the current context
    ///
    /// With `append`, results are merged into the accumulated list (dropping
    /// ids already present) and the call is a no-op while another load is in
    /// flight. Without it, the accumulated list is replaced and any running
    /// load is superseded: its results will come back as
    /// [`PageOutcome::Stale`].
    pub fn load_page(
        &self,
        page_token: Option<String>,
        append: bool,
    ) -> Result<PageOutcome, ActionError> {
        let (generation, query) = {
            let mut state = self.lock();
            if append {
                if self
                    .in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    debug!("Skipping append load: another load is in flight");
                    return Ok(PageOutcome::Skipped);
                }
            } else if self.in_flight.swap(true, Ordering::SeqCst) {
                debug!("Superseding the load in flight for {}", state.key);
            }
            state.generation += 1;
            state.page.is_loading = true;
            (state.generation, state.context.query())
        };
        let _guard = LoadGuard {
            controller: self,
            generation,
        };

        info!(
            "Loading page for '{}' (token: {:?}, append: {})",
            query, page_token, append
        );

        let page = match self
            .provider
            .fetch_page(&query, self.page_size, page_token.as_deref())
        {
            Ok(page) => page,
            Err(e) => {
                if self.lock().generation != generation {
                    debug!("Ignoring failure of superseded load for '{}': {:#}", query, e);
                    return Ok(PageOutcome::Stale { fetched: 0 });
                }
                error!("Failed to load page for '{}': {:#}", query, e);
                return Err(ActionError::fetch(&query, &e));
            }
        };

        let fetched = page.items.len();
        let ids: Vec<EmailId> = page.items.iter().map(|r| r.id.clone()).collect();
        self.repository.add_records(page.items);

        let mut state = self.lock();
        if state.generation != generation {
            info!(
                "Discarding page for '{}': superseded (current context {})",
                query, state.key
            );
            return Ok(PageOutcome::Stale { fetched });
        }

        if !append {
            state.accumulated.clear();
            state.seen.clear();
            state.page.page_index = 0;
        }
        let (added, duplicates) = state.merge(ids);
        if duplicates > 0 {
            debug!("Filtered {} duplicate messages from page for '{}'", duplicates, query);
        }

        state.page.page_token = page.next_page_token.clone();
        state.page.has_more = page.next_page_token.is_some();
        state.page.page_index += 1;

        Ok(PageOutcome::Loaded {
            fetched,
            added,
            duplicates,
            next_page_token: page.next_page_token,
        })
    }

    /// Load the next page if there is one and nothing else is loading
    pub fn load_more(&self) -> Result<PageOutcome, ActionError> {
        let token = {
            let state = self.lock();
            match &state.page.page_token {
                Some(token) if !state.page.is_loading && !self.is_in_flight() => token.clone(),
                _ => return Ok(PageOutcome::Skipped),
            }
        };
        self.load_page(Some(token), true)
    }
}
