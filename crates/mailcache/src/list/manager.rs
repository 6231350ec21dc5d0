//! List manager: tab state, paging and mutations for the message list
//!
//! Mutations follow the same two steps everywhere:
//! 1. Call the provider to change server state
//! 2. On success, apply the change to the repository
//!
//! A failed remote call leaves the repository untouched for that record.

use log::{error, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use super::state::{ListAction, ListState, reduce};
use crate::config::MailSettings;
use crate::error::ActionError;
use crate::models::{Category, EmailId, EmailRecord, MailView};
use crate::provider::MailProvider;
use crate::query::{SortOrder, sort_by_date};
use crate::storage::{EmailRepository, RecordPatch};
use crate::sync::{
    PageContext, PageOutcome, PaginationController, ScrollPosition, ScrollTrigger,
};

/// Receives the new list state after every transition
pub trait ListListener: Send + Sync {
    fn on_change(&self, state: &ListState);
}

/// Coordinates the list UI state with the provider and the repository
pub struct ListManager {
    repository: Arc<EmailRepository>,
    provider: Arc<dyn MailProvider>,
    pager: PaginationController,
    state: RwLock<ListState>,
    scroll: Mutex<ScrollTrigger>,
    listeners: RwLock<Vec<Arc<dyn ListListener>>>,
}

impl ListManager {
    /// Create a manager showing the inbox
    pub fn new(
        repository: Arc<EmailRepository>,
        provider: Arc<dyn MailProvider>,
        settings: &MailSettings,
    ) -> Self {
        let state = ListState::default();
        let pager = PaginationController::new(
            provider.clone(),
            repository.clone(),
            settings.page_size,
            page_context(&state),
        );
        Self {
            repository,
            provider,
            pager,
            state: RwLock::new(state),
            scroll: Mutex::new(ScrollTrigger::new(
                settings.scroll_debounce(),
                settings.scroll_threshold,
            )),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn ListListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn dispatch(&self, action: ListAction) -> ListState {
        self.update(|state| reduce(state, action))
    }

    /// Apply `change` under the state lock, then notify listeners
    fn update(&self, change: impl FnOnce(&mut ListState)) -> ListState {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut state);
            state.clone()
        };

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_change(&snapshot);
        }
        snapshot
    }

    fn scroll(&self) -> MutexGuard<'_, ScrollTrigger> {
        self.scroll.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Reads ===

    /// Snapshot of the current list state
    pub fn state(&self) -> ListState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn repository(&self) -> &Arc<EmailRepository> {
        &self.repository
    }

    pub fn pager(&self) -> &PaginationController {
        &self.pager
    }

    pub fn visible_view(&self) -> MailView {
        self.state().visible_view()
    }

    /// Records in the visible view, newest first
    pub fn visible(&self) -> Vec<EmailRecord> {
        let mut records: Vec<EmailRecord> = self
            .visible_ids()
            .iter()
            .filter_map(|id| self.repository.get(id))
            .collect();
        sort_by_date(&mut records, SortOrder::NewestFirst);
        records
    }

    /// Ids of the visible view
    ///
    /// A label scope also includes whatever the pager loaded for it: the
    /// provider tags those records with its own label ids, which the name
    /// index never sees.
    fn visible_ids(&self) -> Vec<EmailId> {
        let view = self.visible_view();
        let mut ids = self.repository.view_ids(&view);
        if let MailView::Label(_) = view {
            let mut seen: HashSet<EmailId> = ids.iter().cloned().collect();
            for id in self.pager.accumulated() {
                if self.repository.has(&id) && seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    // === Navigation ===

    /// Switch tabs. Always clears the selection, even for the same tab.
    pub fn set_tab(&self, tab: MailView) {
        info!("Switching list to {}", tab);
        self.scroll().cancel();
        self.navigate(ListAction::SetTab(tab));
    }

    pub fn set_category(&self, category: Option<Category>) {
        self.navigate(ListAction::SetCategory(category));
    }

    /// Scope the list to a user label, or back to the tab with `None`
    pub fn set_label(&self, label: Option<String>) {
        let label = label.filter(|l| !l.trim().is_empty());
        self.navigate(ListAction::SetLabel(label));
    }

    pub fn set_base_path(&self, path: Option<String>) {
        self.navigate(ListAction::SetBasePath(path));
    }

    /// Apply a navigation action and retarget the pager in the same step
    ///
    /// The active tab's pagination is copied back from the pager, so the
    /// list state never shows progress the pager does not have.
    fn navigate(&self, action: ListAction) -> ListState {
        let mut retargeted = false;
        let state = self.update(|state| {
            reduce(state, action);
            retargeted = self.pager.set_context(page_context(state));
            Self::mirror_pager(&self.pager, state);
        });
        if retargeted {
            self.scroll().cancel();
        }
        state
    }

    fn mirror_pager(pager: &PaginationController, state: &mut ListState) {
        let tab = state.active_tab.clone();
        reduce(
            state,
            ListAction::SetPagination {
                tab,
                state: pager.state(),
            },
        );
    }

    // === Loading ===

    /// Load the first page of the current context, replacing the list
    pub fn load(&self) -> Result<PageOutcome, ActionError> {
        self.dispatch(ListAction::SetLoading(true));
        let result = self.run_load(|| self.pager.load_page(None, false));
        self.dispatch(ListAction::SetLoading(false));
        result
    }

    /// Append the next page, if there is one and nothing else is loading
    pub fn load_more(&self) -> Result<PageOutcome, ActionError> {
        if !self.pager.can_load_more() {
            return Ok(PageOutcome::Skipped);
        }
        self.run_load(|| self.pager.load_more())
    }

    /// Reload from the first page
    pub fn refresh(&self) -> Result<PageOutcome, ActionError> {
        self.dispatch(ListAction::SetRefreshing(true));
        self.pager.reset();
        let result = self.run_load(|| self.pager.load_page(None, false));
        self.dispatch(ListAction::SetRefreshing(false));
        result
    }

    fn run_load(
        &self,
        load: impl FnOnce() -> Result<PageOutcome, ActionError>,
    ) -> Result<PageOutcome, ActionError> {
        self.dispatch(ListAction::PageLoadStarted);

        let result = load();

        // The pager already kept or dropped the page; whatever tab is active
        // now takes the pager's progress
        self.update(|state| Self::mirror_pager(&self.pager, state));

        match &result {
            Ok(PageOutcome::Loaded { .. }) => {
                self.dispatch(ListAction::SetError(None));
            }
            Err(e) => {
                self.dispatch(ListAction::SetError(Some(e.to_string())));
            }
            _ => {}
        }
        result
    }

    // === Scrolling ===

    pub fn on_scroll(&self, position: ScrollPosition, now: Instant) {
        self.scroll().on_scroll(position, now);
    }

    /// Drive the scroll trigger; loads the next page once a scroll settles
    /// past the threshold
    pub fn tick(&self, now: Instant) -> Result<PageOutcome, ActionError> {
        let fire = self.scroll().poll(now, self.pager.can_load_more());
        if fire {
            self.load_more()
        } else {
            Ok(PageOutcome::Skipped)
        }
    }

    // === Mutations ===

    /// Delete one message remotely, then drop it from the cache
    pub fn delete_one(&self, id: &EmailId) -> Result<(), ActionError> {
        info!("Deleting message {}", id);
        if let Err(e) = self.provider.delete(id) {
            error!("Failed to delete message {}: {:#}", id, e);
            let err = ActionError::delete(id, &e);
            self.dispatch(ListAction::SetError(Some(err.to_string())));
            return Err(err);
        }

        self.repository.delete_record(id);
        self.dispatch(ListAction::Deselect(vec![id.clone()]));
        Ok(())
    }

    /// Delete every selected message, one remote call at a time
    ///
    /// Messages whose delete fails stay in the cache. The selection is
    /// cleared afterwards either way. Returns how many were deleted.
    pub fn delete_selected(&self) -> Result<usize, ActionError> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Ok(0);
        }

        info!("Deleting {} selected messages", ids.len());
        self.dispatch(ListAction::SetLoading(true));

        let mut failures = Vec::new();
        let mut deleted = 0;
        for id in &ids {
            match self.provider.delete(id) {
                Ok(()) => {
                    self.repository.delete_record(id);
                    deleted += 1;
                }
                Err(e) => {
                    error!("Failed to delete message {}: {:#}", id, e);
                    failures.push(ActionError::delete(id, &e));
                }
            }
        }

        self.dispatch(ListAction::DeselectAll);
        self.dispatch(ListAction::SetLoading(false));
        self.finish_batch("deleted", failures, ids.len())?;
        Ok(deleted)
    }

    /// Set the read state of one message remotely, then in the cache
    pub fn mark_read(&self, id: &EmailId, is_read: bool) -> Result<(), ActionError> {
        info!(
            "Marking message {} as {}",
            id,
            if is_read { "read" } else { "unread" }
        );
        if let Err(e) = self.provider.mark_read(id, is_read) {
            error!("Failed to mark message {}: {:#}", id, e);
            let err = ActionError::mark_read(id, is_read, &e);
            self.dispatch(ListAction::SetError(Some(err.to_string())));
            return Err(err);
        }

        self.repository.update_record(id, RecordPatch::read(is_read));
        Ok(())
    }

    pub fn mark_selected_read(&self) -> Result<usize, ActionError> {
        self.mark_selected(true)
    }

    pub fn mark_selected_unread(&self) -> Result<usize, ActionError> {
        self.mark_selected(false)
    }

    /// Remote calls run in parallel; the cache is updated for the successes
    fn mark_selected(&self, is_read: bool) -> Result<usize, ActionError> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Ok(0);
        }

        info!(
            "Marking {} selected messages as {}",
            ids.len(),
            if is_read { "read" } else { "unread" }
        );

        let results: Vec<(EmailId, anyhow::Result<()>)> = ids
            .par_iter()
            .map(|id| (id.clone(), self.provider.mark_read(id, is_read)))
            .collect();

        let mut failures = Vec::new();
        let mut updated = 0;
        for (id, result) in results {
            match result {
                Ok(()) => {
                    self.repository.update_record(&id, RecordPatch::read(is_read));
                    updated += 1;
                }
                Err(e) => {
                    error!("Failed to mark message {}: {:#}", id, e);
                    failures.push(ActionError::mark_read(&id, is_read, &e));
                }
            }
        }

        let action = if is_read { "marked read" } else { "marked unread" };
        self.finish_batch(action, failures, ids.len())?;
        Ok(updated)
    }

    /// Star or unstar a message in the cache
    pub fn star(&self, id: &EmailId, is_starred: bool) -> bool {
        let updated = self
            .repository
            .update_record(id, RecordPatch::starred(is_starred));
        if !updated {
            warn!("Cannot star unknown message {}", id);
        }
        updated
    }

    /// A single failure is returned as-is; several collapse into a count
    fn finish_batch(
        &self,
        action: &'static str,
        mut failures: Vec<ActionError>,
        total: usize,
    ) -> Result<(), ActionError> {
        let err = match failures.len() {
            0 => {
                self.dispatch(ListAction::SetError(None));
                return Ok(());
            }
            1 => failures.remove(0),
            failed => ActionError::Partial {
                action,
                failed,
                total,
            },
        };
        self.dispatch(ListAction::SetError(Some(err.to_string())));
        Err(err)
    }

    // === Selection ===

    pub fn toggle_select(&self, id: &EmailId) {
        self.dispatch(ListAction::ToggleSelect(id.clone()));
    }

    /// Select exactly the records in the visible view
    pub fn select_all(&self) {
        let ids = self.visible_ids();
        self.dispatch(ListAction::SelectAll(ids));
    }

    pub fn deselect_all(&self) {
        self.dispatch(ListAction::DeselectAll);
    }

    /// Selected ids in a stable order
    pub fn selected_ids(&self) -> Vec<EmailId> {
        let mut ids: Vec<EmailId> = self.state().selected.into_iter().collect();
        ids.sort();
        ids
    }
}

/// Pagination context for a list state: the tab (with its category) plus
/// any label scope and route
fn page_context(state: &ListState) -> PageContext {
    let view = match (state.active_category, state.active_tab.folder_type()) {
        (Some(category), Some(folder)) => MailView::Category(category, folder),
        _ => state.active_tab.clone(),
    };
    let context = PageContext::new(view).with_label(state.active_label.clone());
    match &state.base_path {
        Some(path) => context.with_path(path.clone()),
        None => context,
    }
}
