//! List state and its reducer

use std::collections::{HashMap, HashSet};

use crate::models::{Category, EmailId, MailView};
use crate::sync::PaginationState;

/// Snapshot of everything the list UI renders from
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub active_tab: MailView,
    pub active_category: Option<Category>,
    /// User label the list is scoped to, if any
    pub active_label: Option<String>,
    pub base_path: Option<String>,
    pub pagination: HashMap<MailView, PaginationState>,
    pub selected: HashSet<EmailId>,
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
}

impl ListState {
    pub fn new(tab: MailView) -> Self {
        let mut pagination = HashMap::new();
        pagination.insert(tab.clone(), PaginationState::default());
        Self {
            active_tab: tab,
            active_category: None,
            active_label: None,
            base_path: None,
            pagination,
            selected: HashSet::new(),
            loading: false,
            refreshing: false,
            error: None,
        }
    }

    /// The repository view currently shown
    pub fn visible_view(&self) -> MailView {
        if let Some(label) = &self.active_label {
            return MailView::Label(label.clone());
        }
        match (self.active_category, self.active_tab.folder_type()) {
            (Some(category), Some(folder)) => MailView::Category(category, folder),
            _ => self.active_tab.clone(),
        }
    }

    /// Pagination state of the active tab
    pub fn active_pagination(&self) -> PaginationState {
        self.pagination
            .get(&self.active_tab)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_selected(&self, id: &EmailId) -> bool {
        self.selected.contains(id)
    }
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(MailView::Inbox)
    }
}

/// Every state transition the list manager performs
#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    SetTab(MailView),
    SetCategory(Option<Category>),
    SetLabel(Option<String>),
    SetBasePath(Option<String>),
    ToggleSelect(EmailId),
    /// Replace the selection with exactly these ids
    SelectAll(Vec<EmailId>),
    Deselect(Vec<EmailId>),
    DeselectAll,
    SetLoading(bool),
    SetRefreshing(bool),
    SetError(Option<String>),
    /// Mark the active tab as loading
    PageLoadStarted,
    /// Mirror the pager's progress for `tab`
    SetPagination {
        tab: MailView,
        state: PaginationState,
    },
}

/// Apply `action` to `state`
pub fn reduce(state: &mut ListState, action: ListAction) {
    match action {
        ListAction::SetTab(tab) => {
            // Selection never survives a tab switch
            state.selected.clear();
            if let Some(previous) = state.pagination.get_mut(&state.active_tab) {
                previous.is_loading = false;
            }
            state.pagination.insert(tab.clone(), PaginationState::default());
            state.active_tab = tab;
            state.error = None;
        }
        ListAction::SetCategory(category) => {
            if state.active_category != category {
                state.selected.clear();
                state
                    .pagination
                    .insert(state.active_tab.clone(), PaginationState::default());
                state.active_category = category;
            }
        }
        ListAction::SetLabel(label) => {
            if state.active_label != label {
                state.selected.clear();
                state
                    .pagination
                    .insert(state.active_tab.clone(), PaginationState::default());
                state.active_label = label;
            }
        }
        ListAction::SetBasePath(path) => {
            state.base_path = path;
        }
        ListAction::ToggleSelect(id) => {
            if !state.selected.remove(&id) {
                state.selected.insert(id);
            }
        }
        ListAction::SelectAll(ids) => {
            state.selected = ids.into_iter().collect();
        }
        ListAction::Deselect(ids) => {
            for id in &ids {
                state.selected.remove(id);
            }
        }
        ListAction::DeselectAll => state.selected.clear(),
        ListAction::SetLoading(loading) => state.loading = loading,
        ListAction::SetRefreshing(refreshing) => state.refreshing = refreshing,
        ListAction::SetError(error) => state.error = error,
        ListAction::PageLoadStarted => {
            state
                .pagination
                .entry(state.active_tab.clone())
                .or_default()
                .is_loading = true;
        }
        ListAction::SetPagination { tab, state: page } => {
            state.pagination.insert(tab, page);
        }
    }
}
