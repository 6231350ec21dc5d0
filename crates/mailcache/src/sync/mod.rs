//! Paged fetching from the provider into the repository
//!
//! - [`PageContext`] names the list being paged and builds its query
//! - [`PaginationController`] runs guarded, deduplicating page loads
//! - [`ScrollTrigger`] turns scroll events into load-more requests

mod context;
mod pagination;
mod scroll;

pub use context::{ContextKey, PageContext, label_query, normalize_base_path, view_query};
pub use pagination::{PageOutcome, PaginationController, PaginationState};
pub use scroll::{DEFAULT_DEBOUNCE, DEFAULT_THRESHOLD, ScrollPosition, ScrollTrigger};
