//! Read-side helpers for rendering the list
//!
//! Everything here works on materialized records; the repository stays the
//! single source of truth.

mod rows;

pub use rows::{
    EmailSummary, PageSlice, SortOrder, filter_text, paginate, sort_by_date, tab_counts,
};
