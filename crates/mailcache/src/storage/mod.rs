//! In-memory email repository
//!
//! One master map of records keyed by id, plus per-label indices that are
//! kept consistent with it on every mutation. Derived views (inbox, sent,
//! category matrix, ...) are computed from this state on demand.

mod label_index;
mod repository;
mod validate;
pub mod views;

pub use label_index::LabelIndex;
pub use repository::{ChangeListener, EmailRepository, RecordPatch};
pub use validate::{ConsistencyError, ValidationReport};
