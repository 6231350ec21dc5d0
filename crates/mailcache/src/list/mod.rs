//! The message list: UI state, its reducer, and the manager driving both

mod manager;
mod state;

pub use manager::{ListListener, ListManager};
pub use state::{ListAction, ListState, reduce};
