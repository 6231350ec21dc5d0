//! Per-label sets of record identifiers

use std::collections::{HashMap, HashSet};

use crate::models::EmailId;

/// Label token -> set of record ids carrying it
///
/// Pure bookkeeping: the repository decides which ids belong where.
#[derive(Debug, Default, Clone)]
pub struct LabelIndex {
    sets: HashMap<String, HashSet<EmailId>>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set for `label` if none exists yet
    pub fn ensure(&mut self, label: &str) {
        if !self.sets.contains_key(label) {
            self.sets.insert(label.to_string(), HashSet::new());
        }
    }

    /// Add `id` to `label`, creating the set if needed. Returns true if newly added.
    pub fn insert(&mut self, label: &str, id: &EmailId) -> bool {
        self.sets
            .entry(label.to_string())
            .or_default()
            .insert(id.clone())
    }

    /// Remove `id` from `label`. Returns true if it was present.
    pub fn remove(&mut self, label: &str, id: &EmailId) -> bool {
        self.sets
            .get_mut(label)
            .is_some_and(|set| set.remove(id))
    }

    /// Remove `id` from every set. Returns the number of sets it was removed from.
    pub fn remove_everywhere(&mut self, id: &EmailId) -> usize {
        self.sets
            .values_mut()
            .map(|set| usize::from(set.remove(id)))
            .sum()
    }

    pub fn contains(&self, label: &str, id: &EmailId) -> bool {
        self.sets.get(label).is_some_and(|set| set.contains(id))
    }

    pub fn members(&self, label: &str) -> Option<&HashSet<EmailId>> {
        self.sets.get(label)
    }

    pub fn len_of(&self, label: &str) -> usize {
        self.sets.get(label).map_or(0, HashSet::len)
    }

    /// All index keys, including empty ones
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<EmailId>)> {
        self.sets.iter().map(|(label, set)| (label.as_str(), set))
    }

    /// Drop every set and every key
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
