//! Exhaustive consistency check between the master map and label indices

use std::collections::HashMap;

use super::LabelIndex;
use crate::models::{EmailId, EmailRecord, labels};

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("index {label} references unknown record {id}")]
    DanglingIndexEntry { label: String, id: EmailId },

    #[error("record {id} carries {label} but is missing from its index")]
    MissingIndexEntry { label: String, id: EmailId },

    #[error("index {label} contains {id} but the record does not carry the label")]
    StaleIndexEntry { label: String, id: EmailId },

    #[error("record {id} has {label} flag {flag} but index membership {indexed}")]
    FlagMismatch {
        label: String,
        id: EmailId,
        flag: bool,
        indexed: bool,
    },

    #[error("record {id} is stored under key {key}")]
    KeyMismatch { key: EmailId, id: EmailId },

    #[error("record stored under an empty id")]
    EmptyId,
}

/// Result of [`EmailRepository::validate`](super::EmailRepository::validate)
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ConsistencyError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ConsistencyError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

fn flag_for(record: &EmailRecord, label: &str) -> bool {
    match label {
        labels::STARRED => record.is_starred,
        labels::IMPORTANT => record.is_important,
        _ => false,
    }
}

pub(crate) fn check(records: &HashMap<EmailId, EmailRecord>, index: &LabelIndex) -> ValidationReport {
    let mut errors = Vec::new();

    for (key, record) in records {
        if key.is_empty() {
            errors.push(ConsistencyError::EmptyId);
        }
        if *key != record.id {
            errors.push(ConsistencyError::KeyMismatch {
                key: key.clone(),
                id: record.id.clone(),
            });
        }

        for label in &record.label_ids {
            if !index.contains(label, &record.id) {
                errors.push(ConsistencyError::MissingIndexEntry {
                    label: label.clone(),
                    id: record.id.clone(),
                });
            }
        }

        for label in labels::SYNTHETIC {
            let flag = flag_for(record, label);
            let indexed = index.contains(label, &record.id);
            if flag != indexed {
                errors.push(ConsistencyError::FlagMismatch {
                    label: label.to_string(),
                    id: record.id.clone(),
                    flag,
                    indexed,
                });
            }
        }
    }

    for (label, ids) in index.iter() {
        for id in ids {
            let Some(record) = records.get(id) else {
                errors.push(ConsistencyError::DanglingIndexEntry {
                    label: label.to_string(),
                    id: id.clone(),
                });
                continue;
            };
            if !labels::is_synthetic(label) && !record.has_label(label) {
                errors.push(ConsistencyError::StaleIndexEntry {
                    label: label.to_string(),
                    id: id.clone(),
                });
            }
        }
    }

    ValidationReport::from_errors(errors)
}
