//! Entry catalog: the ordered set of votable entries
//!
//! The catalog is loaded fresh at the start of every aggregation run and is
//! never mutated by the rating engine.

pub mod provider;

use crate::error::{Result, VotingError};
use crate::types::{Entry, EntryId};
use std::collections::HashMap;

pub use provider::{CatalogProvider, FileCatalogProvider, StaticCatalogProvider};

/// Validated, ordered entry catalog
///
/// Ids are non-empty and unique. Insertion order is preserved and used as the
/// default tie-break when ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<Entry>,
    positions: HashMap<EntryId, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or duplicate ids
    pub fn new(entries: Vec<Entry>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(VotingError::CatalogLoadFailure {
                    message: format!("entry at position {} has an empty id", index),
                }
                .into());
            }
            if positions.insert(entry.id.clone(), index).is_some() {
                return Err(VotingError::CatalogLoadFailure {
                    message: format!("duplicate entry id '{}'", entry.id),
                }
                .into());
            }
        }

        Ok(Self { entries, positions })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.positions.get(id).map(|&index| &self.entries[index])
    }

    /// Position of an entry in declaration order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntryId> {
        self.entries.iter().map(|entry| &entry.id)
    }
}
