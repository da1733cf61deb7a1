//! Ranking builder: joins final ratings with catalog metadata
//!
//! Entries are sorted by rating, highest first. Entries with equal ratings
//! are ordered by the configured [`TieBreak`], so the output never depends on
//! sort stability.

use crate::catalog::Catalog;
use crate::error::{Result, VotingError};
use crate::rating::RatingTable;
use crate::types::RankingEntry;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Ordering of entries that share a rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earlier catalog position first
    #[default]
    CatalogOrder,
    /// Lexicographically smaller id first
    IdAscending,
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TieBreak::CatalogOrder => write!(f, "catalog_order"),
            TieBreak::IdAscending => write!(f, "id_ascending"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "catalog_order" | "catalog" => Ok(TieBreak::CatalogOrder),
            "id_ascending" | "id" => Ok(TieBreak::IdAscending),
            _ => Err(VotingError::ConfigurationError {
                message: format!("Invalid tie-break rule: {}", s),
            }
            .into()),
        }
    }
}

/// Build the ranking list for every catalog entry
///
/// Fails if the table is missing a catalog id, which cannot happen for a
/// table produced by the rating engine from the same catalog.
pub fn build_rankings(
    table: &RatingTable,
    catalog: &Catalog,
    tie_break: TieBreak,
) -> Result<Vec<RankingEntry>> {
    let mut ranked = Vec::with_capacity(catalog.len());

    for (position, entry) in catalog.entries().iter().enumerate() {
        let rating = table
            .get(&entry.id)
            .ok_or_else(|| VotingError::InternalError {
                message: format!("no rating for catalog entry '{}'", entry.id),
            })?;
        ranked.push((
            position,
            RankingEntry {
                id: entry.id.clone(),
                name: entry.name.clone(),
                rating,
            },
        ));
    }

    ranked.sort_by(|(pos_a, a), (pos_b, b)| {
        b.rating.cmp(&a.rating).then_with(|| match tie_break {
            TieBreak::CatalogOrder => pos_a.cmp(pos_b),
            TieBreak::IdAscending => a.id.cmp(&b.id),
        })
    });

    Ok(ranked.into_iter().map(|(_, entry)| entry).collect())
}
