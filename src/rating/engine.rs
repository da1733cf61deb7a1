//! Rating engine: replays the vote log into a rating table
//!
//! Replay is a pure fold over the events in the order given. Because each
//! Elo update depends on the ratings produced by earlier votes, the same
//! events in a different order generally give different ratings; the same
//! events in the same order always give identical ratings.

use crate::catalog::Catalog;
use crate::config::RatingConfig;
use crate::error::{Result, VotingError};
use crate::rating::elo::EloCalculator;
use crate::types::{EntryId, VoteEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Final rating of every catalog entry after a replay
///
/// Holds exactly the catalog's ids; ids outside the catalog never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingTable {
    ratings: HashMap<EntryId, i64>,
}

impl RatingTable {
    /// Every catalog entry at the same starting rating
    pub fn initial(catalog: &Catalog, rating: i64) -> Self {
        Self {
            ratings: catalog.ids().map(|id| (id.clone(), rating)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<i64> {
        self.ratings.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntryId, i64)> {
        self.ratings.iter().map(|(id, rating)| (id, *rating))
    }
}

impl FromIterator<(EntryId, i64)> for RatingTable {
    fn from_iter<I: IntoIterator<Item = (EntryId, i64)>>(iter: I) -> Self {
        Self {
            ratings: iter.into_iter().collect(),
        }
    }
}

/// Counts of how each event in a replay was handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Events that updated ratings
    pub applied: usize,
    /// Events skipped for a missing id or a self-vote
    pub malformed: usize,
    /// Events skipped for referencing an id outside the catalog
    pub unknown_entry: usize,
}

impl ReplayReport {
    pub fn skipped(&self) -> usize {
        self.malformed + self.unknown_entry
    }

    pub fn total(&self) -> usize {
        self.applied + self.skipped()
    }
}

/// Result of replaying a vote log
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub table: RatingTable,
    pub report: ReplayReport,
}

/// Replays ordered vote events into final ratings
#[derive(Debug, Clone, Default)]
pub struct RatingEngine {
    calculator: EloCalculator,
}

impl RatingEngine {
    /// Create a new rating engine
    pub fn new(config: RatingConfig) -> Result<Self> {
        Ok(Self {
            calculator: EloCalculator::new(config)?,
        })
    }

    pub fn calculator(&self) -> &EloCalculator {
        &self.calculator
    }

    /// Replay `events` in order over a fresh table for `catalog`
    ///
    /// Malformed events and events naming ids outside the catalog are skipped,
    /// logged and counted; they never touch the table. The only error is a
    /// numeric failure, in which case no table is returned at all.
    pub fn compute_ratings(&self, catalog: &Catalog, events: &[VoteEvent]) -> Result<ReplayOutcome> {
        let mut table = RatingTable::initial(catalog, self.calculator.initial_rating());
        let mut report = ReplayReport::default();

        for (index, event) in events.iter().enumerate() {
            if let Err(e) = check_event(catalog, event) {
                match e {
                    VotingError::UnknownEntryReference { .. } => report.unknown_entry += 1,
                    _ => report.malformed += 1,
                }
                warn!(
                    "Skipping vote {} at position {} ({} over {}): {}",
                    event.id, index, event.winner_id, event.loser_id, e
                );
                continue;
            }

            let winner = table.ratings[&event.winner_id];
            let loser = table.ratings[&event.loser_id];
            let outcome = self.calculator.rate(winner, loser)?;

            table
                .ratings
                .insert(event.winner_id.clone(), outcome.winner_rating);
            table
                .ratings
                .insert(event.loser_id.clone(), outcome.loser_rating);
            report.applied += 1;
        }

        debug!(
            "Replayed {} votes: {} applied, {} malformed, {} unknown entry",
            events.len(),
            report.applied,
            report.malformed,
            report.unknown_entry
        );

        Ok(ReplayOutcome { table, report })
    }
}

/// Replay `events` with the default K-factor and starting rating
pub fn compute_ratings(catalog: &Catalog, events: &[VoteEvent]) -> Result<ReplayOutcome> {
    RatingEngine::default().compute_ratings(catalog, events)
}

fn check_event(catalog: &Catalog, event: &VoteEvent) -> std::result::Result<(), VotingError> {
    if event.winner_id.is_empty() || event.loser_id.is_empty() {
        return Err(VotingError::MalformedEvent {
            reason: "missing winner or loser id".to_string(),
        });
    }
    if event.winner_id == event.loser_id {
        return Err(VotingError::MalformedEvent {
            reason: "winner and loser are the same entry".to_string(),
        });
    }
    for id in [&event.winner_id, &event.loser_id] {
        if !catalog.contains(id) {
            return Err(VotingError::UnknownEntryReference {
                entry_id: id.clone(),
            });
        }
    }
    Ok(())
}
