//! Common types used throughout the voting service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for catalog entries
pub type EntryId = String;

/// Unique identifier for recorded votes
pub type VoteId = Uuid;

/// A votable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
}

impl Entry {
    pub fn new(id: impl Into<EntryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One recorded pairwise comparison, as stored in the vote log
///
/// Id fields default to empty strings so that a record missing either of
/// them still deserializes and is rejected at replay time instead of
/// failing the whole log read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEvent {
    #[serde(default = "Uuid::nil")]
    pub id: VoteId,
    #[serde(default)]
    pub winner_id: EntryId,
    #[serde(default)]
    pub loser_id: EntryId,
    pub timestamp: DateTime<Utc>,
}

impl VoteEvent {
    pub fn new(winner_id: impl Into<EntryId>, loser_id: impl Into<EntryId>) -> Self {
        Self {
            id: crate::utils::generate_vote_id(),
            winner_id: winner_id.into(),
            loser_id: loser_id.into(),
            timestamp: crate::utils::current_timestamp(),
        }
    }
}

/// Vote submission payload as received over HTTP
///
/// Both fields are optional here; presence is checked by
/// [`crate::votes::ingest::validate_vote`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub winner_id: Option<String>,
    pub loser_id: Option<String>,
}

/// One row of the published leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub id: EntryId,
    pub name: String,
    pub rating: i64,
}

/// The single published leaderboard artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSnapshot {
    pub updated_at: DateTime<Utc>,
    pub rankings: Vec<RankingEntry>,
}

impl RankingSnapshot {
    /// Stamp a ranking list with the current wall-clock time
    pub fn now(rankings: Vec<RankingEntry>) -> Self {
        Self {
            updated_at: crate::utils::current_timestamp(),
            rankings,
        }
    }
}
