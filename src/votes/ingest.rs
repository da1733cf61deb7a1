//! Vote submission validation
//!
//! Turns an untrusted [`VoteRequest`] into a [`VoteEvent`] with a server
//! assigned id and timestamp. Nothing is constructed unless every check passes.

use crate::catalog::Catalog;
use crate::error::{Result, VotingError};
use crate::types::{VoteEvent, VoteRequest};

fn required_field(value: Option<&str>, field: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(VotingError::InvalidVote {
            reason: format!("{} is required", field),
        }
        .into()),
    }
}

/// Validate a submission
///
/// When `catalog` is given, both ids must belong to it.
pub fn validate_vote(request: &VoteRequest, catalog: Option<&Catalog>) -> Result<VoteEvent> {
    let winner_id = required_field(request.winner_id.as_deref(), "winnerId")?;
    let loser_id = required_field(request.loser_id.as_deref(), "loserId")?;

    if winner_id == loser_id {
        return Err(VotingError::InvalidVote {
            reason: "winnerId and loserId must differ".to_string(),
        }
        .into());
    }

    if let Some(catalog) = catalog {
        for id in [&winner_id, &loser_id] {
            if !catalog.contains(id) {
                return Err(VotingError::InvalidVote {
                    reason: format!("unknown entry '{}'", id),
                }
                .into());
            }
        }
    }

    Ok(VoteEvent::new(winner_id, loser_id))
}
