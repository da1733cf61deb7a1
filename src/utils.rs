//! Utility functions for the voting service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique vote ID
pub fn generate_vote_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round to the nearest integer, with halves rounded towards positive infinity
///
/// `f64::round` rounds halves away from zero, which differs for negative
/// halves. Ratings are replayed with this rule at every step, so it must
/// stay fixed for results to remain reproducible.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
