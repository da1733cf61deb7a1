//! Elo rating aggregation over the vote log
//!
//! This module provides the per-vote Elo update (built on the skillratings
//! crate's expected score) and the engine that replays the whole log.

pub mod elo;
pub mod engine;

// Re-export commonly used types
pub use elo::{EloCalculator, EloOutcome};
pub use engine::{compute_ratings, RatingEngine, RatingTable, ReplayOutcome, ReplayReport};
