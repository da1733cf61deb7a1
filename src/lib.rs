//! Elo Board - pairwise voting service with a cached Elo leaderboard
//!
//! This crate records binary preference votes between catalog entries,
//! replays the full vote log into Elo ratings on a fixed schedule and
//! publishes the resulting leaderboard as a single snapshot.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ranking;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;
pub mod votes;

// Re-export commonly used types and traits
pub use error::{Result, VotingError};
pub use types::*;

// Re-export key components
pub use catalog::{Catalog, CatalogProvider};
pub use ranking::{build_rankings, RankingPublisher, TieBreak};
pub use rating::{compute_ratings, RatingEngine, RatingTable};
pub use service::{Aggregator, AppState};
pub use votes::VoteLog;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
