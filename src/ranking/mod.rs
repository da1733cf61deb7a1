//! Leaderboard construction and publishing
//!
//! This module turns a rating table into a sorted ranking list and stores
//! the resulting snapshot for readers.

pub mod builder;
pub mod publisher;

// Re-export commonly used types
pub use builder::{build_rankings, TieBreak};
pub use publisher::{FileRankingCache, InMemoryRankingCache, RankingPublisher};
