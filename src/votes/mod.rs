//! Vote recording: the append-only vote log and submission validation

pub mod ingest;
pub mod log;

// Re-export commonly used types
pub use ingest::validate_vote;
pub use log::{InMemoryVoteLog, JsonlVoteLog, LogContents, VoteLog};
