//! Error types for the voting service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Typed variants can be recovered with
//! `anyhow::Error::downcast_ref::<VotingError>()`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific voting and aggregation scenarios
#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    #[error("Malformed vote event: {reason}")]
    MalformedEvent { reason: String },

    #[error("Vote references unknown entry: {entry_id}")]
    UnknownEntryReference { entry_id: String },

    #[error("Failed to read vote log: {message}")]
    LogReadFailure { message: String },

    #[error("Failed to append to vote log: {message}")]
    LogWriteFailure { message: String },

    #[error("Failed to load entry catalog: {message}")]
    CatalogLoadFailure { message: String },

    #[error("Failed to publish ranking snapshot: {message}")]
    PublishFailure { message: String },

    #[error("Invalid vote: {reason}")]
    InvalidVote { reason: String },

    #[error("An aggregation run is already in progress")]
    AggregationInProgress,

    #[error("Rating calculation failed: {reason}")]
    RatingCalculationFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl VotingError {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VotingError::InvalidVote { .. }
                | VotingError::MalformedEvent { .. }
                | VotingError::UnknownEntryReference { .. }
        )
    }
}
