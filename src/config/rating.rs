//! Rating system configuration

use serde::{Deserialize, Serialize};

/// Starting rating for every catalog entry
pub const INITIAL_RATING: i64 = 1500;

/// Elo K-factor applied to every vote
pub const K_FACTOR: f64 = 32.0;

/// Elo parameters used when replaying the vote log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub initial_rating: i64,
    pub k_factor: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: INITIAL_RATING,
            k_factor: K_FACTOR,
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(crate::error::VotingError::ConfigurationError {
                message: format!("K-factor must be positive, got {}", self.k_factor),
            }
            .into());
        }

        Ok(())
    }
}
