//! Elo rating update for a single pairwise vote
//!
//! Expected scores come from the skillratings crate. The update itself is
//! applied here because ratings are rounded to whole points after every vote,
//! which the crate's own `elo` function does not do.

use crate::config::RatingConfig;
use crate::error::{Result, VotingError};
use crate::utils::round_half_up;
use skillratings::elo::EloRating;

/// Ratings of both participants after one vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EloOutcome {
    pub winner_rating: i64,
    pub loser_rating: i64,
}

/// Elo calculator with a constant K-factor
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: RatingConfig,
}

impl EloCalculator {
    /// Create a new Elo calculator
    pub fn new(config: RatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub fn initial_rating(&self) -> i64 {
        self.config.initial_rating
    }

    /// Probability that `winner_rating` beats `loser_rating`
    pub fn expected_win(&self, winner_rating: i64, loser_rating: i64) -> f64 {
        let (expected, _) = skillratings::elo::expected_score(
            &EloRating {
                rating: winner_rating as f64,
            },
            &EloRating {
                rating: loser_rating as f64,
            },
        );
        expected
    }

    /// Apply one vote and round both ratings to the nearest point
    ///
    /// The winner never loses points and the loser never gains any.
    pub fn rate(&self, winner_rating: i64, loser_rating: i64) -> Result<EloOutcome> {
        let k = self.config.k_factor;
        let expected_winner = self.expected_win(winner_rating, loser_rating);
        let expected_loser = 1.0 - expected_winner;

        let winner = round_half_up(winner_rating as f64 + k * (1.0 - expected_winner));
        let loser = round_half_up(loser_rating as f64 + k * (0.0 - expected_loser));

        if !winner.is_finite() || !loser.is_finite() {
            return Err(VotingError::RatingCalculationFailed {
                reason: format!(
                    "non-finite rating from {} vs {} (expected {})",
                    winner_rating, loser_rating, expected_winner
                ),
            }
            .into());
        }

        Ok(EloOutcome {
            winner_rating: winner as i64,
            loser_rating: loser as i64,
        })
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            config: RatingConfig::default(),
        }
    }
}
