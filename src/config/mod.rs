//! Configuration management for the elo-board service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the voting service.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AggregationSettings, AppConfig, ServiceSettings, StorageSettings};
pub use rating::{RatingConfig, INITIAL_RATING, K_FACTOR};
