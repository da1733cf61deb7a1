//! Metrics and monitoring for the elo-board voting service

pub mod collector;

pub use collector::MetricsCollector;
