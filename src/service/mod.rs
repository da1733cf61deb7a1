//! Service coordination: application state, scheduled aggregation and health

pub mod aggregation;
pub mod app;
pub mod health;

pub use aggregation::{AggregationScheduler, Aggregator, RunRecord};
pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
