//! Health check functionality
//!
//! This module provides health checks for the elo-board service, including
//! readiness and liveness probes and ranking freshness.

use crate::service::aggregation::RunRecord;
use crate::service::app::AppState;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Snapshots older than this many aggregation intervals are stale
const STALE_INTERVALS: u32 = 3;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Votes currently in the log
    pub total_votes: usize,
    /// Entries in the published ranking
    pub ranked_entries: usize,
    /// When the published ranking was computed
    pub ranking_updated_at: Option<DateTime<Utc>>,
    /// Most recent aggregation run
    pub last_run: Option<RunRecord>,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();

        checks.push(Self::check_service_running(&app_state).await);

        let log_start = std::time::Instant::now();
        let vote_count = app_state.vote_log().event_count().await;
        checks.push(Self::check_vote_log(&vote_count, log_start));

        checks.push(Self::check_ranking_freshness(&app_state).await);

        let status = Self::overall_status(&checks);
        let stats =
            Self::gather_service_stats(&app_state, vote_count.as_ref().ok().copied()).await;

        Ok(HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - the service can accept votes
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        match app_state.catalog().load_catalog().await {
            Ok(_) => Ok(Self::check_ranking_freshness(&app_state).await.status),
            Err(e) => {
                debug!("Readiness check could not load catalog: {}", e);
                Ok(HealthStatus::Unhealthy)
            }
        }
    }

    fn overall_status(checks: &[ComponentCheck]) -> HealthStatus {
        if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Check if service is running
    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Check the vote log could be counted
    fn check_vote_log(vote_count: &Result<usize>, start: std::time::Instant) -> ComponentCheck {
        let (status, message) = match vote_count {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => (
                HealthStatus::Unhealthy,
                Some(format!("Vote log unreadable: {}", e)),
            ),
        };

        ComponentCheck {
            name: "vote_log".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Check a ranking has been published recently
    async fn check_ranking_freshness(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();
        let max_age = app_state.config().aggregation_interval() * STALE_INTERVALS;

        let (status, message) = match app_state.publisher().latest().await {
            Ok(Some(snapshot)) => {
                let age = (Utc::now() - snapshot.updated_at)
                    .to_std()
                    .unwrap_or_default();
                if age > max_age {
                    (
                        HealthStatus::Degraded,
                        Some(format!("Ranking is {}s old", age.as_secs())),
                    )
                } else {
                    (HealthStatus::Healthy, None)
                }
            }
            Ok(None) => (
                HealthStatus::Degraded,
                Some("No ranking published yet".to_string()),
            ),
            Err(e) => (
                HealthStatus::Degraded,
                Some(format!("Ranking cache unreadable: {}", e)),
            ),
        };

        ComponentCheck {
            name: "ranking_cache".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Gather current service statistics
    async fn gather_service_stats(app_state: &AppState, total_votes: Option<usize>) -> ServiceStats {
        let total_votes = total_votes.unwrap_or(0);
        let snapshot = app_state.publisher().latest().await.ok().flatten();

        ServiceStats {
            total_votes,
            ranked_entries: snapshot.as_ref().map_or(0, |s| s.rankings.len()),
            ranking_updated_at: snapshot.map(|s| s.updated_at),
            last_run: app_state.aggregator().last_run().await,
        }
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
