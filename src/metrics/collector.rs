//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the elo-board voting service
//! using Prometheus metrics.

use crate::rating::ReplayReport;
use anyhow::Result;
use prometheus::{Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the voting service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Vote submissions by outcome (accepted, invalid, error)
    pub votes_received_total: IntCounterVec,

    /// Aggregation runs by outcome (success, failure, skipped)
    pub aggregation_runs_total: IntCounterVec,

    /// Replayed events by outcome (applied, malformed, unknown_entry)
    pub replay_events_total: IntCounterVec,

    /// Wall time of a full aggregation run
    pub aggregation_duration_seconds: Histogram,

    /// Entries in the latest published snapshot
    pub ranked_entries: IntGauge,

    /// Events replayed by the latest run
    pub vote_log_size: IntGauge,

    /// Unix time of the latest successful publish
    pub last_successful_aggregation_timestamp: Gauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let votes_received_total = IntCounterVec::new(
            Opts::new("votes_received_total", "Vote submissions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(votes_received_total.clone()))?;

        let aggregation_runs_total = IntCounterVec::new(
            Opts::new("aggregation_runs_total", "Aggregation runs by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(aggregation_runs_total.clone()))?;

        let replay_events_total = IntCounterVec::new(
            Opts::new("replay_events_total", "Replayed vote events by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(replay_events_total.clone()))?;

        let aggregation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "aggregation_duration_seconds",
                "Duration of a full aggregation run",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(aggregation_duration_seconds.clone()))?;

        let ranked_entries = IntGauge::new(
            "ranked_entries",
            "Entries in the latest published ranking snapshot",
        )?;
        registry.register(Box::new(ranked_entries.clone()))?;

        let vote_log_size = IntGauge::new("vote_log_size", "Vote events read by the latest run")?;
        registry.register(Box::new(vote_log_size.clone()))?;

        let last_successful_aggregation_timestamp = Gauge::new(
            "last_successful_aggregation_timestamp",
            "Unix time of the latest successful ranking publish",
        )?;
        registry.register(Box::new(last_successful_aggregation_timestamp.clone()))?;

        Ok(Self {
            registry,
            votes_received_total,
            aggregation_runs_total,
            replay_events_total,
            aggregation_duration_seconds,
            ranked_entries,
            vote_log_size,
            last_successful_aggregation_timestamp,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a vote submission outcome
    pub fn record_vote(&self, outcome: &str) {
        self.votes_received_total.with_label_values(&[outcome]).inc();
    }

    /// Record a completed replay
    pub fn record_replay(&self, events_read: usize, report: &ReplayReport) {
        self.vote_log_size.set(events_read as i64);
        self.replay_events_total
            .with_label_values(&["applied"])
            .inc_by(report.applied as u64);
        self.replay_events_total
            .with_label_values(&["malformed"])
            .inc_by(report.malformed as u64);
        self.replay_events_total
            .with_label_values(&["unknown_entry"])
            .inc_by(report.unknown_entry as u64);
    }

    /// Record a successful publish
    pub fn record_aggregation_success(&self, duration: Duration, ranked: usize, published_at: i64) {
        self.aggregation_runs_total
            .with_label_values(&["success"])
            .inc();
        self.aggregation_duration_seconds
            .observe(duration.as_secs_f64());
        self.ranked_entries.set(ranked as i64);
        self.last_successful_aggregation_timestamp
            .set(published_at as f64);
    }

    /// Record a run that aborted before publishing
    pub fn record_aggregation_failure(&self, duration: Duration) {
        self.aggregation_runs_total
            .with_label_values(&["failure"])
            .inc();
        self.aggregation_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record a run that was skipped because another was in flight
    pub fn record_aggregation_skipped(&self) {
        self.aggregation_runs_total
            .with_label_values(&["skipped"])
            .inc();
    }
}
