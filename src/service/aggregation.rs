//! Aggregation run and its schedule
//!
//! One run reads the catalog and the entire vote log, replays every vote,
//! builds the leaderboard and publishes it. Publishing is the last step, so a
//! run that fails anywhere before it leaves the previous snapshot in place.

use crate::catalog::CatalogProvider;
use crate::error::{Result, VotingError};
use crate::metrics::MetricsCollector;
use crate::ranking::{build_rankings, RankingPublisher, TieBreak};
use crate::rating::{RatingEngine, ReplayReport};
use crate::types::RankingSnapshot;
use crate::votes::VoteLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outcome of the most recent aggregation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub events_read: usize,
    pub report: ReplayReport,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Runs the read, replay, rank, publish pipeline
pub struct Aggregator {
    catalog: Arc<dyn CatalogProvider>,
    vote_log: Arc<dyn VoteLog>,
    publisher: Arc<dyn RankingPublisher>,
    metrics: Arc<MetricsCollector>,
    engine: RatingEngine,
    tie_break: TieBreak,
    run_lock: Mutex<()>,
    last_run: RwLock<Option<RunRecord>>,
}

impl Aggregator {
    /// Create an aggregator with the default rating engine and tie-break
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        vote_log: Arc<dyn VoteLog>,
        publisher: Arc<dyn RankingPublisher>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            catalog,
            vote_log,
            publisher,
            metrics,
            engine: RatingEngine::default(),
            tie_break: TieBreak::default(),
            run_lock: Mutex::new(()),
            last_run: RwLock::new(None),
        }
    }

    pub fn with_engine(mut self, engine: RatingEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// The most recent run, successful or not
    pub async fn last_run(&self) -> Option<RunRecord> {
        self.last_run.read().await.clone()
    }

    /// Run one full aggregation and publish the result
    ///
    /// Fails with [`VotingError::AggregationInProgress`] if another run in this
    /// process has not finished yet.
    pub async fn run_aggregation(&self) -> Result<RankingSnapshot> {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Aggregation already in progress, skipping this run");
                self.metrics.record_aggregation_skipped();
                return Err(VotingError::AggregationInProgress.into());
            }
        };

        let start = Instant::now();
        let mut events_read = 0;
        let mut report = ReplayReport::default();
        let result = self
            .replay_and_publish(&mut events_read, &mut report)
            .await;
        let duration = start.elapsed();

        match &result {
            Ok(snapshot) => {
                self.metrics.record_aggregation_success(
                    duration,
                    snapshot.rankings.len(),
                    snapshot.updated_at.timestamp(),
                );
                info!(
                    "🏆 Ranking updated - entries: {}, votes: {}, applied: {}, skipped: {}, time: {:.2}ms",
                    snapshot.rankings.len(),
                    events_read,
                    report.applied,
                    report.skipped(),
                    duration.as_secs_f64() * 1000.0
                );
            }
            Err(e) => {
                self.metrics.record_aggregation_failure(duration);
                error!(
                    "Aggregation failed, previous ranking kept - time: {:.2}ms, error: {:#}",
                    duration.as_secs_f64() * 1000.0,
                    e
                );
            }
        }

        *self.last_run.write().await = Some(RunRecord {
            finished_at: Utc::now(),
            succeeded: result.is_ok(),
            events_read,
            report,
            duration_ms: duration.as_millis() as u64,
            error: result.as_ref().err().map(|e| format!("{:#}", e)),
        });

        result
    }

    async fn replay_and_publish(
        &self,
        events_read: &mut usize,
        report: &mut ReplayReport,
    ) -> Result<RankingSnapshot> {
        let catalog = self.catalog.load_catalog().await?;
        debug!("Loaded catalog with {} entries", catalog.len());

        let contents = self.vote_log.read_events().await?;
        *events_read = contents.records();
        debug!(
            "Read {} records from the log ({} unreadable)",
            contents.records(),
            contents.unreadable
        );

        let mut outcome = self.engine.compute_ratings(&catalog, &contents.events)?;
        // Undecodable records count as malformed votes
        outcome.report.malformed += contents.unreadable;
        *report = outcome.report;
        self.metrics.record_replay(contents.records(), &outcome.report);

        let rankings = build_rankings(&outcome.table, &catalog, self.tie_break)?;
        let snapshot = RankingSnapshot::now(rankings);

        self.publisher.publish(snapshot.clone()).await?;
        Ok(snapshot)
    }
}

/// Drives [`Aggregator::run_aggregation`] on a fixed interval
///
/// Each tick spawns its run, so a slow run never delays the schedule; a tick
/// that lands while a run is still in flight is skipped by the aggregator.
/// On shutdown the loop stops ticking and waits for runs already started.
pub struct AggregationScheduler {
    aggregator: Arc<Aggregator>,
    interval: Duration,
    run_on_startup: bool,
}

impl AggregationScheduler {
    pub fn new(aggregator: Arc<Aggregator>, interval: Duration, run_on_startup: bool) -> Self {
        Self {
            aggregator,
            interval,
            run_on_startup,
        }
    }

    /// Spawn the schedule loop; it exits once `shutdown` turns true
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The first tick completes immediately
            if !self.run_on_startup {
                interval.tick().await;
            }

            info!(
                "Aggregation scheduler started - interval: {}s",
                self.interval.as_secs()
            );

            let mut runs = JoinSet::new();

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let aggregator = self.aggregator.clone();
                        runs.spawn(async move {
                            // Failures are logged and counted inside the run
                            let _ = aggregator.run_aggregation().await;
                        });
                    }
                    Some(finished) = runs.join_next(), if !runs.is_empty() => {
                        if let Err(e) = finished {
                            error!("Aggregation task failed: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            if !runs.is_empty() {
                info!("Waiting for {} in-flight aggregation run(s)", runs.len());
            }
            while let Some(finished) = runs.join_next().await {
                if let Err(e) = finished {
                    error!("Aggregation task failed: {}", e);
                }
            }

            info!("Aggregation scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::provider::MockCatalogProvider;
    use crate::catalog::{Catalog, StaticCatalogProvider};
    use crate::ranking::publisher::MockRankingPublisher;
    use crate::ranking::InMemoryRankingCache;
    use crate::types::{Entry, VoteEvent};
    use crate::votes::log::MockVoteLog;
    use crate::votes::{InMemoryVoteLog, LogContents};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn entries() -> Vec<Entry> {
        vec![Entry::new("a", "A"), Entry::new("b", "B"), Entry::new("c", "C")]
    }

    fn metrics() -> Arc<MetricsCollector> {
        Arc::new(MetricsCollector::new().unwrap())
    }

    fn static_catalog() -> Arc<StaticCatalogProvider> {
        Arc::new(StaticCatalogProvider::new(entries()).unwrap())
    }

    #[tokio::test]
    async fn test_run_publishes_snapshot() {
        let vote_log = Arc::new(InMemoryVoteLog::with_events(vec![
            VoteEvent::new("a", "b"),
            VoteEvent::new("c", "a"),
        ]));
        let cache = Arc::new(InMemoryRankingCache::new());
        let aggregator = Aggregator::new(static_catalog(), vote_log, cache.clone(), metrics());

        let snapshot = aggregator.run_aggregation().await.unwrap();

        let ids: Vec<_> = snapshot.rankings.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(cache.latest().await.unwrap(), Some(snapshot));

        let last_run = aggregator.last_run().await.unwrap();
        assert!(last_run.succeeded);
        assert_eq!(last_run.events_read, 2);
        assert_eq!(last_run.report.applied, 2);
    }

    #[tokio::test]
    async fn test_log_read_failure_does_not_publish() {
        let mut vote_log = MockVoteLog::new();
        vote_log.expect_read_events().times(1).returning(|| {
            Err(VotingError::LogReadFailure {
                message: "connection reset".to_string(),
            }
            .into())
        });

        let mut publisher = MockRankingPublisher::new();
        publisher.expect_publish().never();

        let aggregator = Aggregator::new(
            static_catalog(),
            Arc::new(vote_log),
            Arc::new(publisher),
            metrics(),
        );

        let err = aggregator.run_aggregation().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VotingError>(),
            Some(VotingError::LogReadFailure { .. })
        ));

        let last_run = aggregator.last_run().await.unwrap();
        assert!(!last_run.succeeded);
        assert!(last_run.error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_catalog_failure_skips_log_read() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_load_catalog().times(1).returning(|| {
            Err(VotingError::CatalogLoadFailure {
                message: "missing".to_string(),
            }
            .into())
        });

        let mut vote_log = MockVoteLog::new();
        vote_log.expect_read_events().never();

        let mut publisher = MockRankingPublisher::new();
        publisher.expect_publish().never();

        let metrics = metrics();
        let aggregator = Aggregator::new(
            Arc::new(catalog),
            Arc::new(vote_log),
            Arc::new(publisher),
            metrics.clone(),
        );

        assert!(aggregator.run_aggregation().await.is_err());
        assert_eq!(
            metrics
                .aggregation_runs_total
                .with_label_values(&["failure"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let mut publisher = MockRankingPublisher::new();
        publisher.expect_publish().times(1).returning(|_| {
            Err(VotingError::PublishFailure {
                message: "disk full".to_string(),
            }
            .into())
        });

        let aggregator = Aggregator::new(
            static_catalog(),
            Arc::new(InMemoryVoteLog::new()),
            Arc::new(publisher),
            metrics(),
        );

        let err = aggregator.run_aggregation().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VotingError>(),
            Some(VotingError::PublishFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_receives_full_catalog() {
        let mut publisher = MockRankingPublisher::new();
        publisher
            .expect_publish()
            .withf(|snapshot| snapshot.rankings.len() == 3)
            .times(1)
            .returning(|_| Ok(()));

        let aggregator = Aggregator::new(
            static_catalog(),
            Arc::new(InMemoryVoteLog::with_events(vec![
                VoteEvent::new("a", "ghost"),
                VoteEvent::new("b", "b"),
            ])),
            Arc::new(publisher),
            metrics(),
        )
        .with_tie_break(TieBreak::IdAscending);

        let snapshot = aggregator.run_aggregation().await.unwrap();
        assert!(snapshot.rankings.iter().all(|e| e.rating == 1500));

        let report = aggregator.last_run().await.unwrap().report;
        assert_eq!(report.unknown_entry, 1);
        assert_eq!(report.malformed, 1);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_rejected() {
        let cache = Arc::new(InMemoryRankingCache::new());
        let metrics = metrics();
        let aggregator = Aggregator::new(
            static_catalog(),
            Arc::new(InMemoryVoteLog::new()),
            cache.clone(),
            metrics.clone(),
        );

        let _held = aggregator.run_lock.lock().await;
        let err = aggregator.run_aggregation().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VotingError>(),
            Some(VotingError::AggregationInProgress)
        ));
        assert!(cache.latest().await.unwrap().is_none());
        assert_eq!(
            metrics
                .aggregation_runs_total
                .with_label_values(&["skipped"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_scheduler_runs_on_startup_and_stops() {
        let cache = Arc::new(InMemoryRankingCache::new());
        let aggregator = Arc::new(Aggregator::new(
            static_catalog(),
            Arc::new(InMemoryVoteLog::new()),
            cache.clone(),
            metrics(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = AggregationScheduler::new(aggregator, Duration::from_secs(3600), true)
            .spawn(shutdown_rx);

        let mut published = None;
        for _ in 0..50 {
            published = cache.latest().await.unwrap();
            if published.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(published.unwrap().rankings.len(), 3);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_catalog_is_reloaded_each_run() {
        let mut catalog = MockCatalogProvider::new();
        let mut calls = 0;
        catalog.expect_load_catalog().times(2).returning(move || {
            calls += 1;
            let mut entries = vec![Entry::new("a", "A"), Entry::new("b", "B")];
            if calls > 1 {
                entries.push(Entry::new("c", "C"));
            }
            Catalog::new(entries)
        });

        let aggregator = Aggregator::new(
            Arc::new(catalog),
            Arc::new(InMemoryVoteLog::new()),
            Arc::new(InMemoryRankingCache::new()),
            metrics(),
        );

        assert_eq!(aggregator.run_aggregation().await.unwrap().rankings.len(), 2);
        assert_eq!(aggregator.run_aggregation().await.unwrap().rankings.len(), 3);
    }

    #[tokio::test]
    async fn test_unreadable_records_count_as_malformed() {
        let mut vote_log = MockVoteLog::new();
        vote_log.expect_read_events().times(1).returning(|| {
            Ok(LogContents {
                events: vec![VoteEvent::new("a", "b")],
                unreadable: 2,
            })
        });

        let metrics = metrics();
        let aggregator = Aggregator::new(
            static_catalog(),
            Arc::new(vote_log),
            Arc::new(InMemoryRankingCache::new()),
            metrics.clone(),
        );

        aggregator.run_aggregation().await.unwrap();

        let last_run = aggregator.last_run().await.unwrap();
        assert_eq!(last_run.events_read, 3);
        assert_eq!(last_run.report.applied, 1);
        assert_eq!(last_run.report.malformed, 2);
        assert_eq!(
            metrics
                .replay_events_total
                .with_label_values(&["malformed"])
                .get(),
            2
        );
        assert_eq!(metrics.vote_log_size.get(), 3);
    }

    /// Publisher that holds each publish open for a while
    #[derive(Default)]
    struct SlowPublisher {
        started: AtomicBool,
        inner: InMemoryRankingCache,
    }

    #[async_trait]
    impl RankingPublisher for SlowPublisher {
        async fn publish(&self, snapshot: RankingSnapshot) -> Result<()> {
            self.started.store(true, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.inner.publish(snapshot).await
        }

        async fn latest(&self) -> Result<Option<RankingSnapshot>> {
            self.inner.latest().await
        }
    }

    #[tokio::test]
    async fn test_scheduler_shutdown_waits_for_inflight_run() {
        let publisher = Arc::new(SlowPublisher::default());
        let aggregator = Arc::new(Aggregator::new(
            static_catalog(),
            Arc::new(InMemoryVoteLog::new()),
            publisher.clone(),
            metrics(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = AggregationScheduler::new(aggregator, Duration::from_secs(3600), true)
            .spawn(shutdown_rx);

        for _ in 0..100 {
            if publisher.started.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(publisher.started.load(Ordering::SeqCst));
        assert!(publisher.latest().await.unwrap().is_none());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(publisher.latest().await.unwrap().is_some());
    }
}
