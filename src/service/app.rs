//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the catalog, vote
//! log, ranking cache and aggregator together and owns the background tasks.

use crate::api::ApiServer;
use crate::catalog::{CatalogProvider, FileCatalogProvider, StaticCatalogProvider};
use crate::config::AppConfig;
use crate::error::Result as VotingResult;
use crate::metrics::MetricsCollector;
use crate::ranking::{FileRankingCache, InMemoryRankingCache, RankingPublisher};
use crate::rating::RatingEngine;
use crate::service::aggregation::{AggregationScheduler, Aggregator};
use crate::types::{Entry, VoteEvent, VoteRequest};
use crate::votes::{validate_vote, InMemoryVoteLog, JsonlVoteLog, VoteLog};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Entry catalog source
    catalog: Arc<dyn CatalogProvider>,

    /// Append-only vote log
    vote_log: Arc<dyn VoteLog>,

    /// Published ranking store
    publisher: Arc<dyn RankingPublisher>,

    /// Read, replay, rank, publish pipeline
    aggregator: Arc<Aggregator>,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Signals background tasks to stop
    shutdown_tx: watch::Sender<bool>,

    /// Service status
    is_running: RwLock<bool>,
}

impl AppState {
    /// Initialize the application with file-backed storage
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing elo-board voting service");
        info!(
            "Storage: catalog={}, votes={}, ranking={}",
            config.storage.catalog_path.display(),
            config.storage.vote_log_path.display(),
            config.storage.ranking_cache_path.display()
        );

        let catalog = Arc::new(FileCatalogProvider::new(&config.storage.catalog_path));
        let vote_log = Arc::new(JsonlVoteLog::new(&config.storage.vote_log_path));
        let publisher = Arc::new(FileRankingCache::new(&config.storage.ranking_cache_path));

        Self::from_components(config, catalog, vote_log, publisher)
    }

    /// Initialize the application with in-memory storage and a fixed catalog
    pub fn in_memory(config: AppConfig, entries: Vec<Entry>) -> Result<Self, ServiceError> {
        let catalog =
            Arc::new(
                StaticCatalogProvider::new(entries).map_err(|e| ServiceError::Configuration {
                    message: format!("Invalid catalog: {}", e),
                })?,
            );

        Self::from_components(
            config,
            catalog,
            Arc::new(InMemoryVoteLog::new()),
            Arc::new(InMemoryRankingCache::new()),
        )
    }

    /// Initialize the application from explicit collaborators
    pub fn from_components(
        config: AppConfig,
        catalog: Arc<dyn CatalogProvider>,
        vote_log: Arc<dyn VoteLog>,
        publisher: Arc<dyn RankingPublisher>,
    ) -> Result<Self, ServiceError> {
        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let engine =
            RatingEngine::new(config.rating).map_err(|e| ServiceError::Configuration {
                message: format!("Invalid rating configuration: {}", e),
            })?;

        let aggregator = Arc::new(
            Aggregator::new(
                catalog.clone(),
                vote_log.clone(),
                publisher.clone(),
                metrics.clone(),
            )
            .with_engine(engine)
            .with_tie_break(config.aggregation.tie_break),
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            catalog,
            vote_log,
            publisher,
            aggregator,
            metrics,
            background_tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            is_running: RwLock::new(false),
        })
    }

    /// Bind the HTTP server and start the aggregation schedule
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting elo-board voting service");

        let server = ApiServer::bind(&self.config.service).await.map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to bind HTTP server: {}", e),
            }
        })?;

        self.set_running(true).await;

        let mut tasks = self.background_tasks.lock().await;

        let scheduler = AggregationScheduler::new(
            self.aggregator.clone(),
            self.config.aggregation_interval(),
            self.config.aggregation.run_on_startup,
        );
        tasks.push(scheduler.spawn(self.shutdown_tx.subscribe()));

        let app_state = self.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.serve(app_state, shutdown_rx).await {
                tracing::error!("HTTP server failed: {}", e);
            }
        }));

        info!("✅ elo-board voting service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of elo-board service");

        self.set_running(false).await;
        let _ = self.shutdown_tx.send(true);

        let tasks: Vec<_> = self.background_tasks.lock().await.drain(..).collect();
        let timeout = self.config.shutdown_timeout();

        for task in tasks {
            let abort = task.abort_handle();
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => debug!("Background task stopped"),
                Ok(Err(e)) if e.is_cancelled() => debug!("Background task cancelled"),
                Ok(Err(e)) => {
                    return Err(ServiceError::BackgroundTask {
                        message: format!("Background task panicked: {}", e),
                    })
                }
                Err(_) => {
                    warn!("Background task did not stop within {:?}, aborting", timeout);
                    abort.abort();
                }
            }
        }

        info!("✅ elo-board service shutdown completed");
        Ok(())
    }

    /// Validate a vote submission and append it to the log
    pub async fn submit_vote(&self, request: &VoteRequest) -> VotingResult<VoteEvent> {
        let catalog = if self.config.aggregation.validate_entry_ids {
            match self.catalog.load_catalog().await {
                Ok(catalog) => Some(catalog),
                Err(e) => {
                    self.metrics.record_vote("error");
                    return Err(e);
                }
            }
        } else {
            None
        };

        let event = match validate_vote(request, catalog.as_ref()) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.record_vote("invalid");
                return Err(e);
            }
        };

        if let Err(e) = self.vote_log.append(event.clone()).await {
            self.metrics.record_vote("error");
            return Err(e);
        }

        self.metrics.record_vote("accepted");
        debug!(
            "Recorded vote {} ({} over {})",
            event.id, event.winner_id, event.loser_id
        );
        Ok(event)
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub(crate) async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    pub fn catalog(&self) -> Arc<dyn CatalogProvider> {
        self.catalog.clone()
    }

    pub fn vote_log(&self) -> Arc<dyn VoteLog> {
        self.vote_log.clone()
    }

    pub fn publisher(&self) -> Arc<dyn RankingPublisher> {
        self.publisher.clone()
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }
}
