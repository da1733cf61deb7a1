//! Ranking snapshot publishing
//!
//! A publish fully replaces the previously stored snapshot. No history is
//! kept and nothing is merged.

use crate::error::{Result, VotingError};
use crate::types::RankingSnapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for storing and serving the published leaderboard
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankingPublisher: Send + Sync {
    /// Replace the stored snapshot
    async fn publish(&self, snapshot: RankingSnapshot) -> Result<()>;

    /// The most recently published snapshot, if any
    async fn latest(&self) -> Result<Option<RankingSnapshot>>;
}

/// In-memory ranking cache
#[derive(Debug, Default)]
pub struct InMemoryRankingCache {
    snapshot: RwLock<Option<RankingSnapshot>>,
}

impl InMemoryRankingCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingPublisher for InMemoryRankingCache {
    async fn publish(&self, snapshot: RankingSnapshot) -> Result<()> {
        *self.snapshot.write().await = Some(snapshot);
        Ok(())
    }

    async fn latest(&self) -> Result<Option<RankingSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }
}

/// Ranking cache stored as a JSON file
///
/// Snapshots are written to a sibling temporary file and renamed into place,
/// so a reader sees either the old snapshot or the new one.
#[derive(Debug)]
pub struct FileRankingCache {
    path: PathBuf,
}

impl FileRankingCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "ranking".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn publish_error(message: String) -> anyhow::Error {
    VotingError::PublishFailure { message }.into()
}

#[async_trait]
impl RankingPublisher for FileRankingCache {
    async fn publish(&self, snapshot: RankingSnapshot) -> Result<()> {
        let contents = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| publish_error(format!("failed to serialize snapshot: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    publish_error(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, contents).await.map_err(|e| {
            publish_error(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(publish_error(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!(
            "Published {} rankings to {}",
            snapshot.rankings.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn latest(&self) -> Result<Option<RankingSnapshot>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(VotingError::InternalError {
                    message: format!("failed to read {}: {}", self.path.display(), e),
                }
                .into())
            }
        };

        let snapshot = serde_json::from_slice(&contents).map_err(|e| VotingError::InternalError {
            message: format!("failed to parse {}: {}", self.path.display(), e),
        })?;

        Ok(Some(snapshot))
    }
}
