//! Vote log interface and implementations
//!
//! The vote log is append-only. Readers always receive events in append
//! order, which is the order the rating engine replays them in.

use crate::error::{Result, VotingError};
use crate::types::VoteEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Decodable votes from the log plus a count of the records that were not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContents {
    /// Votes in append order
    pub events: Vec<VoteEvent>,
    /// Records skipped because they could not be decoded
    pub unreadable: usize,
}

impl LogContents {
    pub fn from_events(events: Vec<VoteEvent>) -> Self {
        Self {
            events,
            unreadable: 0,
        }
    }

    /// Every record in the log, decodable or not
    pub fn records(&self) -> usize {
        self.events.len() + self.unreadable
    }
}

/// Trait for the append-only vote log
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteLog: Send + Sync {
    /// Append one validated vote
    async fn append(&self, event: VoteEvent) -> Result<()>;

    /// Read the whole log in append order, counting undecodable records
    async fn read_events(&self) -> Result<LogContents>;

    /// Read every decodable vote in append order
    async fn read_all_events(&self) -> Result<Vec<VoteEvent>> {
        Ok(self.read_events().await?.events)
    }

    /// Number of decodable votes
    async fn event_count(&self) -> Result<usize>;
}

/// In-memory vote log
#[derive(Debug, Default)]
pub struct InMemoryVoteLog {
    events: RwLock<Vec<VoteEvent>>,
}

impl InMemoryVoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log pre-populated with events, kept in the given order
    pub fn with_events(events: Vec<VoteEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }
}

#[async_trait]
impl VoteLog for InMemoryVoteLog {
    async fn append(&self, event: VoteEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn read_events(&self) -> Result<LogContents> {
        Ok(LogContents::from_events(self.events.read().await.clone()))
    }

    async fn event_count(&self) -> Result<usize> {
        Ok(self.events.read().await.len())
    }
}

/// Vote log stored as one JSON object per line
///
/// A missing file is an empty log. Lines that do not decode into a vote are
/// skipped with a warning and reported in [`LogContents::unreadable`];
/// records missing an id still decode and are rejected later during replay.
///
/// The vote count is cached after the first full read and kept current by
/// appends, so [`VoteLog::event_count`] does not rescan the file. Records
/// written by another process show up at the next full read.
#[derive(Debug)]
pub struct JsonlVoteLog {
    path: PathBuf,
    // Serializes appends with full reads; holds the cached vote count
    count: Mutex<Option<usize>>,
}

impl JsonlVoteLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            count: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_contents(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VotingError::LogReadFailure {
                message: format!("failed to read {}: {}", self.path.display(), e),
            }
            .into()),
        }
    }

    fn decode(&self, contents: &str) -> LogContents {
        let mut decoded = LogContents::default();

        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<VoteEvent>(line) {
                Ok(event) => decoded.events.push(event),
                Err(e) => {
                    decoded.unreadable += 1;
                    warn!(
                        "Skipping unreadable vote record at {}:{}: {}",
                        self.path.display(),
                        index + 1,
                        e
                    );
                }
            }
        }

        decoded
    }
}

#[async_trait]
impl VoteLog for JsonlVoteLog {
    async fn append(&self, event: VoteEvent) -> Result<()> {
        let mut line = serde_json::to_string(&event).map_err(|e| VotingError::LogWriteFailure {
            message: format!("failed to serialize vote {}: {}", event.id, e),
        })?;
        line.push('\n');

        let mut count = self.count.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    VotingError::LogWriteFailure {
                        message: format!("failed to create {}: {}", parent.display(), e),
                    }
                })?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| VotingError::LogWriteFailure {
                message: format!("failed to open {}: {}", self.path.display(), e),
            })?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| VotingError::LogWriteFailure {
                message: format!("failed to write {}: {}", self.path.display(), e),
            })?;
        file.flush().await.map_err(|e| VotingError::LogWriteFailure {
            message: format!("failed to flush {}: {}", self.path.display(), e),
        })?;

        if let Some(count) = count.as_mut() {
            *count += 1;
        }

        debug!("Appended vote {} to {}", event.id, self.path.display());
        Ok(())
    }

    async fn read_events(&self) -> Result<LogContents> {
        let mut count = self.count.lock().await;

        let decoded = match self.read_contents().await? {
            Some(contents) => self.decode(&contents),
            None => LogContents::default(),
        };

        *count = Some(decoded.events.len());
        Ok(decoded)
    }

    async fn event_count(&self) -> Result<usize> {
        if let Some(count) = *self.count.lock().await {
            return Ok(count);
        }
        Ok(self.read_events().await?.events.len())
    }
}
