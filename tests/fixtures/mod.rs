//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use elo_board::error::{Result, VotingError};
use elo_board::ranking::RankingPublisher;
use elo_board::types::{Entry, RankingSnapshot, VoteEvent};
use elo_board::votes::{LogContents, VoteLog};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A small slice of the university faculty catalog
pub fn sample_entries() -> Vec<Entry> {
    vec![
        Entry::new("utokyo_sci1", "University of Tokyo, Science I"),
        Entry::new("kyoto_sci", "Kyoto University, Faculty of Science"),
        Entry::new("osaka_med", "Osaka University, School of Medicine"),
        Entry::new("keio_law", "Keio University, Faculty of Law"),
        Entry::new("waseda_comm", "Waseda University, School of Commerce"),
    ]
}

/// Entries whose ids are their names
pub fn entries(ids: &[&str]) -> Vec<Entry> {
    ids.iter().map(|id| Entry::new(*id, *id)).collect()
}

/// Write a catalog JSON file and return its path
pub fn write_catalog(dir: &Path, entries: &[Entry]) -> PathBuf {
    let path = dir.join("entries.json");
    std::fs::write(&path, serde_json::to_vec_pretty(entries).unwrap()).unwrap();
    path
}

pub fn vote(winner: &str, loser: &str) -> VoteEvent {
    VoteEvent::new(winner, loser)
}

/// Vote log whose reads can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyVoteLog {
    events: Mutex<Vec<VoteEvent>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyVoteLog {
    pub fn with_events(events: Vec<VoteEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoteLog for FlakyVoteLog {
    async fn append(&self, event: VoteEvent) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VotingError::LogWriteFailure {
                message: "simulated write failure".to_string(),
            }
            .into());
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn read_events(&self) -> Result<LogContents> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(VotingError::LogReadFailure {
                message: "simulated read failure".to_string(),
            }
            .into());
        }
        Ok(LogContents::from_events(self.events.lock().unwrap().clone()))
    }

    async fn event_count(&self) -> Result<usize> {
        Ok(self.read_all_events().await?.len())
    }
}

/// Publisher that records every snapshot it accepts
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<RankingSnapshot>>,
    fail: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingPublisher {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<RankingSnapshot> {
        self.published.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RankingPublisher for RecordingPublisher {
    async fn publish(&self, snapshot: RankingSnapshot) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(VotingError::PublishFailure {
                message: "simulated publish failure".to_string(),
            }
            .into());
        }
        self.published.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn latest(&self) -> Result<Option<RankingSnapshot>> {
        Ok(self.published.lock().unwrap().last().cloned())
    }
}
