//! Integration tests for the elo-board voting service
//!
//! These tests validate the aggregation pipeline end to end:
//! - Replay of a vote log into a published leaderboard
//! - File-backed catalog, vote log and ranking cache
//! - All-or-nothing publishing when a run fails
//! - Determinism across repeated runs

mod fixtures;

use elo_board::catalog::{FileCatalogProvider, StaticCatalogProvider};
use elo_board::config::AppConfig;
use elo_board::metrics::MetricsCollector;
use elo_board::ranking::{FileRankingCache, InMemoryRankingCache, RankingPublisher, TieBreak};
use elo_board::service::{AppState, Aggregator};
use elo_board::types::VoteRequest;
use elo_board::votes::{InMemoryVoteLog, JsonlVoteLog, VoteLog};
use std::sync::Arc;

use fixtures::{entries, sample_entries, vote, write_catalog, FlakyVoteLog, RecordingPublisher};

fn metrics() -> Arc<MetricsCollector> {
    Arc::new(MetricsCollector::new().unwrap())
}

fn ranking_ids(snapshot: &elo_board::RankingSnapshot) -> Vec<String> {
    snapshot.rankings.iter().map(|e| e.id.clone()).collect()
}

#[tokio::test]
async fn test_three_entry_example_end_to_end() {
    let catalog = Arc::new(StaticCatalogProvider::new(entries(&["a", "b", "c"])).unwrap());
    let vote_log = Arc::new(InMemoryVoteLog::with_events(vec![
        vote("a", "b"),
        vote("c", "a"),
    ]));
    let cache = Arc::new(InMemoryRankingCache::new());

    let aggregator = Aggregator::new(catalog, vote_log, cache.clone(), metrics());
    let snapshot = aggregator.run_aggregation().await.unwrap();

    assert_eq!(ranking_ids(&snapshot), vec!["c", "a", "b"]);
    let ratings: Vec<i64> = snapshot.rankings.iter().map(|e| e.rating).collect();
    assert_eq!(ratings, vec![1517, 1499, 1484]);
    assert_eq!(cache.latest().await.unwrap().unwrap(), snapshot);
}

#[tokio::test]
async fn test_file_backed_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = write_catalog(dir.path(), &sample_entries());
    let log_path = dir.path().join("votes.jsonl");
    let cache_path = dir.path().join("ranking.json");

    let vote_log = Arc::new(JsonlVoteLog::new(&log_path));
    for (winner, loser) in [
        ("kyoto_sci", "keio_law"),
        ("osaka_med", "waseda_comm"),
        ("kyoto_sci", "osaka_med"),
    ] {
        vote_log.append(vote(winner, loser)).await.unwrap();
    }

    let aggregator = Aggregator::new(
        Arc::new(FileCatalogProvider::new(&catalog_path)),
        vote_log,
        Arc::new(FileRankingCache::new(&cache_path)),
        metrics(),
    );
    let snapshot = aggregator.run_aggregation().await.unwrap();

    assert_eq!(snapshot.rankings.len(), 5);
    assert_eq!(snapshot.rankings[0].id, "kyoto_sci");
    assert_eq!(
        snapshot.rankings[0].name,
        "Kyoto University, Faculty of Science"
    );

    // A fresh reader sees the same snapshot on disk
    let reread = FileRankingCache::new(&cache_path).latest().await.unwrap();
    assert_eq!(reread, Some(snapshot));
}

#[tokio::test]
async fn test_failed_read_keeps_previous_snapshot() {
    let vote_log = Arc::new(FlakyVoteLog::with_events(vec![vote("a", "b")]));
    let publisher = Arc::new(RecordingPublisher::default());
    let aggregator = Aggregator::new(
        Arc::new(StaticCatalogProvider::new(entries(&["a", "b"])).unwrap()),
        vote_log.clone(),
        publisher.clone(),
        metrics(),
    );

    let first = aggregator.run_aggregation().await.unwrap();

    vote_log.set_fail_reads(true);
    assert!(aggregator.run_aggregation().await.is_err());

    assert_eq!(publisher.attempts(), 1);
    assert_eq!(publisher.latest().await.unwrap(), Some(first));

    // The next scheduled run recovers
    vote_log.set_fail_reads(false);
    vote_log.append(vote("b", "a")).await.unwrap();
    let recovered = aggregator.run_aggregation().await.unwrap();
    assert_eq!(publisher.published().len(), 2);
    assert_eq!(recovered.rankings.len(), 2);
}

#[tokio::test]
async fn test_failed_publish_is_not_retried_within_run() {
    let publisher = Arc::new(RecordingPublisher::default());
    publisher.set_fail(true);
    let aggregator = Aggregator::new(
        Arc::new(StaticCatalogProvider::new(entries(&["a", "b"])).unwrap()),
        Arc::new(InMemoryVoteLog::new()),
        publisher.clone(),
        metrics(),
    );

    assert!(aggregator.run_aggregation().await.is_err());
    assert_eq!(publisher.attempts(), 1);
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let log = InMemoryVoteLog::new();
    let ids = ["utokyo_sci1", "kyoto_sci", "osaka_med", "keio_law", "waseda_comm"];
    for round in 0..40 {
        let winner = ids[(round * 3) % ids.len()];
        let loser = ids[(round * 7 + 1) % ids.len()];
        log.append(vote(winner, loser)).await.unwrap();
    }
    let vote_log = Arc::new(log);

    let publisher = Arc::new(RecordingPublisher::default());
    let aggregator = Aggregator::new(
        Arc::new(StaticCatalogProvider::new(sample_entries()).unwrap()),
        vote_log,
        publisher.clone(),
        metrics(),
    );

    let first = aggregator.run_aggregation().await.unwrap();
    let second = aggregator.run_aggregation().await.unwrap();

    assert_eq!(first.rankings, second.rankings);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_tie_break_rules_on_untouched_catalog() {
    let catalog = entries(&["m", "z", "a"]);

    for (tie_break, expected) in [
        (TieBreak::CatalogOrder, vec!["m", "z", "a"]),
        (TieBreak::IdAscending, vec!["a", "m", "z"]),
    ] {
        let aggregator = Aggregator::new(
            Arc::new(StaticCatalogProvider::new(catalog.clone()).unwrap()),
            Arc::new(InMemoryVoteLog::new()),
            Arc::new(InMemoryRankingCache::new()),
            metrics(),
        )
        .with_tie_break(tie_break);

        let snapshot = aggregator.run_aggregation().await.unwrap();
        assert_eq!(ranking_ids(&snapshot), expected);
        assert!(snapshot.rankings.iter().all(|e| e.rating == 1500));
    }
}

#[tokio::test]
async fn test_votes_submitted_through_app_state_reach_ranking() {
    let state = AppState::in_memory(AppConfig::default(), sample_entries()).unwrap();

    for _ in 0..3 {
        state
            .submit_vote(&VoteRequest {
                winner_id: Some("waseda_comm".to_string()),
                loser_id: Some("utokyo_sci1".to_string()),
            })
            .await
            .unwrap();
    }

    let snapshot = state.aggregator().run_aggregation().await.unwrap();
    assert_eq!(snapshot.rankings.first().unwrap().id, "waseda_comm");
    assert_eq!(snapshot.rankings.last().unwrap().id, "utokyo_sci1");
}

#[tokio::test]
async fn test_concurrent_submissions_are_all_recorded() {
    let state = Arc::new(AppState::in_memory(AppConfig::default(), sample_entries()).unwrap());

    let submissions = (0..50).map(|i| {
        let state = state.clone();
        async move {
            let (winner, loser) = if i % 2 == 0 {
                ("kyoto_sci", "keio_law")
            } else {
                ("keio_law", "osaka_med")
            };
            state
                .submit_vote(&VoteRequest {
                    winner_id: Some(winner.to_string()),
                    loser_id: Some(loser.to_string()),
                })
                .await
        }
    });

    let results = futures::future::join_all(submissions).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(state.vote_log().event_count().await.unwrap(), 50);
}

#[tokio::test]
async fn test_unreadable_log_lines_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("votes.jsonl");
    let valid = serde_json::to_string(&vote("a", "b")).unwrap();
    std::fs::write(
        &log_path,
        format!("{}\n{}\n{}\n", valid, r#"{"winnerId":"c","loserId":"a"}"#, "{garbage"),
    )
    .unwrap();

    let metrics = metrics();
    let aggregator = Aggregator::new(
        Arc::new(StaticCatalogProvider::new(entries(&["a", "b", "c"])).unwrap()),
        Arc::new(JsonlVoteLog::new(&log_path)),
        Arc::new(InMemoryRankingCache::new()),
        metrics.clone(),
    );

    let snapshot = aggregator.run_aggregation().await.unwrap();
    assert_eq!(ranking_ids(&snapshot), vec!["a", "c", "b"]);

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
}
