//! Integration tests for the daemon: spool ingestion through the hierarchy,
//! routing of kernel insights into the tournament, and graceful shutdown via
//! CancellationToken.
//!
//! Run with:
//! ```bash
//! cargo test -p sigcon-daemon --test daemon_lifecycle
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sigcon_daemon::config::{DaemonConfig, FeedConfig};
use sigcon_daemon::daemon::{Daemon, Pipeline};
use sigcon_models::config::{DirectorConfig, Persona};
use sigcon_models::insight::InsightKind;
use sigcon_models::research::ResearchCategory;
use sigcon_store::SqliteRepository;

const BTC_BUY: &str =
    r#"{"topic": "BTC", "stance": "BUY", "strength": 0.9, "confidence": 0.8, "priority": 9}"#;

fn config(root: &Path, interval: u64) -> DaemonConfig {
    let mut config: DaemonConfig = toml::from_str("").unwrap();
    config.core.directors = vec![
        DirectorConfig::new("markets", "market"),
        DirectorConfig::new("crypto", "crypto"),
    ];
    for (name, domain, director) in [("tape", "market", "markets"), ("onchain", "crypto", "crypto")] {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        config.feeds.push(FeedConfig {
            name: name.to_string(),
            domain: domain.to_string(),
            director: director.to_string(),
            spool_dir: dir.display().to_string(),
        });
    }
    config.schedule.feed_poll_seconds = interval;
    config.schedule.director_interval_seconds = interval;
    config.schedule.kernel_interval_seconds = interval;
    config.schedule.trading_cycle_seconds = interval;
    config
}

fn drop_signal(root: &Path, feed: &str, file: &str, body: &str) {
    std::fs::write(root.join(feed).join(file), body).unwrap();
}

/// One manually stepped pass through every stage.
#[tokio::test]
async fn spooled_signals_reach_the_tournament() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(SqliteRepository::open(dir.path().join("research.db").to_str().unwrap()).unwrap());
    let config = config(dir.path(), 60);
    drop_signal(dir.path(), "tape", "001.json", BTC_BUY);
    drop_signal(dir.path(), "onchain", "001.json", &format!("[{BTC_BUY}]"));

    let pipeline = Pipeline::build(&config, repo.clone()).unwrap();
    assert_eq!(pipeline.feeds().len(), 2);
    assert_eq!(pipeline.directors().len(), 2);
    assert_eq!(pipeline.directors()[0].feed_count(), 1);

    assert_eq!(pipeline.poll_feeds().await, 2);
    assert!(dir.path().join("tape").join("001.json.done").exists());
    assert_eq!(pipeline.run_directors().await, 2);

    let routed = pipeline.run_kernel().await.unwrap();
    let insights = pipeline.kernel().insights();
    assert!(insights
        .iter()
        .any(|i| i.kind == InsightKind::CrossDomain && i.topic == "BTC"));
    assert!(!routed.is_empty());
    assert!(routed.iter().all(|e| e.consensus_applied));
    assert_eq!(pipeline.watchlist().len(), 1);

    // Stopped tournaments do not trade.
    pipeline.run_trading_cycle().await;
    let innovation = pipeline.tracker().performance(Persona::Innovation.id()).unwrap();
    assert_eq!(innovation.trades, 0);

    pipeline.tracker().start();
    pipeline.run_trading_cycle().await;
    for persona in Persona::ALL {
        let record = pipeline.tracker().performance(persona.id()).unwrap();
        // Neutral personas hold, and holds are not trades.
        assert!(record.trades <= 1, "{} traded twice", persona.id());
    }
    let bitcoin = pipeline.tracker().performance(Persona::MonetaryNetwork.id()).unwrap();
    assert_eq!(bitcoin.trades, 1);

    assert!(!repo.recent(ResearchCategory::Consensus, 10).unwrap().is_empty());
    let reports = repo.recent(ResearchCategory::Reports, 10).unwrap();
    assert_eq!(reports[0].title, "Executive Summary");
}

/// The daemon runs its loops on their timers and stops when cancelled.
#[tokio::test]
async fn daemon_runs_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let config = config(dir.path(), 1);
    drop_signal(dir.path(), "tape", "001.json", BTC_BUY);
    drop_signal(dir.path(), "onchain", "001.json", BTC_BUY);

    let daemon = Arc::new(Daemon::new(config, repo).unwrap());
    let cancel = daemon.cancel_token();
    let runner = daemon.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(daemon.pipeline().tracker().is_running());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("daemon did not shut down in time")
        .expect("daemon panicked")
        .unwrap();

    assert!(!daemon.pipeline().tracker().is_running());
    assert!(dir.path().join("tape").join("001.json.done").exists());
    assert!(dir.path().join("onchain").join("001.json.done").exists());
    assert!(!daemon.pipeline().kernel().insights().is_empty());
    assert_eq!(daemon.pipeline().watchlist().len(), 1);
}

/// Files dropped after startup are picked up on a later poll.
#[tokio::test]
async fn late_spool_files_are_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let config = config(dir.path(), 60);
    let pipeline = Pipeline::build(&config, repo).unwrap();

    assert_eq!(pipeline.poll_feeds().await, 0);
    assert_eq!(pipeline.run_directors().await, 0);

    drop_signal(dir.path(), "tape", "002.json", BTC_BUY);
    drop_signal(dir.path(), "tape", "003.json", "not json");
    assert_eq!(pipeline.poll_feeds().await, 1);
    assert!(dir.path().join("tape").join("003.json.rejected").exists());
    assert_eq!(pipeline.feeds()[0].all_signals().len(), 1);
}

#[test]
fn unknown_director_is_rejected_at_build() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 60);
    config.feeds[0].director = "nobody".to_string();
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    assert!(Pipeline::build(&config, repo).is_err());
}
