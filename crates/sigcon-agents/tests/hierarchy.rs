//! Feed → Director → Kernel runs against a real SQLite research store.

use std::sync::Arc;

use sigcon_agents::test_support::{FailingFeed, PanickingRepository, ScriptedFeed};
use sigcon_agents::{DirectorAgent, FeedAgent, KernelAgent};
use sigcon_models::config::{BufferConfig, DirectorConfig, KernelConfig};
use sigcon_models::insight::InsightKind;
use sigcon_models::research::ResearchCategory;
use sigcon_models::signal::RawSignal;
use sigcon_store::SqliteRepository;

fn feed(name: &str, domain: &str, signals: Vec<RawSignal>) -> Arc<FeedAgent> {
    Arc::new(FeedAgent::new(
        Box::new(ScriptedFeed::new(name, domain, signals)),
        &BufferConfig::default(),
    ))
}

fn inflation(sentiment: f64, strength: f64) -> RawSignal {
    RawSignal::topic("INFLATION")
        .with_sentiment(sentiment)
        .with_strength(strength)
        .with_confidence(0.8)
        .with_keywords(["cpi", "rates"])
}

async fn director_with(
    name: &str,
    domain: &str,
    feeds: Vec<Arc<FeedAgent>>,
    repo: Arc<SqliteRepository>,
) -> Arc<DirectorAgent> {
    let director = Arc::new(DirectorAgent::new(DirectorConfig::new(name, domain), 100, repo));
    for feed in feeds {
        let _ = feed.poll().await;
        director.register_feed(feed);
    }
    director
}

#[tokio::test]
async fn topic_confirmed_across_domains_becomes_an_insight() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());

    let markets = director_with(
        "markets",
        "market",
        vec![
            feed("tape", "market", vec![inflation(-0.5, 0.7), inflation(-0.6, 0.8)]),
            feed("equities", "market", vec![RawSignal::topic("AAPL").with_strength(0.9)]),
        ],
        repo.clone(),
    )
    .await;
    let economy = director_with(
        "economy",
        "macro",
        vec![feed("fed_watch", "macro", vec![inflation(-0.7, 0.75)])],
        repo.clone(),
    )
    .await;

    let kernel = KernelAgent::new(KernelConfig::default(), 100, repo.clone());
    kernel.register_director(markets.clone());
    kernel.register_director(economy.clone());

    let insights = kernel.run_cycle().await.unwrap();
    let cross: Vec<_> = insights
        .iter()
        .filter(|i| i.kind == InsightKind::CrossDomain)
        .collect();
    assert_eq!(cross.len(), 1);
    assert_eq!(cross[0].topic, "INFLATION");
    assert_eq!(cross[0].domains.len(), 2);
    assert!(cross[0].sentiment < 0.0);
    assert!(cross[0].strength > 1.0);

    let analysis = repo.recent(ResearchCategory::Analysis, 10).unwrap();
    let titles: Vec<&str> = analysis.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Signals - markets"));
    assert!(titles.contains(&"Signals - economy"));
    assert!(titles.contains(&"Global Insights"));

    // Insight strength is capped in signal form and lands in the kernel buffer.
    let buffered = kernel.significant_signals();
    assert!(buffered.iter().any(|s| s.group_key() == "INFLATION" && s.strength <= 1.0));
}

#[tokio::test]
async fn repeated_cycles_build_persistence() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let markets = director_with(
        "markets",
        "market",
        vec![feed("tape", "market", vec![inflation(0.5, 0.8)])],
        repo.clone(),
    )
    .await;
    let crypto = director_with(
        "crypto",
        "crypto",
        vec![feed("defi", "crypto", vec![inflation(0.6, 0.8)])],
        repo.clone(),
    )
    .await;

    let kernel = KernelAgent::new(KernelConfig::default(), 100, repo.clone());
    kernel.register_director(markets);
    kernel.register_director(crypto);

    for _ in 0..3 {
        kernel.run_cycle().await.unwrap();
    }
    let tracked = kernel.insights();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].persistence, 3);
    assert!(tracked[0].last_seen >= tracked[0].first_seen);
}

#[tokio::test]
async fn failing_feed_does_not_block_the_hierarchy() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let macro_director = director_with(
        "economy",
        "macro",
        vec![
            Arc::new(FeedAgent::new(
                Box::new(FailingFeed::new("broken", "macro")),
                &BufferConfig::default(),
            )),
            feed(
                "fed_watch",
                "macro",
                vec![RawSignal::topic("FED")
                    .with_sentiment(-0.8)
                    .with_strength(0.9)
                    .with_confidence(0.9)
                    .with_priority(9)],
            ),
        ],
        repo.clone(),
    )
    .await;
    let quiet = director_with("quiet", "sentiment", Vec::new(), repo.clone()).await;

    let kernel = KernelAgent::new(KernelConfig::default(), 100, repo.clone());
    kernel.register_director(macro_director);
    kernel.register_director(quiet.clone());

    let insights = kernel.run_cycle().await.unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::HighPriority);
    assert_eq!(insights[0].topic, "FED");
    assert!(quiet.all_signals().is_empty());

    let summary = kernel.generate_executive_summary().await;
    assert_eq!(summary.top_insights.len(), 1);
    assert_eq!(summary.directors.len(), 2);
    assert_eq!(summary.recent_signals.len(), 1);
    let reports = repo.recent(ResearchCategory::Reports, 5).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].title, "Executive Summary");
}

#[tokio::test]
async fn crashed_director_contributes_nothing() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let markets = director_with(
        "markets",
        "market",
        vec![feed("tape", "market", vec![inflation(0.5, 0.8)])],
        repo.clone(),
    )
    .await;
    let economy = director_with(
        "economy",
        "macro",
        vec![feed("fed_watch", "macro", vec![inflation(0.6, 0.8)])],
        repo.clone(),
    )
    .await;

    let crypto = Arc::new(DirectorAgent::new(
        DirectorConfig::new("crypto", "crypto"),
        100,
        Arc::new(PanickingRepository),
    ));
    let onchain = feed(
        "onchain",
        "crypto",
        vec![
            inflation(0.7, 0.9),
            RawSignal::topic("BTC")
                .with_sentiment(0.9)
                .with_strength(0.95)
                .with_confidence(0.9)
                .with_priority(10),
        ],
    );
    onchain.poll().await.unwrap();
    crypto.register_feed(onchain);

    let kernel = KernelAgent::new(KernelConfig::default(), 100, repo.clone());
    kernel.register_director(markets);
    kernel.register_director(crypto);
    kernel.register_director(economy);

    let insights = kernel.run_cycle().await.unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::CrossDomain);
    assert_eq!(insights[0].topic, "INFLATION");
    let domains: Vec<&str> = insights[0].domains.iter().map(String::as_str).collect();
    assert_eq!(domains, vec!["macro", "market"]);
    assert!(!insights.iter().any(|i| i.topic == "BTC"));

    let titles: Vec<String> = repo
        .recent(ResearchCategory::Analysis, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert!(titles.contains(&"Global Insights".to_string()));
    assert!(!titles.iter().any(|t| t == "Signals - crypto"));
}
