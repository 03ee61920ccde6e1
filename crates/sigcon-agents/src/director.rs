use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::json;
use sigcon_models::config::DirectorConfig;
use sigcon_models::insight::{DirectorStatus, DomainAggregate};
use sigcon_models::research::ResearchCategory;
use sigcon_models::signal::{Signal, Stance};
use sigcon_store::ResearchRepository;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::buffer::SignalBuffer;
use crate::error::AgentError;
use crate::feed::FeedAgent;
use crate::stats::{by_priority_then_strength, recurring_keywords, GroupStats};

/// Number of contributing signals kept verbatim on each aggregate.
const DETAIL_SIGNALS: usize = 3;

/// Domain-level aggregation over a set of feeds.
pub struct DirectorAgent {
    config: DirectorConfig,
    feeds: Mutex<Vec<Arc<FeedAgent>>>,
    buffer: Mutex<SignalBuffer>,
    repository: Arc<dyn ResearchRepository>,
    cycle: tokio::sync::Mutex<()>,
}

impl DirectorAgent {
    pub fn new(
        config: DirectorConfig,
        max_buffer_size: usize,
        repository: Arc<dyn ResearchRepository>,
    ) -> Self {
        let buffer = SignalBuffer::new(
            config.name.clone(),
            config.domain.clone(),
            config.signal_threshold,
            max_buffer_size,
        );
        Self {
            config,
            feeds: Mutex::new(Vec::new()),
            buffer: Mutex::new(buffer),
            repository,
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn domain(&self) -> &str {
        &self.config.domain
    }

    pub fn register_feed(&self, feed: Arc<FeedAgent>) {
        info!(director = %self.config.name, feed = %feed.name(), "Registered feed");
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(feed);
    }

    pub fn feed_count(&self) -> usize {
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn buffer(&self) -> MutexGuard<'_, SignalBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Aggregate every feed's significant signals once.
    ///
    /// Aggregates at or above the Director's threshold enter its buffer and
    /// the buffer is persisted. A domain with nothing significant returns an
    /// empty list without touching the buffer or the repository.
    pub async fn run_cycle(&self) -> Result<Vec<DomainAggregate>, AgentError> {
        let _guard = self
            .cycle
            .try_lock()
            .map_err(|_| AgentError::CycleInProgress(self.config.name.clone()))?;
        let start = Instant::now();

        let feeds: Vec<Arc<FeedAgent>> = self
            .feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut tagged = Vec::new();
        for feed in &feeds {
            for signal in feed.significant_signals() {
                tagged.push((feed.name().to_string(), signal));
            }
        }

        if tagged.is_empty() {
            debug!(director = %self.config.name, "No significant feed signals");
            return Ok(Vec::new());
        }

        let aggregates = aggregate_signals(&tagged, &self.config);
        if aggregates.is_empty() {
            debug!(director = %self.config.name, collected = tagged.len(), "No topic groups survived");
            return Ok(aggregates);
        }

        let snapshot = {
            let mut buffer = self.buffer();
            for aggregate in &aggregates {
                if aggregate.signal.strength >= buffer.threshold() {
                    buffer.push(aggregate.signal.clone());
                }
            }
            buffer.all_signals()
        };

        self.store_signals(&snapshot).await;

        info!(
            director = %self.config.name,
            collected = tagged.len(),
            aggregates = aggregates.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Director cycle complete"
        );
        Ok(aggregates)
    }

    async fn store_signals(&self, signals: &[Signal]) {
        let data = json!({
            "agent": self.config.name,
            "type": "director",
            "domain": self.config.domain,
            "timestamp": Utc::now(),
            "signals": signals,
        });
        let metadata = json!({
            "agent_type": "director",
            "signal_count": signals.len(),
        });
        let title = format!("Signals - {}", self.config.name);
        if let Err(e) = self
            .repository
            .store_research(&title, ResearchCategory::Analysis, data, metadata)
            .await
        {
            warn!(director = %self.config.name, error = %e, "Failed to persist director signals");
        }
    }

    pub fn significant_signals(&self) -> Vec<Signal> {
        self.buffer().significant_signals()
    }

    pub fn all_signals(&self) -> Vec<Signal> {
        self.buffer().all_signals()
    }

    pub fn clear_buffer(&self) {
        self.buffer().clear();
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.buffer().last_update()
    }

    pub fn status(&self) -> DirectorStatus {
        let buffer = self.buffer();
        DirectorStatus {
            name: self.config.name.clone(),
            domain: self.config.domain.clone(),
            signal_count: buffer.len(),
            last_update: buffer.last_update(),
        }
    }
}

/// Group feed-tagged signals by topic and aggregate each group, strongest
/// first. With `consensus_required`, single-signal groups are dropped.
pub fn aggregate_signals(
    tagged: &[(String, Signal)],
    config: &DirectorConfig,
) -> Vec<DomainAggregate> {
    let mut groups: BTreeMap<&str, Vec<&(String, Signal)>> = BTreeMap::new();
    for entry in tagged {
        groups.entry(entry.1.group_key()).or_default().push(entry);
    }

    let mut aggregates: Vec<DomainAggregate> = groups
        .into_iter()
        .filter(|(_, members)| !config.consensus_required || members.len() >= 2)
        .filter_map(|(topic, members)| aggregate_group(topic, &members, config))
        .collect();
    aggregates.sort_by(|a, b| by_priority_then_strength(&a.signal, &b.signal));
    aggregates
}

fn aggregate_group(
    topic: &str,
    members: &[&(String, Signal)],
    config: &DirectorConfig,
) -> Option<DomainAggregate> {
    let stats = GroupStats::compute(members.iter().map(|(_, s)| s))?;

    let mut sources: Vec<String> = Vec::new();
    for (feed, _) in members {
        if !sources.contains(feed) {
            sources.push(feed.clone());
        }
    }

    let signal = Signal {
        id: Uuid::new_v4(),
        topic: Some(topic.to_string()),
        asset: None,
        stance: Stance::Sentiment(stats.mean_sentiment),
        strength: stats.mean_strength,
        confidence: stats.group_confidence(),
        priority: stats.priority,
        source: config.name.clone(),
        domain: config.domain.clone(),
        timestamp: Utc::now(),
        keywords: recurring_keywords(members.iter().map(|(_, s)| s)),
    };

    Some(DomainAggregate {
        signal,
        sources,
        signal_count: stats.count,
        consensus_level: stats.consensus_level,
        contradiction_level: stats.contradiction_level,
        correlated: stats.consensus_level >= config.correlation_threshold,
        details: members
            .iter()
            .take(DETAIL_SIGNALS)
            .map(|(_, s)| s.clone())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingRepository, RecordingRepository, ScriptedFeed};
    use sigcon_models::config::BufferConfig;
    use sigcon_models::signal::RawSignal;

    fn tagged(feed: &str, raw: RawSignal) -> (String, Signal) {
        (feed.to_string(), Signal::from_raw(raw, feed, "market"))
    }

    fn feed(name: &str, signals: Vec<RawSignal>) -> Arc<FeedAgent> {
        Arc::new(FeedAgent::new(
            Box::new(ScriptedFeed::new(name, "market", signals)),
            &BufferConfig::default(),
        ))
    }

    #[test]
    fn groups_by_topic_and_sorts() {
        let input = vec![
            tagged(
                "news",
                RawSignal::topic("AAPL")
                    .with_sentiment(0.6)
                    .with_strength(0.7)
                    .with_confidence(0.8)
                    .with_priority(6),
            ),
            tagged(
                "tape",
                RawSignal::topic("AAPL")
                    .with_sentiment(0.5)
                    .with_strength(0.9)
                    .with_confidence(0.6)
                    .with_priority(6),
            ),
            tagged(
                "news",
                RawSignal::topic("FED")
                    .with_sentiment(-0.4)
                    .with_strength(0.95)
                    .with_confidence(0.9)
                    .with_priority(9),
            ),
        ];
        let aggregates = aggregate_signals(&input, &DirectorConfig::new("markets", "market"));
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].signal.group_key(), "FED");
        let aapl = &aggregates[1];
        assert_eq!(aapl.signal_count, 2);
        assert_eq!(aapl.sources, vec!["news", "tape"]);
        assert!((aapl.signal.strength - 0.8).abs() < 1e-12);
        assert!((aapl.signal.confidence - 0.7).abs() < 1e-12);
        assert_eq!(aapl.signal.source, "markets");
        assert!(aapl.correlated);
    }

    #[test]
    fn consensus_required_drops_singletons() {
        let input = vec![
            tagged("news", RawSignal::topic("AAPL").with_strength(0.9)),
            tagged("news", RawSignal::topic("AAPL").with_strength(0.9)),
            tagged("news", RawSignal::topic("TSLA").with_strength(0.9)),
        ];
        let mut config = DirectorConfig::new("markets", "market");
        config.consensus_required = true;
        let aggregates = aggregate_signals(&input, &config);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].signal.group_key(), "AAPL");
    }

    #[test]
    fn details_keep_first_three() {
        let input: Vec<_> = (0..5)
            .map(|i| {
                tagged(
                    "news",
                    RawSignal::topic("BTC")
                        .with_strength(0.9)
                        .with_source(format!("s{i}")),
                )
            })
            .collect();
        let aggregates = aggregate_signals(&input, &DirectorConfig::new("crypto", "crypto"));
        let details: Vec<&str> = aggregates[0]
            .details
            .iter()
            .map(|s| s.source.as_str())
            .collect();
        assert_eq!(details, vec!["s0", "s1", "s2"]);
    }

    #[test]
    fn split_group_is_not_correlated() {
        let input = vec![
            tagged("a", RawSignal::topic("X").with_sentiment(0.9).with_strength(0.9)),
            tagged("b", RawSignal::topic("X").with_sentiment(-0.9).with_strength(0.9)),
        ];
        let aggregates = aggregate_signals(&input, &DirectorConfig::new("d", "market"));
        assert_eq!(aggregates[0].consensus_level, 0.5);
        assert_eq!(aggregates[0].contradiction_level, 0.5);
        assert!(!aggregates[0].correlated);
    }

    #[tokio::test]
    async fn cycle_buffers_and_persists() {
        let repo = Arc::new(RecordingRepository::default());
        let director = DirectorAgent::new(DirectorConfig::new("markets", "market"), 100, repo.clone());
        let news = feed(
            "news",
            vec![
                RawSignal::topic("AAPL")
                    .with_sentiment(0.7)
                    .with_strength(0.9)
                    .with_confidence(0.8),
                RawSignal::topic("MSFT")
                    .with_sentiment(0.7)
                    .with_strength(0.55)
                    .with_confidence(0.8),
            ],
        );
        news.poll().await.unwrap();
        director.register_feed(news);

        let aggregates = director.run_cycle().await.unwrap();
        assert_eq!(aggregates.len(), 2);
        assert_eq!(director.all_signals().len(), 2);
        assert_eq!(repo.titles(), vec!["Signals - markets"]);
        assert_eq!(director.status().signal_count, 2);
    }

    #[tokio::test]
    async fn weak_aggregates_stay_out_of_buffer() {
        let repo = Arc::new(RecordingRepository::default());
        let mut config = DirectorConfig::new("markets", "market");
        config.signal_threshold = 0.8;
        let director = DirectorAgent::new(config, 100, repo.clone());
        let news = feed(
            "news",
            vec![RawSignal::topic("AAPL").with_strength(0.6)],
        );
        news.poll().await.unwrap();
        director.register_feed(news);

        let aggregates = director.run_cycle().await.unwrap();
        assert_eq!(aggregates.len(), 1);
        assert!(director.all_signals().is_empty());
    }

    #[tokio::test]
    async fn empty_domain_is_a_no_op() {
        let repo = Arc::new(RecordingRepository::default());
        let director = DirectorAgent::new(DirectorConfig::new("macro", "macro"), 100, repo.clone());
        director.register_feed(feed("quiet", vec![RawSignal::topic("CPI").with_strength(0.1)]));

        let aggregates = director.run_cycle().await.unwrap();
        assert!(aggregates.is_empty());
        assert!(director.all_signals().is_empty());
        assert!(director.last_update().is_none());
        assert!(repo.titles().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_cycle() {
        let director = DirectorAgent::new(
            DirectorConfig::new("markets", "market"),
            100,
            Arc::new(FailingRepository),
        );
        let news = feed("news", vec![RawSignal::topic("AAPL").with_strength(0.9)]);
        news.poll().await.unwrap();
        director.register_feed(news);

        let aggregates = director.run_cycle().await.unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(director.all_signals().len(), 1);
    }
}
