use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::json;
use sigcon_models::config::KernelConfig;
use sigcon_models::insight::{ExecutiveSummary, GlobalInsight, InsightKind};
use sigcon_models::research::ResearchCategory;
use sigcon_models::signal::Signal;
use sigcon_store::ResearchRepository;
use tracing::{debug, error, info, warn};

use crate::buffer::SignalBuffer;
use crate::director::DirectorAgent;
use crate::error::AgentError;
use crate::stats::{recurring_keywords, GroupStats};

pub const KERNEL_NAME: &str = "kernel";

const SUMMARY_INSIGHTS: usize = 5;
const SUMMARY_SIGNALS: usize = 5;

/// Top of the hierarchy: cross-domain pattern detection over every Director.
pub struct KernelAgent {
    config: KernelConfig,
    directors: Mutex<Vec<Arc<DirectorAgent>>>,
    buffer: Mutex<SignalBuffer>,
    insights: Mutex<Vec<GlobalInsight>>,
    repository: Arc<dyn ResearchRepository>,
    cycle: tokio::sync::Mutex<()>,
}

impl KernelAgent {
    pub fn new(
        config: KernelConfig,
        max_buffer_size: usize,
        repository: Arc<dyn ResearchRepository>,
    ) -> Self {
        let buffer = SignalBuffer::new(
            KERNEL_NAME,
            KERNEL_NAME,
            config.signal_threshold,
            max_buffer_size,
        );
        Self {
            config,
            directors: Mutex::new(Vec::new()),
            buffer: Mutex::new(buffer),
            insights: Mutex::new(Vec::new()),
            repository,
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn register_director(&self, director: Arc<DirectorAgent>) {
        info!(director = %director.name(), domain = %director.domain(), "Registered director");
        self.directors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(director);
    }

    fn directors(&self) -> Vec<Arc<DirectorAgent>> {
        self.directors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn buffer(&self) -> MutexGuard<'_, SignalBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry(&self) -> MutexGuard<'_, Vec<GlobalInsight>> {
        self.insights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run every Director, then detect and merge insights.
    ///
    /// Returns the insights detected in this cycle. A Director that fails
    /// contributes nothing; the rest of the cycle carries on.
    pub async fn run_cycle(&self) -> Result<Vec<GlobalInsight>, AgentError> {
        let _guard = self
            .cycle
            .try_lock()
            .map_err(|_| AgentError::CycleInProgress(KERNEL_NAME.to_string()))?;
        let start = Instant::now();

        let mut handles = Vec::new();
        for director in self.directors() {
            handles.push(tokio::spawn(async move {
                let result = director.run_cycle().await;
                (director, result)
            }));
        }

        let mut tagged: Vec<(String, Signal)> = Vec::new();
        for handle in handles {
            let director = match handle.await {
                Ok((director, Ok(_))) => director,
                Ok((director, Err(AgentError::CycleInProgress(_)))) => {
                    debug!(director = %director.name(), "Director cycle already running, reading its buffer");
                    director
                }
                Ok((director, Err(e))) => {
                    warn!(director = %director.name(), error = %e, "Director cycle failed");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "Director task panicked");
                    continue;
                }
            };
            let domain = director.domain().to_string();
            tagged.extend(
                director
                    .significant_signals()
                    .into_iter()
                    .map(|signal| (domain.clone(), signal)),
            );
        }

        let now = Utc::now();
        let fresh = detect_insights(&tagged, &self.config, now);

        let (registry, buffered) = {
            let mut registry = self.registry();
            merge_insights(&mut registry, &fresh, self.config.max_insights);

            let mut buffer = self.buffer();
            for insight in &fresh {
                if insight.strength >= buffer.threshold() {
                    buffer.push(insight.to_signal(KERNEL_NAME));
                }
            }
            (registry.clone(), buffer.all_signals())
        };

        if !fresh.is_empty() {
            self.store_insights(&registry, &buffered).await;
        }

        info!(
            collected = tagged.len(),
            detected = fresh.len(),
            tracked = registry.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Kernel cycle complete"
        );
        Ok(fresh)
    }

    async fn store_insights(&self, insights: &[GlobalInsight], signals: &[Signal]) {
        let data = json!({
            "agent": KERNEL_NAME,
            "type": "kernel",
            "timestamp": Utc::now(),
            "insights": insights,
            "signals": signals,
        });
        let metadata = json!({
            "agent_type": "kernel",
            "insight_count": insights.len(),
            "signal_count": signals.len(),
        });
        if let Err(e) = self
            .repository
            .store_research(
                "Global Insights",
                ResearchCategory::Analysis,
                data,
                metadata,
            )
            .await
        {
            warn!(error = %e, "Failed to persist kernel insights");
        }
    }

    /// Tracked insights, highest persistence first.
    pub fn insights(&self) -> Vec<GlobalInsight> {
        self.registry().clone()
    }

    pub fn significant_signals(&self) -> Vec<Signal> {
        self.buffer().significant_signals()
    }

    pub fn all_signals(&self) -> Vec<Signal> {
        self.buffer().all_signals()
    }

    /// Snapshot of the top insights, the latest kernel signals and every
    /// Director's state. Persisted under reports; a failed write is logged
    /// and the summary is still returned.
    pub async fn generate_executive_summary(&self) -> ExecutiveSummary {
        let summary = ExecutiveSummary {
            generated_at: Utc::now(),
            top_insights: self
                .registry()
                .iter()
                .take(SUMMARY_INSIGHTS)
                .cloned()
                .collect(),
            recent_signals: self.buffer().recent(SUMMARY_SIGNALS),
            directors: self.directors().iter().map(|d| d.status()).collect(),
        };

        match serde_json::to_value(&summary) {
            Ok(data) => {
                let metadata = json!({
                    "agent_type": "kernel",
                    "insight_count": summary.top_insights.len(),
                    "director_count": summary.directors.len(),
                });
                if let Err(e) = self
                    .repository
                    .store_research(
                        "Executive Summary",
                        ResearchCategory::Reports,
                        data,
                        metadata,
                    )
                    .await
                {
                    warn!(error = %e, "Failed to persist executive summary");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize executive summary"),
        }
        summary
    }
}

/// Strength of a topic confirmed by `in_group` of `total` domains.
pub fn cross_domain_strength(mean_strength: f64, in_group: usize, total: usize) -> f64 {
    if total == 0 {
        return mean_strength;
    }
    mean_strength * (1.0 + in_group as f64 / total as f64)
}

/// Detect cross-domain and high-priority insights in one cycle's
/// domain-tagged signals. Each (topic, kind) appears at most once.
pub fn detect_insights(
    tagged: &[(String, Signal)],
    config: &KernelConfig,
    now: DateTime<Utc>,
) -> Vec<GlobalInsight> {
    let total_domains = tagged
        .iter()
        .map(|(domain, _)| domain.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let mut groups: BTreeMap<&str, Vec<&(String, Signal)>> = BTreeMap::new();
    for entry in tagged {
        groups.entry(entry.1.group_key()).or_default().push(entry);
    }

    let mut found: HashMap<(String, InsightKind), GlobalInsight> = HashMap::new();

    for (topic, members) in &groups {
        let domains: BTreeSet<String> = members.iter().map(|(d, _)| d.clone()).collect();
        if domains.len() < 2 {
            continue;
        }
        let Some(stats) = GroupStats::compute(members.iter().map(|(_, s)| s)) else {
            continue;
        };
        let strength = cross_domain_strength(stats.mean_strength, domains.len(), total_domains);
        if strength < config.cross_domain_threshold {
            continue;
        }
        let insight = GlobalInsight {
            topic: topic.to_string(),
            kind: InsightKind::CrossDomain,
            domains,
            sentiment: stats.mean_sentiment,
            strength,
            confidence: stats.group_confidence(),
            priority: stats.priority,
            persistence: 1,
            first_seen: now,
            last_seen: now,
            keywords: recurring_keywords(members.iter().map(|(_, s)| s)),
        };
        keep_strongest(&mut found, insight);
    }

    for (domain, signal) in tagged {
        if signal.priority < config.high_priority_min_priority
            || signal.strength < config.high_priority_min_strength
        {
            continue;
        }
        let insight = GlobalInsight {
            topic: signal.group_key().to_string(),
            kind: InsightKind::HighPriority,
            domains: BTreeSet::from([domain.clone()]),
            sentiment: signal.sentiment(),
            strength: signal.strength,
            confidence: signal.confidence,
            priority: signal.priority,
            persistence: 1,
            first_seen: now,
            last_seen: now,
            keywords: signal.keywords.clone(),
        };
        keep_strongest(&mut found, insight);
    }

    let mut insights: Vec<GlobalInsight> = found.into_values().collect();
    insights.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.strength.total_cmp(&a.strength))
            .then_with(|| a.key().cmp(&b.key()))
    });
    insights
}

fn keep_strongest(found: &mut HashMap<(String, InsightKind), GlobalInsight>, insight: GlobalInsight) {
    let key = insight.key();
    let stronger = found.get(&key).map_or(true, |existing| {
        (existing.priority, existing.strength) < (insight.priority, insight.strength)
    });
    if stronger {
        found.insert(key, insight);
    }
}

/// Fold a cycle's insights into the registry. A known insight is replaced by
/// the fresh reading, keeping its `first_seen` and gaining one persistence;
/// new ones enter at persistence 1. The registry is then ordered by
/// (persistence, priority) and cut to `max`.
pub fn merge_insights(registry: &mut Vec<GlobalInsight>, fresh: &[GlobalInsight], max: usize) {
    for insight in fresh {
        match registry.iter_mut().find(|known| known.key() == insight.key()) {
            Some(known) => {
                *known = GlobalInsight {
                    first_seen: known.first_seen,
                    persistence: known.persistence + 1,
                    ..insight.clone()
                };
            }
            None => registry.push(GlobalInsight {
                persistence: 1,
                ..insight.clone()
            }),
        }
    }
    registry.sort_by(|a, b| {
        b.persistence
            .cmp(&a.persistence)
            .then_with(|| b.priority.cmp(&a.priority))
    });
    registry.truncate(max);
}
