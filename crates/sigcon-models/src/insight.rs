use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signal::{Signal, Stance};

/// One topic group as aggregated by a Director.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainAggregate {
    /// The aggregate itself, in signal form so it can sit in a buffer.
    pub signal: Signal,
    /// Deduplicated names of the feeds that contributed.
    pub sources: Vec<String>,
    pub signal_count: usize,
    pub consensus_level: f64,
    pub contradiction_level: f64,
    /// Whether `consensus_level` reached the Director's correlation threshold.
    pub correlated: bool,
    /// The first few contributing signals, verbatim.
    pub details: Vec<Signal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// The same topic confirmed by at least two domains.
    CrossDomain,
    /// A single domain signal urgent and strong enough to surface alone.
    HighPriority,
}

impl InsightKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightKind::CrossDomain => "cross_domain",
            InsightKind::HighPriority => "high_priority",
        }
    }
}

/// A pattern tracked by the Kernel across cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalInsight {
    pub topic: String,
    pub kind: InsightKind,
    pub domains: BTreeSet<String>,
    pub sentiment: f64,
    pub strength: f64,
    pub confidence: f64,
    pub priority: u8,
    /// Number of cycles this insight has been observed in.
    pub persistence: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub keywords: Vec<String>,
}

impl GlobalInsight {
    /// Registry key. Insights merge when both topic and kind match.
    pub fn key(&self) -> (String, InsightKind) {
        (self.topic.clone(), self.kind)
    }

    /// Signal form of the insight, as held in the Kernel's buffer. Cross-domain
    /// scaling can push `strength` past 1; the signal form caps it.
    pub fn to_signal(&self, source: &str) -> Signal {
        Signal {
            id: Uuid::new_v4(),
            topic: Some(self.topic.clone()),
            asset: None,
            stance: Stance::Sentiment(self.sentiment),
            strength: self.strength.min(1.0),
            confidence: self.confidence,
            priority: self.priority,
            source: source.to_string(),
            domain: self.domains.iter().cloned().collect::<Vec<_>>().join("+"),
            timestamp: self.last_seen,
            keywords: self.keywords.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectorStatus {
    pub name: String,
    pub domain: String,
    pub signal_count: usize,
    pub last_update: Option<DateTime<Utc>>,
}

/// Point-in-time report produced by the Kernel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    pub generated_at: DateTime<Utc>,
    pub top_insights: Vec<GlobalInsight>,
    pub recent_signals: Vec<Signal>,
    pub directors: Vec<DirectorStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight() -> GlobalInsight {
        let now = Utc::now();
        GlobalInsight {
            topic: "BTC".to_string(),
            kind: InsightKind::CrossDomain,
            domains: ["crypto", "macro"].iter().map(|d| d.to_string()).collect(),
            sentiment: 0.6,
            strength: 0.9,
            confidence: 0.7,
            priority: 7,
            persistence: 2,
            first_seen: now,
            last_seen: now,
            keywords: vec!["etf".to_string()],
        }
    }

    #[test]
    fn signal_form_carries_domains_and_values() {
        let signal = insight().to_signal("kernel");
        assert_eq!(signal.group_key(), "BTC");
        assert_eq!(signal.domain, "crypto+macro");
        assert_eq!(signal.source, "kernel");
        assert_eq!(signal.strength, 0.9);
        assert_eq!(signal.sentiment(), 0.6);
    }

    #[test]
    fn signal_form_caps_strength() {
        let mut boosted = insight();
        boosted.strength = 1.4;
        assert_eq!(boosted.to_signal("kernel").strength, 1.0);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&InsightKind::HighPriority).unwrap();
        assert_eq!(json, "\"high_priority\"");
        assert_eq!(InsightKind::HighPriority.as_str(), "high_priority");
    }
}
