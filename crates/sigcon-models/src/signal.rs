use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default priority for signals that arrive without one.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Topic used when a signal names neither a topic nor an asset.
pub const GENERAL_TOPIC: &str = "general";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// Directional value of the action on the -1..1 sentiment axis.
    pub fn sentiment(self) -> f64 {
        match self {
            TradeAction::Buy => 1.0,
            TradeAction::Sell => -1.0,
            TradeAction::Hold => 0.0,
        }
    }
}

/// What a signal says: either a discrete action or a sentiment score in -1..1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Stance {
    Action(TradeAction),
    Sentiment(f64),
}

impl Stance {
    pub fn sentiment(&self) -> f64 {
        match self {
            Stance::Action(action) => action.sentiment(),
            Stance::Sentiment(value) => *value,
        }
    }
}

impl Default for Stance {
    fn default() -> Self {
        Stance::Sentiment(0.0)
    }
}

/// A signal as emitted by a feed, before an agent has normalized it.
/// Every field is optional; normalization fills the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawSignal {
    pub topic: Option<String>,
    pub asset: Option<String>,
    pub stance: Option<Stance>,
    pub strength: Option<f64>,
    pub confidence: Option<f64>,
    pub priority: Option<u8>,
    pub source: Option<String>,
    pub domain: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub keywords: Vec<String>,
}

impl RawSignal {
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    pub fn with_sentiment(mut self, sentiment: f64) -> Self {
        self.stance = Some(Stance::Sentiment(sentiment));
        self
    }

    pub fn with_action(mut self, action: TradeAction) -> Self {
        self.stance = Some(Stance::Action(action));
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// The unit of information flowing through the hierarchy.
///
/// `strength` drives buffer-level filtering and `confidence` drives vote
/// weighting. The two are independent and never derived from each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub id: Uuid,
    pub topic: Option<String>,
    pub asset: Option<String>,
    pub stance: Stance,
    /// 0.0 to 1.0 magnitude.
    pub strength: f64,
    /// 0.0 to 1.0 belief in the signal.
    pub confidence: f64,
    /// 1 to 10, 10 being most urgent.
    pub priority: u8,
    pub source: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub keywords: Vec<String>,
}

impl Signal {
    /// Normalize a raw signal. Never fails: missing or malformed fields fall
    /// back to defaults (timestamp = now, source/domain = the receiving agent's,
    /// strength/confidence/sentiment = 0, priority = 5).
    pub fn from_raw(raw: RawSignal, default_source: &str, default_domain: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: raw.topic.filter(|t| !t.is_empty()),
            asset: raw.asset.filter(|a| !a.is_empty()),
            stance: match raw.stance {
                Some(Stance::Sentiment(v)) => Stance::Sentiment(unit_or_zero(v, -1.0)),
                Some(stance) => stance,
                None => Stance::default(),
            },
            strength: raw.strength.map(|v| unit_or_zero(v, 0.0)).unwrap_or(0.0),
            confidence: raw.confidence.map(|v| unit_or_zero(v, 0.0)).unwrap_or(0.0),
            priority: raw.priority.unwrap_or(DEFAULT_PRIORITY).clamp(1, 10),
            source: raw
                .source
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default_source.to_string()),
            domain: raw
                .domain
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| default_domain.to_string()),
            timestamp: raw.timestamp.unwrap_or_else(Utc::now),
            keywords: raw.keywords,
        }
    }

    /// Grouping key: topic, then asset, then `"general"`.
    pub fn group_key(&self) -> &str {
        self.topic
            .as_deref()
            .or(self.asset.as_deref())
            .unwrap_or(GENERAL_TOPIC)
    }

    pub fn sentiment(&self) -> f64 {
        self.stance.sentiment()
    }
}

fn unit_or_zero(value: f64, low: f64) -> f64 {
    if value.is_finite() {
        value.clamp(low, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_applies_defaults() {
        let signal = Signal::from_raw(RawSignal::default(), "wall_street", "market");
        assert_eq!(signal.source, "wall_street");
        assert_eq!(signal.domain, "market");
        assert_eq!(signal.strength, 0.0);
        assert_eq!(signal.confidence, 0.0);
        assert_eq!(signal.priority, DEFAULT_PRIORITY);
        assert_eq!(signal.sentiment(), 0.0);
        assert_eq!(signal.group_key(), GENERAL_TOPIC);
    }

    #[test]
    fn normalization_keeps_supplied_fields() {
        let raw = RawSignal::topic("BTC")
            .with_sentiment(0.4)
            .with_strength(0.9)
            .with_confidence(0.2)
            .with_priority(9)
            .with_source("defi")
            .with_domain("crypto");
        let signal = Signal::from_raw(raw, "fallback", "fallback");
        assert_eq!(signal.source, "defi");
        assert_eq!(signal.domain, "crypto");
        assert_eq!(signal.strength, 0.9);
        assert_eq!(signal.confidence, 0.2);
        assert_eq!(signal.priority, 9);
        assert_eq!(signal.group_key(), "BTC");
    }

    #[test]
    fn malformed_values_are_tamed() {
        let raw = RawSignal {
            strength: Some(f64::NAN),
            confidence: Some(3.0),
            priority: Some(0),
            stance: Some(Stance::Sentiment(-7.0)),
            ..RawSignal::default()
        };
        let signal = Signal::from_raw(raw, "feed", "macro");
        assert_eq!(signal.strength, 0.0);
        assert_eq!(signal.confidence, 1.0);
        assert_eq!(signal.priority, 1);
        assert_eq!(signal.sentiment(), -1.0);
    }

    #[test]
    fn group_key_falls_back_to_asset() {
        let raw = RawSignal {
            asset: Some("ETH".to_string()),
            ..RawSignal::default()
        };
        let signal = Signal::from_raw(raw, "feed", "crypto");
        assert_eq!(signal.group_key(), "ETH");
    }

    #[test]
    fn stance_deserializes_action_or_number() {
        let action: Stance = serde_json::from_str("\"BUY\"").unwrap();
        assert_eq!(action, Stance::Action(TradeAction::Buy));
        assert_eq!(action.sentiment(), 1.0);

        let sentiment: Stance = serde_json::from_str("-0.35").unwrap();
        assert_eq!(sentiment.sentiment(), -0.35);
    }

    #[test]
    fn raw_signal_from_partial_json() {
        let raw: RawSignal =
            serde_json::from_str(r#"{"topic": "FED", "strength": 0.7, "keywords": ["rates"]}"#)
                .unwrap();
        assert_eq!(raw.topic.as_deref(), Some("FED"));
        assert_eq!(raw.strength, Some(0.7));
        assert!(raw.confidence.is_none());
        assert_eq!(raw.keywords, vec!["rates"]);
    }
}
