//! Group statistics shared by the Director and Kernel aggregation steps.

use std::cmp::Ordering;
use std::collections::HashMap;

use sigcon_models::signal::Signal;

/// Sentiment above this counts as positive, below its negation as negative.
pub const SENTIMENT_BAND: f64 = 0.2;

pub const MAX_KEYWORDS: usize = 5;

/// Means and agreement levels over one topic group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub count: usize,
    pub mean_sentiment: f64,
    pub mean_strength: f64,
    pub mean_confidence: f64,
    pub priority: u8,
    /// Largest sentiment class share.
    pub consensus_level: f64,
    /// Smaller of the positive and negative shares, 0 unless both are present.
    pub contradiction_level: f64,
}

impl GroupStats {
    /// Returns None for an empty group.
    pub fn compute<'a, I>(signals: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Signal>,
    {
        let mut count = 0usize;
        let (mut positive, mut negative, mut neutral) = (0usize, 0usize, 0usize);
        let (mut sentiment, mut strength, mut confidence, mut priority) = (0.0, 0.0, 0.0, 0.0);

        for signal in signals {
            count += 1;
            let s = signal.sentiment();
            if s > SENTIMENT_BAND {
                positive += 1;
            } else if s < -SENTIMENT_BAND {
                negative += 1;
            } else {
                neutral += 1;
            }
            sentiment += s;
            strength += signal.strength;
            confidence += signal.confidence;
            priority += f64::from(signal.priority);
        }

        if count == 0 {
            return None;
        }
        let total = count as f64;
        let contradiction_level = if positive > 0 && negative > 0 {
            positive.min(negative) as f64 / total
        } else {
            0.0
        };

        Some(Self {
            count,
            mean_sentiment: sentiment / total,
            mean_strength: strength / total,
            mean_confidence: confidence / total,
            priority: round_half_up(priority / total).clamp(1.0, 10.0) as u8,
            consensus_level: positive.max(negative).max(neutral) as f64 / total,
            contradiction_level,
        })
    }

    /// Confidence suppressed by internal disagreement.
    pub fn group_confidence(&self) -> f64 {
        self.mean_confidence * self.consensus_level * (1.0 - self.contradiction_level / 2.0)
    }
}

/// Halves round toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Keywords that recur across the group, most frequent first, at most five.
/// Ties break alphabetically.
pub fn recurring_keywords<'a, I>(signals: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Signal>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for signal in signals {
        for keyword in &signal.keywords {
            *counts.entry(keyword.as_str()).or_default() += 1;
        }
    }
    let mut recurring: Vec<(&str, usize)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    recurring
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(k, _)| k.to_string())
        .collect()
}

/// Priority descending, then strength descending.
pub fn by_priority_then_strength(a: &Signal, b: &Signal) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.strength.total_cmp(&a.strength))
}
