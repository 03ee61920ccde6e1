use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use sigcon_models::signal::{RawSignal, Signal};

/// Bounded ring buffer of normalized signals with a strength threshold.
///
/// Every agent level owns one. Pure bookkeeping: nothing here can fail, and
/// the oldest entry is evicted when a push would exceed `max_size`.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    owner: String,
    domain: String,
    threshold: f64,
    max_size: usize,
    signals: VecDeque<Signal>,
    last_update: Option<DateTime<Utc>>,
}

impl SignalBuffer {
    /// `owner` and `domain` are the defaults stamped onto raw signals that
    /// arrive without a source or domain.
    pub fn new(
        owner: impl Into<String>,
        domain: impl Into<String>,
        threshold: f64,
        max_size: usize,
    ) -> Self {
        let max_size = max_size.max(1);
        Self {
            owner: owner.into(),
            domain: domain.into(),
            threshold,
            max_size,
            signals: VecDeque::with_capacity(max_size),
            last_update: None,
        }
    }

    /// Normalize and append. Returns the stored signal.
    pub fn add_signal(&mut self, raw: RawSignal) -> Signal {
        let signal = Signal::from_raw(raw, &self.owner, &self.domain);
        self.push(signal.clone());
        signal
    }

    /// Append an already normalized signal.
    pub fn push(&mut self, signal: Signal) {
        if self.signals.len() == self.max_size {
            self.signals.pop_front();
        }
        self.signals.push_back(signal);
        self.last_update = Some(Utc::now());
    }

    /// Signals with `strength >= threshold`, oldest first.
    pub fn significant_signals(&self) -> Vec<Signal> {
        self.signals
            .iter()
            .filter(|s| s.strength >= self.threshold)
            .cloned()
            .collect()
    }

    pub fn all_signals(&self) -> Vec<Signal> {
        self.signals.iter().cloned().collect()
    }

    /// The last `n` signals, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Signal> {
        let skip = self.signals.len().saturating_sub(n);
        self.signals.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.signals.clear();
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(topic: &str, strength: f64) -> RawSignal {
        RawSignal::topic(topic).with_strength(strength)
    }

    #[test]
    fn add_applies_owner_defaults() {
        let mut buffer = SignalBuffer::new("news_feed", "market", 0.5, 10);
        let signal = buffer.add_signal(RawSignal::default());
        assert_eq!(signal.source, "news_feed");
        assert_eq!(signal.domain, "market");
        assert_eq!(signal.strength, 0.0);
        assert_eq!(buffer.len(), 1);
        assert!(buffer.last_update().is_some());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut buffer = SignalBuffer::new("feed", "market", 0.5, 5);
        for i in 0..8 {
            buffer.add_signal(raw(&format!("T{i}"), 0.9));
        }
        let topics: Vec<String> = buffer
            .all_signals()
            .iter()
            .map(|s| s.group_key().to_string())
            .collect();
        assert_eq!(topics, vec!["T3", "T4", "T5", "T6", "T7"]);
    }

    #[test]
    fn significant_is_inclusive_threshold() {
        let mut buffer = SignalBuffer::new("feed", "market", 0.5, 10);
        buffer.add_signal(raw("low", 0.49));
        buffer.add_signal(raw("edge", 0.5));
        buffer.add_signal(raw("high", 0.95));
        let significant: Vec<String> = buffer
            .significant_signals()
            .iter()
            .map(|s| s.group_key().to_string())
            .collect();
        assert_eq!(significant, vec!["edge", "high"]);
        assert_eq!(buffer.all_signals().len(), 3);
    }

    #[test]
    fn strength_and_confidence_filter_independently() {
        let mut buffer = SignalBuffer::new("feed", "market", 0.5, 10);
        buffer.add_signal(raw("loud", 0.9).with_confidence(0.1));
        let significant = buffer.significant_signals();
        assert_eq!(significant.len(), 1);
        assert_eq!(significant[0].confidence, 0.1);
    }

    #[test]
    fn all_signals_is_a_copy() {
        let mut buffer = SignalBuffer::new("feed", "market", 0.5, 10);
        buffer.add_signal(raw("A", 0.9));
        let mut copy = buffer.all_signals();
        copy.clear();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn recent_and_clear() {
        let mut buffer = SignalBuffer::new("feed", "market", 0.5, 10);
        for topic in ["A", "B", "C"] {
            buffer.add_signal(raw(topic, 0.9));
        }
        let recent: Vec<String> = buffer
            .recent(2)
            .iter()
            .map(|s| s.group_key().to_string())
            .collect();
        assert_eq!(recent, vec!["B", "C"]);
        assert_eq!(buffer.recent(10).len(), 3);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
