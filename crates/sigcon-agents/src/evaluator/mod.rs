//! Persona evaluators: fixed investment philosophies that vote on trade signals.
//!
//! Evaluation is pure and synchronous. Each persona blends sub-scores with its
//! own hard-coded weights, clamps the result to [-100, 100] and derives its
//! confidence from the magnitude of that score.

use std::sync::Arc;

use sigcon_models::config::Persona;
use sigcon_models::consensus::{Evaluation, Recommendation};
use sigcon_models::trade_signal::TradeSignal;

mod innovation;
mod institutional;
mod monetary;
mod value;

pub use innovation::InnovationEvaluator;
pub use institutional::InstitutionalEvaluator;
pub use monetary::MonetaryNetworkEvaluator;
pub use value::ValueEvaluator;

/// A voter on the consensus panel.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Standing bias, -100 (bearish) to 100 (bullish).
    fn bias(&self) -> f64;

    fn evaluate(&self, signal: &TradeSignal) -> Evaluation;
}

/// One sub-score with the reasoning that produced it.
#[derive(Debug, Default)]
pub(crate) struct Component {
    pub score: f64,
    pub reasoning: Vec<String>,
}

impl Component {
    pub fn add(&mut self, points: f64, reason: impl Into<String>) {
        self.score += points;
        self.reasoning.push(reason.into());
    }
}

pub(crate) fn clamp_score(score: f64) -> f64 {
    score.clamp(-100.0, 100.0)
}

/// `min(1, base + |score| / divisor)`.
pub(crate) fn score_confidence(score: f64, base: f64, divisor: f64) -> f64 {
    (base + score.abs() / divisor).min(1.0)
}

pub(crate) fn verdict(score: f64, confidence: f64, reasoning: Vec<String>) -> Evaluation {
    Evaluation {
        recommendation: Recommendation::from_score(score),
        confidence,
        reasoning,
    }
}

pub(crate) fn trend_contains(signal: &TradeSignal, needle: &str) -> bool {
    signal.trend().is_some_and(|t| t.contains(needle))
}

pub fn persona_evaluator(persona: Persona) -> Arc<dyn Evaluator> {
    match persona {
        Persona::Innovation => Arc::new(InnovationEvaluator),
        Persona::MonetaryNetwork => Arc::new(MonetaryNetworkEvaluator),
        Persona::Institutional => Arc::new(InstitutionalEvaluator),
        Persona::Value => Arc::new(ValueEvaluator),
    }
}
