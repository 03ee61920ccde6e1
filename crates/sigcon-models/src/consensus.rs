use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::OrderRequest;
use crate::signal::TradeAction;
use crate::trade_signal::TradeSignal;

/// Recommendation scale. The two `Weak*` levels are only ever received as
/// votes; `from_score` emits the five canonical levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongSell,
    Sell,
    WeakSell,
    Neutral,
    WeakBuy,
    Buy,
    StrongBuy,
}

impl Recommendation {
    /// Numeric vote value on the -100..100 axis.
    pub fn value(self) -> f64 {
        match self {
            Recommendation::StrongBuy => 100.0,
            Recommendation::Buy => 75.0,
            Recommendation::WeakBuy => 25.0,
            Recommendation::Neutral => 0.0,
            Recommendation::WeakSell => -25.0,
            Recommendation::Sell => -75.0,
            Recommendation::StrongSell => -100.0,
        }
    }

    /// Five-level step function with fixed breakpoints at ±75 and ±25.
    /// The outer breakpoints are exclusive so that 75 stays a `Buy`.
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            Recommendation::StrongBuy
        } else if score >= 25.0 {
            Recommendation::Buy
        } else if score > -25.0 {
            Recommendation::Neutral
        } else if score >= -75.0 {
            Recommendation::Sell
        } else {
            Recommendation::StrongSell
        }
    }

    /// Trade action implied by the recommendation, if any.
    pub fn action(self) -> Option<TradeAction> {
        match self {
            Recommendation::StrongBuy | Recommendation::Buy | Recommendation::WeakBuy => {
                Some(TradeAction::Buy)
            }
            Recommendation::StrongSell | Recommendation::Sell | Recommendation::WeakSell => {
                Some(TradeAction::Sell)
            }
            Recommendation::Neutral => None,
        }
    }
}

/// Seven-level label applied to blended orchestrator output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalStrength {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Weak Buy")]
    WeakBuy,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Weak Sell")]
    WeakSell,
    #[serde(rename = "Sell")]
    Sell,
    #[serde(rename = "Strong Sell")]
    StrongSell,
}

impl SignalStrength {
    pub fn from_signal(value: f64) -> Self {
        if value > 70.0 {
            SignalStrength::StrongBuy
        } else if value > 30.0 {
            SignalStrength::Buy
        } else if value > 10.0 {
            SignalStrength::WeakBuy
        } else if value > -10.0 {
            SignalStrength::Neutral
        } else if value > -30.0 {
            SignalStrength::WeakSell
        } else if value > -70.0 {
            SignalStrength::Sell
        } else {
            SignalStrength::StrongSell
        }
    }
}

/// One persona's verdict on a trade signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub recommendation: Recommendation,
    /// 0.0 to 1.0, derived from the magnitude of the persona's score.
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

/// An evaluation as recorded by the coordinator, with the voter's identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorVote {
    pub evaluator: String,
    /// Normalized voting weight (registered weight / 100).
    pub weight: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    /// Whether the vote cleared the confidence threshold.
    pub counted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discussion {
    pub evaluator: String,
    pub point: String,
    /// The persona's standing bias, -100 (bearish) to 100 (bullish).
    pub bias: f64,
}

/// Output of the consensus coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusDecision {
    pub symbol: String,
    pub original_signal: f64,
    /// -100 to 100.
    pub weighted_signal: f64,
    pub final_recommendation: Recommendation,
    /// 0.0 to 1.0 share of counted weight behind the largest bucket.
    pub agreement: f64,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub consensus_reached: bool,
    pub requires_human_review: bool,
    pub votes: Vec<EvaluatorVote>,
    pub discussions: Vec<Discussion>,
    pub decided_at: DateTime<Utc>,
}

/// Condensed consensus data attached to an enriched signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusSummary {
    pub agreement: f64,
    pub confidence: f64,
    pub requires_human_review: bool,
    pub discussions: Vec<Discussion>,
}

/// Orchestrator output: the original signal plus the blended verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedSignal {
    pub signal: TradeSignal,
    /// The caller's `overall_signal` before blending. None when bypassed.
    pub original_signal: Option<f64>,
    pub overall_signal: f64,
    pub signal_strength: Option<SignalStrength>,
    pub recommended_action: Option<Recommendation>,
    pub consensus_applied: bool,
    pub bypass_reason: Option<String>,
    pub consensus: Option<ConsensusSummary>,
}

impl EnrichedSignal {
    /// Build a broker-facing order for actionable verdicts. Bypassed signals
    /// fall back to the sign of their own `overall_signal`.
    pub fn order_request(&self, amount: Decimal) -> Option<OrderRequest> {
        let recommendation = self
            .recommended_action
            .unwrap_or_else(|| Recommendation::from_score(self.overall_signal));
        let action = recommendation.action()?;
        Some(OrderRequest {
            symbol: self.signal.symbol.clone(),
            action,
            amount,
            price: None,
        })
    }
}
