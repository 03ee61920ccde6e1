use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signal::TradeAction;

/// Tournament record for one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentPerformance {
    pub id: String,
    pub name: String,
    pub kind: String,
    /// Cumulative, decayed PnL in percent.
    pub pnl: f64,
    pub wins: u32,
    pub losses: u32,
    pub trades: u32,
    pub success_rate: f64,
    pub weight: f64,
}

impl AgentPerformance {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            pnl: 0.0,
            wins: 0,
            losses: 0,
            trades: 0,
            success_rate: 0.0,
            weight,
        }
    }

    /// Fold one cycle's outcomes in. Decay applies once, before the new PnL.
    /// Every outcome counts as a trade; those that were not wins are losses.
    pub fn record(&mut self, outcomes: &[TradeOutcome], decay: f64) {
        if outcomes.is_empty() {
            return;
        }
        self.pnl *= decay;
        let wins = outcomes.iter().filter(|o| o.success).count() as u32;
        let total = outcomes.len() as u32;
        self.pnl += outcomes.iter().map(|o| o.pnl).sum::<f64>();
        self.wins += wins;
        self.losses += total - wins;
        self.trades += total;
        self.success_rate = f64::from(self.wins) / f64::from(self.trades);
    }
}

/// A participant's call on one symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantSignal {
    pub symbol: String,
    pub action: TradeAction,
    pub confidence: f64,
}

/// A participant's call scaled by its current tournament weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedSignal {
    pub agent_id: String,
    pub symbol: String,
    pub action: TradeAction,
    pub confidence: f64,
    pub weight: f64,
    pub weighted_confidence: f64,
    pub collected_at: DateTime<Utc>,
}

/// Observed price move for one symbol over a trading cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarketMove {
    pub up: bool,
    /// Magnitude in percent, always non-negative.
    pub change_pct: f64,
}

impl MarketMove {
    /// Result of acting on this move: a matching call earns the move, a
    /// contrary call loses it. A hold is not a trade and settles to `None`.
    pub fn settle(&self, action: TradeAction) -> Option<(bool, f64)> {
        match (action, self.up) {
            (TradeAction::Hold, _) => None,
            (TradeAction::Buy, true) | (TradeAction::Sell, false) => Some((true, self.change_pct)),
            _ => Some((false, -self.change_pct)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeOutcome {
    pub agent_id: String,
    pub symbol: String,
    pub action: TradeAction,
    pub success: bool,
    pub pnl: f64,
}
