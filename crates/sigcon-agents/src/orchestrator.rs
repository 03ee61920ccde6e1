use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sigcon_models::config::Persona;
use sigcon_models::consensus::{ConsensusSummary, EnrichedSignal, SignalStrength};
use sigcon_models::trade_signal::TradeSignal;
use tracing::info;

use crate::consensus::ConsensusCoordinator;
use crate::stats::round_half_up;

pub const BYPASS_REASON: &str = "Ultra-high confidence signal";

const ORIGINAL_SHARE: f64 = 0.3;
const CONSENSUS_SHARE: f64 = 0.7;
const TOP_DISCUSSIONS: usize = 5;

const CRYPTO: &[&str] = &[
    "BTC", "ETH", "AVAX", "ADA", "MATIC", "SUI", "DOGE", "HBAR", "ONE", "UNI", "SOL", "XRP", "DOT",
    "LINK", "ATOM", "FIL", "NEAR", "ARB", "OP", "ALGO", "TON",
];
const TECH: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "TSLA", "AMD", "INTC", "CRM",
];
const FINANCE: &[&str] = &["JPM", "BAC", "WFC", "GS", "MS", "BLK", "C", "AXP", "V", "MA"];
const CONSUMER: &[&str] = &["PG", "KO", "PEP", "MCD", "WMT", "HD", "NKE", "SBUX", "DIS", "COST"];
const INDUSTRIAL: &[&str] = &["CAT", "BA", "MMM", "GE", "HON", "UNP", "LMT", "RTX", "DE", "EMR"];
const HEALTH: &[&str] = &["JNJ", "PFE", "MRK", "ABBV", "TMO", "ABT", "UNH", "MDT", "AMGN", "BMY"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Crypto,
    Tech,
    Finance,
    Consumer,
    Industrial,
    Health,
    Other,
}

impl AssetCategory {
    /// Static lookup, case-insensitive.
    pub fn of(symbol: &str) -> Self {
        let symbol = symbol.to_ascii_uppercase();
        let table: [(&[&str], AssetCategory); 6] = [
            (CRYPTO, AssetCategory::Crypto),
            (TECH, AssetCategory::Tech),
            (FINANCE, AssetCategory::Finance),
            (CONSUMER, AssetCategory::Consumer),
            (INDUSTRIAL, AssetCategory::Industrial),
            (HEALTH, AssetCategory::Health),
        ];
        table
            .iter()
            .find(|(symbols, _)| symbols.contains(&symbol.as_str()))
            .map_or(AssetCategory::Other, |(_, category)| *category)
    }

    /// Panel weights (0 to 100) for this category, keyed by persona id.
    pub fn manager_weights(self) -> [(&'static str, f64); 4] {
        let (innovation, monetary, institutional, value) = match self {
            AssetCategory::Crypto => (85.0, 90.0, 70.0, 60.0),
            AssetCategory::Tech => (90.0, 60.0, 70.0, 70.0),
            AssetCategory::Finance => (60.0, 50.0, 95.0, 85.0),
            AssetCategory::Consumer => (60.0, 50.0, 75.0, 90.0),
            AssetCategory::Industrial | AssetCategory::Health | AssetCategory::Other => {
                (75.0, 60.0, 80.0, 75.0)
            }
        };
        [
            (Persona::Innovation.id(), innovation),
            (Persona::MonetaryNetwork.id(), monetary),
            (Persona::Institutional.id(), institutional),
            (Persona::Value.id(), value),
        ]
    }
}

/// Front door for trade signals: bypass, category reweighting, consensus
/// and blending.
pub struct SignalOrchestrator {
    coordinator: Arc<ConsensusCoordinator>,
    bypass_threshold: f64,
    /// Held across reweighting and voting so concurrent signals in different
    /// categories cannot vote under each other's weights.
    panel: tokio::sync::Mutex<()>,
}

impl SignalOrchestrator {
    pub fn new(coordinator: Arc<ConsensusCoordinator>, bypass_threshold: f64) -> Self {
        Self {
            coordinator,
            bypass_threshold,
            panel: tokio::sync::Mutex::new(()),
        }
    }

    pub fn coordinator(&self) -> &Arc<ConsensusCoordinator> {
        &self.coordinator
    }

    pub async fn process_signal(&self, signal: TradeSignal) -> EnrichedSignal {
        if signal.confidence_score >= self.bypass_threshold {
            info!(
                symbol = %signal.symbol,
                confidence = signal.confidence_score,
                "Bypassing consensus"
            );
            return EnrichedSignal {
                overall_signal: signal.overall_signal,
                signal,
                original_signal: None,
                signal_strength: None,
                recommended_action: None,
                consensus_applied: false,
                bypass_reason: Some(BYPASS_REASON.to_string()),
                consensus: None,
            };
        }

        let start = Instant::now();
        let category = AssetCategory::of(&signal.symbol);
        let decision = {
            let _panel = self.panel.lock().await;
            self.coordinator
                .set_manager_weights(&category.manager_weights());
            self.coordinator.process_signal(&signal).await
        };

        let blended = blend(signal.overall_signal, decision.weighted_signal);
        info!(
            symbol = %signal.symbol,
            category = ?category,
            original = signal.overall_signal,
            consensus = decision.weighted_signal,
            blended,
            elapsed_ms = start.elapsed().as_millis(),
            "Signal enriched"
        );

        EnrichedSignal {
            original_signal: Some(signal.overall_signal),
            overall_signal: blended,
            signal_strength: Some(SignalStrength::from_signal(blended)),
            recommended_action: Some(decision.final_recommendation),
            consensus_applied: true,
            bypass_reason: None,
            consensus: Some(ConsensusSummary {
                agreement: decision.agreement,
                confidence: decision.confidence,
                requires_human_review: decision.requires_human_review,
                discussions: decision
                    .discussions
                    .into_iter()
                    .take(TOP_DISCUSSIONS)
                    .collect(),
            }),
            signal,
        }
    }
}

/// `round(original * 0.3 + consensus * 0.7)`, halves rounding up.
pub fn blend(original: f64, consensus: f64) -> f64 {
    round_half_up(original * ORIGINAL_SHARE + consensus * CONSENSUS_SHARE)
}
