use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signal::Signal;

/// A per-symbol trade signal as evaluated by the persona panel.
///
/// Only `symbol`, `overall_signal` and `confidence_score` are required; the
/// context blocks are whatever evidence the upstream producer had at hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeSignal {
    pub symbol: String,
    /// -100 (strong sell) to 100 (strong buy).
    pub overall_signal: f64,
    /// 0.0 to 1.0.
    pub confidence_score: f64,
    #[serde(default)]
    pub technical: Option<TechnicalContext>,
    #[serde(default)]
    pub fundamentals: Option<Fundamentals>,
    #[serde(default)]
    pub sentiment: Option<SentimentContext>,
    #[serde(default)]
    pub on_chain: Option<OnChainContext>,
    #[serde(default)]
    pub macro_context: Option<MacroContext>,
    #[serde(default)]
    pub research: Option<ResearchEvidence>,
    #[serde(default)]
    pub quantitative: Option<QuantitativeEvidence>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl TradeSignal {
    pub fn new(symbol: impl Into<String>, overall_signal: f64, confidence_score: f64) -> Self {
        Self {
            symbol: symbol.into(),
            overall_signal,
            confidence_score,
            technical: None,
            fundamentals: None,
            sentiment: None,
            on_chain: None,
            macro_context: None,
            research: None,
            quantitative: None,
            generated_at: Utc::now(),
        }
    }

    /// Trend label, e.g. "Strong Uptrend" or "Downtrend".
    pub fn trend(&self) -> Option<&str> {
        self.technical.as_ref().and_then(|t| t.trend.as_deref())
    }

    pub fn sentiment_score(&self) -> Option<f64> {
        self.sentiment.as_ref().map(|s| s.score)
    }
}

/// Aggregated hierarchy signals become trade signals by scaling sentiment to
/// the -100..100 axis and carrying confidence across unchanged.
impl From<&Signal> for TradeSignal {
    fn from(signal: &Signal) -> Self {
        let mut trade = TradeSignal::new(
            signal.group_key(),
            (signal.sentiment() * 100.0).clamp(-100.0, 100.0),
            signal.confidence,
        );
        trade.sentiment = Some(SentimentContext {
            score: signal.sentiment(),
            themes: signal.keywords.clone(),
        });
        trade.generated_at = signal.timestamp;
        trade
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TechnicalContext {
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Fundamentals {
    pub adoption: Option<Adoption>,
    pub institutional_activity: Option<InstitutionalActivity>,
    /// 0 to 10 durability of competitive advantage.
    pub moat_score: Option<f64>,
    /// Percent below estimated intrinsic value (negative = premium).
    pub intrinsic_value_discount: Option<f64>,
    /// Annualised volatility in percent.
    pub volatility: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Adoption {
    /// Network or user growth in percent.
    pub growth: Option<f64>,
    /// Percent of supply held by institutions.
    pub institutional: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstitutionalActivity {
    /// Net inflows in millions.
    pub inflows: f64,
    pub new_entities: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentContext {
    /// -1.0 to 1.0.
    pub score: f64,
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OnChainContext {
    pub exchange_balance_trend: Option<f64>,
    pub entities_holding: Option<u64>,
    pub prev_entities_holding: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MacroContext {
    /// Year-over-year inflation in percent.
    pub inflation: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResearchEvidence {
    pub sources: Vec<String>,
    pub peer_reviewed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuantitativeEvidence {
    pub backtest_years: Option<u32>,
    pub statistical_significance: Option<f64>,
}
