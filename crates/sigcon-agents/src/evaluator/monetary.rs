use sigcon_models::config::Persona;
use sigcon_models::consensus::Evaluation;
use sigcon_models::trade_signal::TradeSignal;

use super::{clamp_score, score_confidence, trend_contains, verdict, Component, Evaluator};

const BIAS: f64 = 95.0;
const CONVICTION_CONFIDENCE: f64 = 0.9;

/// Monetary-network maximalist. Bitcoin has its own hand-tuned path; every
/// other asset is scored from a fixed base.
pub struct MonetaryNetworkEvaluator;

impl MonetaryNetworkEvaluator {
    fn bitcoin(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        c.add(
            85.0,
            "Bitcoin is digital property on a monetary network and the apex treasury reserve asset",
        );
        c.reasoning
            .push("Time in the market matters more than timing the market".into());

        if let Some(chain) = &signal.on_chain {
            if chain.exchange_balance_trend.is_some_and(|t| t < 0.0) {
                c.add(10.0, "Falling exchange balances point to accumulation");
            }
            if let (Some(now), Some(before)) = (chain.entities_holding, chain.prev_entities_holding)
            {
                if now > before {
                    c.add(5.0, "More entities are holding Bitcoin");
                }
            }
        }
        if let Some(inflation) = signal.macro_context.as_ref().and_then(|m| m.inflation) {
            if inflation > 2.0 {
                c.add(
                    5.0,
                    format!("Inflation at {inflation}% strengthens the hedge thesis"),
                );
            }
        }
        if trend_contains(signal, "Downtrend") {
            c.add(5.0, "Price weakness is an acquisition opportunity");
        }
        c
    }
}

impl Evaluator for MonetaryNetworkEvaluator {
    fn name(&self) -> &str {
        Persona::MonetaryNetwork.id()
    }

    fn bias(&self) -> f64 {
        BIAS
    }

    fn evaluate(&self, signal: &TradeSignal) -> Evaluation {
        match signal.symbol.as_str() {
            "BTC" => {
                let c = Self::bitcoin(signal);
                verdict(clamp_score(c.score), CONVICTION_CONFIDENCE, c.reasoning)
            }
            "ETH" => {
                let score = 20.0;
                verdict(
                    score,
                    score_confidence(score, 0.5, 200.0),
                    vec![
                        "Ethereum has utility but lacks Bitcoin's monetary properties".into(),
                        "At most a complement to a Bitcoin treasury reserve".into(),
                    ],
                )
            }
            _ => {
                let score = -20.0;
                verdict(
                    score,
                    score_confidence(score, 0.5, 200.0),
                    vec![
                        "Lacks the network effects and security of Bitcoin".into(),
                        "Focus belongs on the dominant monetary network".into(),
                    ],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigcon_models::consensus::Recommendation;
    use sigcon_models::trade_signal::{MacroContext, OnChainContext, TechnicalContext};

    #[test]
    fn bitcoin_overrides_the_generic_path() {
        let evaluation = MonetaryNetworkEvaluator.evaluate(&TradeSignal::new("BTC", -90.0, 0.2));
        assert_eq!(evaluation.recommendation, Recommendation::StrongBuy);
        assert_eq!(evaluation.confidence, CONVICTION_CONFIDENCE);
        assert_eq!(evaluation.reasoning.len(), 2);
    }

    #[test]
    fn bitcoin_score_is_clamped() {
        let mut signal = TradeSignal::new("BTC", 0.0, 0.5);
        signal.on_chain = Some(OnChainContext {
            exchange_balance_trend: Some(-3.0),
            entities_holding: Some(120),
            prev_entities_holding: Some(100),
        });
        signal.macro_context = Some(MacroContext {
            inflation: Some(3.5),
        });
        signal.technical = Some(TechnicalContext {
            trend: Some("Downtrend".into()),
        });
        let c = MonetaryNetworkEvaluator::bitcoin(&signal);
        assert_eq!(c.score, 110.0);
        assert_eq!(clamp_score(c.score), 100.0);
        assert_eq!(c.reasoning.len(), 6);
    }

    #[test]
    fn ethereum_is_lukewarm() {
        let evaluation = MonetaryNetworkEvaluator.evaluate(&TradeSignal::new("ETH", 80.0, 0.9));
        assert_eq!(evaluation.recommendation, Recommendation::Neutral);
        assert!((evaluation.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn everything_else_is_neutral_to_negative() {
        let evaluation = MonetaryNetworkEvaluator.evaluate(&TradeSignal::new("SOL", 80.0, 0.9));
        assert_eq!(evaluation.recommendation, Recommendation::Neutral);
        assert!((evaluation.confidence - 0.6).abs() < 1e-12);
    }
}
