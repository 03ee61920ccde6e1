use sigcon_models::config::Persona;
use sigcon_models::consensus::Evaluation;
use sigcon_models::trade_signal::TradeSignal;

use super::{clamp_score, score_confidence, trend_contains, verdict, Component, Evaluator};

const BIAS: f64 = 85.0;

/// Disruptive-innovation investor. Heavily weights platform potential and
/// shrugs off short-term weakness.
pub struct InnovationEvaluator;

impl InnovationEvaluator {
    fn technical(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        if trend_contains(signal, "Uptrend") {
            c.add(20.0, "Technical uptrend confirms positive momentum");
        } else if trend_contains(signal, "Downtrend") {
            c.add(
                -10.0,
                "Downtrend may be a buying opportunity if the innovation thesis holds",
            );
        }
        c
    }

    fn fundamental(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        let growth = signal
            .fundamentals
            .as_ref()
            .and_then(|f| f.adoption.as_ref())
            .and_then(|a| a.growth);
        match growth {
            Some(g) if g > 30.0 => c.add(
                40.0,
                format!("Network growth of {g}% indicates accelerating adoption"),
            ),
            Some(g) if g > 10.0 => c.add(
                20.0,
                format!("Network growth of {g}% supports the long-term thesis"),
            ),
            _ => {}
        }
        c
    }

    fn innovation(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        match signal.symbol.as_str() {
            "BTC" => c.add(
                50.0,
                "Bitcoin is a breakthrough non-sovereign monetary network",
            ),
            "ETH" => c.add(
                60.0,
                "Programmable smart contracts are a platform technology for financial services",
            ),
            _ => {}
        }
        if signal.sentiment_score().is_some_and(|s| s > 0.5) {
            c.add(20.0, "Positive sentiment signals growing awareness");
        }
        c
    }
}

impl Evaluator for InnovationEvaluator {
    fn name(&self) -> &str {
        Persona::Innovation.id()
    }

    fn bias(&self) -> f64 {
        BIAS
    }

    fn evaluate(&self, signal: &TradeSignal) -> Evaluation {
        let technical = Self::technical(signal);
        let fundamental = Self::fundamental(signal);
        let innovation = Self::innovation(signal);

        let score = clamp_score(
            technical.score * 0.2 + fundamental.score * 0.3 + innovation.score * 0.5 + BIAS * 0.2,
        );

        let mut reasoning = technical.reasoning;
        reasoning.extend(fundamental.reasoning);
        reasoning.extend(innovation.reasoning);
        if matches!(signal.symbol.as_str(), "BTC" | "ETH") {
            reasoning.push(format!(
                "{} is a strategic allocation to digital assets and a hedge against currency debasement",
                signal.symbol
            ));
            reasoning.push(format!(
                "Institutional adoption of {} is still early on the curve",
                signal.symbol
            ));
            if signal.symbol == "ETH" {
                reasoning.push(
                    "Decentralized applications on Ethereum can disrupt traditional finance".into(),
                );
            }
        }

        verdict(score, score_confidence(score, 0.5, 200.0), reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigcon_models::consensus::Recommendation;
    use sigcon_models::trade_signal::{Adoption, Fundamentals, SentimentContext, TechnicalContext};

    #[test]
    fn bare_equity_leans_on_bias() {
        let evaluation = InnovationEvaluator.evaluate(&TradeSignal::new("AAPL", 10.0, 0.5));
        // 85 * 0.2
        assert_eq!(evaluation.recommendation, Recommendation::Neutral);
        assert!((evaluation.confidence - (0.5 + 17.0 / 200.0)).abs() < 1e-12);
        assert!(evaluation.reasoning.is_empty());
    }

    #[test]
    fn ethereum_with_momentum() {
        let mut signal = TradeSignal::new("ETH", 40.0, 0.6);
        signal.technical = Some(TechnicalContext {
            trend: Some("Strong Uptrend".into()),
        });
        signal.fundamentals = Some(Fundamentals {
            adoption: Some(Adoption {
                growth: Some(35.0),
                institutional: None,
            }),
            ..Fundamentals::default()
        });
        signal.sentiment = Some(SentimentContext {
            score: 0.7,
            themes: vec![],
        });
        let evaluation = InnovationEvaluator.evaluate(&signal);
        // 20*0.2 + 40*0.3 + 80*0.5 + 17 = 73
        assert_eq!(evaluation.recommendation, Recommendation::Buy);
        assert!((evaluation.confidence - (0.5 + 73.0 / 200.0)).abs() < 1e-12);
        assert_eq!(evaluation.reasoning.len(), 7);
    }

    #[test]
    fn downtrend_barely_dents_conviction() {
        let mut signal = TradeSignal::new("BTC", -20.0, 0.5);
        signal.technical = Some(TechnicalContext {
            trend: Some("Downtrend".into()),
        });
        let evaluation = InnovationEvaluator.evaluate(&signal);
        // -10*0.2 + 50*0.5 + 17 = 40
        assert_eq!(evaluation.recommendation, Recommendation::Buy);
    }
}
