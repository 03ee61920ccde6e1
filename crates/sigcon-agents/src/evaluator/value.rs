use sigcon_models::config::Persona;
use sigcon_models::consensus::Evaluation;
use sigcon_models::trade_signal::TradeSignal;

use super::{clamp_score, score_confidence, verdict, Component, Evaluator};

const BIAS: f64 = -85.0;

/// Margin-of-safety investor. Skeptical by default; strong evidence shrinks
/// the weight of that skepticism.
pub struct ValueEvaluator;

impl ValueEvaluator {
    fn value(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        let Some(fundamentals) = &signal.fundamentals else {
            return c;
        };
        match fundamentals.intrinsic_value_discount {
            Some(d) if d > 30.0 => c.add(60.0, format!("Trades {d}% below intrinsic value")),
            Some(d) if d > 10.0 => c.add(30.0, format!("Modest {d}% margin of safety")),
            Some(d) if d < 0.0 => c.add(-40.0, format!("Trades {}% above intrinsic value", -d)),
            _ => {}
        }
        match fundamentals.moat_score {
            Some(m) if m >= 7.0 => c.add(30.0, "Durable competitive moat"),
            Some(m) if m <= 3.0 => c.add(-20.0, "Little protection from competition"),
            _ => {}
        }
        c
    }

    fn risk(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        match signal.fundamentals.as_ref().and_then(|f| f.volatility) {
            Some(v) if v > 60.0 => c.add(-40.0, format!("Volatility of {v}% is speculative")),
            Some(v) if v > 30.0 => c.add(-15.0, format!("Elevated volatility of {v}%")),
            Some(_) => c.add(20.0, "Volatility within a conservative range"),
            None => {}
        }
        if is_crypto(&signal.symbol) {
            c.add(-20.0, "Digital assets produce no cash flow");
        }
        c
    }

    fn evidence(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        if let Some(research) = &signal.research {
            if research.sources.len() >= 3 {
                c.add(20.0, "Multiple independent research sources");
            }
            if research.peer_reviewed {
                c.add(15.0, "Peer-reviewed analysis");
            }
        }
        if let Some(quant) = &signal.quantitative {
            if let Some(years) = quant.backtest_years.filter(|y| *y >= 5) {
                c.add(25.0, format!("{years}-year backtest shows consistent results"));
            }
            if quant.statistical_significance.is_some_and(|s| s > 0.95) {
                c.add(20.0, "Statistically significant beyond coincidence");
            }
        }
        if let Some(share) = signal
            .fundamentals
            .as_ref()
            .and_then(|f| f.adoption.as_ref())
            .and_then(|a| a.institutional)
            .filter(|s| *s > 30.0)
        {
            c.add(
                20.0,
                format!("{share}% institutional adoption suggests legitimacy"),
            );
        }
        c
    }
}

fn is_crypto(symbol: &str) -> bool {
    crate::orchestrator::AssetCategory::of(symbol) == crate::orchestrator::AssetCategory::Crypto
}

/// Share of the skeptical bias applied, shrinking as evidence mounts.
fn bias_weight(evidence: f64) -> f64 {
    (0.3 - evidence / 100.0 * 0.25).max(0.05)
}

impl Evaluator for ValueEvaluator {
    fn name(&self) -> &str {
        Persona::Value.id()
    }

    fn bias(&self) -> f64 {
        BIAS
    }

    fn evaluate(&self, signal: &TradeSignal) -> Evaluation {
        let value = Self::value(signal);
        let risk = Self::risk(signal);
        let evidence = Self::evidence(signal);

        let score = clamp_score(
            value.score * 0.6
                + risk.score * 0.3
                + evidence.score * 0.1
                + BIAS * bias_weight(evidence.score),
        );

        let mut reasoning = value.reasoning;
        reasoning.extend(risk.reasoning);
        reasoning.extend(evidence.reasoning);
        if matches!(signal.symbol.as_str(), "BTC" | "ETH") {
            reasoning.push(format!(
                "{} lacks the productive capacity sought in an investment",
                signal.symbol
            ));
            if evidence.score > 70.0 {
                reasoning.push("The evidence is substantial enough to merit consideration".into());
                reasoning.push("Strong data can outweigh a long-held skepticism".into());
            }
        }

        verdict(score, score_confidence(score, 0.4, 200.0), reasoning)
    }
}
