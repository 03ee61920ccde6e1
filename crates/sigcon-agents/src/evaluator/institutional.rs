use sigcon_models::config::Persona;
use sigcon_models::consensus::Evaluation;
use sigcon_models::trade_signal::TradeSignal;

use super::{clamp_score, score_confidence, trend_contains, verdict, Component, Evaluator};

const BIAS: f64 = -20.0;
const REGULATORY_THEMES: [&str; 3] = ["regulation", "sec", "compliance"];

/// Large-bank risk desk: regulation and institutional flows first.
pub struct InstitutionalEvaluator;

impl InstitutionalEvaluator {
    fn regulatory(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        if let Some(sentiment) = &signal.sentiment {
            let flagged = sentiment.themes.iter().any(|theme| {
                let theme = theme.to_lowercase();
                REGULATORY_THEMES.iter().any(|t| theme.contains(t))
            });
            if flagged {
                c.add(-40.0, "Regulatory themes in the news flow raise compliance risk");
            } else {
                c.add(20.0, "No regulatory concerns in current sentiment");
            }
        }
        if matches!(signal.symbol.as_str(), "BTC" | "ETH") {
            c.add(
                10.0,
                format!("{} has the clearest regulatory standing in its class", signal.symbol),
            );
        }
        c
    }

    fn technical(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        if trend_contains(signal, "Strong Uptrend") {
            c.add(30.0, "Strong uptrend supports position sizing");
        } else if trend_contains(signal, "Uptrend") {
            c.add(15.0, "Uptrend is constructive");
        } else if trend_contains(signal, "Strong Downtrend") {
            c.add(-40.0, "Strong downtrend breaches risk limits");
        } else if trend_contains(signal, "Downtrend") {
            c.add(-20.0, "Downtrend argues for reduced exposure");
        }
        c
    }

    fn institutional(signal: &TradeSignal) -> Component {
        let mut c = Component::default();
        let Some(activity) = signal
            .fundamentals
            .as_ref()
            .and_then(|f| f.institutional_activity.as_ref())
        else {
            return c;
        };
        if activity.inflows > 0.0 {
            c.add(
                30.0,
                format!("Net institutional inflows of {}M", activity.inflows),
            );
        } else if activity.inflows < 0.0 {
            c.add(
                -40.0,
                format!("Net institutional outflows of {}M", -activity.inflows),
            );
        }
        if activity.new_entities > 0 {
            c.add(
                20.0,
                format!("{} new institutional entities entered", activity.new_entities),
            );
        }
        c
    }
}

impl Evaluator for InstitutionalEvaluator {
    fn name(&self) -> &str {
        Persona::Institutional.id()
    }

    fn bias(&self) -> f64 {
        BIAS
    }

    fn evaluate(&self, signal: &TradeSignal) -> Evaluation {
        let regulatory = Self::regulatory(signal);
        let technical = Self::technical(signal);
        let institutional = Self::institutional(signal);

        let score = clamp_score(
            regulatory.score * 0.4 + technical.score * 0.2 + institutional.score * 0.4 + BIAS * 0.1,
        );

        let mut reasoning = regulatory.reasoning;
        reasoning.extend(technical.reasoning);
        reasoning.extend(institutional.reasoning);
        if matches!(signal.symbol.as_str(), "BTC" | "ETH") {
            reasoning.push(format!(
                "Client demand for {} exposure is met through regulated custody",
                signal.symbol
            ));
        }

        verdict(score, score_confidence(score, 0.4, 150.0), reasoning)
    }
}
