use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde_json::json;
use sigcon_models::config::ConsensusConfig;
use sigcon_models::consensus::{
    ConsensusDecision, Discussion, Evaluation, EvaluatorVote, Recommendation,
};
use sigcon_models::research::ResearchCategory;
use sigcon_models::trade_signal::TradeSignal;
use sigcon_store::ResearchRepository;
use tracing::{debug, info, warn};

use crate::evaluator::{persona_evaluator, Evaluator};

/// Below this confidence a decision is flagged for a human.
pub const HUMAN_REVIEW_CONFIDENCE: f64 = 0.5;

struct Member {
    evaluator: Arc<dyn Evaluator>,
    /// 0.0 to 1.0.
    weight: f64,
}

/// One evaluator's verdict together with its panel seat.
#[derive(Debug, Clone)]
pub struct Ballot {
    pub evaluator: String,
    pub weight: f64,
    pub bias: f64,
    pub evaluation: Evaluation,
}

/// Weighted persona voting over trade signals.
pub struct ConsensusCoordinator {
    required_consensus: f64,
    vote_threshold: f64,
    members: RwLock<Vec<Member>>,
    repository: Arc<dyn ResearchRepository>,
}

impl ConsensusCoordinator {
    pub fn new(
        required_consensus: f64,
        vote_threshold: f64,
        repository: Arc<dyn ResearchRepository>,
    ) -> Self {
        Self {
            required_consensus,
            vote_threshold,
            members: RwLock::new(Vec::new()),
            repository,
        }
    }

    /// Coordinator with every enabled persona from the config registered.
    pub fn from_config(config: &ConsensusConfig, repository: Arc<dyn ResearchRepository>) -> Self {
        let coordinator =
            Self::new(config.required_consensus, config.vote_threshold, repository);
        for seat in config.evaluators.iter().filter(|e| e.enabled) {
            coordinator.register_evaluator(persona_evaluator(seat.persona), seat.weight);
        }
        coordinator
    }

    /// Seat an evaluator with a 0 to 100 weight. Re-registering a name
    /// replaces the earlier seat.
    pub fn register_evaluator(&self, evaluator: Arc<dyn Evaluator>, weight: f64) {
        let weight = weight.clamp(0.0, 100.0) / 100.0;
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        info!(evaluator = %evaluator.name(), weight, "Registered evaluator");
        match members
            .iter_mut()
            .find(|m| m.evaluator.name() == evaluator.name())
        {
            Some(member) => {
                member.evaluator = evaluator;
                member.weight = weight;
            }
            None => members.push(Member { evaluator, weight }),
        }
    }

    /// Reweight seated evaluators by name, 0 to 100. Names without a seat
    /// are ignored.
    pub fn set_manager_weights(&self, weights: &[(&str, f64)]) {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        for (name, weight) in weights {
            match members.iter_mut().find(|m| m.evaluator.name() == *name) {
                Some(member) => member.weight = weight.clamp(0.0, 100.0) / 100.0,
                None => debug!(evaluator = %name, "No seat for weighted evaluator"),
            }
        }
    }

    /// Current seats as (name, weight 0 to 1).
    pub fn weights(&self) -> Vec<(String, f64)> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| (m.evaluator.name().to_string(), m.weight))
            .collect()
    }

    pub fn evaluator_count(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Poll every evaluator, tally the counted votes and persist the result.
    /// A failed write is logged; the decision is still returned.
    pub async fn process_signal(&self, signal: &TradeSignal) -> ConsensusDecision {
        let ballots: Vec<Ballot> = {
            let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
            members
                .iter()
                .map(|m| Ballot {
                    evaluator: m.evaluator.name().to_string(),
                    weight: m.weight,
                    bias: m.evaluator.bias(),
                    evaluation: m.evaluator.evaluate(signal),
                })
                .collect()
        };

        let decision = calculate_consensus(
            signal,
            ballots,
            self.required_consensus,
            self.vote_threshold,
        );

        info!(
            symbol = %decision.symbol,
            weighted_signal = decision.weighted_signal,
            recommendation = ?decision.final_recommendation,
            agreement = decision.agreement,
            confidence = decision.confidence,
            "Consensus reached"
        );

        self.store_decision(signal, &decision).await;
        decision
    }

    async fn store_decision(&self, signal: &TradeSignal, decision: &ConsensusDecision) {
        let data = json!({
            "signal": signal,
            "evaluations": decision.votes,
            "decision": decision,
        });
        let metadata = json!({
            "symbol": decision.symbol,
            "recommendation": decision.final_recommendation,
            "consensus_reached": decision.consensus_reached,
        });
        let title = format!("Consensus - {}", decision.symbol);
        if let Err(e) = self
            .repository
            .store_research(&title, ResearchCategory::Consensus, data, metadata)
            .await
        {
            warn!(symbol = %decision.symbol, error = %e, "Failed to persist consensus decision");
        }
    }
}

/// Tally a panel's ballots.
///
/// Votes under `vote_threshold` confidence are left out of the weighted sum
/// and the agreement share but still count toward mean confidence and still
/// appear in the discussions.
pub fn calculate_consensus(
    signal: &TradeSignal,
    ballots: Vec<Ballot>,
    required_consensus: f64,
    vote_threshold: f64,
) -> ConsensusDecision {
    let mut weighted_sum = 0.0;
    let mut kept_weight = 0.0;
    let mut buckets: HashMap<Recommendation, f64> = HashMap::new();

    for ballot in &ballots {
        if ballot.evaluation.confidence < vote_threshold {
            continue;
        }
        let value = ballot.evaluation.recommendation.value();
        weighted_sum += value * ballot.weight;
        kept_weight += ballot.weight;
        *buckets.entry(Recommendation::from_score(value)).or_default() += ballot.weight;
    }

    let (weighted_signal, agreement) = if kept_weight > 0.0 {
        let largest = buckets.values().copied().fold(0.0, f64::max);
        (weighted_sum / kept_weight, largest / kept_weight)
    } else {
        (0.0, 0.0)
    };

    let mean_confidence = if ballots.is_empty() {
        0.0
    } else {
        ballots.iter().map(|b| b.evaluation.confidence).sum::<f64>() / ballots.len() as f64
    };
    let confidence = (agreement + mean_confidence) / 2.0;

    let discussions = ballots
        .iter()
        .flat_map(|b| {
            b.evaluation.reasoning.iter().map(|point| Discussion {
                evaluator: b.evaluator.clone(),
                point: point.clone(),
                bias: b.bias,
            })
        })
        .collect();

    let votes = ballots
        .into_iter()
        .map(|b| EvaluatorVote {
            counted: b.evaluation.confidence >= vote_threshold,
            evaluator: b.evaluator,
            weight: b.weight,
            recommendation: b.evaluation.recommendation,
            confidence: b.evaluation.confidence,
            reasoning: b.evaluation.reasoning,
        })
        .collect();

    ConsensusDecision {
        symbol: signal.symbol.clone(),
        original_signal: signal.overall_signal,
        weighted_signal,
        final_recommendation: Recommendation::from_score(weighted_signal),
        agreement,
        confidence,
        consensus_reached: agreement >= required_consensus,
        requires_human_review: confidence < HUMAN_REVIEW_CONFIDENCE,
        votes,
        discussions,
        decided_at: Utc::now(),
    }
}
