//! Tournament-style performance tracking and weight rebalancing.
//!
//! Participants produce calls each cycle, calls are settled against observed
//! market moves, and on every rebalance period the weights shift toward the
//! best performers. Weights always sum to 1 and never fall below the floor.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sigcon_models::config::TournamentConfig;
use sigcon_models::performance::{
    AgentPerformance, MarketMove, ParticipantSignal, TradeOutcome, WeightedSignal,
};
use sigcon_models::signal::TradeAction;
use sigcon_models::trade_signal::TradeSignal;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::evaluator::Evaluator;

/// Tolerance on the weights summing to 1.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Largest simulated move, in percent.
const MAX_SIMULATED_MOVE: f64 = 3.0;

#[async_trait]
pub trait TournamentParticipant: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn kind(&self) -> &str;

    async fn signals(&self) -> Result<Vec<ParticipantSignal>, AgentError>;
}

/// Where settled market moves come from: a live feed or a simulation.
#[async_trait]
pub trait OutcomeSource: Send + Sync {
    async fn observe(&self, symbols: &[String]) -> Result<HashMap<String, MarketMove>, AgentError>;
}

/// Random direction and a 0 to 3% move per symbol.
pub struct SimulatedMarket {
    rng: Mutex<StdRng>,
}

impl SimulatedMarket {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reproducible market for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SimulatedMarket {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutcomeSource for SimulatedMarket {
    async fn observe(&self, symbols: &[String]) -> Result<HashMap<String, MarketMove>, AgentError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(symbols
            .iter()
            .map(|symbol| {
                let mv = MarketMove {
                    up: rng.random_bool(0.5),
                    change_pct: rng.random_range(0.0..MAX_SIMULATED_MOVE),
                };
                (symbol.clone(), mv)
            })
            .collect())
    }
}

/// Latest trade signal per symbol, shared between whoever routes signals in
/// and the participants that evaluate them.
#[derive(Default)]
pub struct Watchlist {
    latest: RwLock<BTreeMap<String, TradeSignal>>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, signal: TradeSignal) {
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(signal.symbol.clone(), signal);
    }

    pub fn signals(&self) -> Vec<TradeSignal> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Enters a persona into the tournament: it evaluates every watched symbol
/// and calls buy, sell or hold from its recommendation.
pub struct EvaluatorParticipant {
    evaluator: Arc<dyn Evaluator>,
    watchlist: Arc<Watchlist>,
}

impl EvaluatorParticipant {
    pub fn new(evaluator: Arc<dyn Evaluator>, watchlist: Arc<Watchlist>) -> Self {
        Self {
            evaluator,
            watchlist,
        }
    }
}

#[async_trait]
impl TournamentParticipant for EvaluatorParticipant {
    fn id(&self) -> &str {
        self.evaluator.name()
    }

    fn name(&self) -> &str {
        self.evaluator.name()
    }

    fn kind(&self) -> &str {
        "persona"
    }

    async fn signals(&self) -> Result<Vec<ParticipantSignal>, AgentError> {
        Ok(self
            .watchlist
            .signals()
            .iter()
            .map(|signal| {
                let evaluation = self.evaluator.evaluate(signal);
                ParticipantSignal {
                    symbol: signal.symbol.clone(),
                    action: evaluation
                        .recommendation
                        .action()
                        .unwrap_or(TradeAction::Hold),
                    confidence: evaluation.confidence,
                }
            })
            .collect())
    }
}

/// What one tournament cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub rebalanced: bool,
    pub signals: Vec<WeightedSignal>,
    pub outcomes: Vec<TradeOutcome>,
}

struct Entrant {
    participant: Arc<dyn TournamentParticipant>,
    performance: AgentPerformance,
}

struct Book {
    entrants: Vec<Entrant>,
    last_rebalance: Instant,
}

/// Single writer of the tournament weights.
pub struct PerformanceTracker {
    config: TournamentConfig,
    book: Mutex<Book>,
    outcomes: Arc<dyn OutcomeSource>,
    running: AtomicBool,
    cycle: tokio::sync::Mutex<()>,
}

impl PerformanceTracker {
    pub fn new(config: TournamentConfig, outcomes: Arc<dyn OutcomeSource>) -> Self {
        Self {
            config,
            book: Mutex::new(Book {
                entrants: Vec::new(),
                last_rebalance: Instant::now(),
            }),
            outcomes,
            running: AtomicBool::new(false),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    fn book(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter a participant at the initial weight. Re-registering an id swaps
    /// the participant but keeps its record.
    pub fn register(&self, participant: Arc<dyn TournamentParticipant>) {
        let mut book = self.book();
        if let Some(entrant) = book
            .entrants
            .iter_mut()
            .find(|e| e.performance.id == participant.id())
        {
            warn!(agent = %participant.id(), "Participant re-registered, keeping its record");
            entrant.participant = participant;
            return;
        }
        info!(agent = %participant.id(), kind = %participant.kind(), "Registered participant");
        book.entrants.push(Entrant {
            performance: AgentPerformance::new(
                participant.id(),
                participant.name(),
                participant.kind(),
                self.config.initial_weight,
            ),
            participant,
        });
        if self.is_running() {
            self.normalize(&mut book);
        }
    }

    /// Normalize weights and open the tournament.
    pub fn start(&self) {
        let mut book = self.book();
        self.normalize(&mut book);
        book.last_rebalance = Instant::now();
        self.running.store(true, Ordering::SeqCst);
        info!(participants = book.entrants.len(), "Tournament started");
    }

    /// Stop scheduling further cycles. An in-flight cycle still completes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Tournament stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn rebalance_period(&self) -> Duration {
        Duration::from_secs(self.config.rebalance_period_seconds)
    }

    fn rebalance_due(&self) -> bool {
        self.config.enable_rebalancing
            && self.book().last_rebalance.elapsed() >= self.rebalance_period()
    }

    /// One trading cycle: rebalance if due, collect weighted calls, settle
    /// them and fold the results into each participant's record.
    pub async fn run_cycle(&self) -> Result<CycleReport, AgentError> {
        let _guard = self
            .cycle
            .try_lock()
            .map_err(|_| AgentError::CycleInProgress("tournament".to_string()))?;
        let start = Instant::now();

        let rebalanced = self.rebalance_due() && self.rebalance();

        let seats: Vec<(Arc<dyn TournamentParticipant>, f64)> = self
            .book()
            .entrants
            .iter()
            .map(|e| (Arc::clone(&e.participant), e.performance.weight))
            .collect();

        let timeout = Duration::from_secs(self.config.collect_timeout_seconds);
        let mut handles = Vec::new();
        for (participant, weight) in seats {
            handles.push(tokio::spawn(async move {
                let result = tokio::time::timeout(timeout, participant.signals()).await;
                (participant, weight, result)
            }));
        }

        let mut signals = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((participant, weight, Ok(Ok(calls)))) => {
                    let now = Utc::now();
                    signals.extend(calls.into_iter().map(|call| WeightedSignal {
                        agent_id: participant.id().to_string(),
                        weighted_confidence: call.confidence * weight,
                        symbol: call.symbol,
                        action: call.action,
                        confidence: call.confidence,
                        weight,
                        collected_at: now,
                    }));
                }
                Ok((participant, _, Ok(Err(e)))) => {
                    warn!(agent = %participant.id(), error = %e, "Signal collection failed");
                }
                Ok((participant, _, Err(_))) => {
                    warn!(
                        agent = %participant.id(),
                        timeout_secs = timeout.as_secs(),
                        "Signal collection timed out"
                    );
                }
                Err(e) => error!(error = %e, "Participant task panicked"),
            }
        }

        let symbols: Vec<String> = signals
            .iter()
            .map(|s| s.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let moves = if symbols.is_empty() {
            HashMap::new()
        } else {
            match self.outcomes.observe(&symbols).await {
                Ok(moves) => moves,
                Err(e) => {
                    warn!(error = %e, "Outcome source failed, no trades settled this cycle");
                    HashMap::new()
                }
            }
        };

        let outcomes: Vec<TradeOutcome> = signals
            .iter()
            .filter_map(|signal| {
                let (success, pnl) = moves.get(&signal.symbol)?.settle(signal.action)?;
                Some(TradeOutcome {
                    agent_id: signal.agent_id.clone(),
                    symbol: signal.symbol.clone(),
                    action: signal.action,
                    success,
                    pnl,
                })
            })
            .collect();
        self.record(&outcomes);

        info!(
            signals = signals.len(),
            settled = outcomes.len(),
            rebalanced,
            elapsed_ms = start.elapsed().as_millis(),
            "Tournament cycle complete"
        );
        Ok(CycleReport {
            rebalanced,
            signals,
            outcomes,
        })
    }

    fn record(&self, outcomes: &[TradeOutcome]) {
        let mut by_agent: HashMap<&str, Vec<TradeOutcome>> = HashMap::new();
        for outcome in outcomes {
            by_agent
                .entry(outcome.agent_id.as_str())
                .or_default()
                .push(outcome.clone());
        }
        let mut book = self.book();
        for entrant in &mut book.entrants {
            if let Some(results) = by_agent.get(entrant.performance.id.as_str()) {
                entrant
                    .performance
                    .record(results, self.config.performance_decay_factor);
                debug!(
                    agent = %entrant.performance.id,
                    pnl = entrant.performance.pnl,
                    success_rate = entrant.performance.success_rate,
                    "Performance updated"
                );
            }
        }
    }

    /// Shift weight toward the best performers by rank, then renormalize.
    /// Returns false, changing nothing, with fewer than two participants.
    pub fn rebalance(&self) -> bool {
        let mut book = self.book();
        let n = book.entrants.len();
        if n < 2 {
            debug!(participants = n, "Too few participants to rebalance");
            return false;
        }

        let mut ranked: Vec<usize> = (0..n).collect();
        ranked.sort_by(|&a, &b| {
            book.entrants[b]
                .performance
                .pnl
                .total_cmp(&book.entrants[a].performance.pnl)
        });

        let step = self.config.max_weight_delta * self.config.adjustment_factor;
        for (rank, &i) in ranked.iter().enumerate() {
            let rank_factor = 1.0 - 2.0 * rank as f64 / (n - 1) as f64;
            let perf = &mut book.entrants[i].performance;
            perf.weight = (perf.weight + step * rank_factor).clamp(self.config.min_weight, 1.0);
        }

        self.normalize(&mut book);
        book.last_rebalance = Instant::now();

        info!(
            participants = n,
            leader = %book.entrants[ranked[0]].performance.id,
            "Weights rebalanced"
        );
        true
    }

    /// Nudge one participant's weight by `delta`, then renormalize the whole
    /// book the same way a rebalance does. Returns the resulting weight.
    pub fn manual_adjust_weight(&self, id: &str, delta: f64) -> Result<f64, AgentError> {
        let mut book = self.book();
        let index = book
            .entrants
            .iter()
            .position(|e| e.performance.id == id)
            .ok_or_else(|| AgentError::UnknownAgent(id.to_string()))?;
        {
            let perf = &mut book.entrants[index].performance;
            perf.weight = (perf.weight + delta).clamp(self.config.min_weight, 1.0);
        }
        self.normalize(&mut book);
        let weight = book.entrants[index].performance.weight;
        info!(agent = %id, delta, weight, "Weight manually adjusted");
        Ok(weight)
    }

    fn normalize(&self, book: &mut Book) {
        if book.entrants.is_empty() {
            return;
        }
        let mut weights: Vec<f64> = book.entrants.iter().map(|e| e.performance.weight).collect();
        renormalize(&mut weights, self.config.min_weight);
        if !weights_hold(&weights, self.config.min_weight) {
            error!(
                sum = weights.iter().sum::<f64>(),
                "Weight invariant violated after renormalization, forcing equal weights"
            );
            let equal = 1.0 / weights.len() as f64;
            weights.iter_mut().for_each(|w| *w = equal);
        }
        for (entrant, weight) in book.entrants.iter_mut().zip(weights) {
            entrant.performance.weight = weight;
        }
    }

    pub fn weight(&self, id: &str) -> Option<f64> {
        self.book()
            .entrants
            .iter()
            .find(|e| e.performance.id == id)
            .map(|e| e.performance.weight)
    }

    /// (id, weight) in registration order.
    pub fn weights(&self) -> Vec<(String, f64)> {
        self.book()
            .entrants
            .iter()
            .map(|e| (e.performance.id.clone(), e.performance.weight))
            .collect()
    }

    pub fn performance(&self, id: &str) -> Option<AgentPerformance> {
        self.book()
            .entrants
            .iter()
            .find(|e| e.performance.id == id)
            .map(|e| e.performance.clone())
    }

    /// Records ordered by PnL, best first.
    pub fn leaderboard(&self) -> Vec<AgentPerformance> {
        let mut board: Vec<AgentPerformance> = self
            .book()
            .entrants
            .iter()
            .map(|e| e.performance.clone())
            .collect();
        board.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
        board
    }
}

/// Scale weights to sum to 1 while holding every weight at or above `min`.
///
/// Weights that would drop under the floor are pinned to it and the rest
/// share what is left, repeating until nothing new is pinned. When the floor
/// itself is infeasible (`n * min > 1`) every weight becomes `1 / n`.
pub fn renormalize(weights: &mut [f64], min: f64) {
    let n = weights.len();
    if n == 0 {
        return;
    }
    if n as f64 * min > 1.0 {
        error!(
            participants = n,
            min_weight = min,
            "Weight floor cannot be honoured, using equal weights"
        );
        weights.iter_mut().for_each(|w| *w = 1.0 / n as f64);
        return;
    }

    let mut pinned = vec![false; n];
    loop {
        let pinned_count = pinned.iter().filter(|p| **p).count();
        let free_count = n - pinned_count;
        let free_mass = 1.0 - pinned_count as f64 * min;
        let free_sum: f64 = weights
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|(w, _)| w.max(0.0))
            .sum();

        for (w, p) in weights.iter_mut().zip(&pinned) {
            *w = if *p {
                min
            } else if free_sum > 0.0 {
                w.max(0.0) * free_mass / free_sum
            } else {
                free_mass / free_count as f64
            };
        }

        let mut newly_pinned = false;
        for (w, p) in weights.iter_mut().zip(pinned.iter_mut()) {
            if !*p && *w < min {
                *p = true;
                *w = min;
                newly_pinned = true;
            }
        }
        if !newly_pinned {
            break;
        }
    }
}

fn weights_hold(weights: &[f64], min: f64) -> bool {
    let sum: f64 = weights.iter().sum();
    (sum - 1.0).abs() < WEIGHT_EPSILON && weights.iter().all(|w| *w >= min - WEIGHT_EPSILON)
}
