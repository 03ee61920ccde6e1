//! Scripted collaborators for exercising the hierarchy, the consensus panel
//! and the tournament without live feeds, markets or storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sigcon_models::consensus::{Evaluation, Recommendation};
use sigcon_models::performance::{MarketMove, ParticipantSignal};
use sigcon_models::research::ResearchCategory;
use sigcon_models::signal::RawSignal;
use sigcon_models::trade_signal::{
    Adoption, Fundamentals, InstitutionalActivity, MacroContext, OnChainContext,
    QuantitativeEvidence, ResearchEvidence, SentimentContext, TechnicalContext, TradeSignal,
};
use sigcon_store::repository::new_record;
use sigcon_store::{ResearchRepository, StoreError};

use crate::error::AgentError;
use crate::evaluator::Evaluator;
use crate::feed::FeedSource;
use crate::tournament::{OutcomeSource, TournamentParticipant};

/// Returns the same batch of raw signals on every fetch.
pub struct ScriptedFeed {
    name: String,
    domain: String,
    signals: Vec<RawSignal>,
    acks: Arc<AtomicUsize>,
}

impl ScriptedFeed {
    pub fn new(name: &str, domain: &str, signals: Vec<RawSignal>) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            signals,
            acks: Arc::default(),
        }
    }

    /// Shared count of acknowledged fetches, readable after the feed is boxed.
    pub fn acknowledgements(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.acks)
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    async fn process_data(&self) -> Result<Vec<RawSignal>, AgentError> {
        Ok(self.signals.clone())
    }

    async fn acknowledge(&self) -> Result<(), AgentError> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every fetch fails.
pub struct FailingFeed {
    name: String,
    domain: String,
}

impl FailingFeed {
    pub fn new(name: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
        }
    }
}

#[async_trait]
impl FeedSource for FailingFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    async fn process_data(&self) -> Result<Vec<RawSignal>, AgentError> {
        Err(AgentError::Feed(format!("{} is unreachable", self.name)))
    }
}

/// Sleeps before returning nothing.
pub struct SlowFeed {
    name: String,
    domain: String,
    delay: Duration,
    acks: Arc<AtomicUsize>,
}

impl SlowFeed {
    pub fn new(name: &str, domain: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            delay,
            acks: Arc::default(),
        }
    }

    pub fn acknowledgements(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.acks)
    }
}

#[async_trait]
impl FeedSource for SlowFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    async fn process_data(&self) -> Result<Vec<RawSignal>, AgentError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn acknowledge(&self) -> Result<(), AgentError> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always returns the same verdict.
pub struct FixedEvaluator {
    name: String,
    recommendation: Recommendation,
    confidence: f64,
}

impl FixedEvaluator {
    pub fn new(name: &str, recommendation: Recommendation, confidence: f64) -> Self {
        Self {
            name: name.to_string(),
            recommendation,
            confidence,
        }
    }
}

impl Evaluator for FixedEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn bias(&self) -> f64 {
        0.0
    }

    fn evaluate(&self, signal: &TradeSignal) -> Evaluation {
        Evaluation {
            recommendation: self.recommendation,
            confidence: self.confidence,
            reasoning: vec![format!(
                "{} rates {} {:?}",
                self.name, signal.symbol, self.recommendation
            )],
        }
    }
}

/// Makes the same calls every cycle.
pub struct ScriptedParticipant {
    id: String,
    calls: Vec<ParticipantSignal>,
}

impl ScriptedParticipant {
    pub fn new(id: &str, calls: Vec<ParticipantSignal>) -> Self {
        Self {
            id: id.to_string(),
            calls,
        }
    }
}

#[async_trait]
impl TournamentParticipant for ScriptedParticipant {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "scripted"
    }

    async fn signals(&self) -> Result<Vec<ParticipantSignal>, AgentError> {
        Ok(self.calls.clone())
    }
}

pub struct FailingParticipant {
    id: String,
}

impl FailingParticipant {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

#[async_trait]
impl TournamentParticipant for FailingParticipant {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "failing"
    }

    async fn signals(&self) -> Result<Vec<ParticipantSignal>, AgentError> {
        Err(AgentError::Collaborator(format!("{} has no signals", self.id)))
    }
}

/// Settles every symbol with a predetermined move. Unknown symbols go
/// unsettled.
#[derive(Default)]
pub struct FixedOutcomes {
    moves: HashMap<String, MarketMove>,
}

impl FixedOutcomes {
    /// `(symbol, up, change_pct)` triples.
    pub fn new<'a>(moves: impl IntoIterator<Item = (&'a str, bool, f64)>) -> Self {
        Self {
            moves: moves
                .into_iter()
                .map(|(symbol, up, change_pct)| (symbol.to_string(), MarketMove { up, change_pct }))
                .collect(),
        }
    }
}

#[async_trait]
impl OutcomeSource for FixedOutcomes {
    async fn observe(&self, symbols: &[String]) -> Result<HashMap<String, MarketMove>, AgentError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.moves.get(s).map(|m| (s.clone(), *m)))
            .collect())
    }
}

/// Keeps every write in order so tests can inspect what was persisted.
#[derive(Default)]
pub struct RecordingRepository {
    writes: Mutex<Vec<(String, ResearchCategory, serde_json::Value)>>,
}

impl RecordingRepository {
    pub fn titles(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(title, _, _)| title.clone())
            .collect()
    }

    pub fn writes(&self) -> Vec<(String, ResearchCategory, serde_json::Value)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ResearchRepository for RecordingRepository {
    async fn store_research(
        &self,
        title: &str,
        category: ResearchCategory,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        let record = new_record(title, category, data.clone(), metadata);
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), category, data));
        Ok(record.path)
    }
}

/// Every write fails.
pub struct FailingRepository;

#[async_trait]
impl ResearchRepository for FailingRepository {
    async fn store_research(
        &self,
        _title: &str,
        _category: ResearchCategory,
        _data: serde_json::Value,
        _metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("repository offline".to_string()))
    }
}

/// Panics on every write, standing in for a collaborator bug that takes down
/// the whole agent cycle.
pub struct PanickingRepository;

#[async_trait]
impl ResearchRepository for PanickingRepository {
    async fn store_research(
        &self,
        title: &str,
        _category: ResearchCategory,
        _data: serde_json::Value,
        _metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        panic!("research store crashed writing {title}")
    }
}

/// A signal with every context block filled in on the bullish side.
pub fn bullish_signal(symbol: &str) -> TradeSignal {
    let mut signal = TradeSignal::new(symbol, 60.0, 0.7);
    signal.technical = Some(TechnicalContext {
        trend: Some("Strong Uptrend".to_string()),
    });
    signal.fundamentals = Some(Fundamentals {
        adoption: Some(Adoption {
            growth: Some(40.0),
            institutional: Some(35.0),
        }),
        institutional_activity: Some(InstitutionalActivity {
            inflows: 250.0,
            new_entities: 3,
        }),
        moat_score: Some(8.0),
        intrinsic_value_discount: Some(15.0),
        volatility: Some(25.0),
    });
    signal.sentiment = Some(SentimentContext {
        score: 0.7,
        themes: vec!["adoption".to_string(), "etf".to_string()],
    });
    signal.on_chain = Some(OnChainContext {
        exchange_balance_trend: Some(-2.0),
        entities_holding: Some(1_200),
        prev_entities_holding: Some(1_100),
    });
    signal.macro_context = Some(MacroContext {
        inflation: Some(3.1),
    });
    signal.research = Some(ResearchEvidence {
        sources: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        peer_reviewed: true,
    });
    signal.quantitative = Some(QuantitativeEvidence {
        backtest_years: Some(6),
        statistical_significance: Some(0.97),
    });
    signal
}

/// A signal with regulatory pressure, outflows and a falling trend.
pub fn bearish_signal(symbol: &str) -> TradeSignal {
    let mut signal = TradeSignal::new(symbol, -55.0, 0.6);
    signal.technical = Some(TechnicalContext {
        trend: Some("Strong Downtrend".to_string()),
    });
    signal.fundamentals = Some(Fundamentals {
        institutional_activity: Some(InstitutionalActivity {
            inflows: -400.0,
            new_entities: 0,
        }),
        moat_score: Some(2.0),
        intrinsic_value_discount: Some(-25.0),
        volatility: Some(70.0),
        ..Fundamentals::default()
    });
    signal.sentiment = Some(SentimentContext {
        score: -0.6,
        themes: vec!["SEC investigation".to_string()],
    });
    signal
}
