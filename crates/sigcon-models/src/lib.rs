pub mod config;
pub mod consensus;
pub mod insight;
pub mod order;
pub mod performance;
pub mod research;
pub mod signal;
pub mod trade_signal;

pub use config::{
    BufferConfig, ConfigError, ConsensusConfig, DirectorConfig, EvaluatorConfig, KernelConfig,
    OrchestratorConfig, Persona, SigconConfig, StoreConfig, TournamentConfig,
};
pub use consensus::{
    ConsensusDecision, ConsensusSummary, Discussion, EnrichedSignal, Evaluation, EvaluatorVote,
    Recommendation, SignalStrength,
};
pub use insight::{DirectorStatus, DomainAggregate, ExecutiveSummary, GlobalInsight, InsightKind};
pub use order::OrderRequest;
pub use performance::{
    AgentPerformance, MarketMove, ParticipantSignal, TradeOutcome, WeightedSignal,
};
pub use research::{ResearchCategory, ResearchRecord};
pub use signal::{RawSignal, Signal, Stance, TradeAction};
pub use trade_signal::{
    Adoption, Fundamentals, InstitutionalActivity, MacroContext, OnChainContext,
    QuantitativeEvidence, ResearchEvidence, SentimentContext, TechnicalContext, TradeSignal,
};
