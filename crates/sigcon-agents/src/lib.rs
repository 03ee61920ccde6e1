pub mod buffer;
pub mod consensus;
pub mod director;
pub mod error;
pub mod evaluator;
pub mod feed;
pub mod kernel;
pub mod orchestrator;
pub mod stats;
pub mod tournament;

pub mod test_support;

pub use buffer::SignalBuffer;
pub use consensus::{calculate_consensus, Ballot, ConsensusCoordinator};
pub use director::{aggregate_signals, DirectorAgent};
pub use error::AgentError;
pub use evaluator::{
    persona_evaluator, Evaluator, InnovationEvaluator, InstitutionalEvaluator,
    MonetaryNetworkEvaluator, ValueEvaluator,
};
pub use feed::{FeedAgent, FeedSource};
pub use kernel::{detect_insights, merge_insights, KernelAgent};
pub use orchestrator::{AssetCategory, SignalOrchestrator};
pub use tournament::{
    renormalize, CycleReport, EvaluatorParticipant, OutcomeSource, PerformanceTracker,
    SimulatedMarket, TournamentParticipant, Watchlist,
};
