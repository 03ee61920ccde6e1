//! SIGCON - Signal aggregation and consensus
//!
//! Feed, Director and Kernel agents condense raw signals into cross-domain
//! insights; a panel of persona evaluators votes on trade signals, and a
//! tournament shifts voting weight toward the personas that trade best.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use sigcon::models::trade_signal::TradeSignal;
//! use sigcon::models::config::SigconConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = SigconConfig::default();
//! let orchestrator = sigcon::build_orchestrator(&config)?;
//! let enriched = sigcon::evaluate(&orchestrator, TradeSignal::new("BTC", 40.0, 0.7)).await;
//! println!("{:?}", enriched.recommended_action);
//! # Ok(())
//! # }
//! ```

pub use sigcon_agents as agents;
pub use sigcon_models as models;
pub use sigcon_store as store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sigcon_agents::{ConsensusCoordinator, SignalOrchestrator};
use sigcon_models::config::{SigconConfig, StoreConfig};
use sigcon_models::consensus::EnrichedSignal;
use sigcon_models::trade_signal::TradeSignal;
use sigcon_store::{MemoryRepository, ResearchRepository, SqliteRepository};
use tracing::info;

/// Open the research repository described by `config`: SQLite when a path is
/// set, otherwise a bounded in-memory store.
pub fn open_repository(config: &StoreConfig) -> Result<Arc<dyn ResearchRepository>, anyhow::Error> {
    match &config.sqlite_path {
        Some(path) => {
            let sqlite = SqliteRepository::open(path)
                .with_context(|| format!("Failed to open research store: {path}"))?;
            info!(path = %path, "Research store opened");
            Ok(Arc::new(sqlite))
        }
        None => {
            info!(
                capacity = config.memory_max_capacity,
                ttl_secs = config.memory_ttl_seconds,
                "Using in-memory research store"
            );
            Ok(Arc::new(MemoryRepository::new(
                config.memory_max_capacity,
                Duration::from_secs(config.memory_ttl_seconds),
            )))
        }
    }
}

/// Build a SignalOrchestrator from configuration, with its own repository.
pub fn build_orchestrator(config: &SigconConfig) -> Result<SignalOrchestrator, anyhow::Error> {
    let repository = open_repository(&config.store)?;
    build_orchestrator_with(config, repository)
}

/// Build a SignalOrchestrator that persists into an existing repository.
pub fn build_orchestrator_with(
    config: &SigconConfig,
    repository: Arc<dyn ResearchRepository>,
) -> Result<SignalOrchestrator, anyhow::Error> {
    config.validate().context("Invalid configuration")?;
    let coordinator = Arc::new(ConsensusCoordinator::from_config(&config.consensus, repository));
    Ok(SignalOrchestrator::new(
        coordinator,
        config.orchestrator.bypass_consensus_threshold,
    ))
}

/// Run one trade signal through the orchestrator.
pub async fn evaluate(orchestrator: &SignalOrchestrator, signal: TradeSignal) -> EnrichedSignal {
    orchestrator.process_signal(signal).await
}
