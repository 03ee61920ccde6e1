use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sigcon_agents::kernel::KERNEL_NAME;
use sigcon_agents::{
    persona_evaluator, AgentError, ConsensusCoordinator, DirectorAgent, EvaluatorParticipant,
    FeedAgent, KernelAgent, PerformanceTracker, SignalOrchestrator, SimulatedMarket, Watchlist,
};
use sigcon_models::consensus::EnrichedSignal;
use sigcon_models::insight::GlobalInsight;
use sigcon_models::trade_signal::TradeSignal;
use sigcon_store::ResearchRepository;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::sources::SpoolFeed;

/// Every agent the daemon schedules, wired together once at startup.
pub struct Pipeline {
    feeds: Vec<Arc<FeedAgent>>,
    directors: Vec<Arc<DirectorAgent>>,
    kernel: Arc<KernelAgent>,
    orchestrator: Arc<SignalOrchestrator>,
    watchlist: Arc<Watchlist>,
    tracker: Arc<PerformanceTracker>,
    route_min_priority: u8,
}

impl Pipeline {
    /// Build the hierarchy and panel from a validated config.
    pub fn build(
        config: &DaemonConfig,
        repository: Arc<dyn ResearchRepository>,
    ) -> Result<Self, DaemonError> {
        config.validate()?;
        let core = &config.core;

        let kernel = Arc::new(KernelAgent::new(
            core.kernel.clone(),
            core.buffer.max_buffer_size,
            repository.clone(),
        ));

        let directors: Vec<Arc<DirectorAgent>> = core
            .directors
            .iter()
            .map(|d| {
                Arc::new(DirectorAgent::new(
                    d.clone(),
                    core.buffer.max_buffer_size,
                    repository.clone(),
                ))
            })
            .collect();
        for director in &directors {
            kernel.register_director(director.clone());
        }

        let mut feeds = Vec::new();
        for feed_config in &config.feeds {
            let director = directors
                .iter()
                .find(|d| d.name() == feed_config.director)
                .ok_or_else(|| {
                    DaemonError::Config(format!("unknown director {}", feed_config.director))
                })?;
            let feed = Arc::new(FeedAgent::new(
                Box::new(SpoolFeed::new(
                    feed_config.name.clone(),
                    feed_config.domain.clone(),
                    feed_config.spool_dir.clone(),
                )),
                &core.buffer,
            ));
            director.register_feed(feed.clone());
            feeds.push(feed);
        }

        let coordinator = Arc::new(ConsensusCoordinator::from_config(&core.consensus, repository));
        let orchestrator = Arc::new(SignalOrchestrator::new(
            coordinator,
            core.orchestrator.bypass_consensus_threshold,
        ));

        let watchlist = Arc::new(Watchlist::new());
        let tracker = Arc::new(PerformanceTracker::new(
            core.tournament.clone(),
            Arc::new(SimulatedMarket::new()),
        ));
        for seat in core.consensus.evaluators.iter().filter(|e| e.enabled) {
            tracker.register(Arc::new(EvaluatorParticipant::new(
                persona_evaluator(seat.persona),
                watchlist.clone(),
            )));
        }

        Ok(Self {
            feeds,
            directors,
            kernel,
            orchestrator,
            watchlist,
            tracker,
            route_min_priority: core.kernel.high_priority_min_priority,
        })
    }

    pub fn feeds(&self) -> &[Arc<FeedAgent>] {
        &self.feeds
    }

    pub fn directors(&self) -> &[Arc<DirectorAgent>] {
        &self.directors
    }

    pub fn kernel(&self) -> &Arc<KernelAgent> {
        &self.kernel
    }

    pub fn watchlist(&self) -> &Arc<Watchlist> {
        &self.watchlist
    }

    pub fn tracker(&self) -> &Arc<PerformanceTracker> {
        &self.tracker
    }

    /// Poll every feed once. Returns how many signals were buffered.
    pub async fn poll_feeds(&self) -> usize {
        let mut total = 0;
        for feed in &self.feeds {
            match feed.poll().await {
                Ok(added) => total += added,
                Err(AgentError::CycleInProgress(_)) => {
                    debug!(feed = %feed.name(), "Feed poll already running, skipping");
                }
                Err(e) => warn!(feed = %feed.name(), error = %e, "Feed poll failed"),
            }
        }
        total
    }

    /// Run every director once. Returns how many aggregates were produced.
    pub async fn run_directors(&self) -> usize {
        let mut total = 0;
        for director in &self.directors {
            match director.run_cycle().await {
                Ok(aggregates) => total += aggregates.len(),
                Err(AgentError::CycleInProgress(_)) => {
                    debug!(director = %director.name(), "Director cycle already running, skipping");
                }
                Err(e) => warn!(director = %director.name(), error = %e, "Director cycle failed"),
            }
        }
        total
    }

    /// Run the kernel once and push its urgent insights through the panel.
    /// Routed signals land on the tournament watchlist.
    pub async fn run_kernel(&self) -> Result<Vec<EnrichedSignal>, AgentError> {
        let insights = self.kernel.run_cycle().await?;
        if insights.is_empty() {
            return Ok(Vec::new());
        }
        let summary = self.kernel.generate_executive_summary().await;
        debug!(top = summary.top_insights.len(), "Executive summary refreshed");
        Ok(self.route_insights(&insights).await)
    }

    async fn route_insights(&self, insights: &[GlobalInsight]) -> Vec<EnrichedSignal> {
        let mut routed = Vec::new();
        for insight in insights.iter().filter(|i| i.priority >= self.route_min_priority) {
            let signal = TradeSignal::from(&insight.to_signal(KERNEL_NAME));
            let enriched = self.orchestrator.process_signal(signal).await;
            info!(
                topic = %insight.topic,
                kind = insight.kind.as_str(),
                overall_signal = enriched.overall_signal,
                recommendation = ?enriched.recommended_action,
                "Insight routed to consensus"
            );
            let mut watched = enriched.signal.clone();
            watched.overall_signal = enriched.overall_signal;
            self.watchlist.observe(watched);
            routed.push(enriched);
        }
        routed
    }

    /// One tournament cycle, skipped while the tournament is stopped.
    pub async fn run_trading_cycle(&self) {
        if !self.tracker.is_running() {
            debug!("Tournament not running, skipping trading cycle");
            return;
        }
        if self.watchlist.is_empty() {
            debug!("Watchlist empty, skipping trading cycle");
            return;
        }
        match self.tracker.run_cycle().await {
            Ok(report) => debug!(
                signals = report.signals.len(),
                settled = report.outcomes.len(),
                rebalanced = report.rebalanced,
                "Trading cycle finished"
            ),
            Err(AgentError::CycleInProgress(_)) => debug!("Trading cycle already running, skipping"),
            Err(e) => warn!(error = %e, "Trading cycle failed"),
        }
    }
}

/// The signal daemon. Runs feed polling, director and kernel cycles, and the
/// tournament on independent timers until cancelled.
pub struct Daemon {
    config: DaemonConfig,
    pipeline: Arc<Pipeline>,
    cancel: CancellationToken,
}

impl Daemon {
    pub fn new(
        config: DaemonConfig,
        repository: Arc<dyn ResearchRepository>,
    ) -> Result<Self, DaemonError> {
        let pipeline = Arc::new(Pipeline::build(&config, repository)?);
        Ok(Self {
            config,
            pipeline,
            cancel: CancellationToken::new(),
        })
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Run the daemon until cancelled. In-flight cycles finish before their
    /// loop exits.
    pub async fn run(&self) -> Result<(), DaemonError> {
        info!(
            feeds = self.pipeline.feeds.len(),
            directors = self.pipeline.directors.len(),
            "Signal daemon starting"
        );
        self.pipeline.tracker.start();

        let schedule = &self.config.schedule;
        let mut join_set = tokio::task::JoinSet::new();

        let pipeline = self.pipeline.clone();
        join_set.spawn(every(
            "feed poll",
            schedule.feed_poll_seconds,
            self.cancel.clone(),
            move || {
                let pipeline = pipeline.clone();
                async move {
                    let added = pipeline.poll_feeds().await;
                    debug!(added, "Feeds polled");
                }
            },
        ));

        let pipeline = self.pipeline.clone();
        join_set.spawn(every(
            "director",
            schedule.director_interval_seconds,
            self.cancel.clone(),
            move || {
                let pipeline = pipeline.clone();
                async move {
                    let aggregates = pipeline.run_directors().await;
                    debug!(aggregates, "Director cycles finished");
                }
            },
        ));

        let pipeline = self.pipeline.clone();
        join_set.spawn(every(
            "kernel",
            schedule.kernel_interval_seconds,
            self.cancel.clone(),
            move || {
                let pipeline = pipeline.clone();
                async move {
                    match pipeline.run_kernel().await {
                        Ok(routed) => debug!(routed = routed.len(), "Kernel cycle finished"),
                        Err(AgentError::CycleInProgress(_)) => {
                            debug!("Kernel cycle already running, skipping")
                        }
                        Err(e) => warn!(error = %e, "Kernel cycle failed"),
                    }
                }
            },
        ));

        let pipeline = self.pipeline.clone();
        join_set.spawn(every(
            "trading",
            schedule.trading_cycle_seconds,
            self.cancel.clone(),
            move || {
                let pipeline = pipeline.clone();
                async move { pipeline.run_trading_cycle().await }
            },
        ));

        info!("All daemon loops started");

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Daemon loop panicked");
            }
        }

        self.pipeline.tracker.stop();
        info!("Signal daemon stopped");
        Ok(())
    }
}

/// Run `tick` immediately and then every `secs` seconds until cancelled.
/// Ticks missed while a cycle overran are skipped, not replayed.
async fn every<F, Fut>(name: &'static str, secs: u64, cancel: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let mut interval = tokio::time::interval(Duration::from_secs(secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(name, "Loop shutting down");
                break;
            }
            _ = interval.tick() => {
                tick().await;
            }
        }
    }
}
