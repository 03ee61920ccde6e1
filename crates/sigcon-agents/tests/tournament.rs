//! Tournament runs with persona participants and mixed collaborators.

use std::sync::Arc;

use sigcon_agents::test_support::{
    bearish_signal, bullish_signal, FailingParticipant, FixedOutcomes, ScriptedParticipant,
};
use sigcon_agents::tournament::WEIGHT_EPSILON;
use sigcon_agents::{
    persona_evaluator, EvaluatorParticipant, PerformanceTracker, SimulatedMarket,
    TournamentParticipant, Watchlist,
};
use sigcon_models::config::{Persona, TournamentConfig};
use sigcon_models::performance::ParticipantSignal;
use sigcon_models::signal::TradeAction;

fn assert_conserved(tracker: &PerformanceTracker, min_weight: f64) {
    let weights = tracker.weights();
    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    assert!((sum - 1.0).abs() < WEIGHT_EPSILON, "sum was {sum}");
    for (id, weight) in weights {
        assert!(weight >= min_weight - WEIGHT_EPSILON, "{id} fell to {weight}");
    }
}

fn caller(id: &str, symbol: &str, action: TradeAction) -> Arc<dyn TournamentParticipant> {
    Arc::new(ScriptedParticipant::new(
        id,
        vec![ParticipantSignal {
            symbol: symbol.to_string(),
            action,
            confidence: 0.7,
        }],
    ))
}

#[tokio::test]
async fn ranked_pnl_shifts_weight_to_the_leader() {
    let config = TournamentConfig {
        initial_weight: 0.33,
        ..TournamentConfig::default()
    };
    let outcomes = FixedOutcomes::new([("X", true, 100.0), ("Y", true, 50.0), ("Z", false, 20.0)]);
    let tracker = PerformanceTracker::new(config.clone(), Arc::new(outcomes));
    tracker.register(caller("a", "X", TradeAction::Buy));
    tracker.register(caller("b", "Y", TradeAction::Buy));
    tracker.register(caller("c", "Z", TradeAction::Buy));

    let report = tracker.run_cycle().await.unwrap();
    assert!(!report.rebalanced);
    assert_eq!(report.outcomes.len(), 3);

    assert!(tracker.rebalance());
    let a = tracker.weight("a").unwrap();
    let b = tracker.weight("b").unwrap();
    let c = tracker.weight("c").unwrap();
    assert!((a - 0.37 / 0.99).abs() < 1e-9);
    assert!((b - 0.33 / 0.99).abs() < 1e-9);
    assert!((c - 0.29 / 0.99).abs() < 1e-9);
    assert!(a > b && b > c);
    assert_conserved(&tracker, config.min_weight);

    let board: Vec<String> = tracker.leaderboard().into_iter().map(|p| p.id).collect();
    assert_eq!(board, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn failing_participant_sits_out_the_cycle() {
    let outcomes = FixedOutcomes::new([("X", true, 2.0)]);
    let tracker = PerformanceTracker::new(TournamentConfig::default(), Arc::new(outcomes));
    tracker.register(caller("steady", "X", TradeAction::Buy));
    tracker.register(Arc::new(FailingParticipant::new("broken")));
    tracker.start();

    let report = tracker.run_cycle().await.unwrap();
    assert_eq!(report.signals.len(), 1);
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].success);

    let broken = tracker.performance("broken").unwrap();
    assert_eq!(broken.trades, 0);
    let steady = tracker.performance("steady").unwrap();
    assert_eq!(steady.wins, 1);
    assert!((steady.pnl - 2.0).abs() < 1e-12);

    // A losing record is never pushed under the floor.
    tracker.rebalance();
    assert_conserved(&tracker, TournamentConfig::default().min_weight);
}

#[tokio::test]
async fn persona_tournament_keeps_weights_conserved() {
    let config = TournamentConfig {
        min_weight: 0.1,
        ..TournamentConfig::default()
    };
    let watchlist = Arc::new(Watchlist::new());
    watchlist.observe(bullish_signal("BTC"));
    watchlist.observe(bearish_signal("JPM"));

    let tracker = PerformanceTracker::new(config.clone(), Arc::new(SimulatedMarket::seeded(42)));
    for persona in Persona::ALL {
        tracker.register(Arc::new(EvaluatorParticipant::new(
            persona_evaluator(persona),
            watchlist.clone(),
        )));
    }
    tracker.start();
    assert_conserved(&tracker, config.min_weight);

    for _ in 0..10 {
        let report = tracker.run_cycle().await.unwrap();
        // Every persona calls every watched symbol.
        assert_eq!(report.signals.len(), Persona::ALL.len() * watchlist.len());
        tracker.rebalance();
        assert_conserved(&tracker, config.min_weight);
    }

    let board = tracker.leaderboard();
    assert_eq!(board.len(), Persona::ALL.len());
    assert!(board.windows(2).all(|w| w[0].pnl >= w[1].pnl));
    // The Bitcoin maximalist always buys BTC.
    let monetary = tracker.performance(Persona::MonetaryNetwork.id()).unwrap();
    assert!(monetary.trades >= 10);
}

#[tokio::test]
async fn manual_adjustment_of_unknown_agent_is_rejected() {
    let tracker = PerformanceTracker::new(
        TournamentConfig::default(),
        Arc::new(FixedOutcomes::default()),
    );
    tracker.register(caller("a", "X", TradeAction::Buy));
    tracker.register(caller("b", "X", TradeAction::Sell));
    tracker.start();

    assert!(tracker.manual_adjust_weight("ghost", 0.1).is_err());
    let raised = tracker.manual_adjust_weight("a", 0.2).unwrap();
    assert!(raised > tracker.weight("b").unwrap());
    assert_conserved(&tracker, TournamentConfig::default().min_weight);
}
