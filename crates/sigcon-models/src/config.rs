use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{0} must be greater than zero")]
    Zero(String),

    #[error("duplicate director name: {0}")]
    DuplicateDirector(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the aggregation and consensus core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SigconConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub directors: Vec<DirectorConfig>,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub tournament: TournamentConfig,
}

/// Where research output is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// SQLite file for research records. In-memory repository when absent.
    #[serde(default)]
    pub sqlite_path: Option<String>,
    #[serde(default = "default_memory_capacity")]
    pub memory_max_capacity: u64,
    /// How long in-memory records live, in seconds.
    #[serde(default = "default_memory_ttl")]
    pub memory_ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            memory_max_capacity: default_memory_capacity(),
            memory_ttl_seconds: default_memory_ttl(),
        }
    }
}

/// Feed-level buffering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferConfig {
    #[serde(default = "default_signal_threshold")]
    pub signal_threshold: f64,
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
    /// Timeout for a single feed fetch, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            signal_threshold: default_signal_threshold(),
            max_buffer_size: default_max_buffer_size(),
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectorConfig {
    pub name: String,
    pub domain: String,
    /// Drop topic groups backed by a single signal.
    #[serde(default)]
    pub consensus_required: bool,
    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,
    #[serde(default = "default_signal_threshold")]
    pub signal_threshold: f64,
}

impl DirectorConfig {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            consensus_required: false,
            correlation_threshold: default_correlation_threshold(),
            signal_threshold: default_signal_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelConfig {
    #[serde(default = "default_kernel_threshold")]
    pub signal_threshold: f64,
    #[serde(default = "default_cross_domain_threshold")]
    pub cross_domain_threshold: f64,
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,
    #[serde(default = "default_high_priority_priority")]
    pub high_priority_min_priority: u8,
    #[serde(default = "default_high_priority_strength")]
    pub high_priority_min_strength: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            signal_threshold: default_kernel_threshold(),
            cross_domain_threshold: default_cross_domain_threshold(),
            max_insights: default_max_insights(),
            high_priority_min_priority: default_high_priority_priority(),
            high_priority_min_strength: default_high_priority_strength(),
        }
    }
}

/// The four investment philosophies available as evaluators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Innovation,
    MonetaryNetwork,
    Institutional,
    Value,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Innovation,
        Persona::MonetaryNetwork,
        Persona::Institutional,
        Persona::Value,
    ];

    /// Stable identifier, also used as the evaluator's name.
    pub fn id(self) -> &'static str {
        match self {
            Persona::Innovation => "innovation",
            Persona::MonetaryNetwork => "monetary_network",
            Persona::Institutional => "institutional",
            Persona::Value => "value",
        }
    }

    /// Weight used when a persona is registered without one.
    pub fn default_weight(self) -> f64 {
        match self {
            Persona::Innovation => 85.0,
            Persona::MonetaryNetwork => 90.0,
            Persona::Institutional => 70.0,
            Persona::Value => 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorConfig {
    pub persona: Persona,
    /// Voting weight, 0 to 100.
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusConfig {
    /// Agreement needed for a decision to count as consensus.
    #[serde(default = "default_required_consensus")]
    pub required_consensus: f64,
    /// Minimum evaluation confidence for a vote to be counted.
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: f64,
    #[serde(default = "default_evaluators")]
    pub evaluators: Vec<EvaluatorConfig>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            required_consensus: default_required_consensus(),
            vote_threshold: default_vote_threshold(),
            evaluators: default_evaluators(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    /// Signals at or above this confidence skip the panel entirely.
    #[serde(default = "default_bypass_threshold")]
    pub bypass_consensus_threshold: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bypass_consensus_threshold: default_bypass_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TournamentConfig {
    #[serde(default = "default_rebalance_period")]
    pub rebalance_period_seconds: u64,
    #[serde(default = "default_max_weight_delta")]
    pub max_weight_delta: f64,
    #[serde(default = "default_initial_weight")]
    pub initial_weight: f64,
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: f64,
    #[serde(default = "default_true")]
    pub enable_rebalancing: bool,
    #[serde(default = "default_decay")]
    pub performance_decay_factor: f64,
    /// Timeout for one participant's signal collection, in seconds.
    #[serde(default = "default_collect_timeout")]
    pub collect_timeout_seconds: u64,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            rebalance_period_seconds: default_rebalance_period(),
            max_weight_delta: default_max_weight_delta(),
            initial_weight: default_initial_weight(),
            min_weight: default_min_weight(),
            adjustment_factor: default_adjustment_factor(),
            enable_rebalancing: true,
            performance_decay_factor: default_decay(),
            collect_timeout_seconds: default_collect_timeout(),
        }
    }
}

impl SigconConfig {
    /// Reject configurations the core cannot run with. This is the only
    /// fatal error class; everything past startup degrades instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit("buffer.signal_threshold", self.buffer.signal_threshold)?;
        if self.buffer.max_buffer_size == 0 {
            return Err(ConfigError::Zero("buffer.max_buffer_size".into()));
        }

        let mut names = HashSet::new();
        for director in &self.directors {
            if director.name.is_empty() || director.domain.is_empty() {
                return Err(ConfigError::Invalid(
                    "directors need a name and a domain".into(),
                ));
            }
            if !names.insert(director.name.as_str()) {
                return Err(ConfigError::DuplicateDirector(director.name.clone()));
            }
            unit("directors.signal_threshold", director.signal_threshold)?;
            unit(
                "directors.correlation_threshold",
                director.correlation_threshold,
            )?;
        }

        unit("kernel.signal_threshold", self.kernel.signal_threshold)?;
        unit(
            "kernel.cross_domain_threshold",
            self.kernel.cross_domain_threshold,
        )?;
        unit(
            "kernel.high_priority_min_strength",
            self.kernel.high_priority_min_strength,
        )?;
        if self.kernel.max_insights == 0 {
            return Err(ConfigError::Zero("kernel.max_insights".into()));
        }
        range(
            "kernel.high_priority_min_priority",
            f64::from(self.kernel.high_priority_min_priority),
            1.0,
            10.0,
        )?;

        unit(
            "consensus.required_consensus",
            self.consensus.required_consensus,
        )?;
        unit("consensus.vote_threshold", self.consensus.vote_threshold)?;
        for evaluator in &self.consensus.evaluators {
            range("consensus.evaluators.weight", evaluator.weight, 0.0, 100.0)?;
        }

        unit(
            "orchestrator.bypass_consensus_threshold",
            self.orchestrator.bypass_consensus_threshold,
        )?;

        let t = &self.tournament;
        if t.min_weight <= 0.0 {
            return Err(ConfigError::Zero("tournament.min_weight".into()));
        }
        unit("tournament.initial_weight", t.initial_weight)?;
        if t.min_weight > t.initial_weight {
            return Err(ConfigError::Invalid(format!(
                "tournament.min_weight ({}) exceeds tournament.initial_weight ({})",
                t.min_weight, t.initial_weight
            )));
        }
        unit("tournament.max_weight_delta", t.max_weight_delta)?;
        unit("tournament.adjustment_factor", t.adjustment_factor)?;
        if t.performance_decay_factor <= 0.0 {
            return Err(ConfigError::Zero(
                "tournament.performance_decay_factor".into(),
            ));
        }
        unit(
            "tournament.performance_decay_factor",
            t.performance_decay_factor,
        )?;
        if t.rebalance_period_seconds == 0 {
            return Err(ConfigError::Zero(
                "tournament.rebalance_period_seconds".into(),
            ));
        }
        Ok(())
    }
}

fn unit(field: &str, value: f64) -> Result<(), ConfigError> {
    range(field, value, 0.0, 1.0)
}

fn range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        })
    }
}

fn default_memory_capacity() -> u64 {
    1000
}
fn default_memory_ttl() -> u64 {
    3600
}
fn default_signal_threshold() -> f64 {
    0.5
}
fn default_max_buffer_size() -> usize {
    100
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_correlation_threshold() -> f64 {
    0.6
}
fn default_kernel_threshold() -> f64 {
    0.7
}
fn default_cross_domain_threshold() -> f64 {
    0.65
}
fn default_max_insights() -> usize {
    10
}
fn default_high_priority_priority() -> u8 {
    8
}
fn default_high_priority_strength() -> f64 {
    0.8
}
fn default_required_consensus() -> f64 {
    0.6
}
fn default_vote_threshold() -> f64 {
    0.65
}
fn default_evaluators() -> Vec<EvaluatorConfig> {
    Persona::ALL
        .iter()
        .map(|&persona| EvaluatorConfig {
            persona,
            weight: persona.default_weight(),
            enabled: true,
        })
        .collect()
}
fn default_bypass_threshold() -> f64 {
    0.9
}
fn default_rebalance_period() -> u64 {
    3600
}
fn default_max_weight_delta() -> f64 {
    0.05
}
fn default_initial_weight() -> f64 {
    0.2
}
fn default_min_weight() -> f64 {
    0.05
}
fn default_adjustment_factor() -> f64 {
    0.8
}
fn default_decay() -> f64 {
    0.9
}
fn default_collect_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SigconConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consensus.evaluators.len(), 4);
        assert_eq!(config.kernel.max_insights, 10);
        assert_eq!(config.tournament.rebalance_period_seconds, 3600);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: SigconConfig = toml::from_str("").unwrap();
        assert_eq!(config, SigconConfig::default());
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[store]
sqlite_path = "/tmp/research.db"

[buffer]
signal_threshold = 0.4
max_buffer_size = 50

[[directors]]
name = "markets"
domain = "market"
consensus_required = true

[[directors]]
name = "economy"
domain = "macro"

[kernel]
max_insights = 5

[consensus]
vote_threshold = 0.7

[[consensus.evaluators]]
persona = "monetary_network"
weight = 95

[[consensus.evaluators]]
persona = "value"
weight = 40
enabled = false

[tournament]
min_weight = 0.1
"#;
        let config: SigconConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.sqlite_path.as_deref(), Some("/tmp/research.db"));
        assert_eq!(config.buffer.max_buffer_size, 50);
        assert_eq!(config.directors.len(), 2);
        assert!(config.directors[0].consensus_required);
        assert_eq!(config.directors[1].signal_threshold, 0.5);
        assert_eq!(config.kernel.max_insights, 5);
        assert_eq!(config.kernel.cross_domain_threshold, 0.65);
        assert_eq!(config.consensus.evaluators.len(), 2);
        assert_eq!(config.consensus.evaluators[0].persona, Persona::MonetaryNetwork);
        assert!(!config.consensus.evaluators[1].enabled);
        assert_eq!(config.tournament.min_weight, 0.1);
        assert_eq!(config.tournament.initial_weight, 0.2);
    }

    #[test]
    fn unknown_persona_is_rejected() {
        let toml_str = r#"
[[consensus.evaluators]]
persona = "astrologer"
weight = 50
"#;
        assert!(toml::from_str::<SigconConfig>(toml_str).is_err());
    }

    #[test]
    fn threshold_out_of_range() {
        let mut config = SigconConfig::default();
        config.consensus.vote_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "consensus.vote_threshold"
        ));
    }

    #[test]
    fn duplicate_directors() {
        let mut config = SigconConfig::default();
        config.directors = vec![
            DirectorConfig::new("markets", "market"),
            DirectorConfig::new("markets", "macro"),
        ];
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateDirector("markets".to_string()))
        );
    }

    #[test]
    fn min_weight_above_initial() {
        let mut config = SigconConfig::default();
        config.tournament.min_weight = 0.3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_buffer_rejected() {
        let mut config = SigconConfig::default();
        config.buffer.max_buffer_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("buffer.max_buffer_size".to_string()))
        );
    }

    #[test]
    fn evaluator_weight_range() {
        let mut config = SigconConfig::default();
        config.consensus.evaluators[0].weight = 120.0;
        assert!(config.validate().is_err());
    }
}
