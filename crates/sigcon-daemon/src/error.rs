use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid core configuration: {0}")]
    InvalidCore(#[from] sigcon_models::config::ConfigError),

    #[error("Agent error: {0}")]
    Agent(#[from] sigcon_agents::AgentError),

    #[error("Store error: {0}")]
    Store(#[from] sigcon_store::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
