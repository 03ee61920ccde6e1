use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Cycle already in progress: {0}")]
    CycleInProgress(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Store error: {0}")]
    Store(#[from] sigcon_store::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
