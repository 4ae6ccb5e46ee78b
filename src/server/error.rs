use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
