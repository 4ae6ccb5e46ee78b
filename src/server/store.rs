use async_trait::async_trait;

use crate::model::{Session, SessionPatch};
use crate::server::StoreError;

/// Gauge of the current session population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCounts {
    pub active: usize,
    pub waiting: usize,
    pub connected: usize,
}

/// Storage for per-participant session state.
///
/// Individual operations are atomic; serialization of whole inbound events
/// is the lifecycle controller's responsibility.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new `Disconnected` session. No-op if the id already exists,
    /// so a client reconnecting with the same id keeps its state.
    async fn create(&self, session_id: &str) -> Result<(), StoreError>;

    async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Atomically merge a partial update into the session.
    async fn update(&self, session_id: &str, patch: SessionPatch) -> Result<(), StoreError>;

    /// Delete the session, returning it so the caller can resolve any
    /// live partnership.
    async fn remove(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// First session in insertion order that is `Waiting`, unpaired, and
    /// not the excluded requester.
    async fn find_waiting_partner(&self, exclude: &str) -> Result<Option<Session>, StoreError>;

    /// Atomically transition both sessions to `Connected` with reciprocal
    /// partner references.
    async fn pair(&self, session_id: &str, partner_id: &str) -> Result<(), StoreError>;

    async fn counts(&self) -> Result<SessionCounts, StoreError>;
}
