use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, instrument};

use crate::model::{ServerEvent, Session, SessionId, SessionPatch, SessionStatus};
use crate::server::{
    Connection, ConnectionRegistry, SessionCounts, SessionRepository, StoreError,
};

#[derive(Default)]
struct SessionMap {
    sessions: HashMap<SessionId, Session>,
    /// Insertion order of live sessions; matching scans this so the longest
    /// connected waiting participant is found first.
    order: Vec<SessionId>,
}

/// In-memory realization of both the session repository and the connection
/// registry.
pub struct MemoryStorage {
    state: Arc<RwLock<SessionMap>>,
    connections: Arc<RwLock<HashMap<SessionId, Connection>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionMap::default())),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for MemoryStorage {
    #[instrument(skip(self))]
    async fn create(&self, session_id: &str) -> Result<(), StoreError> {
        match self.state.write() {
            Ok(mut state) => {
                if state.sessions.contains_key(session_id) {
                    debug!(session_id, "Session already exists, keeping state");
                    return Ok(());
                }
                state
                    .sessions
                    .insert(session_id.to_string(), Session::new(session_id));
                state.order.push(session_id.to_string());
                debug!(session_id, "Session created");
                Ok(())
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        match self.state.read() {
            Ok(state) => Ok(state.sessions.get(session_id).cloned()),
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, session_id: &str, patch: SessionPatch) -> Result<(), StoreError> {
        match self.state.write() {
            Ok(mut state) => match state.sessions.get_mut(session_id) {
                Some(session) => {
                    session.apply(patch);
                    Ok(())
                }
                None => Err(StoreError::SessionNotFound(session_id.to_string())),
            },
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn remove(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        match self.state.write() {
            Ok(mut state) => {
                let removed = state.sessions.remove(session_id);
                if removed.is_some() {
                    state.order.retain(|id| id != session_id);
                    debug!(session_id, "Session removed");
                }
                Ok(removed)
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    async fn find_waiting_partner(&self, exclude: &str) -> Result<Option<Session>, StoreError> {
        match self.state.read() {
            Ok(state) => {
                let partner = state
                    .order
                    .iter()
                    .filter_map(|id| state.sessions.get(id))
                    .find(|session| {
                        session.session_id != exclude
                            && session.status == SessionStatus::Waiting
                            && session.partner_id.is_none()
                    })
                    .cloned();
                Ok(partner)
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn pair(&self, session_id: &str, partner_id: &str) -> Result<(), StoreError> {
        match self.state.write() {
            Ok(mut state) => {
                if !state.sessions.contains_key(session_id) {
                    return Err(StoreError::SessionNotFound(session_id.to_string()));
                }
                if !state.sessions.contains_key(partner_id) {
                    return Err(StoreError::SessionNotFound(partner_id.to_string()));
                }
                // Both sessions verified above, so the pairing is applied in
                // full or not at all.
                if let Some(session) = state.sessions.get_mut(session_id) {
                    session.status = SessionStatus::Connected;
                    session.partner_id = Some(partner_id.to_string());
                }
                if let Some(partner) = state.sessions.get_mut(partner_id) {
                    partner.status = SessionStatus::Connected;
                    partner.partner_id = Some(session_id.to_string());
                }
                debug!(session_id, partner_id, "Sessions paired");
                Ok(())
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    async fn counts(&self) -> Result<SessionCounts, StoreError> {
        match self.state.read() {
            Ok(state) => {
                let mut counts = SessionCounts {
                    active: state.sessions.len(),
                    ..Default::default()
                };
                for session in state.sessions.values() {
                    match session.status {
                        SessionStatus::Waiting => counts.waiting += 1,
                        SessionStatus::Connected => counts.connected += 1,
                        SessionStatus::Disconnected => {}
                    }
                }
                Ok(counts)
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }
}

#[async_trait]
impl ConnectionRegistry for MemoryStorage {
    #[instrument(skip(self, connection), fields(session_id = %connection.session_id))]
    async fn register(&self, connection: Connection) -> Result<(), StoreError> {
        match self.connections.write() {
            Ok(mut connections) => {
                connections.insert(connection.session_id.clone(), connection);
                Ok(())
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }

    async fn send(&self, session_id: &str, event: &ServerEvent) {
        let serialized = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!(session_id, error = %e, "Failed to serialize event");
                return;
            }
        };

        // Clone the sender out so the lock is never held across the send.
        let sender = match self.connections.read() {
            Ok(connections) => connections.get(session_id).map(|c| c.sender.clone()),
            Err(e) => {
                error!(session_id, error = %e, "Connection lock poisoned");
                return;
            }
        };

        match sender {
            Some(sender) => {
                if sender.send(Message::Text(serialized.into())).is_err() {
                    debug!(session_id, "Channel closed, dropping event");
                }
            }
            None => {
                debug!(session_id, "No channel registered, dropping event");
            }
        }
    }

    #[instrument(skip(self))]
    async fn unregister(&self, session_id: &str) -> Result<(), StoreError> {
        match self.connections.write() {
            Ok(mut connections) => {
                connections.remove(session_id);
                Ok(())
            }
            Err(e) => Err(StoreError::LockPoisoned(e.to_string())),
        }
    }
}
