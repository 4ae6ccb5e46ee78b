use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, instrument, warn};

use crate::model::{ClientEvent, ServerEvent, SessionId, SessionPatch, SessionStatus};
use crate::server::{
    Connection, ConnectionRegistry, Matchmaker, SessionRepository, StoreError,
};

/// Outbound events produced while handling one inbound event, delivered
/// after the serialization guard is released.
type Outbound = Vec<(SessionId, ServerEvent)>;

/// Top-level event dispatcher.
///
/// Interprets inbound client events, drives the session state machine
/// (`Disconnected -> Waiting -> Connected` and back), and pushes the
/// resulting notifications through the connection registry. All handling is
/// serialized behind one async mutex, so every multi-session transition is
/// atomic with respect to other events. Handlers are defensive: malformed or
/// out-of-order events are logged and dropped, never fatal.
pub struct LifecycleController {
    sessions: Arc<dyn SessionRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    matchmaker: Matchmaker,
    notify_unmatched: bool,
    guard: Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        let matchmaker = Matchmaker::new(sessions.clone());
        LifecycleController {
            sessions,
            registry,
            matchmaker,
            notify_unmatched: false,
            guard: Mutex::new(()),
        }
    }

    /// Emit `no_partners_available` to a requester that could not be paired
    /// immediately. Off by default; clients then show "searching" locally.
    pub fn notify_unmatched(mut self, enabled: bool) -> Self {
        self.notify_unmatched = enabled;
        self
    }

    /// Handle one inbound event from a client's socket. `sender` is the
    /// client's outbound channel, bound to its session on `user_connected`.
    pub async fn handle_event(&self, event: ClientEvent, sender: &UnboundedSender<Message>) {
        let outbound = {
            let _serialized = self.guard.lock().await;
            let result = match event {
                ClientEvent::UserConnected { session_id } => {
                    self.on_user_connected(session_id, sender).await
                }
                ClientEvent::FindPartner {
                    session_id,
                    username,
                } => self.on_find_partner(session_id, username).await,
                ClientEvent::DisconnectPartner {
                    session_id,
                    partner_id,
                } => self.on_disconnect_partner(&session_id, &partner_id).await,
                ClientEvent::CancelConnection { session_id } => {
                    self.on_cancel_connection(&session_id).await
                }
                ClientEvent::Signal {
                    session_id,
                    partner_id,
                    signal,
                } => self.on_relay(session_id, partner_id, RelayKind::Signal(signal)).await,
                ClientEvent::SendMessage {
                    session_id,
                    partner_id,
                    message,
                } => {
                    self.on_relay(session_id, partner_id, RelayKind::Chat(message))
                        .await
                }
            };
            match result {
                Ok(outbound) => outbound,
                Err(e) => {
                    warn!(error = %e, "Event handling failed, dropping event");
                    Vec::new()
                }
            }
        };

        self.dispatch(outbound).await;
    }

    /// Synthesized by the listener when a client's socket closes without an
    /// explicit message.
    #[instrument(skip(self))]
    pub async fn handle_channel_closed(&self, session_id: &str) {
        let outbound = {
            let _serialized = self.guard.lock().await;
            match self.on_channel_closed(session_id).await {
                Ok(outbound) => outbound,
                Err(e) => {
                    warn!(error = %e, "Channel close handling failed");
                    Vec::new()
                }
            }
        };

        self.dispatch(outbound).await;
    }

    async fn dispatch(&self, outbound: Outbound) {
        for (session_id, event) in outbound {
            self.registry.send(&session_id, &event).await;
        }
    }

    async fn on_user_connected(
        &self,
        session_id: SessionId,
        sender: &UnboundedSender<Message>,
    ) -> Result<Outbound, StoreError> {
        self.registry
            .register(Connection::new(session_id.clone(), sender.clone()))
            .await?;
        self.sessions.create(&session_id).await?;
        Ok(vec![(session_id, ServerEvent::UserConnected)])
    }

    async fn on_find_partner(
        &self,
        session_id: SessionId,
        username: String,
    ) -> Result<Outbound, StoreError> {
        let Some(session) = self.sessions.get(&session_id).await? else {
            warn!(%session_id, "find_partner for unknown session");
            return Ok(Vec::new());
        };

        let mut outbound = Vec::new();

        // A requester switching partners must release the old one first so
        // no session is left behind in Connected status.
        if let Some(old_partner_id) = session.partner_id {
            outbound.extend(self.release_partner(&session_id, &old_partner_id).await?);
        }

        match self.matchmaker.find_partner(&session_id, &username).await? {
            Some(matched) => {
                outbound.push((
                    session_id.clone(),
                    ServerEvent::PartnerFound {
                        partner_id: matched.partner_id.clone(),
                        username: matched.username,
                    },
                ));
                outbound.push((
                    matched.partner_id,
                    ServerEvent::PartnerFound {
                        partner_id: session_id,
                        username: Some(username),
                    },
                ));
            }
            None => {
                if self.notify_unmatched {
                    outbound.push((session_id, ServerEvent::NoPartnersAvailable));
                }
            }
        }

        Ok(outbound)
    }

    async fn on_disconnect_partner(
        &self,
        session_id: &str,
        partner_id: &str,
    ) -> Result<Outbound, StoreError> {
        let Some(session) = self.sessions.get(session_id).await? else {
            debug!(session_id, "disconnect_partner for unknown session");
            return Ok(Vec::new());
        };
        if session.partner_id.as_deref() != Some(partner_id) {
            debug!(session_id, partner_id, "disconnect_partner for non-partner, dropping");
            return Ok(Vec::new());
        }

        let outbound = self.release_partner(session_id, partner_id).await?;
        self.sessions
            .update(
                session_id,
                SessionPatch {
                    status: Some(SessionStatus::Disconnected),
                    partner_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        // The requester initiated the split, only the partner is told.
        Ok(outbound)
    }

    async fn on_cancel_connection(&self, session_id: &str) -> Result<Outbound, StoreError> {
        let Some(session) = self.sessions.get(session_id).await? else {
            debug!(session_id, "cancel_connection for unknown session");
            return Ok(Vec::new());
        };
        if session.status != SessionStatus::Waiting {
            debug!(session_id, status = ?session.status, "cancel_connection ignored");
            return Ok(Vec::new());
        }

        self.sessions
            .update(
                session_id,
                SessionPatch {
                    status: Some(SessionStatus::Disconnected),
                    ..Default::default()
                },
            )
            .await?;
        Ok(Vec::new())
    }

    /// Forward a payload to the partner iff the sender's recorded partner
    /// matches the claimed target. Stale or forged targets are dropped so a
    /// payload can never reach a now-unrelated third party.
    async fn on_relay(
        &self,
        session_id: SessionId,
        partner_id: SessionId,
        payload: RelayKind,
    ) -> Result<Outbound, StoreError> {
        let Some(session) = self.sessions.get(&session_id).await? else {
            debug!(%session_id, "relay from unknown session, dropping");
            return Ok(Vec::new());
        };
        if session.partner_id.as_deref() != Some(partner_id.as_str()) {
            debug!(%session_id, %partner_id, "relay target is not the current partner, dropping");
            return Ok(Vec::new());
        }

        let event = match payload {
            RelayKind::Signal(signal) => ServerEvent::Signal {
                session_id,
                partner_id: partner_id.clone(),
                signal,
            },
            RelayKind::Chat(message) => ServerEvent::MessageReceived { message },
        };
        Ok(vec![(partner_id, event)])
    }

    async fn on_channel_closed(&self, session_id: &str) -> Result<Outbound, StoreError> {
        let mut outbound = Vec::new();

        if let Some(session) = self.sessions.remove(session_id).await? {
            if let Some(partner_id) = session.partner_id {
                outbound.extend(self.release_partner(session_id, &partner_id).await?);
            }
        } else {
            debug!(session_id, "channel closed for unknown session");
        }

        self.registry.unregister(session_id).await?;
        Ok(outbound)
    }

    /// Transition the partner back to `Disconnected` and queue its
    /// notification, provided it still points back at `session_id`.
    async fn release_partner(
        &self,
        session_id: &str,
        partner_id: &str,
    ) -> Result<Outbound, StoreError> {
        let Some(partner) = self.sessions.get(partner_id).await? else {
            debug!(session_id, partner_id, "partner session already gone");
            return Ok(Vec::new());
        };
        if partner.partner_id.as_deref() != Some(session_id) {
            debug!(session_id, partner_id, "pairing no longer reciprocal, skipping release");
            return Ok(Vec::new());
        }

        self.sessions
            .update(
                partner_id,
                SessionPatch {
                    status: Some(SessionStatus::Disconnected),
                    partner_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        Ok(vec![(
            partner_id.to_string(),
            ServerEvent::PartnerDisconnected,
        )])
    }
}

enum RelayKind {
    Signal(Value),
    Chat(Value),
}
