use std::sync::Arc;

use tracing::{debug, instrument};

use crate::model::{SessionId, SessionPatch, SessionStatus};
use crate::server::{SessionRepository, StoreError};

/// Outcome of a successful pairing, returned to the caller for outbound
/// notification.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPartner {
    pub partner_id: SessionId,
    pub username: Option<String>,
}

/// Pairs waiting participants, first come first served.
#[derive(Clone)]
pub struct Matchmaker {
    sessions: Arc<dyn SessionRepository>,
}

impl Matchmaker {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Matchmaker { sessions }
    }

    /// Put the requester into the waiting pool and try to pair it with the
    /// longest-waiting other participant.
    ///
    /// Returns `None` when nobody is waiting; the requester then stays
    /// `Waiting` and is picked up by a later caller. Any prior pairing of
    /// the requester must already have been dissolved by the caller.
    #[instrument(skip(self, username))]
    pub async fn find_partner(
        &self,
        requester_id: &str,
        username: &str,
    ) -> Result<Option<MatchedPartner>, StoreError> {
        self.sessions
            .update(
                requester_id,
                SessionPatch {
                    username: Some(username.to_string()),
                    status: Some(SessionStatus::Waiting),
                    partner_id: Some(None),
                },
            )
            .await?;

        match self.sessions.find_waiting_partner(requester_id).await? {
            Some(partner) => {
                self.sessions.pair(requester_id, &partner.session_id).await?;
                debug!(requester_id, partner_id = %partner.session_id, "Partner matched");
                Ok(Some(MatchedPartner {
                    partner_id: partner.session_id,
                    username: partner.username,
                }))
            }
            None => {
                debug!(requester_id, "No partner available, waiting");
                Ok(None)
            }
        }
    }
}
