use serde::{Deserialize, Serialize};

/// Opaque identifier supplied by the client at connect time.
pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Waiting,
    Connected,
}

/// State of one connected participant.
///
/// `partner_id` is present iff the session is `Connected`, and pairing is
/// reciprocal: if a's partner is b, then b's partner is a.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: SessionId,
    pub username: Option<String>,
    pub status: SessionStatus,
    pub partner_id: Option<SessionId>,
}

impl Session {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Session {
            session_id: session_id.into(),
            username: None,
            status: SessionStatus::Disconnected,
            partner_id: None,
        }
    }

    /// Merge a partial update into this session.
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(username) = patch.username {
            self.username = Some(username);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(partner_id) = patch.partner_id {
            self.partner_id = partner_id;
        }
    }
}

/// Partial session update. `partner_id` is doubly optional so a patch can
/// clear an existing partner reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub username: Option<String>,
    pub status: Option<SessionStatus>,
    pub partner_id: Option<Option<SessionId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_disconnected() {
        let session = Session::new("abc123");
        assert_eq!(session.status, SessionStatus::Disconnected);
        assert_eq!(session.username, None);
        assert_eq!(session.partner_id, None);
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut session = Session::new("abc123");
        session.apply(SessionPatch {
            username: Some("anna".to_string()),
            status: Some(SessionStatus::Waiting),
            ..Default::default()
        });

        assert_eq!(session.username.as_deref(), Some("anna"));
        assert_eq!(session.status, SessionStatus::Waiting);

        session.apply(SessionPatch {
            status: Some(SessionStatus::Connected),
            partner_id: Some(Some("def456".to_string())),
            ..Default::default()
        });

        // username untouched by the second patch
        assert_eq!(session.username.as_deref(), Some("anna"));
        assert_eq!(session.partner_id.as_deref(), Some("def456"));
    }

    #[test]
    fn apply_can_clear_partner() {
        let mut session = Session::new("abc123");
        session.apply(SessionPatch {
            status: Some(SessionStatus::Connected),
            partner_id: Some(Some("def456".to_string())),
            ..Default::default()
        });

        session.apply(SessionPatch {
            status: Some(SessionStatus::Disconnected),
            partner_id: Some(None),
            ..Default::default()
        });

        assert_eq!(session.status, SessionStatus::Disconnected);
        assert_eq!(session.partner_id, None);
    }
}
