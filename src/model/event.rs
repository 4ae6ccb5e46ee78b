use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SessionId;

/// Events received from a client over its WebSocket connection.
///
/// Signal and chat payloads are opaque to the server and relayed verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    UserConnected { session_id: SessionId },
    #[serde(rename_all = "camelCase")]
    FindPartner {
        session_id: SessionId,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    DisconnectPartner {
        session_id: SessionId,
        partner_id: SessionId,
    },
    #[serde(rename_all = "camelCase")]
    CancelConnection { session_id: SessionId },
    #[serde(rename_all = "camelCase")]
    Signal {
        session_id: SessionId,
        partner_id: SessionId,
        signal: Value,
    },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        session_id: SessionId,
        partner_id: SessionId,
        message: Value,
    },
}

/// Events pushed to a client over its WebSocket connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Acknowledges a `user_connected` registration.
    UserConnected,
    #[serde(rename_all = "camelCase")]
    PartnerFound {
        partner_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    PartnerDisconnected,
    NoPartnersAvailable,
    #[serde(rename_all = "camelCase")]
    Signal {
        session_id: SessionId,
        partner_id: SessionId,
        signal: Value,
    },
    #[serde(rename_all = "camelCase")]
    MessageReceived { message: Value },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_find_partner() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"find_partner","sessionId":"u1","username":"anna"}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::FindPartner {
                session_id: "u1".to_string(),
                username: "anna".to_string(),
            }
        );
    }

    #[test]
    fn deserialize_signal_keeps_payload_opaque() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"signal","sessionId":"u1","partnerId":"u2","signal":{"type":"offer","sdp":"v=0"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::Signal { signal, .. } => {
                assert_eq!(signal, json!({"type": "offer", "sdp": "v=0"}));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn serialize_partner_found() {
        let event = ServerEvent::PartnerFound {
            partner_id: "u2".to_string(),
            username: Some("ben".to_string()),
        };
        let serialized = serde_json::to_string(&event).unwrap();
        assert_eq!(
            serialized,
            r#"{"type":"partner_found","partnerId":"u2","username":"ben"}"#
        );
    }

    #[test]
    fn serialize_unit_events() {
        assert_eq!(
            serde_json::to_string(&ServerEvent::UserConnected).unwrap(),
            r#"{"type":"user_connected"}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerEvent::PartnerDisconnected).unwrap(),
            r#"{"type":"partner_disconnected"}"#
        );
    }

    #[test]
    fn serialize_message_received() {
        let event = ServerEvent::MessageReceived {
            message: json!({"content": "hi", "senderId": "u1"}),
        };
        let serialized = serde_json::to_string(&event).unwrap();
        assert_eq!(
            serialized,
            r#"{"type":"message_received","message":{"content":"hi","senderId":"u1"}}"#
        );
    }
}
