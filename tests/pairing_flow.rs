//! End-to-end flow through the lifecycle controller: connect, match,
//! signal, chat, and teardown, observed through each client's channel.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use vox_session::model::{ClientEvent, ServerEvent};
use vox_session::server::{LifecycleController, MemoryStorage};

struct Client {
    session_id: String,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
}

impl Client {
    async fn connect(controller: &LifecycleController, session_id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut client = Client {
            session_id: session_id.to_string(),
            tx,
            rx,
        };
        client
            .send(
                controller,
                ClientEvent::UserConnected {
                    session_id: session_id.to_string(),
                },
            )
            .await;
        assert_eq!(client.next_event(), ServerEvent::UserConnected);
        client
    }

    async fn send(&mut self, controller: &LifecycleController, event: ClientEvent) {
        controller.handle_event(event, &self.tx).await;
    }

    async fn find_partner(&mut self, controller: &LifecycleController, username: &str) {
        let event = ClientEvent::FindPartner {
            session_id: self.session_id.clone(),
            username: username.to_string(),
        };
        self.send(controller, event).await;
    }

    fn next_event(&mut self) -> ServerEvent {
        match self.rx.try_recv().expect("expected a queued event") {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    fn assert_quiet(&mut self) {
        assert!(self.rx.try_recv().is_err(), "expected no queued event");
    }
}

fn controller() -> LifecycleController {
    let storage = Arc::new(MemoryStorage::new());
    LifecycleController::new(storage.clone(), storage)
}

#[tokio::test]
async fn full_conversation_lifecycle() {
    let controller = controller();

    // u1 searches alone and stays quietly waiting.
    let mut u1 = Client::connect(&controller, "u1").await;
    u1.find_partner(&controller, "anna").await;
    u1.assert_quiet();

    // u2 arrives and both sides learn about each other.
    let mut u2 = Client::connect(&controller, "u2").await;
    u2.find_partner(&controller, "ben").await;
    assert_eq!(
        u1.next_event(),
        ServerEvent::PartnerFound {
            partner_id: "u2".to_string(),
            username: Some("ben".to_string()),
        }
    );
    assert_eq!(
        u2.next_event(),
        ServerEvent::PartnerFound {
            partner_id: "u1".to_string(),
            username: Some("anna".to_string()),
        }
    );

    // u1 opens WebRTC negotiation; the offer reaches u2 untouched.
    let offer = json!({"type": "offer", "sdp": "v=0\r\no=- 46117 2 IN IP4 127.0.0.1"});
    u1.send(
        &controller,
        ClientEvent::Signal {
            session_id: "u1".to_string(),
            partner_id: "u2".to_string(),
            signal: offer.clone(),
        },
    )
    .await;
    assert_eq!(
        u2.next_event(),
        ServerEvent::Signal {
            session_id: "u1".to_string(),
            partner_id: "u2".to_string(),
            signal: offer,
        }
    );

    // Chat flows the other way.
    let message = json!({
        "content": "hi there",
        "senderId": "u2",
        "senderName": "ben",
        "timestamp": 1700000000000u64,
        "type": "text",
    });
    u2.send(
        &controller,
        ClientEvent::SendMessage {
            session_id: "u2".to_string(),
            partner_id: "u1".to_string(),
            message: message.clone(),
        },
    )
    .await;
    assert_eq!(u1.next_event(), ServerEvent::MessageReceived { message });

    // u1's socket dies; u2 gets exactly one notification.
    controller.handle_channel_closed("u1").await;
    assert_eq!(u2.next_event(), ServerEvent::PartnerDisconnected);
    u2.assert_quiet();

    // u2 can immediately search again and ends up waiting, not re-paired.
    u2.find_partner(&controller, "ben").await;
    u2.assert_quiet();
}

#[tokio::test]
async fn third_caller_waits_until_next_request() {
    let controller = controller();

    let mut u1 = Client::connect(&controller, "u1").await;
    let mut u2 = Client::connect(&controller, "u2").await;
    let mut u3 = Client::connect(&controller, "u3").await;

    u1.find_partner(&controller, "anna").await;
    u2.find_partner(&controller, "ben").await;
    u1.next_event();
    u2.next_event();

    // Nobody is waiting, so u3 receives nothing.
    u3.find_partner(&controller, "cleo").await;
    u3.assert_quiet();

    // u1 leaves its pairing and searches again; u3 is finally matched.
    u1.send(
        &controller,
        ClientEvent::DisconnectPartner {
            session_id: "u1".to_string(),
            partner_id: "u2".to_string(),
        },
    )
    .await;
    assert_eq!(u2.next_event(), ServerEvent::PartnerDisconnected);

    u1.find_partner(&controller, "anna").await;
    assert_eq!(
        u1.next_event(),
        ServerEvent::PartnerFound {
            partner_id: "u3".to_string(),
            username: Some("cleo".to_string()),
        }
    );
    assert_eq!(
        u3.next_event(),
        ServerEvent::PartnerFound {
            partner_id: "u1".to_string(),
            username: Some("anna".to_string()),
        }
    );
}
