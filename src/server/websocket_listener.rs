use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, info, warn};

use crate::model::{ClientEvent, SessionId};
use crate::server::LifecycleController;

/// Accepts WebSocket connections and feeds their events to the lifecycle
/// controller.
pub struct WebSocketListener {
    controller: Arc<LifecycleController>,
    address: SocketAddr,
}

impl WebSocketListener {
    pub fn new(controller: Arc<LifecycleController>, address: SocketAddr) -> Self {
        WebSocketListener {
            controller,
            address,
        }
    }

    pub async fn run(&self) {
        let listener = TcpListener::bind(&self.address)
            .await
            .expect("Failed to bind to address");

        info!("Listening on ws://{}", self.address);

        while let Ok((stream, peer)) = listener.accept().await {
            let controller = Arc::clone(&self.controller);

            tokio::spawn(async move {
                match accept_async(stream).await {
                    Ok(ws_stream) => handle_connection(ws_stream, peer, controller).await,
                    Err(e) => warn!(%peer, error = %e, "WebSocket handshake failed"),
                }
            });
        }
    }
}

async fn handle_connection(
    ws_stream: WebSocketStream<TcpStream>,
    peer: SocketAddr,
    controller: Arc<LifecycleController>,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    debug!(%peer, "Client connected");

    // Pump queued outbound events to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                debug!(error = %e, "Error sending message");
                break;
            }
        }
    });

    // The socket is bound to a session by the first user_connected event;
    // until then there is nothing to tear down on close.
    let mut bound_session: Option<SessionId> = None;

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => {
                    if let ClientEvent::UserConnected { session_id } = &event {
                        bound_session = Some(session_id.clone());
                    }
                    controller.handle_event(event, &tx).await;
                }
                Err(e) => {
                    warn!(%peer, error = %e, "Failed to parse client event");
                }
            },
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(%peer, error = %e, "Error receiving message");
                break;
            }
        }
    }

    if let Some(session_id) = bound_session {
        controller.handle_channel_closed(&session_id).await;
    }
    debug!(%peer, "Client disconnected");

    send_task.abort();
}
