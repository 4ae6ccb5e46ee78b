use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;

use crate::model::SessionId;

/// A participant's live outbound channel, owned by the connection registry.
#[derive(Debug, Clone)]
pub struct Connection {
    pub session_id: SessionId,
    pub sender: UnboundedSender<Message>,
}

impl Connection {
    pub fn new(session_id: SessionId, sender: UnboundedSender<Message>) -> Self {
        Connection { session_id, sender }
    }
}
