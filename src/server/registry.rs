use async_trait::async_trait;

use crate::model::ServerEvent;
use crate::server::Connection;
use crate::server::StoreError;

/// Maps session ids to live outbound channels.
///
/// Delivery is best effort: sending to a closed or unregistered channel is a
/// silent no-op. The eventual close of the dead peer's own socket is the
/// sole source of truth for notifying anyone.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Bind a channel to a session id, replacing any prior binding.
    async fn register(&self, connection: Connection) -> Result<(), StoreError>;

    /// Serialize the event and deliver it to the session's channel, if open.
    /// FIFO per session id.
    async fn send(&self, session_id: &str, event: &ServerEvent);

    async fn unregister(&self, session_id: &str) -> Result<(), StoreError>;
}
