mod connection;
mod error;
mod lifecycle;
mod matchmaker;
mod memory_storage;
mod registry;
mod store;
mod websocket_listener;

pub use connection::Connection;
pub use error::StoreError;
pub use lifecycle::LifecycleController;
pub use matchmaker::{MatchedPartner, Matchmaker};
pub use memory_storage::MemoryStorage;
pub use registry::ConnectionRegistry;
pub use store::{SessionCounts, SessionRepository};
pub use websocket_listener::WebSocketListener;
