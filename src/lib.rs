pub mod model;
pub mod server;

pub mod prelude {
    pub use crate::model::ClientEvent;
    pub use crate::model::ServerEvent;
    pub use crate::model::Session;
    pub use crate::model::SessionId;
    pub use crate::model::SessionPatch;
    pub use crate::model::SessionStatus;
    pub use crate::server::Connection;
    pub use crate::server::ConnectionRegistry;
    pub use crate::server::LifecycleController;
    pub use crate::server::Matchmaker;
    pub use crate::server::MemoryStorage;
    pub use crate::server::SessionRepository;
}
