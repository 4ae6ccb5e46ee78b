mod event;
mod session;

pub use event::{ClientEvent, ServerEvent};
pub use session::{Session, SessionId, SessionPatch, SessionStatus};
