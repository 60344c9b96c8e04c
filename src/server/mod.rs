//! TCP command server: the accept loop and per-connection sessions.

pub mod listener;
pub mod session;

pub use listener::Server;
pub use session::{Session, SessionContext, SessionOutcome};
