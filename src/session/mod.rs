mod actor;
pub mod manager;
mod timer;

pub use actor::{MAX_PENDING_COMMANDS, SessionReply};
pub use manager::{SessionInfo, SessionManager};
pub use timer::TokioAdTimer;
