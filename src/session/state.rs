use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture session lifecycle.
///
/// `Idle → Starting → Live ⇄ Capturing`, `Starting → Failed`, any state `→ Stopped`.
/// `Failed` and `Stopped` only leave through an explicit `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Starting,
    Live,
    Capturing,
    Failed,
    Stopped,
}

impl SessionState {
    /// Whether a camera stream is attached in this state
    pub fn has_stream(&self) -> bool {
        matches!(self, SessionState::Live | SessionState::Capturing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Failed | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Live => "live",
            SessionState::Capturing => "capturing",
            SessionState::Failed => "failed",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
