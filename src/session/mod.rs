mod core;
mod delivery;
mod state;

pub use self::core::{CaptureSession, CaptureSessionBuilder, SessionConfig};
pub use delivery::{BackCallback, CaptureCallback};
pub use state::SessionState;
