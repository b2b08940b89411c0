pub mod camera;
pub mod capture;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod flash;
pub mod frame;
pub mod orientation;
pub mod overlay;
pub mod session;

pub use camera::{CameraBackend, CameraBackendBuilder, CameraStream, StreamConstraints};
pub use capture::{CapturedImage, PhotoMetadata};
pub use config::{OverlayPolicy, PhotoboothConfig};
pub use download::{generate_filename, save_photo, PhotoStore};
pub use error::{CameraError, CaptureError, OverlayError, PhotoboothError, Result};
pub use events::{EventBus, EventFilter, EventMetrics, EventReceiver, PhotoboothEvent};
pub use flash::{FlashPulse, FlashTimer};
pub use frame::{DisplaySize, VideoFrame};
pub use orientation::Orientation;
pub use overlay::{DirectoryOverlaySource, OverlayLoader, OverlaySource, OverlayState};
pub use session::{CaptureSession, CaptureSessionBuilder, SessionConfig, SessionState};
