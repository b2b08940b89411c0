use crate::orientation::Orientation;
use crate::session::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoboothError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Camera unavailable: {0}")]
    Camera(#[from] CameraError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl PhotoboothError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Reasons a camera stream could not be obtained or read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera matches the requested constraints: {details}")]
    NoMatchingDevice { details: String },

    #[error("camera is already in use by another client")]
    DeviceBusy,

    #[error("camera stream failure: {details}")]
    Stream { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("overlay asset not found: {path}")]
    NotFound { path: String },

    #[error("failed to read overlay {path}: {details}")]
    Read { path: String, details: String },

    #[error("failed to decode overlay for {orientation}: {details}")]
    Decode {
        orientation: Orientation,
        details: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture requires a live camera stream (session is {state})")]
    NotLive { state: SessionState },

    #[error("overlay for {orientation} is still loading")]
    OverlayPending { orientation: Orientation },

    #[error("failed to encode photo: {details}")]
    Encode { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("event bus channel closed")]
    ChannelClosed,

    #[error("receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },
}

pub type Result<T> = std::result::Result<T, PhotoboothError>;
