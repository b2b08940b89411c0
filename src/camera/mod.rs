mod builder;
mod constraints;
mod interface;
mod still;
mod synthetic;
#[cfg(test)]
mod tests;

pub use builder::CameraBackendBuilder;
pub use constraints::StreamConstraints;
pub use interface::{CameraBackend, CameraStream, StillFrameStream, TrackRegistry, TrackSet};
pub use still::StillImageCamera;
pub use synthetic::{test_pattern, SyntheticCamera, MARKER_COLOR};
