use super::constraints::StreamConstraints;
use super::interface::{CameraBackend, CameraStream, StillFrameStream, TrackRegistry};
use crate::error::CameraError;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Virtual camera that uses a picture on disk as its sensor.
///
/// Each acquisition center-crops the picture to the requested aspect ratio and
/// scales it down when it is wider than the ideal width.
pub struct StillImageCamera {
    path: PathBuf,
    tracks: TrackRegistry,
}

impl StillImageCamera {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            tracks: TrackRegistry::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Crop and scale a sensor image to what the constraints negotiate
pub(crate) fn frame_for_constraints(
    sensor: &RgbaImage,
    constraints: &StreamConstraints,
) -> Option<RgbaImage> {
    let (x, y, crop_width, crop_height) = constraints.crop_region(sensor.dimensions())?;
    let (width, height) = constraints.negotiate(sensor.dimensions())?;

    let cropped = imageops::crop_imm(sensor, x, y, crop_width, crop_height).to_image();
    if (width, height) == (crop_width, crop_height) {
        Some(cropped)
    } else {
        Some(imageops::resize(&cropped, width, height, FilterType::Triangle))
    }
}

#[async_trait]
impl CameraBackend for StillImageCamera {
    fn name(&self) -> &str {
        "still"
    }

    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CameraError::NoMatchingDevice {
                details: format!("{} does not exist", self.path.display()),
            },
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            _ => CameraError::Stream {
                details: format!("failed to read {}: {}", self.path.display(), e),
            },
        })?;

        let constraints = *constraints;
        let path = self.path.display().to_string();
        let frame = tokio::task::spawn_blocking(move || {
            let sensor = image::load_from_memory(&bytes)
                .map_err(|e| CameraError::Stream {
                    details: format!("failed to decode {}: {}", path, e),
                })?
                .to_rgba8();

            debug!(
                "Still camera sensor {}x{}",
                sensor.width(),
                sensor.height()
            );

            frame_for_constraints(&sensor, &constraints).ok_or_else(|| {
                CameraError::NoMatchingDevice {
                    details: format!(
                        "{} cannot satisfy aspect ratio {:.3}",
                        path, constraints.aspect_ratio
                    ),
                }
            })
        })
        .await
        .map_err(|e| CameraError::Stream {
            details: format!("decode task failed: {}", e),
        })??;

        info!(
            "Still camera stream opened at {}x{} from {}",
            frame.width(),
            frame.height(),
            self.path.display()
        );

        Ok(Box::new(StillFrameStream::new(
            Arc::new(frame),
            self.tracks.open(1),
        )))
    }

    fn live_tracks(&self) -> usize {
        self.tracks.live()
    }
}
