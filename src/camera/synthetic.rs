use super::constraints::StreamConstraints;
use super::interface::{CameraBackend, CameraStream, StillFrameStream, TrackRegistry};
use crate::config::FacingMode;
use crate::error::CameraError;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Colour of the marker drawn in the top-left corner of the test pattern
pub const MARKER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Asymmetric test pattern: a gradient with a solid marker in the top-left quarter.
///
/// Mirroring moves the marker to the top-right, which makes the flip observable.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let marker_width = (width / 4).max(1);
    let marker_height = (height / 4).max(1);

    RgbaImage::from_fn(width, height, |x, y| {
        if x < marker_width && y < marker_height {
            MARKER_COLOR
        } else {
            let g = ((x as u64 * 200) / width.max(1) as u64) as u8;
            let b = ((y as u64 * 200) / height.max(1) as u64) as u8;
            Rgba([16, g.saturating_add(40), b.saturating_add(40), 255])
        }
    })
}

/// Software camera that renders the test pattern.
///
/// Permission, contention and the negotiated resolution are all simulated so
/// sessions can be exercised without hardware.
pub struct SyntheticCamera {
    name: String,
    sensor: (u32, u32),
    native_override: Option<(u32, u32)>,
    permission_granted: bool,
    busy: bool,
    acquire_delay: Duration,
    tracks: TrackRegistry,
    acquisitions: AtomicU64,
}

impl SyntheticCamera {
    pub fn new(sensor: (u32, u32)) -> Self {
        Self {
            name: "synthetic".to_string(),
            sensor,
            native_override: None,
            permission_granted: true,
            busy: false,
            acquire_delay: Duration::ZERO,
            tracks: TrackRegistry::new(),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Deliver exactly this resolution regardless of constraints
    pub fn with_native_resolution(mut self, width: u32, height: u32) -> Self {
        self.native_override = Some((width, height));
        self
    }

    /// Answer every request as if the user dismissed the permission prompt
    pub fn deny_permission(mut self) -> Self {
        self.permission_granted = false;
        self
    }

    /// Answer every request as if another client holds the device
    pub fn in_use(mut self) -> Self {
        self.busy = true;
        self
    }

    /// Wait this long before answering a request
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    /// Number of successful acquisitions so far
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraBackend for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        if !self.permission_granted {
            warn!("Synthetic camera: permission denied");
            return Err(CameraError::PermissionDenied);
        }

        if self.busy {
            return Err(CameraError::DeviceBusy);
        }

        if constraints.facing != FacingMode::User {
            return Err(CameraError::NoMatchingDevice {
                details: format!("{:?} facing camera is not available", constraints.facing),
            });
        }

        let (width, height) = match self.native_override {
            Some(resolution) => resolution,
            None => constraints.negotiate(self.sensor).ok_or_else(|| {
                CameraError::NoMatchingDevice {
                    details: format!(
                        "sensor {}x{} cannot satisfy aspect ratio {:.3}",
                        self.sensor.0, self.sensor.1, constraints.aspect_ratio
                    ),
                }
            })?,
        };

        if width == 0 || height == 0 {
            return Err(CameraError::NoMatchingDevice {
                details: "zero-sized resolution".to_string(),
            });
        }

        debug!("Rendering {}x{} test pattern", width, height);
        let pattern = Arc::new(test_pattern(width, height));

        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        info!("Synthetic camera stream opened at {}x{}", width, height);

        Ok(Box::new(StillFrameStream::new(pattern, self.tracks.open(1))))
    }

    fn live_tracks(&self) -> usize {
        self.tracks.live()
    }
}
