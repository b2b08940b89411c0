use image::RgbaImage;
use std::sync::Arc;
use std::time::SystemTime;

/// One frame read from a live camera stream, at the stream's native resolution
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Monotonic frame number within the stream
    pub id: u64,
    /// When the frame was read
    pub timestamp: SystemTime,
    /// Pixels as delivered by the sensor (not mirrored)
    pub image: Arc<RgbaImage>,
}

impl VideoFrame {
    pub fn new(id: u64, timestamp: SystemTime, image: Arc<RgbaImage>) -> Self {
        Self {
            id,
            timestamp,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Size of the on-screen box a preview is fitted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Largest size with the source aspect ratio that fits inside this box
    pub fn fit(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        if src_width == 0 || src_height == 0 || self.width == 0 || self.height == 0 {
            return (0, 0);
        }

        let scale = f64::min(
            self.width as f64 / src_width as f64,
            self.height as f64 / src_height as f64,
        );
        let width = ((src_width as f64 * scale).round() as u32).clamp(1, self.width);
        let height = ((src_height as f64 * scale).round() as u32).clamp(1, self.height);
        (width, height)
    }
}
