use super::encode::decode_png;
use crate::orientation::Orientation;
use image::RgbaImage;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// The single output of a capture: a lossless PNG at the camera's native resolution
#[derive(Debug, Clone)]
pub struct CapturedImage {
    id: Uuid,
    orientation: Orientation,
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
    captured_at: SystemTime,
    overlay_applied: bool,
}

impl CapturedImage {
    pub(crate) fn new(
        orientation: Orientation,
        width: u32,
        height: u32,
        png: Vec<u8>,
        overlay_applied: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            orientation,
            width,
            height,
            data: Arc::new(png),
            captured_at: SystemTime::now(),
            overlay_applied,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encoded PNG bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        "image/png"
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn overlay_applied(&self) -> bool {
        self.overlay_applied
    }

    /// Decode the pixels, e.g. for an on-screen preview
    pub fn decode(&self) -> Result<RgbaImage, image::ImageError> {
        decode_png(&self.data)
    }
}
