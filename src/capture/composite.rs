use crate::frame::DisplaySize;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::borrow::Cow;
use tracing::debug;

/// Flatten one photo: the frame mirrored horizontally, then the overlay drawn
/// on top without mirroring.
///
/// The output always has the frame's dimensions. An overlay of a different size
/// is stretched to cover the whole frame.
pub fn composite(frame: &RgbaImage, overlay: Option<&RgbaImage>) -> RgbaImage {
    let mut canvas = imageops::flip_horizontal(frame);

    if let Some(overlay) = overlay {
        let (width, height) = canvas.dimensions();
        let overlay = if overlay.dimensions() == (width, height) {
            Cow::Borrowed(overlay)
        } else {
            debug!(
                "Scaling overlay {}x{} to {}x{}",
                overlay.width(),
                overlay.height(),
                width,
                height
            );
            Cow::Owned(imageops::resize(overlay, width, height, FilterType::Triangle))
        };

        imageops::overlay(&mut canvas, overlay.as_ref(), 0, 0);
    }

    canvas
}

/// Mirrored preview frame, fitted into `display` when given
pub fn mirrored_preview(frame: &RgbaImage, display: Option<DisplaySize>) -> RgbaImage {
    let mirrored = imageops::flip_horizontal(frame);

    match display {
        Some(display) => {
            let (width, height) = display.fit(frame.width(), frame.height());
            if width == 0 || height == 0 || (width, height) == mirrored.dimensions() {
                mirrored
            } else {
                imageops::thumbnail(&mirrored, width, height)
            }
        }
        None => mirrored,
    }
}
