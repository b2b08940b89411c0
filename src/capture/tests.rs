use super::*;
use crate::camera::{test_pattern, MARKER_COLOR};
use crate::config::PngCompression;
use crate::frame::DisplaySize;
use crate::orientation::Orientation;
use image::imageops;
use image::{Rgba, RgbaImage};

const OVERLAY_COLOR: Rgba<u8> = Rgba([250, 250, 20, 255]);

/// Opaque band across the top-left corner, transparent elsewhere
fn corner_overlay(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x < 3 && y < 2 {
            OVERLAY_COLOR
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[test]
fn test_composite_mirrors_frame() {
    let frame = test_pattern(40, 60);
    let result = composite(&frame, None);

    assert_eq!(result.dimensions(), (40, 60));
    // Marker moves from top-left to top-right
    assert_eq!(*result.get_pixel(39, 0), MARKER_COLOR);
    assert_ne!(*result.get_pixel(0, 0), MARKER_COLOR);
    assert_eq!(result, imageops::flip_horizontal(&frame));
}

#[test]
fn test_overlay_is_drawn_unmirrored() {
    let frame = test_pattern(40, 60);
    let overlay = corner_overlay(40, 60);
    let result = composite(&frame, Some(&overlay));
    let mirrored = imageops::flip_horizontal(&frame);

    for (x, y, pixel) in result.enumerate_pixels() {
        if x < 3 && y < 2 {
            assert_eq!(*pixel, OVERLAY_COLOR, "overlay pixel at {},{}", x, y);
        } else {
            assert_eq!(pixel, mirrored.get_pixel(x, y), "frame pixel at {},{}", x, y);
        }
    }
}

#[test]
fn test_overlay_is_stretched_to_frame() {
    let frame = test_pattern(20, 30);
    let overlay = RgbaImage::from_pixel(4, 6, OVERLAY_COLOR);

    let result = composite(&frame, Some(&overlay));

    assert_eq!(result.dimensions(), (20, 30));
    assert!(result.pixels().all(|p| *p == OVERLAY_COLOR));
}

#[test]
fn test_mirrored_preview_fits_display() {
    let frame = test_pattern(300, 450);

    let preview = mirrored_preview(&frame, Some(DisplaySize::new(100, 100)));
    assert_eq!(preview.dimensions(), (67, 100));
    assert_eq!(preview.get_pixel(66, 0)[0], 255);

    let full = mirrored_preview(&frame, None);
    assert_eq!(full, imageops::flip_horizontal(&frame));
}

#[test]
fn test_png_encoding_is_lossless() {
    let image = composite(&test_pattern(33, 21), Some(&corner_overlay(33, 21)));

    for compression in [PngCompression::Fast, PngCompression::Best] {
        let png = encode_png(&image, compression).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(decode_png(&png).unwrap(), image);
    }
}

#[test]
fn test_captured_image_accessors() {
    let pixels = test_pattern(10, 15);
    let png = encode_png(&pixels, PngCompression::Default).unwrap();
    let photo = CapturedImage::new(Orientation::Portrait, 10, 15, png.clone(), true);

    assert_eq!(photo.dimensions(), (10, 15));
    assert_eq!(photo.mime_type(), "image/png");
    assert_eq!(photo.as_bytes(), png.as_slice());
    assert!(photo.overlay_applied());
    assert!(!photo.is_empty());
    assert_eq!(photo.decode().unwrap(), pixels);

    let copy = photo.clone();
    assert_eq!(copy.id(), photo.id());

    let other = CapturedImage::new(Orientation::Portrait, 10, 15, png, true);
    assert_ne!(other.id(), photo.id());
}
