use crate::config::PngCompression;
use crate::error::CaptureError;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use tracing::trace;

/// Encode RGBA pixels as PNG
pub fn encode_png(image: &RgbaImage, compression: PngCompression) -> Result<Vec<u8>, CaptureError> {
    let (compression_type, filter) = match compression {
        PngCompression::Fast => (CompressionType::Fast, PngFilterType::NoFilter),
        PngCompression::Default => (CompressionType::Default, PngFilterType::Adaptive),
        PngCompression::Best => (CompressionType::Best, PngFilterType::Adaptive),
    };

    let mut output = Vec::new();
    PngEncoder::new_with_quality(&mut output, compression_type, filter)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| CaptureError::Encode {
            details: e.to_string(),
        })?;

    trace!(
        "Encoded {}x{} PNG ({} bytes)",
        image.width(),
        image.height(),
        output.len()
    );
    Ok(output)
}

/// Decode PNG bytes back to RGBA pixels
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}
