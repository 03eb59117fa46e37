use image::{codecs::jpeg::JpegEncoder, DynamicImage};

pub const JPEG_QUALITY: u8 = 85;
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Decodes any supported image format and re-encodes it as RGB JPEG.
pub fn normalize_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, crate::Error> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let rgb = DynamicImage::ImageRgb8(rgb);

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))?;

    tracing::debug!(
        "Normalized {}x{} image: {} -> {} bytes",
        width,
        height,
        bytes.len(),
        jpeg.len()
    );

    Ok(jpeg)
}
