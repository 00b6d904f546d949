//! Crop extraction and encoding.

use image::DynamicImage;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::crop::SourceRect;

/// Extracts `region` from the decoded image at native resolution and encodes
/// it as JPEG at quality 100.
///
/// Deterministic: the same image and region always produce identical bytes.
pub fn extract_jpeg(image: &DynamicImage, region: SourceRect) -> image::ImageResult<Vec<u8>> {
    let cropped = image
        .crop_imm(region.x, region.y, region.width, region.height)
        .to_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, 100);
    encoder.encode(
        cropped.as_raw(),
        cropped.width(),
        cropped.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}
