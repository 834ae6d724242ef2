//! Photo downscaling and inline encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ColorType};

use crate::error::{Error, Result};
use crate::record::PhotoData;

/// Compute the output size for a photo bounded to `max_width`.
///
/// Never upscales; height keeps the aspect ratio.
#[must_use]
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scale = f64::from(max_width) / f64::from(width);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled_height = (f64::from(height) * scale).round().max(1.0) as u32;
    (max_width, scaled_height)
}

/// Decode a photo, bound its width and recompress it as JPEG.
///
/// Photos already narrow enough are still recompressed so every stored photo
/// ends up a JPEG.
///
/// # Errors
///
/// Returns [`Error::Photo`] if the bytes are not a decodable image or the
/// re-encode fails.
pub fn downscale(photo: &PhotoData, max_width: u32, jpeg_quality: u8) -> Result<PhotoData> {
    let img = image::load_from_memory(&photo.bytes)
        .map_err(|e| Error::photo(&photo.file_name, format!("decode failed: {e}")))?;

    let (width, height) = scaled_dimensions(img.width(), img.height(), max_width);
    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    let rgb = img.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, jpeg_quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| Error::photo(&photo.file_name, format!("encode failed: {e}")))?;

    tracing::debug!(
        file = %photo.file_name,
        from = photo.bytes.len(),
        to = bytes.len(),
        width,
        height,
        "Downscaled photo"
    );

    Ok(PhotoData {
        file_name: jpeg_file_name(&photo.file_name),
        content_type: "image/jpeg".to_string(),
        bytes,
    })
}

/// Encode photo bytes as a `data:` URL.
#[must_use]
pub fn to_data_url(photo: &PhotoData) -> String {
    let content_type = if photo.content_type.is_empty() {
        "application/octet-stream"
    } else {
        &photo.content_type
    };
    format!("data:{content_type};base64,{}", STANDARD.encode(&photo.bytes))
}

fn jpeg_file_name(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("photo");
    format!("{stem}.jpg")
}
