//! Share-page previews.
//!
//! The upload is decoded, shrunk to fit a 200x200 box and re-encoded as a
//! `data:` URI. PNG uploads stay PNG; everything else becomes JPEG.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageResult};

/// Longest edge of a preview, in pixels.
pub const THUMBNAIL_EDGE: u32 = 200;

/// Build a base64 `data:` URI preview of `data`.
///
/// Images already inside the box are re-encoded without scaling.
pub fn data_uri(data: &[u8], content_type: &str) -> ImageResult<String> {
    let img = image::load_from_memory(data)?;
    let thumb = if img.width() > THUMBNAIL_EDGE || img.height() > THUMBNAIL_EDGE {
        img.resize(THUMBNAIL_EDGE, THUMBNAIL_EDGE, FilterType::Lanczos3)
    } else {
        img
    };

    let (format, mime) = if content_type == "image/png" {
        (ImageFormat::Png, "image/png")
    } else {
        (ImageFormat::Jpeg, "image/jpeg")
    };

    let mut buf = Cursor::new(Vec::new());
    match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(thumb.to_rgb8()).write_to(&mut buf, format)?,
        _ => thumb.write_to(&mut buf, format)?,
    }

    Ok(format!("data:{mime};base64,{}", STANDARD.encode(buf.into_inner())))
}
