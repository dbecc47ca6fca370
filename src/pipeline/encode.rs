//! Image encoding: `RgbImage` → PNG bytes → base64 `ImageData`.
//!
//! The provider receives the page as an inline PNG. PNG is lossless, so thin
//! strokes and small CJK glyphs survive intact; JPEG ringing around text
//! measurably hurts transcription.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Serialise a page image to an in-memory PNG buffer.
pub fn png_bytes(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a page image as a base64 PNG ready for the provider call.
///
/// `detail: "high"` keeps providers that tile images (OpenAI-style) from
/// down-sampling the page to a single overview tile.
pub fn encode_page(img: &RgbImage) -> Result<ImageData, image::ImageError> {
    let buf = png_bytes(img)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} page → {} bytes base64", img.width(), img.height(), b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_small_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..4], b"\x89PNG");
    }

    #[test]
    fn png_bytes_round_trip_dimensions() {
        let img = RgbImage::from_pixel(7, 3, Rgb([1, 2, 3]));
        let bytes = png_bytes(&img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (7, 3));
    }
}
