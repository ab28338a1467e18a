//! Image decode/encode helpers shared by the workflows.
//!
//! Codec work is CPU-bound; the async wrappers push it onto the blocking pool.
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{AppError, AppResult};

pub fn decode_rgb(bytes: &[u8]) -> AppResult<RgbImage> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

pub fn encode_png(image: &RgbImage) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.clone()).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf)
}

/// Decode anything the `image` crate understands and re-encode it as RGB PNG.
pub async fn to_png(bytes: Vec<u8>) -> AppResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode_png(&decode_rgb(&bytes)?)).await?
}

/// Decode and re-encode as RGB JPEG at `quality`.
pub async fn to_jpeg(bytes: Vec<u8>, quality: u8) -> AppResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode_jpeg(&decode_rgb(&bytes)?, quality)).await?
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_keeps_pixels() {
        let png = fixtures::solid_png(3, 2, [10, 20, 30]);
        let back = decode_rgb(&png).unwrap();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(2, 1).0, [10, 20, 30]);
    }

    #[test]
    fn empty_upload_is_a_bad_request() {
        assert!(matches!(decode_rgb(&[]), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(decode_rgb(b"not an image"), Err(AppError::Image(_))));
    }

    #[tokio::test]
    async fn jpeg_conversion_produces_a_jpeg() {
        let jpeg = to_jpeg(fixtures::solid_png(8, 8, [200, 0, 0]), 90).await.unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
