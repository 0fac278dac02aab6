//! Raw RGBA pixel buffers.

use image::RgbaImage;

use crate::error::Error;

/// Wraps interleaved `[R, G, B, A, ...]` bytes into an image, checking that the dimensions are
/// positive and that the buffer holds exactly `width * height * 4` bytes.
pub fn from_raw_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage, Error> {
    if width == 0 || height == 0 {
        return Err(Error::ZeroDimensions { width, height });
    }
    let expected = width as usize * height as usize * 4;
    let got = pixels.len();
    if got != expected {
        return Err(Error::BufferSizeMismatch {
            width,
            height,
            expected,
            got,
        });
    }
    RgbaImage::from_raw(width, height, pixels).ok_or(Error::BufferSizeMismatch {
        width,
        height,
        expected,
        got,
    })
}

/// Decodes an encoded image (PNG, JPEG, ...) into RGBA pixels.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, Error> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}
