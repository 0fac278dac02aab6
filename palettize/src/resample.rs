//! Nearest-neighbor resampling.
//!
//! No filtering happens here on purpose: blending neighboring colors before quantization would
//! smear the hard edges pixel art is made of.

use image::RgbaImage;

use crate::error::Error;

/// Size of `(width, height)` after downscaling by `factor`.
pub fn downscaled_size((width, height): (u32, u32), factor: u32) -> (u32, u32) {
    (width / factor, height / factor)
}

/// Checks that an image of the given size can be downscaled by `factor` into an image that still
/// has pixels in it.
pub fn check_factor(width: u32, height: u32, factor: u32) -> Result<(), Error> {
    if factor == 0 {
        return Err(Error::InvalidFactor);
    }
    if width == 0 || height == 0 {
        return Err(Error::ZeroDimensions { width, height });
    }
    let (w, h) = downscaled_size((width, height), factor);
    if w == 0 || h == 0 {
        return Err(Error::ImageTooSmall {
            width,
            height,
            factor,
        });
    }
    Ok(())
}

/// Shrinks `source` to `floor(width / factor) x floor(height / factor)`, taking the pixel at the
/// center of each `factor x factor` block.
///
/// `factor` must be positive and no larger than either dimension; see [`check_factor`].
pub fn downscale(source: &RgbaImage, factor: u32) -> RgbaImage {
    if factor == 1 {
        return source.clone();
    }
    let (width, height) = downscaled_size(source.dimensions(), factor);
    let offset = factor / 2;
    RgbaImage::from_fn(width, height, |x, y| {
        *source.get_pixel(x * factor + offset, y * factor + offset)
    })
}

/// Size of `(width, height)` after upscaling by `factor`, if it still fits in a `u32`.
pub fn upscaled_size((width, height): (u32, u32), factor: u32) -> Result<(u32, u32), Error> {
    if factor == 0 {
        return Err(Error::InvalidFactor);
    }
    width
        .checked_mul(factor)
        .zip(height.checked_mul(factor))
        .ok_or(Error::UpscaleTooLarge {
            width,
            height,
            factor,
        })
}

/// Magnifies `image` by `factor`, turning every pixel into a `factor x factor` block.
pub fn upscale(image: &RgbaImage, factor: u32) -> Result<RgbaImage, Error> {
    let (width, height) = upscaled_size(image.dimensions(), factor)?;
    if factor == 1 {
        return Ok(image.clone());
    }
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        *image.get_pixel(x / factor, y / factor)
    }))
}
