//! Encoding of finished images.

use std::{fmt, str::FromStr};

use image::{codecs::png::PngEncoder, ColorType, ImageEncoder, RgbaImage};

use crate::{error::Error, palette::Palette};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Png,
    Gif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(format!("unsupported output format {s:?} (expected png or gif)")),
        }
    }
}

/// An encoded result image.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Error> {
    let mut bytes = vec![];
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Writes a single still frame whose global color table is the palette itself. Every pixel of a
/// quantized image is a palette entry, so no further color reduction takes place.
fn encode_gif(image: &RgbaImage, palette: &Palette) -> Result<Vec<u8>, Error> {
    if palette.len() > 256 {
        return Err(Error::PaletteTooBig);
    }
    let width = u16::try_from(image.width()).map_err(|_| Error::FrameTooBig)?;
    let height = u16::try_from(image.height()).map_err(|_| Error::FrameTooBig)?;

    // GIF color tables hold a power of two entries.
    let table_len = palette.len().next_power_of_two().max(2);
    let mut color_table: Vec<u8> = palette.colors().iter().flat_map(|c| c.to_array()).collect();
    color_table.resize(table_len * 3, 0);

    let indices = image
        .pixels()
        .map(|pixel| {
            let [r, g, b, _] = pixel.0;
            palette
                .index_of([r, g, b].into())
                .map(|index| index as u8)
                .ok_or(Error::ColorNotInPalette)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut bytes = vec![];
    {
        let mut encoder = gif::Encoder::new(&mut bytes, width, height, &color_table)?;
        let frame = gif::Frame {
            width,
            height,
            buffer: indices.into(),
            ..Default::default()
        };
        encoder.write_frame(&frame)?;
    }
    Ok(bytes)
}

/// Encodes a quantized image. `palette` must be the palette the image was quantized to.
pub fn encode(image: &RgbaImage, palette: &Palette, format: OutputFormat) -> Result<Encoded, Error> {
    let bytes = match format {
        OutputFormat::Png => encode_png(image)?,
        OutputFormat::Gif => encode_gif(image, palette)?,
    };
    Ok(Encoded {
        width: image.width(),
        height: image.height(),
        format,
        bytes,
    })
}
