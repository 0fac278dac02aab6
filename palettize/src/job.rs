//! Processing jobs. A job applies one palette to an already downscaled source image.

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::{
    buffer,
    dither::dither,
    encode::{encode, Encoded, OutputFormat},
    error::Error,
    kernel::{parse_dithering, Kernel},
    palette::{Color, Palette},
    resample::{upscale, upscaled_size},
};

#[derive(Debug, Clone)]
pub struct Job {
    /// The downscaled source. It is shared between all jobs of a run and never written to.
    pub source: Arc<RgbaImage>,
    pub palette: Arc<Palette>,
    pub kernel: Option<Kernel>,
    /// The factor the source was downscaled by, reused for upscaling.
    pub factor: u32,
    pub upscale: bool,
    pub format: OutputFormat,
}

impl Job {
    /// Quantizes (and optionally upscales) the source, without encoding it.
    pub fn render(&self) -> Result<RgbaImage, Error> {
        debug!(
            palette = self.palette.name(),
            kernel = ?self.kernel,
            upscale = self.upscale,
            "rendering job"
        );
        let mut working = RgbaImage::clone(&self.source);
        let output = dither(&mut working, &self.palette, self.kernel);
        if self.upscale {
            upscale(&output, self.factor)
        } else {
            Ok(output)
        }
    }

    pub fn run(&self) -> Result<Encoded, Error> {
        let image = self.render()?;
        encode(&image, &self.palette, self.format)
    }
}

/// A job in its flat wire form: raw pixels plus everything needed to process them.
#[derive(Debug, Clone)]
pub struct JobMessage {
    pub width: u32,
    pub height: u32,
    pub source_buffer: Vec<u8>,
    pub palette_name: String,
    pub palette: Vec<Color>,
    /// A kernel name, or `none`/empty for plain quantization.
    pub kernel: String,
    pub upscale: bool,
    pub factor: u32,
}

impl TryFrom<JobMessage> for Job {
    type Error = Error;

    fn try_from(message: JobMessage) -> Result<Self, Self::Error> {
        if message.factor == 0 {
            return Err(Error::InvalidFactor);
        }
        let palette = Palette::new(message.palette_name, message.palette)?;
        let kernel = parse_dithering(&message.kernel)?;
        if message.upscale {
            upscaled_size((message.width, message.height), message.factor)?;
        }
        let source = buffer::from_raw_rgba(message.width, message.height, message.source_buffer)?;
        Ok(Job {
            source: Arc::new(source),
            palette: Arc::new(palette),
            kernel,
            factor: message.factor,
            upscale: message.upscale,
            format: OutputFormat::Png,
        })
    }
}
