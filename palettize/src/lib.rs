//! Turns images into pixel art: nearest-neighbor downscaling, quantization to a fixed palette,
//! optional error diffusion dithering, and optional nearest-neighbor upscaling.

pub mod buffer;
pub mod catalog;
pub mod dither;
pub mod encode;
pub mod error;
pub mod job;
pub mod kernel;
pub mod palette;
pub mod quantize;
pub mod resample;

pub use encode::{Encoded, OutputFormat};
pub use error::Error;
pub use job::{Job, JobMessage};
pub use kernel::Kernel;
pub use palette::{Color, Palette};
