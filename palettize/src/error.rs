use image::ImageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error while loading image: {0}")]
    Image(#[from] ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GIF encoding error: {0}")]
    GifEncode(#[from] gif::EncodingError),
    #[error("Cannot parse palette catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("Palette is empty")]
    PaletteIsEmpty,
    #[error("Palette must not be larger than 256 colors to be stored in a GIF")]
    PaletteTooBig,
    #[error("Palette {name:?} declares {count} colors but carries {len} RGB bytes")]
    PaletteLengthMismatch {
        name: String,
        count: usize,
        len: usize,
    },
    #[error("Image is too big to encode in a GIF")]
    FrameTooBig,
    #[error("Image contains a color that is not in its palette")]
    ColorNotInPalette,
    #[error("Image dimensions must be positive (got {width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("Pixel buffer holds {got} bytes, {width}x{height} RGBA needs {expected}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
    #[error("Downscale factor must be a positive integer")]
    InvalidFactor,
    #[error("Image of {width}x{height} is too small to downscale by a factor of {factor}")]
    ImageTooSmall { width: u32, height: u32, factor: u32 },
    #[error("Image of {width}x{height} is too big to upscale by a factor of {factor}")]
    UpscaleTooLarge { width: u32, height: u32, factor: u32 },
    #[error("Unknown palette {0:?}")]
    UnknownPalette(String),
    #[error("Unknown dithering kernel {0:?}")]
    UnknownKernel(String),
}
