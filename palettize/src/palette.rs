//! Palettes: the fixed color sets pixels get quantized to.

use std::fmt;

use crate::error::Error;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A named, ordered, non-empty list of colors.
///
/// Order only matters when a pixel is exactly as far from two entries, in which case the entry
/// that comes first wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    name: String,
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(name: impl Into<String>, colors: Vec<Color>) -> Result<Self, Error> {
        if colors.is_empty() {
            return Err(Error::PaletteIsEmpty);
        }
        Ok(Self {
            name: name.into(),
            colors,
        })
    }

    /// Builds a palette out of flattened `[R, G, B, R, G, B, ...]` bytes.
    pub fn from_flat_rgb(name: impl Into<String>, rgb: &[u8]) -> Result<Self, Error> {
        let name = name.into();
        if rgb.len() % 3 != 0 {
            return Err(Error::PaletteLengthMismatch {
                count: rgb.len() / 3,
                len: rgb.len(),
                name,
            });
        }
        let colors = rgb
            .chunks_exact(3)
            .map(|c| Color::new(c[0], c[1], c[2]))
            .collect();
        Self::new(name, colors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always `false`; palettes cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Position of the first entry equal to `color`.
    pub fn index_of(&self, color: Color) -> Option<usize> {
        self.colors.iter().position(|&c| c == color)
    }
}
