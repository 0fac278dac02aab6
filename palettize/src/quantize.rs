//! Nearest-color lookup.

use std::collections::HashMap;

use crate::palette::{Color, Palette};

fn distance_squared(a: Color, b: Color) -> u32 {
    let dr = u32::from(a.r.abs_diff(b.r));
    let dg = u32::from(a.g.abs_diff(b.g));
    let db = u32::from(a.b.abs_diff(b.b));
    dr * dr + dg * dg + db * db
}

/// Returns the palette entry with the smallest Euclidean RGB distance to `color`.
/// On ties the entry that comes first in the palette wins.
pub fn closest(palette: &Palette, color: Color) -> Color {
    let colors = palette.colors();
    let (mut best, mut best_distance) = (colors[0], u32::MAX);
    for &candidate in colors {
        let distance = distance_squared(color, candidate);
        if distance < best_distance {
            best_distance = distance;
            best = candidate;
        }
    }
    best
}

/// Per-job nearest-color lookup that remembers every color it has already resolved.
pub struct Quantizer<'p> {
    palette: &'p Palette,
    cache: HashMap<Color, Color>,
}

impl<'p> Quantizer<'p> {
    pub fn new(palette: &'p Palette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    pub fn closest(&mut self, color: Color) -> Color {
        let palette = self.palette;
        *self
            .cache
            .entry(color)
            .or_insert_with(|| closest(palette, color))
    }
}
