//! Error diffusion kernels.
//!
//! Every kernel spreads the quantization error of the current pixel over pixels that the
//! row-major scan has not reached yet: taps on the current row always point to the right, all
//! other taps point downwards.

use std::{fmt, str::FromStr};

use crate::error::Error;

/// One diffusion target: `(dx, dy, numerator)`. The weight of the tap is
/// `numerator / denominator` of its kernel.
pub type Tap = (i32, i32, u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Atkinson,
    Burkes,
    FloydSteinberg,
    JarvisJudiceNinke,
    ShiauFan,
    Sierra,
    SierraLite,
    SierraTwoRow,
    StevensonArce,
    Stucki,
}

// Atkinson only passes on 6/8 of the error on purpose.
#[rustfmt::skip]
const ATKINSON: &[Tap] = &[
                         (1, 0, 1), (2, 0, 1),
    (-1, 1, 1), (0, 1, 1), (1, 1, 1),
                (0, 2, 1),
];

#[rustfmt::skip]
const BURKES: &[Tap] = &[
                                     (1, 0, 8), (2, 0, 4),
    (-2, 1, 2), (-1, 1, 4), (0, 1, 8), (1, 1, 4), (2, 1, 2),
];

#[rustfmt::skip]
const FLOYD_STEINBERG: &[Tap] = &[
                           (1, 0, 7),
    (-1, 1, 3), (0, 1, 5), (1, 1, 1),
];

#[rustfmt::skip]
const JARVIS_JUDICE_NINKE: &[Tap] = &[
                                     (1, 0, 7), (2, 0, 5),
    (-2, 1, 3), (-1, 1, 5), (0, 1, 7), (1, 1, 5), (2, 1, 3),
    (-2, 2, 1), (-1, 2, 3), (0, 2, 5), (1, 2, 3), (2, 2, 1),
];

// The five-tap Shiau-Fan filter (Shiau and Fan, 1996).
#[rustfmt::skip]
const SHIAU_FAN: &[Tap] = &[
                                                 (1, 0, 8),
    (-3, 1, 1), (-2, 1, 1), (-1, 1, 2), (0, 1, 4),
];

#[rustfmt::skip]
const SIERRA: &[Tap] = &[
                                     (1, 0, 5), (2, 0, 3),
    (-2, 1, 2), (-1, 1, 4), (0, 1, 5), (1, 1, 4), (2, 1, 2),
                (-1, 2, 2), (0, 2, 3), (1, 2, 2),
];

#[rustfmt::skip]
const SIERRA_LITE: &[Tap] = &[
                           (1, 0, 2),
    (-1, 1, 1), (0, 1, 1),
];

#[rustfmt::skip]
const SIERRA_TWO_ROW: &[Tap] = &[
                                     (1, 0, 4), (2, 0, 3),
    (-2, 1, 1), (-1, 1, 2), (0, 1, 3), (1, 1, 2), (2, 1, 1),
];

// The Stevenson-Arce filter (Stevenson and Arce, 1985), laid out for a square grid.
#[rustfmt::skip]
const STEVENSON_ARCE: &[Tap] = &[
                                                                    (2, 0, 32),
    (-3, 1, 12),              (-1, 1, 26),             (1, 1, 30),              (3, 1, 16),
                 (-2, 2, 12),              (0, 2, 26),              (2, 2, 12),
    (-3, 3, 5),               (-1, 3, 12),             (1, 3, 12),              (3, 3, 5),
];

#[rustfmt::skip]
const STUCKI: &[Tap] = &[
                                     (1, 0, 8), (2, 0, 4),
    (-2, 1, 2), (-1, 1, 4), (0, 1, 8), (1, 1, 4), (2, 1, 2),
    (-2, 2, 1), (-1, 2, 2), (0, 2, 4), (1, 2, 2), (2, 2, 1),
];

impl Kernel {
    pub const ALL: [Kernel; 10] = [
        Kernel::Atkinson,
        Kernel::Burkes,
        Kernel::FloydSteinberg,
        Kernel::JarvisJudiceNinke,
        Kernel::ShiauFan,
        Kernel::Sierra,
        Kernel::SierraLite,
        Kernel::SierraTwoRow,
        Kernel::StevensonArce,
        Kernel::Stucki,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Atkinson => "Atkinson",
            Kernel::Burkes => "Burkes",
            Kernel::FloydSteinberg => "FloydSteinberg",
            Kernel::JarvisJudiceNinke => "JarvisJudiceNinke",
            Kernel::ShiauFan => "ShiauFan",
            Kernel::Sierra => "Sierra",
            Kernel::SierraLite => "SierraLite",
            Kernel::SierraTwoRow => "SierraTwoRow",
            Kernel::StevensonArce => "StevensonArce",
            Kernel::Stucki => "Stucki",
        }
    }

    pub fn taps(self) -> &'static [Tap] {
        match self {
            Kernel::Atkinson => ATKINSON,
            Kernel::Burkes => BURKES,
            Kernel::FloydSteinberg => FLOYD_STEINBERG,
            Kernel::JarvisJudiceNinke => JARVIS_JUDICE_NINKE,
            Kernel::ShiauFan => SHIAU_FAN,
            Kernel::Sierra => SIERRA,
            Kernel::SierraLite => SIERRA_LITE,
            Kernel::SierraTwoRow => SIERRA_TWO_ROW,
            Kernel::StevensonArce => STEVENSON_ARCE,
            Kernel::Stucki => STUCKI,
        }
    }

    pub fn denominator(self) -> u16 {
        match self {
            Kernel::Atkinson => 8,
            Kernel::Burkes => 32,
            Kernel::FloydSteinberg => 16,
            Kernel::JarvisJudiceNinke => 48,
            Kernel::ShiauFan => 16,
            Kernel::Sierra => 32,
            Kernel::SierraLite => 4,
            Kernel::SierraTwoRow => 16,
            Kernel::StevensonArce => 200,
            Kernel::Stucki => 42,
        }
    }

    /// Taps with their weights resolved to fractions of the error.
    pub fn weighted_taps(self) -> impl Iterator<Item = (i32, i32, f64)> {
        let denominator = f64::from(self.denominator());
        self.taps()
            .iter()
            .map(move |&(dx, dy, numerator)| (dx, dy, f64::from(numerator) / denominator))
    }

    /// The fraction of the error an interior pixel passes on.
    pub fn weight_sum(self) -> f64 {
        let numerators: u16 = self.taps().iter().map(|&(_, _, n)| n).sum();
        f64::from(numerators) / f64::from(self.denominator())
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Kernel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Kernel::ALL
            .into_iter()
            .find(|kernel| normalize(kernel.name()) == wanted)
            .ok_or_else(|| Error::UnknownKernel(s.to_owned()))
    }
}

/// Parses a dithering selection, where an empty name or `none` turns diffusion off.
pub fn parse_dithering(name: &str) -> Result<Option<Kernel>, Error> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        trimmed.parse().map(Some)
    }
}
