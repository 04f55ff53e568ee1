/// Colours and the palettes cells are drawn with.
///
/// A palette is a pure rendering lookup: index = cell value.
/// Colour-blind palettes swap in a blue/orange ramp that stays distinct
/// under the common forms of colour blindness.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::grid::BitDepth;

/// 24-bit RGB colour. Parsed from `#RGB` or `#RRGGBB` (any case),
/// always printed as lower-case `#rrggbb`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Colour { r, g, b }
    }

    /// Parse `#RGB` / `#RRGGBB`. Returns None for anything else.
    pub fn parse_hex(s: &str) -> Option<Colour> {
        let hex = s.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut it = hex.chars().map(|c| c.to_digit(16).unwrap_or(0) as u8);
                let (r, g, b) = (it.next()?, it.next()?, it.next()?);
                Some(Colour::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                Some(Colour::rgb(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => None,
        }
    }

    /// Relative luminance in 0.0..=1.0, good enough to pick a readable
    /// foreground over this colour.
    pub fn luminance(self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Colour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Colour::parse_hex(s.trim()).ok_or_else(|| format!("not a hex colour: {s}"))
    }
}

impl TryFrom<String> for Colour {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Colour> for String {
    fn from(c: Colour) -> String {
        c.to_string()
    }
}

// ── Palettes ──

const STANDARD_1: [Colour; 2] = [Colour::rgb(0xff, 0xff, 0xff), Colour::rgb(0x11, 0x18, 0x27)];
const STANDARD_2: [Colour; 4] = [
    Colour::rgb(0xff, 0xff, 0xff),
    Colour::rgb(0x25, 0x63, 0xeb),
    Colour::rgb(0xf9, 0x73, 0x16),
    Colour::rgb(0x11, 0x18, 0x27),
];
const COLOUR_BLIND_1: [Colour; 2] = [Colour::rgb(0xf7, 0xf7, 0xf7), Colour::rgb(0x00, 0x42, 0x9d)];
const COLOUR_BLIND_2: [Colour; 4] = [
    Colour::rgb(0xf7, 0xf7, 0xf7),
    Colour::rgb(0x3b, 0x4c, 0xc0),
    Colour::rgb(0x73, 0xa2, 0xc6),
    Colour::rgb(0xe1, 0xa6, 0x92),
];

/// Palette for a bit depth. Always `2^bits` entries long.
pub fn palette(depth: BitDepth, colour_blind: bool) -> &'static [Colour] {
    match (depth, colour_blind) {
        (BitDepth::One, false) => &STANDARD_1,
        (BitDepth::Two, false) => &STANDARD_2,
        (BitDepth::One, true) => &COLOUR_BLIND_1,
        (BitDepth::Two, true) => &COLOUR_BLIND_2,
    }
}

/// Index of `colour` in the palette, if present.
pub fn index_of(palette: &[Colour], colour: Colour) -> Option<u8> {
    palette.iter().position(|c| *c == colour).map(|i| i as u8)
}
