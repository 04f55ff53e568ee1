/// Legend codec: maps fixed-width binary codes to cell values or colours.
///
/// ## Text format
///   ```text
///   00=0
///   01=1
///   10=2
///   11=3
///   ```
/// One `code=value` (or `code=#colour`) pair per line. Blank lines are
/// skipped, whitespace around each line and each side of `=` is trimmed.
/// All codes share one width (1 or 2) and together cover every binary
/// code of that width exactly once.
///
/// ## Validation order
///   1. each line: binary code, well-formed right-hand side  → `InvalidLine`
///   2. one width, and it is 1 or 2                          → `InconsistentWidth`
///   3. code set == `bit_codes(width)`                       → `IncompleteLegend`
///   4. values within `0..=2^width-1` (value legends only)   → `ValueOutOfRange`

use std::collections::{BTreeMap, BTreeSet};

use super::error::{CodecError, Result};
use super::grid::BitDepth;
use super::palette::{self, Colour};

const CODES_1: [&str; 2] = ["0", "1"];
const CODES_2: [&str; 4] = ["00", "01", "10", "11"];

/// Binary codes for a depth in value order: position `i` encodes value `i`.
pub fn bit_codes(depth: BitDepth) -> &'static [&'static str] {
    match depth {
        BitDepth::One => &CODES_1,
        BitDepth::Two => &CODES_2,
    }
}

/// Something a legend can map a code to.
pub trait LegendValue: Sized + Clone + PartialEq {
    /// Shown in `InvalidLine` messages.
    const EXAMPLE: &'static str;

    fn parse_rhs(rhs: &str) -> Option<Self>;

    fn check_range(&self, _depth: BitDepth) -> Result<()> {
        Ok(())
    }

    fn render(&self) -> String;
}

impl LegendValue for u8 {
    const EXAMPLE: &'static str = "00=0";

    fn parse_rhs(rhs: &str) -> Option<Self> {
        if rhs.is_empty() || !rhs.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Oversized numbers saturate and are caught by the range check.
        Some(rhs.parse::<u64>().map_or(u8::MAX, |v| v.min(u8::MAX as u64) as u8))
    }

    fn check_range(&self, depth: BitDepth) -> Result<()> {
        if *self > depth.max_value() {
            return Err(CodecError::ValueOutOfRange { max: depth.max_value() });
        }
        Ok(())
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl LegendValue for Colour {
    const EXAMPLE: &'static str = "00=#ffffff";

    fn parse_rhs(rhs: &str) -> Option<Self> {
        Colour::parse_hex(rhs)
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

/// A validated code → value mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Legend<T> {
    depth: BitDepth,
    map: BTreeMap<String, T>,
}

/// Legend from codes to cell values.
pub type ValueLegend = Legend<u8>;
/// Legend from codes to colours.
pub type ColourLegend = Legend<Colour>;

impl<T: LegendValue> Legend<T> {
    /// Parse legend text. See the module docs for format and error order.
    pub fn parse(text: &str) -> Result<Self> {
        let mut map = BTreeMap::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let invalid = || CodecError::InvalidLine { line: line.to_string(), example: T::EXAMPLE };
            let (code, rhs) = line.split_once('=').ok_or_else(invalid)?;
            let code = code.trim();
            if !is_binary(code) {
                return Err(invalid());
            }
            let value = T::parse_rhs(rhs.trim()).ok_or_else(invalid)?;
            map.insert(code.to_string(), value);
        }

        Self::from_map(map)
    }

    /// Validate an already-split map (width, completeness, range).
    pub fn from_map(map: BTreeMap<String, T>) -> Result<Self> {
        if !map.keys().all(|c| is_binary(c)) {
            return Err(CodecError::IncompleteLegend);
        }

        let widths: BTreeSet<usize> = map.keys().map(|c| c.len()).collect();
        let depth = match (widths.len(), widths.iter().next()) {
            (1, Some(&w)) => BitDepth::from_bits(w).ok_or(CodecError::InconsistentWidth)?,
            _ => return Err(CodecError::InconsistentWidth),
        };

        let required = bit_codes(depth);
        if map.len() != required.len() || required.iter().any(|c| !map.contains_key(*c)) {
            return Err(CodecError::IncompleteLegend);
        }

        for value in map.values() {
            value.check_range(depth)?;
        }

        Ok(Legend { depth, map })
    }

    /// Canonical text: one line per code, in `bit_codes` order.
    pub fn to_text(&self) -> String {
        bit_codes(self.depth)
            .iter()
            .filter_map(|code| self.map.get(*code).map(|v| format!("{}={}", code, v.render())))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn get(&self, code: &str) -> Option<&T> {
        self.map.get(code)
    }

    /// Entries in `bit_codes` order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &T)> + '_ {
        bit_codes(self.depth)
            .iter()
            .filter_map(move |code| self.map.get(*code).map(|v| (*code, v)))
    }

    pub fn as_map(&self) -> &BTreeMap<String, T> {
        &self.map
    }

    /// Skip validation; lets tests build legends with gaps.
    #[cfg(test)]
    pub(crate) fn unchecked(depth: BitDepth, map: BTreeMap<String, T>) -> Self {
        Legend { depth, map }
    }
}

impl Legend<u8> {
    /// The legend where code `i` means value `i`.
    pub fn identity(depth: BitDepth) -> Self {
        let map = bit_codes(depth)
            .iter()
            .enumerate()
            .map(|(i, code)| (code.to_string(), i as u8))
            .collect();
        Legend { depth, map }
    }

    /// First code (in `bit_codes` order) that decodes to `value`.
    pub fn code_for(&self, value: u8) -> Option<&'static str> {
        self.entries().find(|(_, v)| **v == value).map(|(code, _)| code)
    }
}

impl Legend<Colour> {
    /// Code `i` → `palette[i]`. The palette must have `2^bits` entries.
    pub fn from_palette(depth: BitDepth, palette: &[Colour]) -> Self {
        let map = bit_codes(depth)
            .iter()
            .zip(palette.iter())
            .map(|(code, colour)| (code.to_string(), *colour))
            .collect();
        Legend { depth, map }
    }

    /// Translate colours to palette indices.
    pub fn to_values(&self, palette: &[Colour]) -> Result<ValueLegend> {
        let mut map = BTreeMap::new();
        for (code, colour) in &self.map {
            let value = palette::index_of(palette, *colour)
                .ok_or_else(|| CodecError::UnknownColour { colour: colour.to_string() })?;
            map.insert(code.clone(), value);
        }
        Legend::from_map(map)
    }
}

/// A legend typed by a student, in either value or colour form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StudentLegend {
    Values(ValueLegend),
    Colours(ColourLegend),
}

impl StudentLegend {
    /// Colour form is chosen when the first non-blank line's right-hand
    /// side starts with `#`.
    pub fn parse(text: &str) -> Result<Self> {
        let colour_form = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .and_then(|l| l.split_once('='))
            .map_or(false, |(_, rhs)| rhs.trim_start().starts_with('#'));

        if colour_form {
            Legend::parse(text).map(StudentLegend::Colours)
        } else {
            Legend::parse(text).map(StudentLegend::Values)
        }
    }

    pub fn depth(&self) -> BitDepth {
        match self {
            StudentLegend::Values(l) => l.depth(),
            StudentLegend::Colours(l) => l.depth(),
        }
    }

    /// Value legend to decode with, mapping colours through `palette`.
    pub fn resolve(&self, palette: &[Colour]) -> Result<ValueLegend> {
        match self {
            StudentLegend::Values(l) => Ok(l.clone()),
            StudentLegend::Colours(l) => l.to_values(palette),
        }
    }
}

fn is_binary(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b == b'0' || b == b'1')
}
