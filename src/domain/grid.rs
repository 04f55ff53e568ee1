/// Grid model: a square array of small-integer cell values.
///
/// Cells are addressed by flat index in row-major order:
///   `index = row * size + col`, `row = index / size`, `col = index % size`.
/// Every component that navigates by cursor goes through the helpers
/// below so the arithmetic stays in one place.

use serde::{Deserialize, Serialize};

/// Grid sizes offered by the editor, in cycling order.
pub const GRID_SIZES: [usize; 3] = [8, 12, 16];

/// Largest side any grid may have, puzzles and share codes included.
pub const MAX_GRID_SIZE: usize = 16;

/// Number of bits that encode one cell.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    One,
    Two,
}

impl BitDepth {
    pub fn bits(self) -> usize {
        match self {
            BitDepth::One => 1,
            BitDepth::Two => 2,
        }
    }

    /// Largest cell value representable at this depth.
    pub fn max_value(self) -> u8 {
        (1u8 << self.bits()) - 1
    }

    /// Number of distinct values (= colours) at this depth.
    pub fn levels(self) -> usize {
        1 << self.bits()
    }

    pub fn from_bits(bits: usize) -> Option<BitDepth> {
        match bits {
            1 => Some(BitDepth::One),
            2 => Some(BitDepth::Two),
            _ => None,
        }
    }

    /// Smallest depth able to hold `value`.
    pub fn for_value(value: u8) -> Option<BitDepth> {
        match value {
            0..=1 => Some(BitDepth::One),
            2..=3 => Some(BitDepth::Two),
            _ => None,
        }
    }

    pub fn toggled(self) -> BitDepth {
        match self {
            BitDepth::One => BitDepth::Two,
            BitDepth::Two => BitDepth::One,
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        BitDepth::from_bits(v as usize).ok_or_else(|| format!("bit depth must be 1 or 2, got {v}"))
    }
}

impl From<BitDepth> for u8 {
    fn from(d: BitDepth) -> u8 {
        d.bits() as u8
    }
}

/// Cursor movement direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

#[inline]
pub fn index_of(row: usize, col: usize, size: usize) -> usize {
    row * size + col
}

#[inline]
pub fn row_col(index: usize, size: usize) -> (usize, usize) {
    (index / size, index % size)
}

/// Move a cursor one cell. Edges clamp; the cursor never wraps to the
/// next row.
pub fn step_cursor(index: usize, size: usize, dir: Dir) -> usize {
    let (row, col) = row_col(index, size);
    match dir {
        Dir::Up if row > 0 => index - size,
        Dir::Down if row + 1 < size => index + size,
        Dir::Left if col > 0 => index - 1,
        Dir::Right if col + 1 < size => index + 1,
        _ => index,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    depth: BitDepth,
    cells: Vec<u8>,
}

impl Grid {
    /// All-zero grid.
    pub fn new(size: usize, depth: BitDepth) -> Self {
        Grid { size, depth, cells: vec![0; size * size] }
    }

    /// Build from existing cells. Returns None if the length is not
    /// `size * size` or any value exceeds the depth's range.
    pub fn from_cells(size: usize, depth: BitDepth, cells: Vec<u8>) -> Option<Self> {
        if size == 0 || size.checked_mul(size) != Some(cells.len()) {
            return None;
        }
        if cells.iter().any(|&v| v > depth.max_value()) {
            return None;
        }
        Some(Grid { size, depth, cells })
    }

    pub fn size(&self) -> usize { self.size }
    pub fn depth(&self) -> BitDepth { self.depth }
    pub fn cells(&self) -> &[u8] { &self.cells }
    pub fn len(&self) -> usize { self.cells.len() }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied()
    }

    /// Set a cell. Out-of-range index or value is ignored and reported
    /// as `false`.
    pub fn set(&mut self, index: usize, value: u8) -> bool {
        if value > self.depth.max_value() {
            return false;
        }
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: u8) {
        if value <= self.depth.max_value() {
            self.cells.fill(value);
        }
    }
}
