/// Puzzle catalog: built-in presets plus puzzle files.
///
/// ## Sources (in play order):
///   1. Built-in presets (Easy 1-4, Medium 1-2, Hard 1-2)
///   2. `puzzles/` directory (individual `.txt` files, sorted by filename)
///
/// ## Puzzle file format (`.txt`):
///   ```text
///   # Title
///   @ mode=typeBits depth=2
///   0123
///   1230
///   2301
///   3012
///   ```
///   Line 1: `# Title` (optional, defaults to the file stem)
///   Optional: `@ key=value ...` with `mode=paint|typeBits`, `depth=1|2`
///   Remaining lines: one digit string per grid row. The grid is square.
///
/// Without `depth=`, the smallest depth holding every value is used.

use std::path::Path;

use crate::domain::grid::{index_of, BitDepth, Grid, MAX_GRID_SIZE};

/// Largest puzzle side a file may declare.
pub const MAX_PUZZLE_SIZE: usize = MAX_GRID_SIZE;

/// How the player answers a challenge.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PuzzleMode {
    /// Paint the decoded image on the board.
    #[default]
    Paint,
    /// Type the bitstream for the shown image.
    TypeBits,
}

impl PuzzleMode {
    pub fn label(self) -> &'static str {
        match self {
            PuzzleMode::Paint => "paint",
            PuzzleMode::TypeBits => "typeBits",
        }
    }

    fn parse(s: &str) -> Option<PuzzleMode> {
        match s {
            "paint" => Some(PuzzleMode::Paint),
            "typeBits" | "typebits" | "type" => Some(PuzzleMode::TypeBits),
            _ => None,
        }
    }
}

/// One challenge. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preset {
    pub title: String,
    pub mode: PuzzleMode,
    pub target: Grid,
}

impl Preset {
    pub fn size(&self) -> usize { self.target.size() }
    pub fn depth(&self) -> BitDepth { self.target.depth() }
    pub fn cells(&self) -> &[u8] { self.target.cells() }
}

/// Ordered list of presets for level progression.
#[derive(Clone, Debug)]
pub struct Catalog {
    presets: Vec<Preset>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

impl Catalog {
    pub fn new(presets: Vec<Preset>) -> Self {
        Catalog { presets }
    }

    /// Built-in presets followed by any puzzles in `puzzles_dir`.
    pub fn load(puzzles_dir: &Path) -> Self {
        let mut presets = embedded_presets();
        if puzzles_dir.is_dir() {
            let extra = load_from_directory(puzzles_dir);
            tracing::info!(count = extra.len(), dir = %puzzles_dir.display(), "loaded puzzle files");
            presets.extend(extra);
        }
        Catalog { presets }
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.title.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(embedded_presets())
    }
}

// ══════════════════════════════════════════════════════════════
// Puzzle file parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single puzzle. `None` if the rows do not form a square grid of
/// digits within the declared (or inferred) depth.
pub fn parse_puzzle(content: &str, fallback_title: &str) -> Option<Preset> {
    let mut title = String::new();
    let mut mode = PuzzleMode::Paint;
    let mut depth = None;
    let mut rows: Vec<Vec<u8>> = vec![];

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix('#') {
            if title.is_empty() {
                title = rest.trim().to_string();
            }
        } else if let Some(rest) = line.strip_prefix('@') {
            for pair in rest.split_whitespace() {
                match pair.split_once('=') {
                    Some(("mode", v)) => mode = PuzzleMode::parse(v)?,
                    Some(("depth", v)) => depth = Some(BitDepth::from_bits(v.parse().ok()?)?),
                    _ => tracing::debug!(pair, "ignoring unknown puzzle attribute"),
                }
            }
        } else {
            let row = line
                .chars()
                .map(|c| c.to_digit(10).map(|d| d as u8))
                .collect::<Option<Vec<u8>>>()?;
            rows.push(row);
        }
    }

    let size = rows.len();
    if size == 0 || size > MAX_PUZZLE_SIZE || rows.iter().any(|r| r.len() != size) {
        return None;
    }

    let cells: Vec<u8> = rows.into_iter().flatten().collect();
    let depth = match depth {
        Some(d) => d,
        None => BitDepth::for_value(cells.iter().copied().max().unwrap_or(0))?,
    };
    let target = Grid::from_cells(size, depth, cells)?;

    if title.is_empty() {
        title = fallback_title.to_string();
    }

    Some(Preset { title, mode, target })
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<Preset> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("could not read {}: {e}", dir.display());
            return vec![];
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
            match std::fs::read_to_string(&path) {
                Ok(content) => match parse_puzzle(&content, &stem) {
                    Some(preset) => results.push((path.clone(), preset)),
                    None => tracing::warn!("skipping malformed puzzle {}", path.display()),
                },
                Err(e) => tracing::warn!("could not read {}: {e}", path.display()),
            }
        }
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results.into_iter().map(|(_, preset)| preset).collect()
}

// ══════════════════════════════════════════════════════════════
// Pattern generators
// ══════════════════════════════════════════════════════════════

fn generate(size: usize, f: impl Fn(usize, usize) -> u8) -> Vec<u8> {
    (0..size * size).map(|i| f(i / size, i % size)).collect()
}

/// Diagonal bands cycling through `values`.
pub fn checker(size: usize, values: &[u8]) -> Vec<u8> {
    generate(size, |r, c| values.get((r + c) % values.len().max(1)).copied().unwrap_or(0))
}

/// Frame of 1s with 3 in the corners around an inner block of 2s.
pub fn border(size: usize) -> Vec<u8> {
    generate(size, |r, c| {
        let edge_r = r == 0 || r + 1 == size;
        let edge_c = c == 0 || c + 1 == size;
        if edge_r && edge_c {
            3
        } else if edge_r || edge_c {
            1
        } else if r > 1 && c > 1 && r + 2 < size && c + 2 < size {
            2
        } else {
            0
        }
    })
}

/// Both diagonals over a background of every third anti-diagonal.
pub fn diagonal(size: usize) -> Vec<u8> {
    generate(size, |r, c| {
        if r == c {
            1
        } else if r + c + 1 == size {
            2
        } else if (r + c) % 3 == 0 {
            3
        } else {
            0
        }
    })
}

/// Four vertical bars of equal width.
pub fn vertical_bars(size: usize) -> Vec<u8> {
    generate(size, |_, c| ((c * 4 / size) % 4) as u8)
}

/// Horizontal stripes, one value per row.
pub fn stripes(size: usize) -> Vec<u8> {
    generate(size, |r, _| (r % 4) as u8)
}

/// Quadrants 0 1 / 2 3.
pub fn blocks(size: usize) -> Vec<u8> {
    generate(size, |r, c| {
        let top = 2 * r < size;
        let left = 2 * c < size;
        match (top, left) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    })
}

/// Concentric rings: a 2-wide outer band, a middle square, an inner core.
pub fn ring(size: usize) -> Vec<u8> {
    let mut cells = vec![0; size * size];
    let s = size as isize;
    for r in 0..s {
        for c in 0..s {
            let idx = index_of(r as usize, c as usize, size);
            if r < 2 || c < 2 || r > s - 3 || c > s - 3 {
                cells[idx] = 1;
            }
            if r > 2 && c > 2 && r < s - 3 && c < s - 3 {
                cells[idx] = 2;
            }
            if r > 5 && c > 5 && r < s - 6 && c < s - 6 {
                cells[idx] = 3;
            }
        }
    }
    cells
}

// ══════════════════════════════════════════════════════════════
// Embedded presets
// ══════════════════════════════════════════════════════════════

pub fn embedded_presets() -> Vec<Preset> {
    const ALL: [u8; 4] = [0, 1, 2, 3];
    vec![
        make_embedded("Easy 1", 8, PuzzleMode::Paint, checker(8, &ALL)),
        make_embedded("Easy 2", 8, PuzzleMode::Paint, border(8)),
        make_embedded("Easy 3", 8, PuzzleMode::TypeBits, diagonal(8)),
        make_embedded("Easy 4", 8, PuzzleMode::Paint, vertical_bars(8)),
        make_embedded("Medium 1", 12, PuzzleMode::Paint, stripes(12)),
        make_embedded("Medium 2", 12, PuzzleMode::TypeBits, blocks(12)),
        make_embedded("Hard 1", 16, PuzzleMode::Paint, checker(16, &ALL)),
        make_embedded("Hard 2", 16, PuzzleMode::TypeBits, ring(16)),
    ]
}

fn make_embedded(title: &str, size: usize, mode: PuzzleMode, cells: Vec<u8>) -> Preset {
    // Generators only emit 0..=3 into size*size cells.
    let target = Grid::from_cells(size, BitDepth::Two, cells).unwrap_or_else(|| Grid::new(size, BitDepth::Two));
    Preset { title: title.to_string(), mode, target }
}
