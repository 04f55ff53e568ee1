/// A paintable board: a grid plus cursor, tool and selected value.
///
/// Painting moves the cursor to the painted cell. Resizing or changing
/// depth throws the old content away (all cells 0, cursor 0).
///
/// ## Drag painting
///
/// A `DragStroke` starts on pointer-down over a board and keeps the value
/// chosen at that moment. Every cell the pointer enters afterwards is
/// painted once per stroke. A stroke belongs to the board it started on:
/// cells entered on any other board are ignored until pointer-up.

use std::collections::HashSet;

use super::grid::{step_cursor, BitDepth, Dir, Grid};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tool {
    #[default]
    Paint,
    Eraser,
}

/// Which board a command or stroke targets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BoardId {
    Encode,
    Decode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    pub grid: Grid,
    pub cursor: usize,
    pub tool: Tool,
    pub selected: u8,
}

impl Board {
    pub fn new(size: usize, depth: BitDepth) -> Self {
        Board { grid: Grid::new(size, depth), cursor: 0, tool: Tool::Paint, selected: 1 }
    }

    pub fn size(&self) -> usize { self.grid.size() }
    pub fn depth(&self) -> BitDepth { self.grid.depth() }

    /// Value the current tool writes.
    pub fn tool_value(&self) -> u8 {
        match self.tool {
            Tool::Paint => self.selected,
            Tool::Eraser => 0,
        }
    }

    /// Paint one cell with an explicit value and move the cursor there.
    pub fn paint_value(&mut self, index: usize, value: u8) -> bool {
        if !self.grid.set(index, value) {
            return false;
        }
        self.cursor = index;
        true
    }

    /// Next value in the cycle `0 → 1 → … → max → 0` for the cell.
    pub fn cycled_value(&self, index: usize) -> u8 {
        let levels = self.depth().levels() as u8;
        self.grid.get(index).map_or(0, |v| (v + 1) % levels)
    }

    pub fn fill(&mut self) {
        let value = self.tool_value();
        self.grid.fill(value);
    }

    /// Reset to an all-zero grid of the given shape.
    pub fn reshape(&mut self, size: usize, depth: BitDepth) {
        self.grid = Grid::new(size, depth);
        self.cursor = 0;
        self.selected = self.selected.min(depth.max_value());
    }

    pub fn clear(&mut self) {
        let (size, depth) = (self.size(), self.depth());
        self.reshape(size, depth);
    }

    pub fn select(&mut self, value: u8) -> bool {
        if value > self.depth().max_value() {
            return false;
        }
        self.selected = value;
        self.tool = Tool::Paint;
        true
    }

    pub fn move_cursor(&mut self, dir: Dir) {
        self.cursor = step_cursor(self.cursor, self.size(), dir);
    }
}

/// One pointer-down … pointer-up pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragStroke {
    pub board: BoardId,
    pub value: u8,
    visited: HashSet<usize>,
}

impl DragStroke {
    pub fn begin(board: BoardId, value: u8) -> Self {
        DragStroke { board, value, visited: HashSet::new() }
    }

    /// Returns the value to paint if `index` on `board` has not been
    /// painted by this stroke yet.
    pub fn enter(&mut self, board: BoardId, index: usize) -> Option<u8> {
        if board != self.board || !self.visited.insert(index) {
            return None;
        }
        Some(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_sets_value_and_moves_cursor() {
        let mut b = Board::new(8, BitDepth::Two);
        b.select(2);
        assert!(b.paint_value(10, b.tool_value()));
        assert_eq!(b.grid.get(10), Some(2));
        assert_eq!(b.cursor, 10);
    }

    #[test]
    fn eraser_paints_zero() {
        let mut b = Board::new(8, BitDepth::One);
        b.paint_value(3, b.tool_value());
        b.tool = Tool::Eraser;
        b.paint_value(3, b.tool_value());
        assert_eq!(b.grid.get(3), Some(0));
    }

    #[test]
    fn fill_uses_current_tool_value() {
        let mut b = Board::new(8, BitDepth::Two);
        b.select(3);
        b.fill();
        assert!(b.grid.cells().iter().all(|&v| v == 3));
        b.tool = Tool::Eraser;
        b.fill();
        assert!(b.grid.cells().iter().all(|&v| v == 0));
    }

    #[test]
    fn reshape_zeroes_cells_resets_cursor_and_clamps_selection() {
        let mut b = Board::new(8, BitDepth::Two);
        b.select(3);
        b.fill();
        b.cursor = 20;
        b.reshape(12, BitDepth::One);
        assert_eq!(b.grid.len(), 144);
        assert!(b.grid.cells().iter().all(|&v| v == 0));
        assert_eq!(b.cursor, 0);
        assert_eq!(b.selected, 1);
    }

    #[test]
    fn select_rejects_values_beyond_depth() {
        let mut b = Board::new(8, BitDepth::One);
        assert!(!b.select(2));
        assert!(b.select(0));
    }

    #[test]
    fn cycled_value_wraps_at_depth() {
        let mut b = Board::new(2, BitDepth::Two);
        b.paint_value(0, 3);
        assert_eq!(b.cycled_value(0), 0);
        assert_eq!(b.cycled_value(1), 1);
    }

    #[test]
    fn stroke_paints_each_cell_once() {
        let mut s = DragStroke::begin(BoardId::Encode, 1);
        assert_eq!(s.enter(BoardId::Encode, 4), Some(1));
        assert_eq!(s.enter(BoardId::Encode, 5), Some(1));
        assert_eq!(s.enter(BoardId::Encode, 4), None);
    }

    #[test]
    fn stroke_ignores_other_board() {
        let mut s = DragStroke::begin(BoardId::Decode, 2);
        assert_eq!(s.enter(BoardId::Encode, 0), None);
        assert_eq!(s.enter(BoardId::Decode, 0), Some(2));
    }
}
