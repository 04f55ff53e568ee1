/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// While composing, every clickable cell records a `Hit` so mouse events
/// can be resolved against the frame that is actually on screen.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use binmosaic::domain::board::{BoardId, Tool};
use binmosaic::domain::grid::{row_col, Grid};
use binmosaic::domain::palette::Colour;
use binmosaic::sim::level::{PuzzleMode, MAX_PUZZLE_SIZE};
use binmosaic::sim::session::{Mode, Session, Status};

use super::controls::{FieldId, Focus, Hit, UiState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::INVALID; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::INVALID; w * h];
        }
    }

    /// Fill with blanks on an explicit background, never terminal-default.
    fn clear(&mut self, fg: Color, bg: Color) {
        self.cells.fill(Cell::new(' ', fg, bg));
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::INVALID
        }
    }

    /// Write a string at (x, y), one column per char, clipped at `max_x`.
    /// Returns the column after the last char written.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color, max_x: usize) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= max_x.min(self.width) {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
        cx
    }

    fn fill_row(&mut self, y: usize, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
    }
}

// ── Theme ──

struct Theme {
    bg: Color,
    fg: Color,
    dim: Color,
    hud_bg: Color,
    field_bg: Color,
    accent: Color,
    focus: Color,
    error: Color,
    ok: Color,
}

/// Dark background shared by `Clear` and every cell, so the gaps between
/// rows on VTE terminals match the cells.
const NORMAL: Theme = Theme {
    bg: Color::Rgb { r: 22, g: 22, b: 35 },
    fg: Color::White,
    dim: Color::DarkGrey,
    hud_bg: Color::Rgb { r: 20, g: 20, b: 60 },
    field_bg: Color::Rgb { r: 34, g: 34, b: 54 },
    accent: Color::Rgb { r: 200, g: 180, b: 50 },
    focus: Color::Cyan,
    error: Color::Rgb { r: 170, g: 40, b: 40 },
    ok: Color::Rgb { r: 40, g: 130, b: 70 },
};

const HIGH_CONTRAST: Theme = Theme {
    bg: Color::Black,
    fg: Color::White,
    dim: Color::White,
    hud_bg: Color::Blue,
    field_bg: Color::Rgb { r: 40, g: 40, b: 40 },
    accent: Color::Yellow,
    focus: Color::Yellow,
    error: Color::Red,
    ok: Color::DarkGreen,
};

// ── Layout ──

/// Each grid cell is two terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const BOARD_ROW: usize = 3;
const BOARD_COL: usize = 2;
const PANEL_COL: usize = BOARD_COL + MAX_PUZZLE_SIZE * CELL_W + 3;

const LEGEND_ROWS: usize = 4;
const BITS_ROWS: usize = 6;
const TYPED_ROWS: usize = 3;

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    hits: Vec<Option<Hit>>,
    term_w: usize,
    term_h: usize,
    last_high_contrast: Option<bool>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            hits: vec![],
            term_w: 0,
            term_h: 0,
            last_high_contrast: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste,
            cursor::Hide,
            SetBackgroundColor(NORMAL.bg),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize_buffers(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            DisableBracketedPaste,
            DisableMouseCapture,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// What was drawn at a terminal position in the last frame.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<Hit> {
        let (x, y) = (col as usize, row as usize);
        if x >= self.term_w || y >= self.term_h {
            return None;
        }
        self.hits.get(y * self.term_w + x).copied().flatten()
    }

    pub fn render(&mut self, session: &Session, ui: &UiState) -> io::Result<()> {
        let theme = theme_for(session);

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize_buffers(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(theme.bg), Clear(ClearType::All))?;
        }

        // Theme switch: clear for a clean repaint
        let hc = session.settings.high_contrast;
        if self.last_high_contrast != Some(hc) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(theme.bg), Clear(ClearType::All))?;
            self.last_high_contrast = Some(hc);
        }

        self.compose(session, ui);
        self.flush_diff(theme)?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn resize_buffers(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
        self.hits = vec![None; w * h];
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self, theme: &Theme) -> io::Result<()> {
        let mut last_fg = theme.fg;
        let mut last_bg = theme.bg;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the
        // terminal default and show line artifacts.
        queue!(self.writer, SetForegroundColor(theme.fg), SetBackgroundColor(theme.bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, s: &Session, ui: &UiState) {
        let t = theme_for(s);
        self.front.clear(t.fg, t.bg);
        self.hits.fill(None);

        self.compose_hud(s, ui, t);
        let board_bottom = self.compose_board(s, ui, t);
        let panel_bottom = match ui.tab {
            BoardId::Encode => self.compose_encode_panel(s, ui, t),
            BoardId::Decode => self.compose_decode_panel(s, ui, t),
        };
        self.compose_footer(board_bottom.max(panel_bottom) + 1, s, ui, t);
    }

    fn compose_hud(&mut self, s: &Session, ui: &UiState, t: &Theme) {
        let w = self.front.width;
        self.front.fill_row(HUD_ROW, t.fg, t.hud_bg);
        let mut x = self.front.put_str(0, HUD_ROW, " BINARY MOSAIC  ", t.accent, t.hud_bg, w);

        for (tab, label) in [(BoardId::Encode, " Encode "), (BoardId::Decode, " Decode ")] {
            let (fg, bg) = if ui.tab == tab { (Color::Black, t.accent) } else { (t.fg, t.hud_bg) };
            let start = x;
            x = self.front.put_str(x, HUD_ROW, label, fg, bg, w);
            self.mark(start, x, HUD_ROW, Hit::Tab(tab));
            x += 1;
        }

        let on = |b: bool| if b { "on" } else { "off" };
        let flags = format!(
            "  Timer:{}  Mistakes:{}  Colour-blind:{}  Contrast:{}",
            on(s.settings.timer_enabled),
            on(s.settings.show_mistakes),
            on(s.settings.colour_blind),
            on(s.settings.high_contrast),
        );
        self.front.put_str(x, HUD_ROW, &flags, t.fg, t.hud_bg, w);
    }

    /// Draw the board for the active tab. Returns the frame's bottom row.
    fn compose_board(&mut self, s: &Session, ui: &UiState, t: &Theme) -> usize {
        let board_id = ui.tab;
        let typing = s.challenge.mode == Mode::Challenge && s.challenge.puzzle_mode == PuzzleMode::TypeBits;
        // A type-the-bits puzzle shows its target, read-only.
        let (grid, cursor): (&Grid, Option<usize>) = match board_id {
            BoardId::Decode if typing => (&s.challenge.target, None),
            id => {
                let board = s.board(id);
                (&board.grid, Some(board.cursor))
            }
        };
        let clickable = cursor.is_some();
        let focused = ui.focus == Focus::Board;
        let size = grid.size();
        let palette = s.palette(grid.depth());

        let frame_fg = if focused { t.focus } else { t.dim };
        self.draw_frame(BOARD_COL - 1, BOARD_ROW - 1, size * CELL_W + 2, size + 2, frame_fg, t.bg);

        for (i, &v) in grid.cells().iter().enumerate() {
            let (r, c) = row_col(i, size);
            let (x, y) = (BOARD_COL + c * CELL_W, BOARD_ROW + r);
            let colour = palette.get(v as usize).copied().unwrap_or(Colour::rgb(0, 0, 0));
            let bg = to_color(colour);
            let wrong = board_id == BoardId::Decode && s.challenge.wrong.contains(&i);
            let fg = if wrong { t.error } else { marker_fg(colour) };

            let digit = char::from(b'0' + v);
            let glyphs = if focused && cursor == Some(i) {
                ['[', ']']
            } else if wrong {
                ['×', '×']
            } else if s.settings.colour_blind {
                [digit, ' ']
            } else {
                [' ', ' ']
            };
            self.front.set(x, y, Cell::new(glyphs[0], fg, bg));
            self.front.set(x + 1, y, Cell::new(glyphs[1], fg, bg));
            if clickable {
                self.mark(x, x + CELL_W, y, Hit::Cell(board_id, i));
            }
        }
        BOARD_ROW + size
    }

    fn compose_encode_panel(&mut self, s: &Session, ui: &UiState, t: &Theme) -> usize {
        let max_x = self.front.width;
        let mut y = BOARD_ROW - 1;
        let board = &s.encode;
        let tool = match board.tool {
            Tool::Paint => "Paint",
            Tool::Eraser => "Eraser",
        };
        let info = format!("Grid {0}x{0}  {1}-bit  Tool: {tool}", board.size(), board.depth().bits());
        self.front.put_str(PANEL_COL, y, &info, t.fg, t.bg, max_x);
        y += 1;

        let selected = (board.tool == Tool::Paint).then_some(board.selected);
        self.compose_chips(PANEL_COL, y, s.palette(board.depth()), selected, true, t);
        y += 2;

        y = self.compose_field(PANEL_COL, y, LEGEND_ROWS, FieldId::EncodeLegend, ui, t);
        y = self.compose_field(PANEL_COL, y, BITS_ROWS, FieldId::EncodeBits, ui, t);

        if let Some(code) = &s.share_code {
            let width = max_x.saturating_sub(PANEL_COL + 8);
            let shown = ellipsize(code, width);
            let x = self.front.put_str(PANEL_COL, y, "Share: ", t.accent, t.bg, max_x);
            self.front.put_str(x, y, &shown, t.fg, t.bg, max_x);
            y += 1;
        }
        y
    }

    fn compose_decode_panel(&mut self, s: &Session, ui: &UiState, t: &Theme) -> usize {
        let max_x = self.front.width;
        let ch = &s.challenge;
        let mut y = BOARD_ROW - 1;

        self.front.put_str(PANEL_COL, y, &s.level_status, t.accent, t.bg, max_x);
        y += 1;

        let timer = if s.settings.timer_enabled {
            format!("Timer: {}s", ch.elapsed_display)
        } else {
            "Timer: off".to_string()
        };
        let mode = match ch.mode {
            Mode::Challenge => format!("Mode: {}", ch.puzzle_mode.label()),
            Mode::Complete => "Mode: complete".to_string(),
            Mode::Idle => "Mode: tutorial".to_string(),
        };
        self.front.put_str(PANEL_COL, y, &format!("{mode}  {timer}"), t.fg, t.bg, max_x);
        y += 1;

        if let Some(report) = &ch.report {
            let fg = if report.passed() { t.ok } else { t.error };
            self.front.put_str(PANEL_COL, y, &report.summary(), fg, t.bg, max_x);
        }
        y += 1;

        let depth = if ch.mode == Mode::Idle { s.encode.depth() } else { ch.target.depth() };
        self.compose_chips(PANEL_COL, y, s.palette(depth), None, false, t);
        y += 2;

        for (id, rows) in [(FieldId::DecodeLegend, LEGEND_ROWS), (FieldId::DecodeBits, BITS_ROWS)] {
            y = self.compose_field(PANEL_COL, y, rows, id, ui, t);
        }
        if ui.fields(s).contains(&FieldId::TypedBits) {
            y = self.compose_field(PANEL_COL, y, TYPED_ROWS, FieldId::TypedBits, ui, t);
        }
        y
    }

    /// One swatch per palette value. Encode chips are clickable.
    fn compose_chips(&mut self, x0: usize, y: usize, palette: &[Colour], selected: Option<u8>, clickable: bool, t: &Theme) {
        let max_x = self.front.width;
        let mut x = self.front.put_str(x0, y, "Colours ", t.dim, t.bg, max_x);
        for (v, &colour) in palette.iter().enumerate() {
            let v = v as u8;
            let start = x;
            let mark = if selected == Some(v) { ('>', '<') } else { (' ', ' ') };
            self.front.set(x, y, Cell::new(mark.0, t.accent, t.bg));
            self.front.set(x + 1, y, Cell::new(' ', t.fg, to_color(colour)));
            self.front.set(x + 2, y, Cell::new(' ', t.fg, to_color(colour)));
            self.front.set(x + 3, y, Cell::new(mark.1, t.accent, t.bg));
            x = self.front.put_str(x + 4, y, &format!("{v} "), t.fg, t.bg, max_x);
            if clickable {
                self.mark(start, x, y, Hit::Chip(v));
            }
        }
    }

    /// Label line plus `rows` lines of text, scrolled so the cursor stays
    /// visible. Returns the row after the field.
    fn compose_field(&mut self, x: usize, y: usize, rows: usize, id: FieldId, ui: &UiState, t: &Theme) -> usize {
        let max_x = self.front.width;
        let width = max_x.saturating_sub(x + 1).min(MAX_PUZZLE_SIZE * 2 + 8);
        let field = ui.field(id);
        let focused = ui.focus == Focus::Field(id);

        let (label_fg, prefix) = if focused { (t.focus, "> ") } else { (t.dim, "  ") };
        self.front.put_str(x, y, &format!("{prefix}{}", id.label()), label_fg, t.bg, max_x);
        self.mark(x, x + width, y, Hit::Field(id));

        let (line, col) = field.cursor_line_col();
        let top = line.saturating_sub(rows - 1);
        for r in 0..rows {
            let row = y + 1 + r;
            for cx in x..(x + width).min(max_x) {
                self.front.set(cx, row, Cell::new(' ', t.fg, t.field_bg));
            }
            self.mark(x, x + width, row, Hit::Field(id));
        }
        if field.is_empty() && !focused {
            self.front.put_str(x, y + 1, id.placeholder(), t.dim, t.field_bg, x + width);
        }
        for (r, text) in field.lines().skip(top).take(rows).enumerate() {
            self.front.put_str(x, y + 1 + r, text, t.fg, t.field_bg, x + width);
        }
        if focused && width > 0 {
            let cx = x + col.min(width - 1);
            let cy = y + 1 + (line - top);
            let under = self.front.get(cx, cy);
            let ch = if under.ch == ' ' { '_' } else { under.ch };
            self.front.set(cx, cy, Cell::new(ch, Color::Black, t.focus));
        }
        y + 1 + rows
    }

    fn compose_footer(&mut self, y: usize, s: &Session, ui: &UiState, t: &Theme) {
        let max_x = self.front.width;
        let status: &Status = match ui.tab {
            BoardId::Encode => &s.encode_status,
            BoardId::Decode => &s.decode_status,
        };
        if !status.text.is_empty() {
            let bg = if status.is_error { t.error } else { t.ok };
            self.front.fill_row(y, Color::White, bg);
            self.front.put_str(0, y, &format!(" {} ", status.text), Color::White, bg, max_x);
        }

        let help = match (ui.focus, ui.tab) {
            (Focus::Field(id), _) => format!(" Editing {}  Esc:board  Tab:next field  F5:check", id.label()),
            (Focus::Board, BoardId::Encode) => {
                " Arrows:move  Space:paint  0-3:colour  e:eraser  f:fill  c:clear  s:size  b:depth  x:share  F5:check  F1:decode  q:quit"
                    .to_string()
            }
            (Focus::Board, BoardId::Decode) => {
                " Arrows:move  Space:cycle  l:levels  r:restart  u:decode fields  F5:check  F1:encode  q:quit".to_string()
            }
        };
        self.front.put_str(0, y + 2, &help, t.dim, t.bg, max_x);
        self.front.put_str(0, y + 3, " F6:timer  F7:mistakes  F8:colour-blind  F9:contrast  Tab:fields", t.dim, t.bg, max_x);
    }

    fn draw_frame(&mut self, x: usize, y: usize, w: usize, h: usize, fg: Color, bg: Color) {
        let (right, bottom) = (x + w - 1, y + h - 1);
        for cx in x + 1..right {
            self.front.set(cx, y, Cell::new('─', fg, bg));
            self.front.set(cx, bottom, Cell::new('─', fg, bg));
        }
        for cy in y + 1..bottom {
            self.front.set(x, cy, Cell::new('│', fg, bg));
            self.front.set(right, cy, Cell::new('│', fg, bg));
        }
        self.front.set(x, y, Cell::new('┌', fg, bg));
        self.front.set(right, y, Cell::new('┐', fg, bg));
        self.front.set(x, bottom, Cell::new('└', fg, bg));
        self.front.set(right, bottom, Cell::new('┘', fg, bg));
    }

    fn mark(&mut self, x0: usize, x1: usize, y: usize, hit: Hit) {
        if y >= self.term_h {
            return;
        }
        for x in x0..x1.min(self.term_w) {
            self.hits[y * self.term_w + x] = Some(hit);
        }
    }
}

fn theme_for(s: &Session) -> &'static Theme {
    if s.settings.high_contrast { &HIGH_CONTRAST } else { &NORMAL }
}

fn to_color(c: Colour) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

/// Readable marker colour on top of a cell.
fn marker_fg(c: Colour) -> Color {
    if c.luminance() > 0.5 { Color::Black } else { Color::White }
}

fn ellipsize(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
