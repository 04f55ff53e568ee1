/// Session: the one owner of all mutable state.
///
/// Input handlers never touch boards directly. They build a `Command` and
/// hand it to `Session::apply`, which mutates the state and reports what
/// happened as an `Outcome` (redraw hint + events for sound).
///
/// ## Challenge state machine
///
/// ```text
///   Idle ──StartLevels/LoadLevel──▶ Challenge ──RestartChallenge──▶ Challenge
///                                    │  pass (level) + advance delay
///                                    ▼
///                     next level: Challenge   |   catalog exhausted: Complete
/// ```
///
/// Custom and shared puzzles enter `Challenge` outside the level sequence
/// and do not advance on a pass.
///
/// ## Scheduled work
///
/// The challenge owns a timer `Interval` (display refresh), a `Deadline`
/// (advance after a pass) and the scoring clock. Every level load and
/// every exit from `Challenge` cancels both tasks first, so at most one of
/// each is ever live.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::config::MosaicConfig;
use crate::domain::bitstream::{self, clean_bitstream, expected_len};
use crate::domain::board::{Board, BoardId, DragStroke, Tool};
use crate::domain::error::{CodecError, Result as CodecResult};
use crate::domain::grid::{BitDepth, Dir, Grid, GRID_SIZES};
use crate::domain::legend::{StudentLegend, ValueLegend};
use crate::domain::palette::{self, Colour};
use crate::domain::scoring::{self, CheckResult, ScoreReport};
use crate::domain::share::{extract_code, SharePayload};

use super::event::MosaicEvent;
use super::level::{Catalog, Preset, PuzzleMode, MAX_PUZZLE_SIZE};
use super::timer::{ChallengeClock, Deadline, Interval};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Idle,
    Challenge,
    Complete,
}

/// Where the current target came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Source {
    Level(usize),
    Custom,
}

/// One line of feedback under a board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Status { text: text.into(), is_error: false }
    }

    fn error(text: impl Into<String>) -> Self {
        Status { text: text.into(), is_error: true }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub timer_enabled: bool,
    pub show_mistakes: bool,
    pub colour_blind: bool,
    pub high_contrast: bool,
}

/// The decode side: target, player board and everything scheduled.
#[derive(Clone, Debug)]
pub struct Challenge {
    pub mode: Mode,
    pub source: Option<Source>,
    pub title: String,
    pub puzzle_mode: PuzzleMode,
    pub target: Grid,
    pub player: Board,
    /// Legend shown next to the board.
    pub legend_text: String,
    /// Bitstream to decode (empty for type-the-bits puzzles).
    pub bitstream_text: String,
    /// Last submitted answer of a type-the-bits puzzle.
    pub typed: String,
    /// Cells highlighted after a failed check.
    pub wrong: BTreeSet<usize>,
    pub report: Option<ScoreReport>,
    /// Seconds shown by the timer readout.
    pub elapsed_display: u64,
    clock: ChallengeClock,
    ticker: Interval,
    advance: Deadline,
}

impl Challenge {
    fn new(timer_interval: Duration) -> Self {
        let (size, depth) = (GRID_SIZES[0], BitDepth::One);
        Challenge {
            mode: Mode::Idle,
            source: None,
            title: String::new(),
            puzzle_mode: PuzzleMode::Paint,
            target: Grid::new(size, depth),
            player: Board::new(size, depth),
            legend_text: String::new(),
            bitstream_text: String::new(),
            typed: String::new(),
            wrong: BTreeSet::new(),
            report: None,
            elapsed_display: 0,
            clock: ChallengeClock::default(),
            ticker: Interval::new(timer_interval),
            advance: Deadline::default(),
        }
    }

    fn begin(&mut self, preset: Preset, source: Source, legend_text: String, bitstream_text: String) {
        let (size, depth) = (preset.size(), preset.depth());
        self.mode = Mode::Challenge;
        self.source = Some(source);
        self.title = preset.title;
        self.puzzle_mode = preset.mode;
        self.target = preset.target;
        self.player = Board::new(size, depth);
        self.legend_text = legend_text;
        self.bitstream_text = bitstream_text;
        self.reset_answer();
    }

    fn reset_answer(&mut self) {
        let (size, depth) = (self.target.size(), self.target.depth());
        self.player.reshape(size, depth);
        self.typed.clear();
        self.wrong.clear();
        self.report = None;
        self.elapsed_display = 0;
    }

    /// Cancel the tick interval and any pending advance.
    fn cancel_tasks(&mut self) {
        self.ticker.cancel();
        self.advance.cancel();
    }

    /// Restart the scoring clock; a disabled timer or a finished
    /// challenge freezes elapsed time at 0.
    fn restart_timer(&mut self, now: Instant, enabled: bool) {
        self.ticker.cancel();
        self.elapsed_display = 0;
        if !enabled || self.mode != Mode::Challenge {
            self.clock.stop();
            return;
        }
        self.clock.start(now);
        self.ticker.start(now);
    }

    /// Painting the decode board only makes sense in a paint challenge.
    pub fn accepts_paint(&self) -> bool {
        self.mode == Mode::Challenge && self.puzzle_mode == PuzzleMode::Paint
    }

    pub fn is_advance_pending(&self) -> bool {
        self.advance.is_pending()
    }

    pub fn level(&self) -> Option<usize> {
        match self.source {
            Some(Source::Level(i)) => Some(i),
            _ => None,
        }
    }
}

/// Everything a handler can ask the session to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Focus(BoardId),
    /// Click on a cell: paint (encode) or cycle its value (decode).
    Paint { board: BoardId, index: usize },
    PaintAtCursor(BoardId),
    MoveCursor(BoardId, Dir),
    SelectValue(u8),
    NextValue,
    SetTool(Tool),
    FillAll,
    Clear,
    Resize(usize),
    SetBitDepth(BitDepth),
    DragBegin { board: BoardId, index: usize },
    DragEnter { board: BoardId, index: usize },
    DragEnd,
    StartLevels,
    LoadLevel(usize),
    RestartChallenge,
    CheckChallenge,
    SubmitTypedBits(String),
    CheckEncodeAnswer { legend: String, bitstream: String },
    StartCustomChallenge { legend: String, bitstream: String },
    ImportShareCode(String),
    ExportShareCode,
    ToggleTimer,
    ToggleShowMistakes,
    ToggleColourBlind,
    ToggleHighContrast,
    /// Poll scheduled work.
    Tick,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub render: bool,
    pub events: Vec<MosaicEvent>,
}

pub struct Session {
    pub encode: Board,
    pub challenge: Challenge,
    pub focus: BoardId,
    pub settings: Settings,
    pub encode_status: Status,
    pub decode_status: Status,
    pub level_status: String,
    /// Last exported share code, as a `#mosaic=` fragment.
    pub share_code: Option<String>,
    catalog: Catalog,
    advance_delay: Duration,
    drag: Option<DragStroke>,
}

// ══════════════════════════════════════════════════════════════
// Construction and queries
// ══════════════════════════════════════════════════════════════

impl Session {
    pub fn new(config: &MosaicConfig, catalog: Catalog) -> Self {
        let board = &config.board;
        Session {
            encode: Board::new(board.grid_size, board.bit_depth),
            challenge: Challenge::new(config.timing.timer_interval()),
            focus: BoardId::Encode,
            settings: Settings {
                timer_enabled: board.timer_enabled,
                show_mistakes: board.show_mistakes,
                colour_blind: board.colour_blind,
                high_contrast: board.high_contrast,
            },
            encode_status: Status::info("Paint an image, then write its legend and bitstream."),
            decode_status: Status::info("Tutorial first, then start level 1."),
            level_status: "Read the tutorial, then press Start levels.".into(),
            share_code: None,
            catalog,
            advance_delay: config.timing.advance_delay(),
            drag: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Active palette for a depth.
    pub fn palette(&self, depth: BitDepth) -> &'static [Colour] {
        palette::palette(depth, self.settings.colour_blind)
    }

    pub fn board(&self, id: BoardId) -> &Board {
        match id {
            BoardId::Encode => &self.encode,
            BoardId::Decode => &self.challenge.player,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // ══════════════════════════════════════════════════════════════
    // Dispatch
    // ══════════════════════════════════════════════════════════════

    pub fn apply(&mut self, cmd: Command, now: Instant) -> Outcome {
        if cmd == Command::Tick {
            return self.tick(now);
        }

        let mut out = Outcome { render: true, events: vec![] };
        match cmd {
            Command::Focus(board) => self.focus = board,
            Command::Paint { board, index } => self.paint(board, index, &mut out),
            Command::PaintAtCursor(board) => {
                let index = self.board(board).cursor;
                self.paint(board, index, &mut out);
            }
            Command::MoveCursor(board, dir) => match board {
                BoardId::Encode => self.encode.move_cursor(dir),
                BoardId::Decode => self.challenge.player.move_cursor(dir),
            },
            Command::SelectValue(value) => {
                if !self.encode.select(value) {
                    let max = self.encode.depth().max_value();
                    self.reject(BoardId::Encode, format!("Colour {value} needs a deeper bit depth (max {max})."), &mut out);
                }
            }
            Command::NextValue => {
                let next = (self.encode.selected + 1) % self.encode.depth().levels() as u8;
                self.encode.select(next);
            }
            Command::SetTool(tool) => self.encode.tool = tool,
            Command::FillAll => {
                self.encode.fill();
                out.events.push(MosaicEvent::BoardFilled);
            }
            Command::Clear => self.encode.clear(),
            Command::Resize(size) => self.resize(size, &mut out),
            Command::SetBitDepth(depth) => {
                let size = self.encode.size();
                self.encode.reshape(size, depth);
                self.share_code = None;
            }
            Command::DragBegin { board, index } => self.drag_begin(board, index, &mut out),
            Command::DragEnter { board, index } => self.drag_enter(board, index, &mut out),
            Command::DragEnd => self.drag = None,
            Command::StartLevels => self.load_level(0, now, &mut out),
            Command::LoadLevel(index) => self.load_level(index, now, &mut out),
            Command::RestartChallenge => self.restart_challenge(now, &mut out),
            Command::CheckChallenge => self.check_challenge(now, &mut out),
            Command::SubmitTypedBits(text) => {
                if self.challenge.mode == Mode::Challenge && self.challenge.puzzle_mode == PuzzleMode::TypeBits {
                    self.challenge.typed = text;
                }
                self.check_challenge(now, &mut out);
            }
            Command::CheckEncodeAnswer { legend, bitstream } => {
                self.check_encode_answer(&legend, &bitstream, &mut out)
            }
            Command::StartCustomChallenge { legend, bitstream } => {
                match self.decode_custom(&legend, &bitstream) {
                    Ok(preset) => self.start_custom(preset, legend, bitstream, now, &mut out),
                    Err(e) => self.reject(BoardId::Decode, e, &mut out),
                }
            }
            Command::ImportShareCode(code) => self.import_share_code(&code, now, &mut out),
            Command::ExportShareCode => self.export_share_code(&mut out),
            Command::ToggleTimer => {
                self.settings.timer_enabled = !self.settings.timer_enabled;
                self.challenge.restart_timer(now, self.settings.timer_enabled);
                tracing::debug!(enabled = self.settings.timer_enabled, "timer toggled");
            }
            Command::ToggleShowMistakes => {
                self.settings.show_mistakes = !self.settings.show_mistakes;
                if !self.settings.show_mistakes {
                    self.challenge.wrong.clear();
                }
            }
            Command::ToggleColourBlind => self.settings.colour_blind = !self.settings.colour_blind,
            Command::ToggleHighContrast => self.settings.high_contrast = !self.settings.high_contrast,
            Command::Tick => {}
        }
        out
    }

    fn tick(&mut self, now: Instant) -> Outcome {
        let mut out = Outcome::default();
        if self.challenge.ticker.poll(now) {
            self.challenge.elapsed_display = self.challenge.clock.elapsed_secs(now);
            out.render = true;
        }
        if self.challenge.advance.poll(now) {
            if let Some(level) = self.challenge.level() {
                self.load_level(level + 1, now, &mut out);
            }
            out.render = true;
        }
        out
    }

    fn reject(&mut self, board: BoardId, message: impl Display, out: &mut Outcome) {
        let text = message.to_string();
        tracing::warn!(?board, "rejected: {text}");
        match board {
            BoardId::Encode => self.encode_status = Status::error(text),
            BoardId::Decode => self.decode_status = Status::error(text),
        }
        out.events.push(MosaicEvent::InputRejected);
    }

    // ══════════════════════════════════════════════════════════════
    // Painting
    // ══════════════════════════════════════════════════════════════

    fn paint(&mut self, board: BoardId, index: usize, out: &mut Outcome) {
        let value = match board {
            BoardId::Encode => self.encode.tool_value(),
            BoardId::Decode => {
                if !self.challenge.accepts_paint() {
                    return;
                }
                self.challenge.player.cycled_value(index)
            }
        };
        self.paint_value(board, index, value, out);
    }

    fn paint_value(&mut self, board: BoardId, index: usize, value: u8, out: &mut Outcome) {
        let painted = match board {
            BoardId::Encode => self.encode.paint_value(index, value),
            BoardId::Decode => {
                let painted = self.challenge.accepts_paint() && self.challenge.player.paint_value(index, value);
                if painted {
                    self.challenge.wrong.clear();
                }
                painted
            }
        };
        if painted {
            self.focus = board;
            out.events.push(MosaicEvent::CellPainted { board, index, value });
        }
    }

    fn drag_begin(&mut self, board: BoardId, index: usize, out: &mut Outcome) {
        if self.board(board).grid.get(index).is_none() {
            return;
        }
        let value = match board {
            BoardId::Encode => self.encode.tool_value(),
            BoardId::Decode if self.challenge.accepts_paint() => self.challenge.player.cycled_value(index),
            BoardId::Decode => return,
        };
        let mut stroke = DragStroke::begin(board, value);
        stroke.enter(board, index);
        self.drag = Some(stroke);
        self.paint_value(board, index, value, out);
    }

    fn drag_enter(&mut self, board: BoardId, index: usize, out: &mut Outcome) {
        let Some(stroke) = self.drag.as_mut() else { return };
        if let Some(value) = stroke.enter(board, index) {
            self.paint_value(board, index, value, out);
        }
    }

    fn resize(&mut self, size: usize, out: &mut Outcome) {
        if !GRID_SIZES.contains(&size) {
            let sizes = GRID_SIZES.map(|s| s.to_string()).join("/");
            self.reject(BoardId::Encode, format!("Grid size must be one of {sizes}."), out);
            return;
        }
        let depth = self.encode.depth();
        self.encode.reshape(size, depth);
        self.share_code = None;
    }

    // ══════════════════════════════════════════════════════════════
    // Levels and challenges
    // ══════════════════════════════════════════════════════════════

    fn load_level(&mut self, index: usize, now: Instant, out: &mut Outcome) {
        self.drag = None;
        self.challenge.cancel_tasks();

        let Some(preset) = self.catalog.get(index).cloned() else {
            self.challenge.mode = Mode::Complete;
            self.challenge.restart_timer(now, false);
            self.level_status = "All levels complete.".into();
            self.decode_status = Status::info("You completed all levels!");
            tracing::info!("all levels complete");
            out.events.push(MosaicEvent::AllLevelsComplete);
            return;
        };

        let legend_text = ValueLegend::identity(preset.depth()).to_text();
        let bitstream_text = match preset.mode {
            PuzzleMode::Paint => bitstream::encode(preset.cells(), preset.depth(), preset.size(), true),
            PuzzleMode::TypeBits => String::new(),
        };
        self.level_status = format!("Level {} of {}: {}", index + 1, self.catalog.len(), preset.title);
        tracing::info!(level = index, title = %preset.title, mode = preset.mode.label(), "level loaded");

        let mode = preset.mode;
        self.challenge.begin(preset, Source::Level(index), legend_text, bitstream_text);
        self.challenge.restart_timer(now, self.settings.timer_enabled);
        self.decode_status = Status::info(start_message(mode));
        self.focus = BoardId::Decode;
        out.events.push(MosaicEvent::ChallengeStarted { level: Some(index) });
    }

    fn start_custom(&mut self, preset: Preset, legend: String, bitstream: String, now: Instant, out: &mut Outcome) {
        self.drag = None;
        self.challenge.cancel_tasks();

        let size = preset.size();
        let bits = preset.depth().bits();
        self.level_status = format!("{}: {size}x{size}, {bits}-bit", preset.title);
        tracing::info!(title = %preset.title, size, bits, "custom challenge started");

        let mode = preset.mode;
        self.challenge.begin(preset, Source::Custom, legend, bitstream);
        self.challenge.restart_timer(now, self.settings.timer_enabled);
        self.decode_status = Status::info(start_message(mode));
        self.focus = BoardId::Decode;
        out.events.push(MosaicEvent::ChallengeStarted { level: None });
    }

    fn restart_challenge(&mut self, now: Instant, out: &mut Outcome) {
        if self.challenge.source.is_none() {
            self.reject(BoardId::Decode, "Start levels first.", out);
            return;
        }
        self.drag = None;
        self.challenge.cancel_tasks();
        self.challenge.mode = Mode::Challenge;
        self.challenge.reset_answer();
        self.challenge.restart_timer(now, self.settings.timer_enabled);
        self.decode_status = Status::info("Challenge restarted. Decode and paint again.");
    }

    fn check_challenge(&mut self, now: Instant, out: &mut Outcome) {
        if self.challenge.mode != Mode::Challenge {
            self.reject(BoardId::Decode, "Press Start levels first.", out);
            return;
        }

        let target = self.challenge.target.cells();
        let result = match self.challenge.puzzle_mode {
            PuzzleMode::Paint => scoring::check(self.challenge.player.grid.cells(), target),
            PuzzleMode::TypeBits => scoring::check_typed(&self.challenge.typed, target, self.challenge.target.depth()),
        };
        let report = ScoreReport::new(result, self.challenge.clock.elapsed_secs(now));
        tracing::info!(
            percentage = report.percentage,
            elapsed = report.elapsed_secs,
            score = report.score,
            "challenge checked"
        );

        self.challenge.wrong = if self.settings.show_mistakes {
            report.check.wrong.clone()
        } else {
            BTreeSet::new()
        };

        if report.passed() {
            self.decode_status = match self.challenge.source {
                Some(Source::Level(_)) => {
                    self.challenge.advance.schedule(now, self.advance_delay);
                    Status::info("Correct! Moving to next level...")
                }
                _ => Status::info("Correct! Puzzle solved."),
            };
            out.events.push(MosaicEvent::CheckPassed { score: report.score });
        } else {
            let hint = match self.challenge.puzzle_mode {
                PuzzleMode::Paint => "Not correct yet. Fix highlighted cells and check again.",
                PuzzleMode::TypeBits => "Not correct yet. Fix the highlighted codes and check again.",
            };
            self.decode_status = Status::error(hint);
            out.events.push(MosaicEvent::CheckFailed { percentage: report.percentage });
        }
        self.challenge.report = Some(report);
    }

    /// Build a target from a pasted legend and bitstream. The grid side is
    /// whatever square the clean bitstream fills.
    fn decode_custom(&self, legend_text: &str, bitstream_text: &str) -> CodecResult<Preset> {
        let student = StudentLegend::parse(legend_text)?;
        let depth = student.depth();
        let legend = student.resolve(self.palette(depth))?;

        let actual = clean_bitstream(bitstream_text).len();
        let size = (1..=MAX_PUZZLE_SIZE)
            .find(|&s| expected_len(s, depth) == actual)
            .ok_or_else(|| {
                let fit = GRID_SIZES
                    .iter()
                    .copied()
                    .find(|&s| expected_len(s, depth) >= actual)
                    .unwrap_or(MAX_PUZZLE_SIZE);
                CodecError::LengthMismatch { actual, expected: expected_len(fit, depth) }
            })?;

        let values = bitstream::decode(bitstream_text, size, depth, &legend)?;
        let target = Grid::from_cells(size, depth, values)
            .ok_or(CodecError::ValueOutOfRange { max: depth.max_value() })?;
        Ok(Preset { title: "Custom puzzle".into(), mode: PuzzleMode::Paint, target })
    }

    // ══════════════════════════════════════════════════════════════
    // Encode tab
    // ══════════════════════════════════════════════════════════════

    fn check_encode_answer(&mut self, legend_text: &str, bitstream_text: &str, out: &mut Outcome) {
        match self.grade_encode_answer(legend_text, bitstream_text) {
            Err(e) => self.reject(BoardId::Encode, e, out),
            Ok(result) if result.is_perfect() => {
                tracing::info!("encode answer correct");
                self.encode_status = Status::info("Correct! Your legend and bitstream match the image.");
                out.events.push(MosaicEvent::EncodeAnswerCorrect);
            }
            Ok(result) => {
                let pct = result.percentage();
                tracing::info!(percentage = pct, wrong = result.wrong.len(), "encode answer incorrect");
                self.encode_status = Status::error(format!(
                    "Not quite yet: {} of {} cells ({pct}%) decode correctly. Keep trying.",
                    result.correct, result.total
                ));
                out.events.push(MosaicEvent::CheckFailed { percentage: pct });
            }
        }
    }

    /// Compare the student's decoded answer with the encode board, cell by cell.
    fn grade_encode_answer(&self, legend_text: &str, bitstream_text: &str) -> CodecResult<CheckResult> {
        let depth = self.encode.depth();
        let student = StudentLegend::parse(legend_text)?;
        if student.depth() != depth {
            return Err(CodecError::DepthMismatch { expected: depth.into(), actual: student.depth().into() });
        }
        let legend = student.resolve(self.palette(depth))?;
        let decoded = bitstream::decode(bitstream_text, self.encode.size(), depth, &legend)?;
        Ok(scoring::check(&decoded, self.encode.grid.cells()))
    }

    fn export_share_code(&mut self, out: &mut Outcome) {
        let legend = ValueLegend::identity(self.encode.depth());
        match SharePayload::new(self.encode.grid.clone(), legend) {
            Ok(payload) => {
                let fragment = payload.to_fragment();
                tracing::info!(code = %fragment, "share code exported");
                self.share_code = Some(fragment);
                self.encode_status = Status::info("Share code ready. Paste it into --import to load it.");
                out.events.push(MosaicEvent::ShareCodeExported);
            }
            Err(e) => self.reject(BoardId::Encode, e, out),
        }
    }

    fn import_share_code(&mut self, input: &str, now: Instant, out: &mut Outcome) {
        let payload = match SharePayload::decode(extract_code(input)) {
            Ok(p) => p,
            Err(e) => {
                self.reject(BoardId::Decode, e, out);
                return;
            }
        };
        let SharePayload { grid, legend } = payload;
        let Some(bits) = bitstream::encode_with(grid.cells(), grid.size(), &legend, true) else {
            self.reject(BoardId::Decode, CodecError::malformed("legend cannot encode every cell"), out);
            return;
        };
        let preset = Preset { title: "Shared puzzle".into(), mode: PuzzleMode::Paint, target: grid };
        self.start_custom(preset, legend.to_text(), bits, now, out);
    }
}

fn start_message(mode: PuzzleMode) -> &'static str {
    match mode {
        PuzzleMode::Paint => "Decode the bits by painting the grid, then press Check.",
        PuzzleMode::TypeBits => "Type the bitstream for this image, then press Check.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::embedded_presets;

    fn session() -> Session {
        Session::new(&MosaicConfig::default(), Catalog::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Copy the target onto the player board.
    fn solve(s: &mut Session) {
        let target = s.challenge.target.clone();
        for (i, &v) in target.cells().iter().enumerate() {
            s.challenge.player.paint_value(i, v);
        }
    }

    #[test]
    fn starts_idle_with_tutorial_status() {
        let s = session();
        assert_eq!(s.challenge.mode, Mode::Idle);
        assert_eq!(s.level_status, "Read the tutorial, then press Start levels.");
        assert_eq!(s.encode.size(), 16);
        assert_eq!(s.encode.depth(), BitDepth::One);
    }

    #[test]
    fn start_levels_loads_first_preset() {
        let mut s = session();
        let out = s.apply(Command::StartLevels, Instant::now());
        assert_eq!(out.events, vec![MosaicEvent::ChallengeStarted { level: Some(0) }]);
        assert_eq!(s.challenge.mode, Mode::Challenge);
        assert_eq!(s.challenge.level(), Some(0));
        assert_eq!(s.level_status, "Level 1 of 8: Easy 1");
        assert_eq!(s.challenge.legend_text, "00=0\n01=1\n10=2\n11=3");
        let first = &embedded_presets()[0];
        assert_eq!(s.challenge.bitstream_text, bitstream::encode(first.cells(), BitDepth::Two, 8, true));
        assert!(s.challenge.player.grid.cells().iter().all(|&v| v == 0));
        assert_eq!(s.focus, BoardId::Decode);
    }

    #[test]
    fn check_before_start_is_rejected() {
        let mut s = session();
        let out = s.apply(Command::CheckChallenge, Instant::now());
        assert_eq!(out.events, vec![MosaicEvent::InputRejected]);
        assert_eq!(s.decode_status, Status::error("Press Start levels first."));
    }

    #[test]
    fn restart_without_level_is_rejected() {
        let mut s = session();
        s.apply(Command::RestartChallenge, Instant::now());
        assert_eq!(s.decode_status, Status::error("Start levels first."));
        assert_eq!(s.challenge.mode, Mode::Idle);
    }

    #[test]
    fn partial_answer_scores_and_highlights_mistakes() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartCustomChallenge { legend: "0=0\n1=1".into(), bitstream: "01\n10".into() }, t0);
        assert_eq!(s.challenge.target.cells(), &[0, 1, 1, 0]);

        s.apply(Command::Paint { board: BoardId::Decode, index: 1 }, t0);
        let out = s.apply(Command::CheckChallenge, t0 + ms(5_400));

        assert_eq!(out.events, vec![MosaicEvent::CheckFailed { percentage: 75 }]);
        let report = s.challenge.report.clone().unwrap();
        assert_eq!(report.summary(), "Correct: 75% (3/4) | Time: 5s | Score: 745");
        assert_eq!(s.challenge.wrong, BTreeSet::from([2]));
        assert!(s.decode_status.is_error);
        assert!(!s.challenge.is_advance_pending());
    }

    #[test]
    fn decode_click_cycles_value() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        for expected in [1, 2, 3, 0] {
            s.apply(Command::Paint { board: BoardId::Decode, index: 9 }, t0);
            assert_eq!(s.challenge.player.grid.get(9), Some(expected));
        }
        assert_eq!(s.challenge.player.cursor, 9);
    }

    #[test]
    fn painting_clears_mistake_highlights() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        s.apply(Command::CheckChallenge, t0);
        assert!(!s.challenge.wrong.is_empty());
        s.apply(Command::Paint { board: BoardId::Decode, index: 0 }, t0);
        assert!(s.challenge.wrong.is_empty());
    }

    #[test]
    fn pass_advances_after_delay() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        solve(&mut s);

        let out = s.apply(Command::CheckChallenge, t0 + ms(2_000));
        assert_eq!(out.events, vec![MosaicEvent::CheckPassed { score: 998 }]);
        assert_eq!(s.decode_status, Status::info("Correct! Moving to next level..."));
        assert!(s.challenge.is_advance_pending());

        let out = s.apply(Command::Tick, t0 + ms(2_699));
        assert!(out.events.is_empty());
        assert_eq!(s.challenge.level(), Some(0));

        let out = s.apply(Command::Tick, t0 + ms(2_700));
        assert_eq!(out.events, vec![MosaicEvent::ChallengeStarted { level: Some(1) }]);
        assert_eq!(s.level_status, "Level 2 of 8: Easy 2");
        assert!(!s.challenge.is_advance_pending());
    }

    #[test]
    fn loading_a_level_cancels_pending_advance() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        solve(&mut s);
        s.apply(Command::CheckChallenge, t0);
        s.apply(Command::LoadLevel(3), t0 + ms(100));
        s.apply(Command::Tick, t0 + ms(5_000));
        assert_eq!(s.challenge.level(), Some(3));
    }

    #[test]
    fn passing_last_level_completes_catalog() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::LoadLevel(6), t0);
        solve(&mut s);
        s.apply(Command::CheckChallenge, t0);
        let out = s.apply(Command::Tick, t0 + ms(700));
        assert_eq!(out.events, vec![MosaicEvent::ChallengeStarted { level: Some(7) }]);

        // Hard 2 is a type-the-bits puzzle
        let answer = bitstream::encode(s.challenge.target.cells(), BitDepth::Two, 16, true);
        s.apply(Command::SubmitTypedBits(answer), t0 + ms(1_000));
        let out = s.apply(Command::Tick, t0 + ms(1_700));

        assert_eq!(out.events, vec![MosaicEvent::AllLevelsComplete]);
        assert_eq!(s.challenge.mode, Mode::Complete);
        assert_eq!(s.level_status, "All levels complete.");
        assert!(!s.challenge.is_advance_pending());
        assert!(!s.challenge.ticker.is_active());

        let out = s.apply(Command::CheckChallenge, t0 + ms(2_000));
        assert_eq!(out.events, vec![MosaicEvent::InputRejected]);
    }

    #[test]
    fn restart_clears_the_board_and_resumes() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        s.apply(Command::Paint { board: BoardId::Decode, index: 0 }, t0);
        s.apply(Command::RestartChallenge, t0 + ms(3_000));
        assert_eq!(s.challenge.mode, Mode::Challenge);
        assert_eq!(s.challenge.player.grid.get(0), Some(0));
        assert_eq!(s.decode_status, Status::info("Challenge restarted. Decode and paint again."));
        assert_eq!(s.challenge.clock.elapsed_secs(t0 + ms(4_000)), 1);
    }

    #[test]
    fn timer_ticks_update_the_readout() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        assert!(!s.apply(Command::Tick, t0 + ms(499)).render);
        assert!(s.apply(Command::Tick, t0 + ms(2_500)).render);
        assert_eq!(s.challenge.elapsed_display, 2);
    }

    #[test]
    fn disabled_timer_freezes_elapsed_at_zero() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        s.apply(Command::ToggleTimer, t0);
        assert!(!s.settings.timer_enabled);
        solve(&mut s);
        let out = s.apply(Command::CheckChallenge, t0 + ms(60_000));
        assert_eq!(out.events, vec![MosaicEvent::CheckPassed { score: 1000 }]);
        assert!(!s.apply(Command::Tick, t0 + ms(61_000)).events.is_empty());
    }

    #[test]
    fn hidden_mistakes_are_not_highlighted() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::ToggleShowMistakes, t0);
        s.apply(Command::StartLevels, t0);
        s.apply(Command::CheckChallenge, t0);
        assert!(s.challenge.wrong.is_empty());
        assert!(s.challenge.report.as_ref().is_some_and(|r| !r.check.wrong.is_empty()));
    }

    #[test]
    fn type_bits_puzzle_ignores_painting_and_grades_text() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::LoadLevel(2), t0);
        assert_eq!(s.challenge.puzzle_mode, PuzzleMode::TypeBits);
        assert!(s.challenge.bitstream_text.is_empty());

        let out = s.apply(Command::Paint { board: BoardId::Decode, index: 0 }, t0);
        assert!(out.events.is_empty());

        let out = s.apply(Command::SubmitTypedBits("0110".into()), t0);
        assert!(matches!(out.events[..], [MosaicEvent::CheckFailed { .. }]));

        let answer = bitstream::encode(s.challenge.target.cells(), BitDepth::Two, 8, false);
        let out = s.apply(Command::SubmitTypedBits(answer), t0);
        assert!(matches!(out.events[..], [MosaicEvent::CheckPassed { .. }]));
    }

    #[test]
    fn drag_paints_only_the_board_it_started_on() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        s.apply(Command::DragBegin { board: BoardId::Encode, index: 0 }, t0);
        s.apply(Command::DragEnter { board: BoardId::Decode, index: 1 }, t0);
        s.apply(Command::DragEnter { board: BoardId::Encode, index: 1 }, t0);
        s.apply(Command::DragEnter { board: BoardId::Encode, index: 0 }, t0);
        s.apply(Command::DragEnd, t0);
        s.apply(Command::DragEnter { board: BoardId::Encode, index: 2 }, t0);

        assert_eq!(&s.encode.grid.cells()[0..3], &[1, 1, 0]);
        assert_eq!(s.challenge.player.grid.get(1), Some(0));
        assert!(!s.is_dragging());
    }

    #[test]
    fn decode_drag_spreads_the_start_cells_next_value() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        s.apply(Command::Paint { board: BoardId::Decode, index: 0 }, t0); // 0 -> 1
        s.apply(Command::DragBegin { board: BoardId::Decode, index: 0 }, t0); // 1 -> 2
        s.apply(Command::DragEnter { board: BoardId::Decode, index: 1 }, t0);
        s.apply(Command::DragEnter { board: BoardId::Decode, index: 2 }, t0);
        assert_eq!(&s.challenge.player.grid.cells()[0..4], &[2, 2, 2, 0]);
    }

    #[test]
    fn drag_on_idle_decode_board_does_nothing() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::DragBegin { board: BoardId::Decode, index: 0 }, t0);
        assert!(!s.is_dragging());
    }

    #[test]
    fn cursor_keys_and_paint_at_cursor() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::MoveCursor(BoardId::Encode, Dir::Left), t0);
        s.apply(Command::MoveCursor(BoardId::Encode, Dir::Down), t0);
        s.apply(Command::MoveCursor(BoardId::Encode, Dir::Right), t0);
        assert_eq!(s.encode.cursor, 17);
        let out = s.apply(Command::PaintAtCursor(BoardId::Encode), t0);
        assert_eq!(out.events, vec![MosaicEvent::CellPainted { board: BoardId::Encode, index: 17, value: 1 }]);
    }

    #[test]
    fn resize_and_depth_change_reset_the_encode_board() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::FillAll, t0);
        s.apply(Command::Resize(8), t0);
        assert_eq!(s.encode.grid.len(), 64);
        assert!(s.encode.grid.cells().iter().all(|&v| v == 0));

        s.apply(Command::SetBitDepth(BitDepth::Two), t0);
        s.apply(Command::SelectValue(3), t0);
        s.apply(Command::SetBitDepth(BitDepth::One), t0);
        assert_eq!(s.encode.selected, 1);

        let out = s.apply(Command::Resize(10), t0);
        assert_eq!(out.events, vec![MosaicEvent::InputRejected]);
        assert_eq!(s.encode.size(), 8);
    }

    #[test]
    fn next_value_wraps_and_selects_paint() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::SetTool(Tool::Eraser), t0);
        s.apply(Command::NextValue, t0);
        assert_eq!(s.encode.selected, 0);
        assert_eq!(s.encode.tool, Tool::Paint);
    }

    fn encode_with_pattern(s: &mut Session) {
        let t0 = Instant::now();
        s.apply(Command::Resize(8), t0);
        s.apply(Command::Paint { board: BoardId::Encode, index: 0 }, t0);
        s.apply(Command::Paint { board: BoardId::Encode, index: 9 }, t0);
    }

    fn expected_bits(s: &Session) -> String {
        bitstream::encode(s.encode.grid.cells(), s.encode.depth(), s.encode.size(), true)
    }

    #[test]
    fn encode_answer_correct() {
        let mut s = session();
        encode_with_pattern(&mut s);
        let bits = expected_bits(&s);
        let out = s.apply(Command::CheckEncodeAnswer { legend: "0=0\n1=1".into(), bitstream: bits }, Instant::now());
        assert_eq!(out.events, vec![MosaicEvent::EncodeAnswerCorrect]);
        assert_eq!(s.encode_status, Status::info("Correct! Your legend and bitstream match the image."));
    }

    #[test]
    fn encode_answer_with_swapped_legend_and_inverted_bits_is_correct() {
        let mut s = session();
        encode_with_pattern(&mut s);
        let bits: String = expected_bits(&s)
            .chars()
            .map(|c| match c {
                '0' => '1',
                '1' => '0',
                other => other,
            })
            .collect();
        let out = s.apply(Command::CheckEncodeAnswer { legend: "0=1\n1=0".into(), bitstream: bits }, Instant::now());
        assert_eq!(out.events, vec![MosaicEvent::EncodeAnswerCorrect]);
    }

    #[test]
    fn encode_answer_accepts_colour_legend() {
        let mut s = session();
        encode_with_pattern(&mut s);
        let bits = expected_bits(&s);
        let legend = "0=#ffffff\n1=#111827".to_string();
        let out = s.apply(Command::CheckEncodeAnswer { legend, bitstream: bits }, Instant::now());
        assert_eq!(out.events, vec![MosaicEvent::EncodeAnswerCorrect]);
    }

    #[test]
    fn encode_answer_reports_partial_percentage() {
        let mut s = session();
        encode_with_pattern(&mut s);
        let bits = "0".repeat(64);
        s.apply(Command::CheckEncodeAnswer { legend: "0=0\n1=1".into(), bitstream: bits }, Instant::now());
        assert_eq!(
            s.encode_status,
            Status::error("Not quite yet: 62 of 64 cells (97%) decode correctly. Keep trying.")
        );
    }

    #[test]
    fn encode_answer_with_one_wrong_cell_on_16x16_is_not_correct() {
        let mut s = session();
        assert_eq!(s.encode.size(), 16);
        s.apply(Command::Paint { board: BoardId::Encode, index: 5 }, Instant::now());
        let bits = "0".repeat(256);
        let out = s.apply(Command::CheckEncodeAnswer { legend: "0=0\n1=1".into(), bitstream: bits }, Instant::now());
        assert_eq!(out.events, vec![MosaicEvent::CheckFailed { percentage: 100 }]);
        assert_eq!(
            s.encode_status,
            Status::error("Not quite yet: 255 of 256 cells (100%) decode correctly. Keep trying.")
        );
    }

    #[test]
    fn encode_answer_rejects_wrong_depth_and_bad_length() {
        let mut s = session();
        encode_with_pattern(&mut s);
        s.apply(
            Command::CheckEncodeAnswer { legend: "00=0\n01=1\n10=2\n11=3".into(), bitstream: String::new() },
            Instant::now(),
        );
        assert_eq!(s.encode_status, Status::error("Legend bit depth must be 1-bit for this grid."));

        s.apply(Command::CheckEncodeAnswer { legend: "0=0\n1=1".into(), bitstream: "101".into() }, Instant::now());
        assert_eq!(s.encode_status, Status::error("Bitstream length 3 does not match expected 64."));
    }

    #[test]
    fn failed_custom_decode_leaves_state_untouched() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartLevels, t0);
        let before = s.challenge.target.clone();

        let out = s.apply(Command::StartCustomChallenge { legend: "0=0\n1=1".into(), bitstream: "101".into() }, t0);
        assert_eq!(out.events, vec![MosaicEvent::InputRejected]);
        assert_eq!(s.decode_status, Status::error("Bitstream length 3 does not match expected 64."));
        assert_eq!(s.challenge.target, before);
        assert_eq!(s.challenge.level(), Some(0));

        s.apply(Command::StartCustomChallenge { legend: "00=0\n01=1\n10=2".into(), bitstream: "0000".into() }, t0);
        assert_eq!(
            s.decode_status,
            Status::error("Legend must include every binary code for the selected bit depth.")
        );
    }

    #[test]
    fn custom_pass_does_not_advance() {
        let t0 = Instant::now();
        let mut s = session();
        s.apply(Command::StartCustomChallenge { legend: "0=0\n1=1".into(), bitstream: "1001".into() }, t0);
        solve(&mut s);
        let out = s.apply(Command::CheckChallenge, t0);
        assert!(matches!(out.events[..], [MosaicEvent::CheckPassed { .. }]));
        assert!(!s.challenge.is_advance_pending());
        assert_eq!(s.decode_status, Status::info("Correct! Puzzle solved."));
    }

    #[test]
    fn share_code_export_then_import_rebuilds_the_image() {
        let t0 = Instant::now();
        let mut s = session();
        encode_with_pattern(&mut s);
        let out = s.apply(Command::ExportShareCode, t0);
        assert_eq!(out.events, vec![MosaicEvent::ShareCodeExported]);
        let fragment = s.share_code.clone().unwrap();
        assert!(fragment.starts_with("#mosaic="));

        let url = format!("https://example.org/mosaic/{fragment}");
        let out = s.apply(Command::ImportShareCode(url), t0);
        assert_eq!(out.events, vec![MosaicEvent::ChallengeStarted { level: None }]);
        assert_eq!(s.challenge.target, s.encode.grid);
        assert_eq!(s.challenge.source, Some(Source::Custom));
        assert_eq!(s.challenge.legend_text, "0=0\n1=1");
        assert_eq!(s.challenge.bitstream_text, expected_bits(&s));
    }

    #[test]
    fn malformed_share_code_is_rejected() {
        let t0 = Instant::now();
        let mut s = session();
        let out = s.apply(Command::ImportShareCode("#mosaic=%%%".into()), t0);
        assert_eq!(out.events, vec![MosaicEvent::InputRejected]);
        assert!(s.decode_status.text.starts_with("Share code is malformed"));
        assert_eq!(s.challenge.mode, Mode::Idle);
    }

    #[test]
    fn share_import_with_non_identity_legend_shows_its_encoding() {
        let t0 = Instant::now();
        let mut s = session();
        let grid = Grid::from_cells(2, BitDepth::One, vec![0, 1, 1, 1]).unwrap();
        let legend = ValueLegend::parse("0=1\n1=0").unwrap();
        let code = SharePayload::new(grid.clone(), legend).unwrap().encode();
        s.apply(Command::ImportShareCode(code), t0);
        assert_eq!(s.challenge.target, grid);
        assert_eq!(s.challenge.bitstream_text, "10\n00");
    }
}
