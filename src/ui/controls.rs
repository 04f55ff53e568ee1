/// Keyboard, mouse and gamepad handling.
///
/// `UiState` owns what only the terminal front end cares about: the active
/// board tab, keyboard focus and the text fields. Every handler turns raw
/// input into `Command`s for the session and never mutates a board itself.
///
/// Keys, board focused:
///   Arrows          move cursor          Space / Enter   paint
///   0-3             pick colour          n               next colour
///   e / p           eraser / paint tool  f / c           fill / clear
///   s / b           grid size / depth    x               export share code
///   l / r           start / restart      u               decode custom input
///   k / F5          check                q               quit
/// Keys, anywhere:
///   F1 switch board, Tab / Shift-Tab cycle focus, Esc back to board,
///   F6 timer, F7 mistakes, F8 colour-blind, F9 high contrast.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use binmosaic::domain::board::{BoardId, Tool};
use binmosaic::domain::grid::{Dir, GRID_SIZES};
use binmosaic::sim::event::MosaicEvent;
use binmosaic::sim::level::PuzzleMode;
use binmosaic::sim::session::{Command, Mode, Session};

use super::gamepad::GamepadState;
use super::input::Pointer;
use super::text_field::TextField;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldId {
    EncodeLegend,
    EncodeBits,
    DecodeLegend,
    DecodeBits,
    TypedBits,
}

impl FieldId {
    pub fn label(self) -> &'static str {
        match self {
            FieldId::EncodeLegend | FieldId::DecodeLegend => "Legend",
            FieldId::EncodeBits | FieldId::DecodeBits => "Bitstream",
            FieldId::TypedBits => "Your bits",
        }
    }

    /// Hint shown while the field is empty and unfocused.
    pub fn placeholder(self) -> &'static str {
        match self {
            FieldId::EncodeLegend | FieldId::DecodeLegend => "code=colour, one per line",
            FieldId::EncodeBits | FieldId::DecodeBits => "0s and 1s, row by row",
            FieldId::TypedBits => "type the codes for the image",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Focus {
    Board,
    Field(FieldId),
}

/// What sits under a screen position, as recorded by the renderer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hit {
    Cell(BoardId, usize),
    Field(FieldId),
    Tab(BoardId),
    Chip(u8),
}

pub struct UiState {
    pub tab: BoardId,
    pub focus: Focus,
    pub encode_legend: TextField,
    pub encode_bits: TextField,
    pub decode_legend: TextField,
    pub decode_bits: TextField,
    pub typed_bits: TextField,
    pub quit: bool,
}

impl UiState {
    pub fn new() -> Self {
        UiState {
            tab: BoardId::Encode,
            focus: Focus::Board,
            encode_legend: TextField::with_text("0=0\n1=1"),
            encode_bits: TextField::new(),
            decode_legend: TextField::new(),
            decode_bits: TextField::new(),
            typed_bits: TextField::new(),
            quit: false,
        }
    }

    pub fn field(&self, id: FieldId) -> &TextField {
        match id {
            FieldId::EncodeLegend => &self.encode_legend,
            FieldId::EncodeBits => &self.encode_bits,
            FieldId::DecodeLegend => &self.decode_legend,
            FieldId::DecodeBits => &self.decode_bits,
            FieldId::TypedBits => &self.typed_bits,
        }
    }

    fn field_mut(&mut self, id: FieldId) -> &mut TextField {
        match id {
            FieldId::EncodeLegend => &mut self.encode_legend,
            FieldId::EncodeBits => &mut self.encode_bits,
            FieldId::DecodeLegend => &mut self.decode_legend,
            FieldId::DecodeBits => &mut self.decode_bits,
            FieldId::TypedBits => &mut self.typed_bits,
        }
    }

    /// Fields on the active tab, in focus order.
    pub fn fields(&self, session: &Session) -> Vec<FieldId> {
        match self.tab {
            BoardId::Encode => vec![FieldId::EncodeLegend, FieldId::EncodeBits],
            BoardId::Decode if is_typing_challenge(session) => {
                vec![FieldId::DecodeLegend, FieldId::DecodeBits, FieldId::TypedBits]
            }
            BoardId::Decode => vec![FieldId::DecodeLegend, FieldId::DecodeBits],
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Keyboard
    // ══════════════════════════════════════════════════════════════

    pub fn handle_key(&mut self, key: KeyEvent, session: &Session) -> Vec<Command> {
        if let Some(cmds) = self.global_key(key, session) {
            return cmds;
        }
        match self.focus {
            Focus::Board => self.board_key(key, session),
            Focus::Field(id) => {
                self.field_key(id, key);
                vec![]
            }
        }
    }

    fn global_key(&mut self, key: KeyEvent, session: &Session) -> Option<Vec<Command>> {
        let cmds = match key.code {
            KeyCode::F(1) => self.switch_tab(other(self.tab)),
            KeyCode::Tab => {
                self.cycle_focus(session, true);
                vec![]
            }
            KeyCode::BackTab => {
                self.cycle_focus(session, false);
                vec![]
            }
            KeyCode::Esc => {
                self.focus = Focus::Board;
                vec![]
            }
            KeyCode::F(5) => vec![self.check_command(session)],
            KeyCode::F(6) => vec![Command::ToggleTimer],
            KeyCode::F(7) => vec![Command::ToggleShowMistakes],
            KeyCode::F(8) => vec![Command::ToggleColourBlind],
            KeyCode::F(9) => vec![Command::ToggleHighContrast],
            _ => return None,
        };
        Some(cmds)
    }

    fn board_key(&mut self, key: KeyEvent, session: &Session) -> Vec<Command> {
        let board = self.tab;
        if let Some(dir) = arrow_dir(key.code) {
            return vec![Command::MoveCursor(board, dir)];
        }
        let cmd = match (key.code, board) {
            (KeyCode::Char(' ') | KeyCode::Enter, _) => Command::PaintAtCursor(board),
            (KeyCode::Char('k'), _) => self.check_command(session),
            (KeyCode::Char('q'), _) => {
                self.quit = true;
                return vec![];
            }
            (KeyCode::Char(c @ '0'..='3'), BoardId::Encode) => Command::SelectValue(c as u8 - b'0'),
            (KeyCode::Char('n'), BoardId::Encode) => Command::NextValue,
            (KeyCode::Char('e'), BoardId::Encode) => Command::SetTool(Tool::Eraser),
            (KeyCode::Char('p'), BoardId::Encode) => Command::SetTool(Tool::Paint),
            (KeyCode::Char('f'), BoardId::Encode) => Command::FillAll,
            (KeyCode::Char('c'), BoardId::Encode) => Command::Clear,
            (KeyCode::Char('s'), BoardId::Encode) => Command::Resize(next_size(session.encode.size())),
            (KeyCode::Char('b'), BoardId::Encode) => Command::SetBitDepth(session.encode.depth().toggled()),
            (KeyCode::Char('x'), BoardId::Encode) => Command::ExportShareCode,
            (KeyCode::Char('l'), BoardId::Decode) => Command::StartLevels,
            (KeyCode::Char('r'), BoardId::Decode) => Command::RestartChallenge,
            (KeyCode::Char('u'), BoardId::Decode) => Command::StartCustomChallenge {
                legend: self.decode_legend.text().to_string(),
                bitstream: self.decode_bits.text().to_string(),
            },
            _ => return vec![],
        };
        vec![cmd]
    }

    fn field_key(&mut self, id: FieldId, key: KeyEvent) {
        let field = self.field_mut(id);
        match key.code {
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                field.insert_char(c)
            }
            KeyCode::Enter => field.insert_char('\n'),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Delete => field.delete(),
            KeyCode::Left => field.left(),
            KeyCode::Right => field.right(),
            KeyCode::Up => field.up(),
            KeyCode::Down => field.down(),
            KeyCode::Home => field.home(),
            KeyCode::End => field.end(),
            _ => {}
        }
    }

    /// Bracketed paste goes into the focused field. On the decode board
    /// it is taken as a share code.
    pub fn handle_paste(&mut self, text: &str) -> Vec<Command> {
        match (self.focus, self.tab) {
            (Focus::Field(id), _) => {
                self.field_mut(id).insert_str(text);
                vec![]
            }
            (Focus::Board, BoardId::Decode) => vec![Command::ImportShareCode(text.trim().to_string())],
            (Focus::Board, BoardId::Encode) => vec![],
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Mouse and gamepad
    // ══════════════════════════════════════════════════════════════

    pub fn handle_pointer(&mut self, action: Pointer, hit: Option<Hit>) -> Vec<Command> {
        match (action, hit) {
            (Pointer::Up, _) => vec![Command::DragEnd],
            (Pointer::Down, Some(Hit::Cell(board, index))) => {
                self.focus = Focus::Board;
                vec![Command::Focus(board), Command::DragBegin { board, index }]
            }
            (Pointer::Drag, Some(Hit::Cell(board, index))) => vec![Command::DragEnter { board, index }],
            (Pointer::Down, Some(Hit::Field(id))) => {
                self.focus = Focus::Field(id);
                vec![]
            }
            (Pointer::Down, Some(Hit::Tab(board))) => self.switch_tab(board),
            (Pointer::Down, Some(Hit::Chip(value))) => vec![Command::SelectValue(value)],
            _ => vec![],
        }
    }

    pub fn handle_gamepad(&mut self, gp: &GamepadState, session: &Session) -> Vec<Command> {
        let mut cmds = vec![];
        if gp.switch_tab_pressed() {
            cmds.extend(self.switch_tab(other(self.tab)));
        }
        let board = self.tab;
        if let Some(dir) = gp.dir_pressed() {
            self.focus = Focus::Board;
            cmds.push(Command::MoveCursor(board, dir));
        }
        if gp.next_value_pressed() && board == BoardId::Encode {
            cmds.push(Command::NextValue);
        }
        if gp.erase_pressed() && board == BoardId::Encode {
            cmds.push(Command::SetTool(Tool::Eraser));
        }
        if gp.paint_pressed() {
            cmds.push(Command::PaintAtCursor(board));
        }
        if gp.check_pressed() {
            cmds.push(self.check_command(session));
        }
        cmds
    }

    /// Refresh the decode fields whenever a new challenge is loaded.
    pub fn on_events(&mut self, events: &[MosaicEvent], session: &Session) {
        for event in events {
            if let MosaicEvent::ChallengeStarted { .. } = event {
                self.decode_legend.set_text(&session.challenge.legend_text);
                self.decode_bits.set_text(&session.challenge.bitstream_text);
                self.typed_bits.clear();
                self.tab = BoardId::Decode;
                self.focus = if is_typing_challenge(session) {
                    Focus::Field(FieldId::TypedBits)
                } else {
                    Focus::Board
                };
            }
        }
    }

    // ── Internal ──

    fn switch_tab(&mut self, tab: BoardId) -> Vec<Command> {
        self.tab = tab;
        self.focus = Focus::Board;
        vec![Command::Focus(tab)]
    }

    fn cycle_focus(&mut self, session: &Session, forward: bool) {
        let mut order = vec![Focus::Board];
        order.extend(self.fields(session).into_iter().map(Focus::Field));
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let n = order.len();
        let next = if forward { (pos + 1) % n } else { (pos + n - 1) % n };
        self.focus = order[next];
    }

    fn check_command(&self, session: &Session) -> Command {
        match self.tab {
            BoardId::Encode => Command::CheckEncodeAnswer {
                legend: self.encode_legend.text().to_string(),
                bitstream: self.encode_bits.text().to_string(),
            },
            BoardId::Decode if is_typing_challenge(session) => {
                Command::SubmitTypedBits(self.typed_bits.text().to_string())
            }
            BoardId::Decode => Command::CheckChallenge,
        }
    }
}

fn is_typing_challenge(session: &Session) -> bool {
    session.challenge.mode == Mode::Challenge && session.challenge.puzzle_mode == PuzzleMode::TypeBits
}

fn other(tab: BoardId) -> BoardId {
    match tab {
        BoardId::Encode => BoardId::Decode,
        BoardId::Decode => BoardId::Encode,
    }
}

fn next_size(current: usize) -> usize {
    let pos = GRID_SIZES.iter().position(|&s| s == current).unwrap_or(0);
    GRID_SIZES[(pos + 1) % GRID_SIZES.len()]
}

fn arrow_dir(code: KeyCode) -> Option<Dir> {
    match code {
        KeyCode::Up => Some(Dir::Up),
        KeyCode::Down => Some(Dir::Down),
        KeyCode::Left => Some(Dir::Left),
        KeyCode::Right => Some(Dir::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binmosaic::config::MosaicConfig;
    use binmosaic::domain::grid::BitDepth;
    use binmosaic::sim::level::Catalog;
    use std::time::Instant;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup() -> (UiState, Session) {
        (UiState::new(), Session::new(&MosaicConfig::default(), Catalog::default()))
    }

    #[test]
    fn encode_board_keys() {
        let (mut ui, s) = setup();
        assert_eq!(ui.handle_key(key(KeyCode::Left), &s), vec![Command::MoveCursor(BoardId::Encode, Dir::Left)]);
        assert_eq!(ui.handle_key(key(KeyCode::Char(' ')), &s), vec![Command::PaintAtCursor(BoardId::Encode)]);
        assert_eq!(ui.handle_key(key(KeyCode::Char('2')), &s), vec![Command::SelectValue(2)]);
        assert_eq!(ui.handle_key(key(KeyCode::Char('s')), &s), vec![Command::Resize(8)]);
        assert_eq!(ui.handle_key(key(KeyCode::Char('b')), &s), vec![Command::SetBitDepth(BitDepth::Two)]);
        assert_eq!(ui.handle_key(key(KeyCode::Char('l')), &s), vec![]);
    }

    #[test]
    fn next_size_wraps() {
        assert_eq!(next_size(8), 12);
        assert_eq!(next_size(16), 8);
    }

    #[test]
    fn check_on_encode_sends_field_text() {
        let (mut ui, s) = setup();
        ui.encode_bits.set_text("0101");
        assert_eq!(
            ui.handle_key(key(KeyCode::F(5)), &s),
            vec![Command::CheckEncodeAnswer { legend: "0=0\n1=1".into(), bitstream: "0101".into() }]
        );
    }

    #[test]
    fn focused_field_swallows_letters() {
        let (mut ui, s) = setup();
        ui.handle_key(key(KeyCode::Tab), &s);
        ui.handle_key(key(KeyCode::Tab), &s);
        assert_eq!(ui.focus, Focus::Field(FieldId::EncodeBits));
        assert!(ui.handle_key(key(KeyCode::Char('q')), &s).is_empty());
        assert!(!ui.quit);
        ui.handle_key(key(KeyCode::Char('1')), &s);
        assert_eq!(ui.encode_bits.text(), "q1");

        ui.handle_key(key(KeyCode::Esc), &s);
        ui.handle_key(key(KeyCode::Char('q')), &s);
        assert!(ui.quit);
    }

    #[test]
    fn back_tab_wraps_to_last_field() {
        let (mut ui, s) = setup();
        ui.handle_key(key(KeyCode::BackTab), &s);
        assert_eq!(ui.focus, Focus::Field(FieldId::EncodeBits));
        ui.handle_key(key(KeyCode::Tab), &s);
        assert_eq!(ui.focus, Focus::Board);
    }

    #[test]
    fn decode_tab_start_and_custom() {
        let (mut ui, s) = setup();
        assert_eq!(ui.handle_key(key(KeyCode::F(1)), &s), vec![Command::Focus(BoardId::Decode)]);
        assert_eq!(ui.handle_key(key(KeyCode::Char('l')), &s), vec![Command::StartLevels]);
        assert_eq!(ui.handle_key(key(KeyCode::Char('k')), &s), vec![Command::CheckChallenge]);
        ui.decode_legend.set_text("0=0\n1=1");
        ui.decode_bits.set_text("0110");
        assert_eq!(
            ui.handle_key(key(KeyCode::Char('u')), &s),
            vec![Command::StartCustomChallenge { legend: "0=0\n1=1".into(), bitstream: "0110".into() }]
        );
    }

    #[test]
    fn new_challenge_refreshes_decode_fields() {
        let (mut ui, mut s) = setup();
        let out = s.apply(Command::StartLevels, Instant::now());
        ui.on_events(&out.events, &s);
        assert_eq!(ui.tab, BoardId::Decode);
        assert_eq!(ui.decode_legend.text(), s.challenge.legend_text);
        assert_eq!(ui.decode_bits.text(), s.challenge.bitstream_text);
        assert_eq!(ui.focus, Focus::Board);
    }

    #[test]
    fn type_bits_challenge_focuses_answer_and_submits_it() {
        let (mut ui, mut s) = setup();
        let out = s.apply(Command::LoadLevel(2), Instant::now());
        ui.on_events(&out.events, &s);
        assert_eq!(ui.focus, Focus::Field(FieldId::TypedBits));
        ui.handle_key(key(KeyCode::Char('0')), &s);
        ui.handle_key(key(KeyCode::Char('1')), &s);
        assert_eq!(ui.handle_key(key(KeyCode::F(5)), &s), vec![Command::SubmitTypedBits("01".into())]);
    }

    #[test]
    fn pointer_stroke_maps_to_drag_commands() {
        let (mut ui, _) = setup();
        let hit = Some(Hit::Cell(BoardId::Encode, 5));
        assert_eq!(
            ui.handle_pointer(Pointer::Down, hit),
            vec![Command::Focus(BoardId::Encode), Command::DragBegin { board: BoardId::Encode, index: 5 }]
        );
        assert_eq!(
            ui.handle_pointer(Pointer::Drag, Some(Hit::Cell(BoardId::Encode, 6))),
            vec![Command::DragEnter { board: BoardId::Encode, index: 6 }]
        );
        assert_eq!(ui.handle_pointer(Pointer::Drag, None), vec![]);
        assert_eq!(ui.handle_pointer(Pointer::Up, None), vec![Command::DragEnd]);
    }

    #[test]
    fn clicks_on_fields_chips_and_tabs() {
        let (mut ui, _) = setup();
        ui.handle_pointer(Pointer::Down, Some(Hit::Field(FieldId::EncodeLegend)));
        assert_eq!(ui.focus, Focus::Field(FieldId::EncodeLegend));
        assert_eq!(ui.handle_pointer(Pointer::Down, Some(Hit::Chip(1))), vec![Command::SelectValue(1)]);
        assert_eq!(
            ui.handle_pointer(Pointer::Down, Some(Hit::Tab(BoardId::Decode))),
            vec![Command::Focus(BoardId::Decode)]
        );
        assert_eq!(ui.focus, Focus::Board);
    }

    #[test]
    fn paste_fills_field_or_imports_share_code() {
        let (mut ui, _) = setup();
        ui.focus = Focus::Field(FieldId::EncodeBits);
        assert!(ui.handle_paste("01\r\n10").is_empty());
        assert_eq!(ui.encode_bits.text(), "01\n10");

        ui.focus = Focus::Board;
        assert!(ui.handle_paste("#mosaic=abc").is_empty());
        ui.tab = BoardId::Decode;
        assert_eq!(ui.handle_paste(" #mosaic=abc\n"), vec![Command::ImportShareCode("#mosaic=abc".into())]);
    }
}
