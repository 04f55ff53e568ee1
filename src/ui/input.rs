/// Input state tracker.
///
/// Drains every pending terminal event once per frame into an ordered list,
/// so key presses, mouse strokes and pastes are handled in arrival order.
/// Key releases are dropped: every action here is edge-triggered.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

/// Left-button pointer action at a terminal position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pointer {
    Down,
    Drag,
    Up,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse { action: Pointer, col: u16, row: u16 },
    Paste(String),
    Resize,
}

pub struct InputState {
    /// Events collected during the most recent `drain_events()`.
    pub events: Vec<InputEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { events: Vec::with_capacity(16) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame, before the session tick.
    pub fn drain_events(&mut self) {
        self.events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(ev) = event::read() else { break };
            if let Some(ev) = translate(ev) {
                self.events.push(ev);
            }
        }
    }

    /// Check if any key event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.events.iter().any(|ev| matches!(ev, InputEvent::Key(k) if is_ctrl_c(k)))
    }
}

fn translate(ev: Event) -> Option<InputEvent> {
    match ev {
        Event::Key(key) if key.kind != KeyEventKind::Release => Some(InputEvent::Key(key)),
        Event::Mouse(m) => {
            let action = match m.kind {
                MouseEventKind::Down(MouseButton::Left) => Pointer::Down,
                MouseEventKind::Drag(MouseButton::Left) => Pointer::Drag,
                MouseEventKind::Up(MouseButton::Left) => Pointer::Up,
                _ => return None,
            };
            Some(InputEvent::Mouse { action, col: m.column, row: m.row })
        }
        Event::Paste(text) => Some(InputEvent::Paste(text)),
        Event::Resize(..) => Some(InputEvent::Resize),
        _ => None,
    }
}

pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL)
        && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
}
