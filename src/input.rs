//! Key bindings and mouse → pointer mapping.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to game action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P' | ' ') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        _ => Action::None,
    }
}

/// Pointer input in terminal cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    Down { column: u16, row: u16 },
    Move { column: u16 },
    Up,
}

/// Only the left button drags; everything else is ignored.
pub fn mouse_to_pointer(mouse: MouseEvent) -> Option<Pointer> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Pointer::Down {
            column: mouse.column,
            row: mouse.row,
        }),
        MouseEventKind::Drag(MouseButton::Left) => Some(Pointer::Move {
            column: mouse.column,
        }),
        MouseEventKind::Up(MouseButton::Left) => Some(Pointer::Up),
        _ => None,
    }
}
