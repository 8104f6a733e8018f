use std::io;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    Quit,
    MoveUp,
    MoveDown,
    Complete,
    Dismiss,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    InputChar(char),
    Backspace,
    Delete,
    Submit,
    PageUp,
    PageDown,
    JumpToBottom,
    MouseScrollUp,
    MouseScrollDown,
    MouseLeftClick(u16, u16),
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    match key_event.code {
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => AppEvent::Quit,
        KeyCode::Char('u') if ctrl => AppEvent::PageUp,
        KeyCode::Char('f') if ctrl => AppEvent::PageDown,
        KeyCode::End if ctrl => AppEvent::JumpToBottom,
        KeyCode::Up => AppEvent::MoveUp,
        KeyCode::Down => AppEvent::MoveDown,
        KeyCode::Tab => AppEvent::Complete,
        KeyCode::Esc => AppEvent::Dismiss,
        KeyCode::Left => AppEvent::CursorLeft,
        KeyCode::Right => AppEvent::CursorRight,
        KeyCode::Home => AppEvent::CursorHome,
        KeyCode::End => AppEvent::CursorEnd,
        KeyCode::PageUp => AppEvent::PageUp,
        KeyCode::PageDown => AppEvent::PageDown,
        KeyCode::Backspace => AppEvent::Backspace,
        KeyCode::Delete => AppEvent::Delete,
        KeyCode::Enter => AppEvent::Submit,
        KeyCode::Char(c) if !ctrl => AppEvent::InputChar(c),
        _ => AppEvent::Tick,
    }
}

fn map_mouse_event_kind(kind: MouseEventKind, column: u16, row: u16) -> AppEvent {
    match kind {
        MouseEventKind::ScrollUp => AppEvent::MouseScrollUp,
        MouseEventKind::ScrollDown => AppEvent::MouseScrollDown,
        MouseEventKind::Down(MouseButton::Left) => AppEvent::MouseLeftClick(column, row),
        _ => AppEvent::Tick,
    }
}

/// Waits one frame for terminal input.
pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(POLL_INTERVAL)? {
        match event::read()? {
            Event::Key(key_event) => return Ok(map_key_event(key_event)),
            Event::Mouse(mouse_event) => {
                return Ok(map_mouse_event_kind(
                    mouse_event.kind,
                    mouse_event.column,
                    mouse_event.row,
                ));
            }
            _ => {}
        }
    }

    Ok(AppEvent::Tick)
}
