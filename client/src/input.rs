//! Keyboard capture, translated into gestures.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use shared::Direction;

/// A user gesture, decoupled from the physical key that produced it.
///
/// The application state machine consumes these with a plain `match`: menus
/// interpret vertical steering as selection movement, the game forwards
/// steering to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Steer(Direction),
    Submit,
    Cancel,
    TogglePause,
    Quit,
}

/// Waits up to `timeout` for a key and translates it. Returns `None` on
/// timeout or for keys without a binding.
pub fn poll_gesture(timeout: Duration) -> io::Result<Option<Gesture>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind != KeyEventKind::Release => Ok(translate_key(key)),
        _ => Ok(None),
    }
}

fn translate_key(key: KeyEvent) -> Option<Gesture> {
    match key.code {
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => {
            Some(Gesture::Steer(Direction::Up))
        }
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => {
            Some(Gesture::Steer(Direction::Down))
        }
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => {
            Some(Gesture::Steer(Direction::Left))
        }
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => {
            Some(Gesture::Steer(Direction::Right))
        }
        KeyCode::Enter => Some(Gesture::Submit),
        KeyCode::Esc => Some(Gesture::Cancel),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(Gesture::TogglePause),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Gesture::Quit),
        _ => None,
    }
}
