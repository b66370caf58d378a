//! Terminal event pump for the TUI.
//!
//! A background task polls crossterm and forwards key presses, resizes,
//! and periodic ticks over a channel so the main loop can `select!` on
//! them alongside fetch progress.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum Event {
    Tick,
    Key(KeyEvent),
    /// The terminal changed size; the next draw picks up the new area.
    Resize,
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::task::spawn_blocking(move || {
            let mut last_tick = std::time::Instant::now();

            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                if event::poll(timeout).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => {
                            if tx.send(Event::Key(key)).is_err() {
                                break;
                            }
                        }
                        Ok(CrosstermEvent::Resize(_, _)) => {
                            if tx.send(Event::Resize).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = std::time::Instant::now();
                }
            }
        });

        Self { rx, _task: task }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// What the application should do with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Up,
    Down,
    Select,
    Back,
    MarkRead,
}

pub fn key_to_action(key: KeyEvent) -> KeyAction {
    // Ctrl+C always quits
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Char('j') | KeyCode::Down => KeyAction::Down,
        KeyCode::Char('k') | KeyCode::Up => KeyAction::Up,
        KeyCode::Enter | KeyCode::Char(' ') => KeyAction::Select,
        KeyCode::Esc => KeyAction::Back,
        KeyCode::Char('m') => KeyAction::MarkRead,
        _ => KeyAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn make_key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Press)
    }

    #[test]
    fn quit_keybindings() {
        assert_eq!(
            key_to_action(make_key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Quit
        );
        assert_eq!(
            key_to_action(make_key(KeyCode::Char('q'), KeyModifiers::NONE)),
            KeyAction::Quit
        );
    }

    #[test]
    fn vim_navigation() {
        assert_eq!(
            key_to_action(make_key(KeyCode::Char('j'), KeyModifiers::NONE)),
            KeyAction::Down
        );
        assert_eq!(
            key_to_action(make_key(KeyCode::Char('k'), KeyModifiers::NONE)),
            KeyAction::Up
        );
        assert_eq!(
            key_to_action(make_key(KeyCode::Up, KeyModifiers::NONE)),
            KeyAction::Up
        );
    }

    #[test]
    fn selection_and_back() {
        assert_eq!(
            key_to_action(make_key(KeyCode::Enter, KeyModifiers::NONE)),
            KeyAction::Select
        );
        assert_eq!(
            key_to_action(make_key(KeyCode::Esc, KeyModifiers::NONE)),
            KeyAction::Back
        );
        assert_eq!(
            key_to_action(make_key(KeyCode::Char('m'), KeyModifiers::NONE)),
            KeyAction::MarkRead
        );
    }
}
