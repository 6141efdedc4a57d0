//! Key mapping for console input
//!
//! Converts crossterm key events to the logical events the line editor
//! understands, and recognizes the client's own shortcuts.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::editor::InputEvent;

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// What a key press means to the client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Hand to the line editor
    Input(InputEvent),
    /// Leave the client
    Quit,
}

/// Key mapper for converting key events to input events
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent; `None` for keys the client has no use for
    pub fn map(event: &KeyEvent) -> Option<KeyAction> {
        let mods = Modifiers::from(event.modifiers);

        if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
            return match event.code {
                KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Char('q') | KeyCode::Char('Q') => {
                    Some(KeyAction::Quit)
                }
                // Ctrl+H is backspace on many terminals
                KeyCode::Char('h') | KeyCode::Char('H') => {
                    Some(KeyAction::Input(InputEvent::Backspace))
                }
                _ => None,
            };
        }

        let event = match event.code {
            KeyCode::Char(ch) => InputEvent::Char(ch),
            KeyCode::Enter => InputEvent::Enter,
            KeyCode::Backspace => InputEvent::Backspace,
            KeyCode::Esc => InputEvent::Escape,
            KeyCode::Up => InputEvent::ArrowUp,
            KeyCode::Down => InputEvent::ArrowDown,
            KeyCode::Left => InputEvent::ArrowLeft,
            KeyCode::Right => InputEvent::ArrowRight,
            _ => return None,
        };
        Some(KeyAction::Input(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn test_char_keys() {
        assert_eq!(
            KeyMapper::map(&key_event(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(KeyAction::Input(InputEvent::Char('a')))
        );
        assert_eq!(
            KeyMapper::map(&key_event(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(KeyAction::Input(InputEvent::Char('A')))
        );
    }

    #[test]
    fn test_editing_keys() {
        let cases = [
            (KeyCode::Enter, InputEvent::Enter),
            (KeyCode::Backspace, InputEvent::Backspace),
            (KeyCode::Esc, InputEvent::Escape),
            (KeyCode::Up, InputEvent::ArrowUp),
            (KeyCode::Down, InputEvent::ArrowDown),
            (KeyCode::Left, InputEvent::ArrowLeft),
            (KeyCode::Right, InputEvent::ArrowRight),
        ];
        for (code, expected) in cases {
            assert_eq!(
                KeyMapper::map(&key_event(code, KeyModifiers::NONE)),
                Some(KeyAction::Input(expected))
            );
        }
    }

    #[test]
    fn test_ctrl_keys() {
        assert_eq!(
            KeyMapper::map(&key_event(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            KeyMapper::map(&key_event(KeyCode::Char('h'), KeyModifiers::CONTROL)),
            Some(KeyAction::Input(InputEvent::Backspace))
        );
        assert_eq!(
            KeyMapper::map(&key_event(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn test_unmapped_keys() {
        assert_eq!(KeyMapper::map(&key_event(KeyCode::F(1), KeyModifiers::NONE)), None);
        assert_eq!(KeyMapper::map(&key_event(KeyCode::Tab, KeyModifiers::NONE)), None);
    }
}
