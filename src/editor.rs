//! Local line editing
//!
//! The input line is edited locally and only sent on Enter. Arrow keys browse
//! the command history; in scrollback echo mode left/right scroll a viewport
//! over a line longer than the display.

use serde::{Deserialize, Serialize};

use crate::history::CommandHistory;

/// Logical key events produced by the keyboard layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Char(char),
    Enter,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

/// Where the line being typed is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EchoMode {
    /// The renderer shows the input line and echoes committed lines into scrollback
    #[default]
    Scrollback,
    /// An external input widget reflects the line; nothing is echoed into scrollback
    Widget,
}

/// `history_pos` value meaning "editing a live line"
const NOT_BROWSING: isize = -1;

/// Input buffer with history.
pub struct LineEditor {
    content: String,
    /// How far the view is scrolled back from the tail of `content`
    cursor_offset: usize,
    history: CommandHistory,
    history_pos: isize,
    width: usize,
    echo_mode: EchoMode,
    local_echo: bool,
}

impl LineEditor {
    pub fn new(width: usize, echo_mode: EchoMode, history: CommandHistory) -> Self {
        Self {
            content: String::new(),
            cursor_offset: 0,
            history,
            history_pos: NOT_BROWSING,
            width,
            echo_mode,
            local_echo: true,
        }
    }

    /// Apply one key event. Returns the committed line, newline included, on Enter.
    pub fn apply(&mut self, event: InputEvent) -> Option<String> {
        match event {
            InputEvent::Char(ch) => {
                if !ch.is_control() {
                    self.content.push(ch);
                    self.cursor_offset = 0;
                }
            }
            InputEvent::Backspace => {
                self.content.pop();
                self.cursor_offset = 0;
            }
            InputEvent::Enter => return Some(self.commit()),
            InputEvent::Escape => {
                self.content.clear();
                self.cursor_offset = 0;
                self.history_pos = NOT_BROWSING;
            }
            InputEvent::ArrowUp => {
                let newest = self.history.len() as isize - 1;
                self.history_pos = (self.history_pos + 1).min(newest);
                // Nothing to recall: the live line stays as typed
                if self.history_pos != NOT_BROWSING {
                    self.recall();
                }
            }
            InputEvent::ArrowDown => {
                self.history_pos = (self.history_pos - 1).max(NOT_BROWSING);
                self.recall();
            }
            InputEvent::ArrowLeft => self.scroll_view(true),
            InputEvent::ArrowRight => self.scroll_view(false),
        }
        None
    }

    fn commit(&mut self) -> String {
        let mut line = std::mem::take(&mut self.content);
        // Lines typed while the server echoes (passwords) are not remembered
        if self.local_echo {
            self.history.add(&line);
        }
        self.history_pos = NOT_BROWSING;
        self.cursor_offset = 0;
        line.push('\n');
        line
    }

    fn recall(&mut self) {
        self.cursor_offset = 0;
        if self.history_pos == NOT_BROWSING {
            self.content.clear();
        } else if let Some(entry) = self.history.recent(self.history_pos as usize) {
            self.content = entry.to_string();
        }
    }

    fn scroll_view(&mut self, back: bool) {
        if self.echo_mode != EchoMode::Scrollback {
            return;
        }
        let max = self.max_offset();
        self.cursor_offset = if back {
            (self.cursor_offset + 1).min(max)
        } else {
            self.cursor_offset.saturating_sub(1)
        };
    }

    fn max_offset(&self) -> usize {
        self.content.chars().count().saturating_sub(self.width)
    }

    /// The part of the line that fits the display width, honoring the scroll offset
    pub fn visible(&self) -> String {
        let len = self.content.chars().count();
        let start = len.saturating_sub(self.width + self.cursor_offset);
        self.content.chars().skip(start).take(self.width).collect()
    }

    /// Text the display should show for the input line; empty while the server echoes
    pub fn display_text(&self) -> String {
        if self.local_echo {
            self.visible()
        } else {
            String::new()
        }
    }

    /// The cursor is only drawn while the view is anchored at the tail
    pub fn cursor_at_tail(&self) -> bool {
        self.cursor_offset == 0
    }

    /// Whether a committed line is rendered into scrollback
    pub fn echoes_to_scrollback(&self) -> bool {
        self.local_echo && self.echo_mode == EchoMode::Scrollback
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor_offset(&self) -> usize {
        self.cursor_offset
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_pos(&self) -> isize {
        self.history_pos
    }

    pub fn is_browsing(&self) -> bool {
        self.history_pos != NOT_BROWSING
    }

    pub fn echo_mode(&self) -> EchoMode {
        self.echo_mode
    }

    pub fn local_echo(&self) -> bool {
        self.local_echo
    }

    pub fn set_local_echo(&mut self, enabled: bool) {
        self.local_echo = enabled;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width;
        self.cursor_offset = self.cursor_offset.min(self.max_offset());
    }

    /// Clear the line for a new session; history is kept
    pub fn reset(&mut self) {
        self.content.clear();
        self.cursor_offset = 0;
        self.history_pos = NOT_BROWSING;
    }
}
