//! Console renderer using crossterm
//!
//! Implements [`DisplaySink`] on the host terminal: styled output scrolls
//! upward through the normal screen while the bottom row holds the input line.

use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, SetTitle},
};
use tracing::warn;

use crate::config::Palette;
use crate::core::session::DisplaySink;
use crate::core::telnet::WindowSize;
use crate::core::term::{Presentation, StyledRun};

/// Terminal renderer
pub struct Renderer {
    out: Stdout,
    palette: Palette,
    prompt: String,
    /// Runs of the last, not yet terminated output line
    tail: Vec<StyledRun>,
    input: String,
    cursor_visible: bool,
    /// Used when the host terminal cannot report its size
    fallback_size: WindowSize,
    /// Whether the terminal has been initialized
    initialized: bool,
}

impl Renderer {
    pub fn new(palette: Palette, prompt: impl Into<String>, fallback_size: WindowSize) -> Self {
        Self {
            out: io::stdout(),
            palette,
            prompt: prompt.into(),
            tail: Vec::new(),
            input: String::new(),
            cursor_visible: true,
            fallback_size,
            initialized: false,
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let rows = self.rows();
        queue!(
            self.out,
            Clear(ClearType::All),
            MoveTo(0, rows.saturating_sub(2))
        )?;
        self.out.flush()?;
        self.initialized = true;
        Ok(())
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        // Reset all attributes first
        let _ = queue!(self.out, ResetColor, SetAttribute(Attribute::Reset), Show);
        let _ = self.out.flush();

        // Disable raw mode - this is the most important part
        terminal::disable_raw_mode()?;

        // Print a newline to ensure we're on a fresh line
        println!();
        Ok(())
    }

    fn rows(&self) -> u16 {
        terminal::size()
            .map(|(_, rows)| rows)
            .unwrap_or(self.fallback_size.height)
    }

    fn draw_output(&mut self, runs: &[StyledRun]) -> io::Result<()> {
        let rows = self.rows();
        let tail_row = rows.saturating_sub(2);

        queue!(self.out, MoveTo(0, tail_row), Clear(ClearType::FromCursorDown))?;
        write_runs(&mut self.out, &self.tail, &self.palette)?;
        write_runs(&mut self.out, runs, &self.palette)?;

        let broke_line = runs.iter().any(|r| r.text.contains('\n'));
        self.update_tail(runs);
        if broke_line && rows >= 2 {
            // Scroll once more so the open line sits just above the input row
            queue!(self.out, Print("\r\n"))?;
        }

        self.draw_input()
    }

    fn update_tail(&mut self, runs: &[StyledRun]) {
        for run in runs {
            match run.text.rfind('\n') {
                Some(pos) => {
                    self.tail.clear();
                    let rest = &run.text[pos + 1..];
                    if !rest.is_empty() {
                        self.tail.push(StyledRun::new(rest, run.style));
                    }
                }
                None => self.tail.push(run.clone()),
            }
        }
    }

    fn draw_input(&mut self) -> io::Result<()> {
        let rows = self.rows();
        queue!(
            self.out,
            MoveTo(0, rows.saturating_sub(1)),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Clear(ClearType::CurrentLine),
            Print(&self.prompt),
            Print(&self.input)
        )?;
        if self.cursor_visible {
            queue!(self.out, Show)?;
        } else {
            queue!(self.out, Hide)?;
        }
        self.out.flush()
    }
}

impl DisplaySink for Renderer {
    fn append_runs(&mut self, runs: &[StyledRun]) {
        if let Err(e) = self.draw_output(runs) {
            warn!("Failed to draw output: {}", e);
        }
    }

    fn set_input_line(&mut self, text: &str, cursor_visible: bool) {
        self.input = text.to_string();
        self.cursor_visible = cursor_visible;
        if let Err(e) = self.draw_input() {
            warn!("Failed to draw input line: {}", e);
        }
    }

    fn report_viewport(&self) -> WindowSize {
        terminal::size()
            .map(|(cols, rows)| WindowSize::new(cols, rows))
            .unwrap_or(self.fallback_size)
    }

    fn line_count_changed(&mut self, lines: u64) {
        if let Err(e) = write_title(&mut self.out, lines) {
            warn!("Failed to set title: {}", e);
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Show the line count in the window title
pub fn write_title<W: Write>(out: &mut W, lines: u64) -> io::Result<()> {
    queue!(out, SetTitle(format!("mudcon ({} lines)", lines)))?;
    out.flush()
}

/// Write runs with their styles, turning each newline into CR LF
pub fn write_runs<W: Write>(out: &mut W, runs: &[StyledRun], palette: &Palette) -> io::Result<()> {
    for run in runs {
        let presentation = run.style.presentation(palette);
        for (i, piece) in run.text.split('\n').enumerate() {
            if i > 0 {
                // Reset before the line break so backgrounds do not bleed into the new line
                queue!(out, SetAttribute(Attribute::Reset), ResetColor, Print("\r\n"))?;
            }
            if piece.is_empty() {
                continue;
            }
            apply_presentation(out, &presentation)?;
            queue!(out, Print(piece))?;
        }
        if !presentation.is_neutral() {
            queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        }
    }
    Ok(())
}

fn apply_presentation<W: Write>(out: &mut W, presentation: &Presentation) -> io::Result<()> {
    if presentation.is_neutral() {
        return Ok(());
    }
    if presentation.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if presentation.underline {
        queue!(out, SetAttribute(Attribute::Underlined))?;
    }
    if presentation.blink {
        queue!(out, SetAttribute(Attribute::SlowBlink))?;
    }
    if let Some(fg) = presentation.fg {
        queue!(out, SetForegroundColor(fg.to_crossterm()))?;
    }
    if let Some(bg) = presentation.bg {
        queue!(out, SetBackgroundColor(bg.to_crossterm()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::{AttrFlags, StyleState};

    fn render(runs: &[StyledRun]) -> String {
        let mut out = Vec::new();
        write_runs(&mut out, runs, &Palette::default()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[derive(Default)]
    struct FlushCounter {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_title_is_flushed_immediately() {
        let mut out = FlushCounter::default();
        write_title(&mut out, 12).unwrap();
        assert_eq!(out.flushes, 1);
        let text = String::from_utf8(out.bytes).unwrap();
        assert!(text.contains("mudcon (12 lines)"));
    }

    #[test]
    fn test_neutral_runs_are_plain_text() {
        let runs = [StyledRun::new("hello", StyleState::default())];
        assert_eq!(render(&runs), "hello");
    }

    #[test]
    fn test_newline_becomes_crlf() {
        let runs = [StyledRun::new("a\nb", StyleState::default())];
        let text = render(&runs);
        assert!(text.starts_with('a'));
        assert!(text.contains("\r\n"));
        assert!(text.ends_with('b'));
    }

    #[test]
    fn test_styled_run_emits_color() {
        let style = StyleState {
            fg: 1,
            bg: 0,
            flags: AttrFlags::BOLD,
        };
        let text = render(&[StyledRun::new("x", style)]);
        // Bright red from the default palette as a 24-bit foreground
        assert!(text.contains("38;2;255;0;0"));
        assert!(text.contains('x'));
    }
}
