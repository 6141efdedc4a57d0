//! ANSI escape sequence renderer
//!
//! Turns the plain (telnet-free) byte stream into styled, line-wrapped runs.
//! Escape sequences may be split across calls; the unterminated tail is kept
//! and parsed together with the next chunk.

use tracing::debug;

use super::style::{AttrFlags, StyleState, StyledRun, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};

const ESC: u8 = 0x1B;
/// Parameter and intermediate bytes are below this value; anything at or above terminates.
const FINAL_BYTE_MIN: u8 = 0x40;

/// Collects characters into runs, closing a run whenever the style changes
struct RunBuilder {
    runs: Vec<StyledRun>,
    text: String,
    style: StyleState,
}

impl RunBuilder {
    fn new(style: StyleState) -> Self {
        Self {
            runs: Vec::new(),
            text: String::new(),
            style,
        }
    }

    fn push(&mut self, ch: char) {
        self.text.push(ch);
    }

    fn set_style(&mut self, style: StyleState) {
        if style != self.style {
            self.flush();
            self.style = style;
        }
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.runs.push(StyledRun::new(text, self.style));
        }
    }

    fn finish(mut self) -> Vec<StyledRun> {
        self.flush();
        self.runs
    }
}

/// Stateful renderer for SGR-styled text.
///
/// Style, the pending escape fragment and the current line length all persist
/// across [`AnsiRenderer::render`] calls until [`AnsiRenderer::reset`].
pub struct AnsiRenderer {
    style: StyleState,
    /// Unterminated escape sequence carried over from the previous chunk
    pending: Vec<u8>,
    width: usize,
    first_line_margin: usize,
    line_length: usize,
    /// Whether the session's first line is still open (margin applies)
    first_line: bool,
    lines: u64,
}

impl AnsiRenderer {
    pub fn new(width: usize, first_line_margin: usize) -> Self {
        Self {
            style: StyleState::default(),
            pending: Vec::new(),
            width,
            first_line_margin,
            line_length: 0,
            first_line: true,
            lines: 0,
        }
    }

    /// Parse a chunk of plain bytes and return the runs it produced.
    ///
    /// Each octet is one character (Latin-1) and one column.
    pub fn render(&mut self, bytes: &[u8]) -> Vec<StyledRun> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = RunBuilder::new(self.style);
        let mut i = 0;
        while i < input.len() {
            if input[i] != ESC {
                self.put_char(input[i] as char, &mut out);
                i += 1;
                continue;
            }

            match sequence_len(&input[i..]) {
                Some(len) => {
                    self.execute(&input[i..i + len], &mut out);
                    i += len;
                }
                None => {
                    self.pending = input[i..].to_vec();
                    break;
                }
            }
        }

        out.finish()
    }

    /// Render a locally echoed input line under the current style.
    ///
    /// The text is taken literally: no escape parsing, and any pending
    /// fragment from the remote stream is left untouched.
    pub fn echo_line(&mut self, line: &str) -> Vec<StyledRun> {
        let mut out = RunBuilder::new(self.style);
        for ch in line.chars() {
            self.put_char(ch, &mut out);
        }
        if !line.ends_with('\n') {
            self.put_char('\n', &mut out);
        }
        out.finish()
    }

    fn put_char(&mut self, ch: char, out: &mut RunBuilder) {
        if ch == '\n' {
            out.push('\n');
            self.break_line();
            return;
        }
        if (ch as u32) < 0x20 {
            return;
        }

        out.push(ch);
        self.line_length += 1;
        if self.width > 0 && self.line_length >= self.wrap_limit() {
            out.push('\n');
            self.break_line();
        }
    }

    fn wrap_limit(&self) -> usize {
        if self.first_line {
            self.width + self.first_line_margin
        } else {
            self.width
        }
    }

    fn break_line(&mut self) {
        self.line_length = 0;
        self.first_line = false;
        self.lines += 1;
    }

    /// Execute one complete sequence: `ESC`, introducer, parameters, final byte
    fn execute(&mut self, seq: &[u8], out: &mut RunBuilder) {
        let final_byte = seq[seq.len() - 1];
        let params = &seq[2..seq.len() - 1];

        if seq[1] != b'[' || final_byte != b'm' {
            debug!(
                "Ignoring escape sequence: introducer={:?}, params={:?}, final={:?}",
                seq[1] as char,
                String::from_utf8_lossy(params),
                final_byte as char
            );
            return;
        }

        // CSI m with no parameters is a reset
        if params.is_empty() {
            self.style.reset();
            out.set_style(self.style);
            return;
        }

        for param in params.split(|&b| b == b';') {
            self.apply_sgr(param);
            out.set_style(self.style);
        }
    }

    fn apply_sgr(&mut self, param: &[u8]) {
        match param {
            b"0" => self.style.reset(),
            b"1" => self.style.flags |= AttrFlags::BOLD,
            b"4" => self.style.flags |= AttrFlags::UNDERLINE,
            b"5" => self.style.flags |= AttrFlags::BLINK,
            b"7" => self.style.flags |= AttrFlags::INVERSE,
            [tens, ones] if tens.is_ascii_digit() && ones.is_ascii_digit() => {
                let code = (tens - b'0') * 10 + (ones - b'0');
                match code {
                    30..=37 => self.style.fg = code - 30,
                    39 => self.style.fg = DEFAULT_FOREGROUND,
                    40..=47 => self.style.bg = code - 40,
                    49 => self.style.bg = DEFAULT_BACKGROUND,
                    _ => debug!("Unsupported SGR code {}", code),
                }
            }
            _ => debug!("Unsupported SGR parameter {:?}", String::from_utf8_lossy(param)),
        }
    }

    pub fn style(&self) -> StyleState {
        self.style
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn line_length(&self) -> usize {
        self.line_length
    }

    /// Total line breaks emitted, hard and soft
    pub fn line_count(&self) -> u64 {
        self.lines
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    /// Drop an unterminated escape fragment
    pub fn discard_pending(&mut self) {
        if !self.pending.is_empty() {
            debug!("Discarding {} byte escape fragment", self.pending.len());
            self.pending.clear();
        }
    }

    /// Restore session-start state. The line counter keeps counting.
    pub fn reset(&mut self) {
        self.style.reset();
        self.pending.clear();
        self.line_length = 0;
        self.first_line = true;
    }
}

/// Length of the escape sequence at the start of `seq`, or `None` if the
/// input ends before its final byte.
fn sequence_len(seq: &[u8]) -> Option<usize> {
    let mut j = 2;
    while j < seq.len() && seq[j] < FINAL_BYTE_MIN {
        j += 1;
    }
    if j >= seq.len() {
        None
    } else {
        Some(j + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::style::coalesce;

    fn text_of(runs: &[StyledRun]) -> String {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_sgr_scenario() {
        let mut renderer = AnsiRenderer::new(80, 0);
        let runs = renderer.render(b"\x1b[1;31mHello\x1b[0m World");

        let bold_red = StyleState {
            fg: 1,
            bg: DEFAULT_BACKGROUND,
            flags: AttrFlags::BOLD,
        };
        assert_eq!(
            runs,
            vec![
                StyledRun::new("Hello", bold_red),
                StyledRun::new(" World", StyleState::default()),
            ]
        );
        assert!(renderer.style().is_default());
    }

    #[test]
    fn test_split_sequence_is_buffered() {
        let mut renderer = AnsiRenderer::new(80, 0);
        let first = renderer.render(b"ab\x1b[3");
        assert_eq!(text_of(&first), "ab");
        assert_eq!(renderer.pending(), b"\x1b[3");

        let second = renderer.render(b"2mgreen");
        assert!(renderer.pending().is_empty());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].text, "green");
        assert_eq!(second[0].style.fg, 2);
    }

    #[test]
    fn test_lone_escape_is_buffered() {
        let mut renderer = AnsiRenderer::new(80, 0);
        assert!(renderer.render(b"\x1b").is_empty());
        assert_eq!(renderer.pending(), b"\x1b");
        let runs = renderer.render(b"[4mx");
        assert_eq!(runs[0].style.flags, AttrFlags::UNDERLINE);
    }

    #[test]
    fn test_attributes_are_additive() {
        let mut renderer = AnsiRenderer::new(80, 0);
        renderer.render(b"\x1b[1m\x1b[4m\x1b[5m\x1b[7m");
        assert_eq!(renderer.style().flags, AttrFlags::all());
        renderer.render(b"\x1b[0m");
        assert!(renderer.style().is_default());
    }

    #[test]
    fn test_color_codes() {
        let mut renderer = AnsiRenderer::new(80, 0);
        renderer.render(b"\x1b[33;44m");
        assert_eq!((renderer.style().fg, renderer.style().bg), (3, 4));
        renderer.render(b"\x1b[39m");
        assert_eq!(renderer.style().fg, DEFAULT_FOREGROUND);
        renderer.render(b"\x1b[49m");
        assert_eq!(renderer.style().bg, DEFAULT_BACKGROUND);
        // Extended color introducers carry no 8-color meaning
        renderer.render(b"\x1b[38m\x1b[48m");
        assert!(renderer.style().is_default());
    }

    #[test]
    fn test_empty_sgr_resets() {
        let mut renderer = AnsiRenderer::new(80, 0);
        renderer.render(b"\x1b[31m");
        renderer.render(b"\x1b[m");
        assert!(renderer.style().is_default());
    }

    #[test]
    fn test_non_sgr_sequences_are_consumed() {
        let mut renderer = AnsiRenderer::new(80, 0);
        let runs = renderer.render(b"\x1b[2Jclear\x1b[1A");
        assert_eq!(text_of(&runs), "clear");
        assert!(renderer.style().is_default());
    }

    #[test]
    fn test_control_codes_dropped() {
        let mut renderer = AnsiRenderer::new(80, 0);
        let runs = renderer.render(b"a\r\x07b\x08c\nd");
        assert_eq!(text_of(&runs), "abc\nd");
        assert_eq!(renderer.line_length(), 1);
    }

    #[test]
    fn test_wrap_after_width() {
        let mut renderer = AnsiRenderer::new(5, 0);
        let runs = renderer.render(b"abcdefg");
        assert_eq!(text_of(&runs), "abcde\nfg");
        assert_eq!(renderer.line_length(), 2);
        assert_eq!(renderer.line_count(), 1);
    }

    #[test]
    fn test_first_line_margin_applies_once() {
        let mut renderer = AnsiRenderer::new(4, 2);
        let runs = renderer.render(b"abcdefghijkl");
        assert_eq!(text_of(&runs), "abcdef\nghij\nkl");
    }

    #[test]
    fn test_newline_resets_line_length() {
        let mut renderer = AnsiRenderer::new(4, 0);
        let runs = renderer.render(b"abc\nabc\n");
        assert_eq!(text_of(&runs), "abc\nabc\n");
        assert_eq!(renderer.line_length(), 0);
        assert_eq!(renderer.line_count(), 2);
    }

    #[test]
    fn test_style_change_without_text_emits_nothing() {
        let mut renderer = AnsiRenderer::new(80, 0);
        assert!(renderer.render(b"\x1b[31m\x1b[32m").is_empty());
        assert_eq!(renderer.style().fg, 2);
    }

    #[test]
    fn test_echo_line_keeps_pending_fragment() {
        let mut renderer = AnsiRenderer::new(80, 0);
        renderer.render(b"\x1b[3");
        let runs = renderer.echo_line("look\n");
        assert_eq!(text_of(&runs), "look\n");
        assert_eq!(renderer.pending(), b"\x1b[3");
        assert_eq!(renderer.line_length(), 0);
    }

    #[test]
    fn test_chunked_input_matches_whole() {
        let input: &[u8] = b"\x1b[1;31mHello\x1b[0m there\nsecond \x1b[44mline\x1b[0m done";
        let mut whole = AnsiRenderer::new(8, 2);
        let expected = coalesce(whole.render(input));

        for split in 0..input.len() {
            let mut chunked = AnsiRenderer::new(8, 2);
            let mut runs = chunked.render(&input[..split]);
            runs.extend(chunked.render(&input[split..]));
            assert_eq!(coalesce(runs), expected, "split at {}", split);
            assert_eq!(chunked.style(), whole.style());
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut renderer = AnsiRenderer::new(80, 2);
        renderer.render(b"\x1b[31mabc\nxy\x1b[");
        renderer.reset();
        assert!(renderer.style().is_default());
        assert!(renderer.pending().is_empty());
        assert_eq!(renderer.line_length(), 0);
        assert_eq!(renderer.line_count(), 1);
    }
}
