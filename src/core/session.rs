//! Session management
//!
//! Ties the negotiator, the renderer and the line editor together for one
//! connection. Inbound chunks go negotiator first, renderer second; key events
//! go to the editor, and committed lines are echoed and encoded for the wire.
//! Every handler returns the bytes that must be written to the transport
//! before the next event is processed.

use tracing::{debug, info};

use super::telnet::{Negotiator, OptionState, WindowSize};
use super::term::{AnsiRenderer, StyleState, StyledRun};
use crate::config::Config;
use crate::editor::{InputEvent, LineEditor};
use crate::history::CommandHistory;

/// Display surface the session paints onto
pub trait DisplaySink {
    /// Append styled output to the scrollback
    fn append_runs(&mut self, runs: &[StyledRun]);

    /// Reflect the current input line
    fn set_input_line(&mut self, text: &str, cursor_visible: bool);

    /// Current viewport size in columns and rows
    fn report_viewport(&self) -> WindowSize;

    /// Total number of output lines changed
    fn line_count_changed(&mut self, _lines: u64) {}
}

type LineListener = Box<dyn FnMut(&str)>;

/// A connected (or reconnectable) console session
pub struct Session<S: DisplaySink> {
    negotiator: Negotiator,
    renderer: AnsiRenderer,
    editor: LineEditor,
    sink: S,
    /// Key events are only handled while input is captured
    capture: bool,
    cursor_visible: bool,
    /// Local echo setting at session start
    default_echo: bool,
    last_line_count: u64,
    line_listener: Option<LineListener>,
    /// Wrap width asked for by the configuration
    configured_width: usize,
    /// Columns taken by the prompt in front of the input line
    prompt_width: usize,
}

impl<S: DisplaySink> Session<S> {
    pub fn new(config: &Config, sink: S) -> Self {
        let viewport = sink.report_viewport();
        let window = if viewport.width == 0 || viewport.height == 0 {
            WindowSize::new(config.width, config.height)
        } else {
            viewport
        };
        let width = usize::from(config.width);

        let mut editor = LineEditor::new(
            width,
            config.echo_mode,
            CommandHistory::new(config.history_limit),
        );
        editor.set_local_echo(config.local_echo);

        let mut session = Self {
            negotiator: Negotiator::new(config.term_type.clone(), window, config.local_echo),
            renderer: AnsiRenderer::new(width, usize::from(config.first_line_margin)),
            editor,
            sink,
            capture: false,
            cursor_visible: true,
            default_echo: config.local_echo,
            last_line_count: 0,
            line_listener: None,
            configured_width: width,
            prompt_width: config.prompt.chars().count(),
        };
        session.fit_widths(viewport);
        session
    }

    /// Register the application callback for submitted lines
    pub fn on_line_submitted(&mut self, listener: impl FnMut(&str) + 'static) {
        self.line_listener = Some(Box::new(listener));
    }

    /// Process a chunk from the transport; returns negotiation replies to send
    pub fn receive(&mut self, chunk: &[u8]) -> Vec<u8> {
        let inbound = self.negotiator.process_inbound(chunk);

        if !inbound.data.is_empty() {
            let runs = self.renderer.render(&inbound.data);
            self.emit(runs);
        }

        if let Some(echo) = inbound.local_echo {
            info!("Local echo {}", if echo { "on" } else { "off" });
            self.editor.set_local_echo(echo);
            self.refresh_input();
        }

        inbound.replies
    }

    /// Process one key event; returns the bytes of a submitted line, if any
    pub fn handle_key(&mut self, event: InputEvent) -> Vec<u8> {
        if !self.capture {
            debug!("Input not captured, dropping {:?}", event);
            return Vec::new();
        }

        let echo = self.editor.echoes_to_scrollback();
        let mut outbound = Vec::new();
        if let Some(line) = self.editor.apply(event) {
            if echo {
                let runs = self.renderer.echo_line(&line);
                self.emit(runs);
            }
            if let Some(listener) = self.line_listener.as_mut() {
                listener(&line);
            }
            outbound = self.negotiator.encode_outbound(&line);
        }
        self.refresh_input();
        outbound
    }

    /// Encode text for the wire without touching the input line or history
    pub fn send_text(&self, text: &str) -> Vec<u8> {
        self.negotiator.encode_outbound(text)
    }

    /// The display changed size; returns a NAWS report if NAWS is active
    pub fn resize(&mut self) -> Vec<u8> {
        let viewport = self.sink.report_viewport();
        info!("Resize: {}x{}", viewport.width, viewport.height);
        self.fit_widths(viewport);
        self.refresh_input();
        self.negotiator.resize(viewport).unwrap_or_default()
    }

    /// Keep output and input inside the viewport so the display never auto-wraps.
    /// A zero-width viewport means the size is unknown.
    fn fit_widths(&mut self, viewport: WindowSize) {
        let columns = usize::from(viewport.width);
        let (wrap, input) = if columns == 0 {
            (self.configured_width, self.configured_width)
        } else {
            let wrap = self.configured_width.min(columns);
            // One column is left for the cursor after the prompt
            let room = columns.saturating_sub(self.prompt_width + 1).max(1);
            (wrap, wrap.min(room))
        };
        debug!("Output wraps at {}, input shows {} columns", wrap, input);
        self.renderer.set_width(wrap);
        self.editor.set_width(input);
    }

    /// Transport is up: start capturing input and show the cursor
    pub fn connected(&mut self) {
        info!("Session connected");
        self.capture = true;
        self.cursor_visible = true;
        self.refresh_input();
    }

    /// Transport is gone: drop in-flight protocol state and stop capturing input
    pub fn disconnected(&mut self) {
        info!("Session disconnected");
        self.renderer.discard_pending();
        self.negotiator.reset(self.default_echo);
        self.editor.set_local_echo(self.default_echo);
        self.capture = false;
        self.cursor_visible = true;
        self.refresh_input();
    }

    /// Restore session-start defaults for a new connection; history is kept
    pub fn reset(&mut self) {
        self.renderer.reset();
        self.negotiator.reset(self.default_echo);
        self.editor.reset();
        self.editor.set_local_echo(self.default_echo);
        self.refresh_input();
    }

    fn emit(&mut self, runs: Vec<StyledRun>) {
        if !runs.is_empty() {
            self.sink.append_runs(&runs);
        }
        let count = self.renderer.line_count();
        if count != self.last_line_count {
            self.last_line_count = count;
            self.sink.line_count_changed(count);
        }
    }

    fn refresh_input(&mut self) {
        let cursor = self.cursor_visible && self.editor.cursor_at_tail();
        let text = self.editor.display_text();
        self.sink.set_input_line(&text, cursor);
    }

    pub fn set_capture(&mut self, capture: bool) {
        self.capture = capture;
    }

    pub fn is_capturing(&self) -> bool {
        self.capture
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
        self.refresh_input();
    }

    pub fn local_echo(&self) -> bool {
        self.negotiator.local_echo()
    }

    pub fn option_state(&self, option: u8) -> Option<OptionState> {
        self.negotiator.option_state(option)
    }

    pub fn style(&self) -> StyleState {
        self.renderer.style()
    }

    pub fn line_count(&self) -> u64 {
        self.renderer.line_count()
    }

    pub fn wrap_width(&self) -> usize {
        self.renderer.width()
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
