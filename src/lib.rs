//! mudcon - a telnet console client
//!
//! The library holds the terminal core: telnet option negotiation, an ANSI
//! renderer producing styled, wrapped runs, and a local line editor with
//! history. Frontends plug in through [`DisplaySink`] and feed transport
//! bytes and [`InputEvent`]s into a [`Session`].

pub mod config;
pub mod core;
pub mod editor;
pub mod error;
pub mod history;
pub mod ui;

pub use crate::config::Config;
pub use crate::core::session::{DisplaySink, Session};
pub use crate::core::telnet::{Negotiator, WindowSize};
pub use crate::core::term::{AnsiRenderer, StyleState, StyledRun};
pub use crate::editor::{EchoMode, InputEvent, LineEditor};
