//! Core console components.
//!
//! This module contains the protocol and rendering logic:
//!
//! - **telnet**: Option negotiation and IAC handling on the raw byte stream
//! - **term**: ANSI style state and the escape sequence renderer
//! - **session**: One connection combining negotiator, renderer and line editor
//! - **transport**: TCP connection with a background reader thread
//!
//! # Architecture
//!
//! ```text
//! TcpTransport ──bytes──▶ Session
//!                         ├── Negotiator (IAC commands, replies)
//!                         ├── AnsiRenderer (SGR styles, wrapping) ──runs──▶ DisplaySink
//!                         └── LineEditor (input line, history) ──line──▶ TcpTransport
//! ```

pub mod session;
pub mod telnet;
pub mod term;
pub mod transport;
