//! ANSI rendering: style state and the escape sequence renderer

pub mod parser;
pub mod style;

pub use parser::AnsiRenderer;
pub use style::{coalesce, AttrFlags, Presentation, StyleState, StyledRun};
