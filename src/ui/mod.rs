//! User interface rendering and input handling.
//!
//! - **renderer**: crossterm display sink (scrollback plus bottom input line)
//! - **keymapper**: Keyboard input to logical input events

pub mod keymapper;
pub mod renderer;

pub use keymapper::{KeyAction, KeyMapper};
pub use renderer::Renderer;
