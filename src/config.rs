//! Configuration for mudcon.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.mudcon/config.toml`
//! - The 8-color palette (normal and bright variants) used to paint styled runs
//!
//! # Configuration File
//!
//! ```toml
//! # Terminal type sent in TERM-TYPE subnegotiation
//! term_type = "ANSI"
//!
//! # Wrap width and the window size reported through NAWS
//! width = 80
//! height = 36
//!
//! # Extra columns allowed on the first line of a session
//! first_line_margin = 2
//!
//! # "scrollback" echoes typed lines into the output, "widget" leaves it to the input widget
//! echo_mode = "scrollback"
//!
//! prompt = "> "
//! history_limit = 1000
//! log_level = "info"
//!
//! [palette]
//! normal = ["#1D1D1D", "#800000", "#008000", "#808000", "#000080", "#800080", "#008080", "#C0C0C0"]
//! bright = ["#808080", "#FF0000", "#00FF00", "#FFD700", "#0000FF", "#FF00FF", "#00FFFF", "#FFFFFF"]
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::editor::EchoMode;
use crate::error::ConfigError;
use crate::history::HISTORY_LIMIT;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal type reported to the server
    pub term_type: String,
    /// Columns before a forced line break
    pub width: u16,
    /// Rows reported through NAWS when the display cannot tell
    pub height: u16,
    /// Extra columns allowed on the first line of a session
    pub first_line_margin: u16,
    pub echo_mode: EchoMode,
    /// Local echo before the server negotiates ECHO
    pub local_echo: bool,
    /// Shown in front of the input line
    pub prompt: String,
    pub history_limit: usize,
    pub log_level: String,
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            term_type: "ANSI".to_string(),
            width: 80,
            height: 36,
            first_line_margin: 2,
            echo_mode: EchoMode::Scrollback,
            local_echo: true,
            prompt: "> ".to_string(),
            history_limit: HISTORY_LIMIT,
            log_level: "info".to_string(),
            palette: Palette::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// used is an error, so the caller decides how to report it.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load `path` if it exists, otherwise use the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    /// Load and validate configuration from an explicit file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::get_config_path().ok_or(ConfigError::NoConfigPath)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).map_err(ConfigError::Write)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::Invalid {
                field: "width",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.height == 0 {
            return Err(ConfigError::Invalid {
                field: "height",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.term_type.is_empty() || !self.term_type.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ConfigError::Invalid {
                field: "term_type",
                reason: format!("{:?} is not a printable ASCII name", self.term_type),
            });
        }
        Ok(())
    }

    /// `~/.mudcon/config.toml`
    pub fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.mudcon`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".mudcon");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

/// Color definition (RGB), written as `#RRGGBB` in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color {:?}", s)))
    }
}

/// The eight base colors and their bright (bold) variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub normal: [Rgb; 8],
    pub bright: [Rgb; 8],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            normal: [
                Rgb::new(0x1D, 0x1D, 0x1D), // black
                Rgb::new(0x80, 0x00, 0x00), // red
                Rgb::new(0x00, 0x80, 0x00), // green
                Rgb::new(0x80, 0x80, 0x00), // yellow
                Rgb::new(0x00, 0x00, 0x80), // blue
                Rgb::new(0x80, 0x00, 0x80), // purple
                Rgb::new(0x00, 0x80, 0x80), // cyan
                Rgb::new(0xC0, 0xC0, 0xC0), // white
            ],
            bright: [
                Rgb::new(0x80, 0x80, 0x80),
                Rgb::new(0xFF, 0x00, 0x00),
                Rgb::new(0x00, 0xFF, 0x00),
                Rgb::new(0xFF, 0xD7, 0x00),
                Rgb::new(0x00, 0x00, 0xFF),
                Rgb::new(0xFF, 0x00, 0xFF),
                Rgb::new(0x00, 0xFF, 0xFF),
                Rgb::new(0xFF, 0xFF, 0xFF),
            ],
        }
    }
}

impl Palette {
    /// Color for a base index 0..7; out-of-range indices wrap
    pub fn color(&self, index: u8, bright: bool) -> Rgb {
        let idx = usize::from(index % 8);
        if bright {
            self.bright[idx]
        } else {
            self.normal[idx]
        }
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
