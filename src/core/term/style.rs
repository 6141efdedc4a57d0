//! Rendering style state
//!
//! Defines the live SGR style, the runs emitted under it, and how a style maps
//! onto concrete colors for a display sink.

use bitflags::bitflags;

use crate::config::{Palette, Rgb};

/// Foreground color used after a reset
pub const DEFAULT_FOREGROUND: u8 = 7;
/// Background color used after a reset
pub const DEFAULT_BACKGROUND: u8 = 0;

bitflags! {
    /// Text attributes. Only ever set by SGR codes, cleared by a full reset.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u8 {
        const BOLD      = 0b0001;
        const UNDERLINE = 0b0010;
        const BLINK     = 0b0100;
        const INVERSE   = 0b1000;
    }
}

/// Current rendering style: one of the 8 base colors for each plane plus attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StyleState {
    pub fg: u8,
    pub bg: u8,
    pub flags: AttrFlags,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            fg: DEFAULT_FOREGROUND,
            bg: DEFAULT_BACKGROUND,
            flags: AttrFlags::empty(),
        }
    }
}

impl StyleState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve this style to the colors and decorations a sink should paint.
    ///
    /// INVERSE swaps the planes before lookup; BOLD selects the bright variant
    /// of the foreground only. A default style resolves to a neutral
    /// presentation so sinks can skip styling entirely.
    pub fn presentation(&self, palette: &Palette) -> Presentation {
        if self.is_default() {
            return Presentation::default();
        }

        let inverse = self.flags.contains(AttrFlags::INVERSE);
        let bold = self.flags.contains(AttrFlags::BOLD);
        let (fg, bg) = if inverse { (self.bg, self.fg) } else { (self.fg, self.bg) };

        let fg = if fg != DEFAULT_FOREGROUND || inverse || bold {
            Some(palette.color(fg, bold))
        } else {
            None
        };
        let bg = if bg != DEFAULT_BACKGROUND || inverse {
            Some(palette.color(bg, false))
        } else {
            None
        };

        Presentation {
            fg,
            bg,
            bold,
            underline: self.flags.contains(AttrFlags::UNDERLINE),
            blink: self.flags.contains(AttrFlags::BLINK),
        }
    }
}

/// Concrete colors and decorations for one run. `None` means "sink default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Presentation {
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub bold: bool,
    pub underline: bool,
    pub blink: bool,
}

impl Presentation {
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// A contiguous span of text sharing one style.
///
/// Newlines (hard or forced by wrapping) stay inside `text`. Sinks that use a
/// markup language must escape `<`, `>` and `&` themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub style: StyleState,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, style: StyleState) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Merge adjacent runs that share a style.
///
/// Run boundaries depend on where input chunks were split; the merged form
/// does not.
pub fn coalesce(runs: impl IntoIterator<Item = StyledRun>) -> Vec<StyledRun> {
    let mut merged: Vec<StyledRun> = Vec::new();
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.style == run.style => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_neutral() {
        let palette = Palette::default();
        assert!(StyleState::default().presentation(&palette).is_neutral());
    }

    #[test]
    fn test_bold_uses_bright_foreground() {
        let palette = Palette::default();
        let style = StyleState {
            fg: 1,
            bg: DEFAULT_BACKGROUND,
            flags: AttrFlags::BOLD,
        };
        let p = style.presentation(&palette);
        assert_eq!(p.fg, Some(palette.bright[1]));
        assert_eq!(p.bg, None);
        assert!(p.bold);
    }

    #[test]
    fn test_inverse_swaps_planes() {
        let palette = Palette::default();
        let style = StyleState {
            fg: 2,
            bg: 4,
            flags: AttrFlags::INVERSE,
        };
        let p = style.presentation(&palette);
        assert_eq!(p.fg, Some(palette.normal[4]));
        assert_eq!(p.bg, Some(palette.normal[2]));
    }

    #[test]
    fn test_underline_and_blink_combine() {
        let palette = Palette::default();
        let style = StyleState {
            flags: AttrFlags::UNDERLINE | AttrFlags::BLINK,
            ..StyleState::default()
        };
        let p = style.presentation(&palette);
        assert!(p.underline && p.blink);
        assert_eq!(p.fg, None);
    }

    #[test]
    fn test_coalesce_merges_same_style() {
        let red = StyleState {
            fg: 1,
            ..StyleState::default()
        };
        let runs = vec![
            StyledRun::new("ab", red),
            StyledRun::new("", StyleState::default()),
            StyledRun::new("c", red),
            StyledRun::new("d", StyleState::default()),
        ];
        assert_eq!(
            coalesce(runs),
            vec![StyledRun::new("abc", red), StyledRun::new("d", StyleState::default())]
        );
    }
}
