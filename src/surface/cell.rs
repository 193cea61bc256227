//! Cell: one character position on the table surface.
//!
//! A cell stores its glyph inline (up to 4 UTF-8 bytes), the colors it is
//! painted with and a small set of style modifiers. Glyphs that do not fit
//! inline are replaced with [`Cell::REPLACEMENT`] when they are painted;
//! the table only ever draws single-codepoint card and cursor glyphs.

use bitflags::bitflags;

/// True-color RGB representation.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black (0, 0, 0)
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White (255, 255, 255)
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Felt green used for the table background.
    pub const FELT: Self = Self::new(12, 64, 32);
    /// Highlight used for selected entities.
    pub const GOLD: Self = Self::new(230, 190, 60);
    /// Color used for debug bounds outlines.
    pub const BOUNDS: Self = Self::new(255, 64, 64);

    /// Create from a 24-bit hex color (e.g., 0xFF5500).
    #[inline]
    pub const fn from_u32(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<u32> for Rgb {
    #[inline]
    fn from(hex: u32) -> Self {
        Self::from_u32(hex)
    }
}

bitflags! {
    /// Text style modifiers.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Bold text (selection highlight)
        const BOLD = 0b0000_0001;
    }
}

impl std::fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

bitflags! {
    /// Cell-level flags for special states.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// This cell is the right half of a wide glyph
        const WIDE_CONTINUATION = 0b0000_0001;
    }
}

impl std::fmt::Debug for CellFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// A single surface cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Inline glyph storage (UTF-8 bytes).
    glyph: [u8; 4],
    /// Byte length of the glyph (0-4).
    glyph_len: u8,
    /// Display width (0=continuation, 1=normal, 2=wide).
    display_width: u8,
    fg: Rgb,
    bg: Rgb,
    modifiers: Modifiers,
    flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Cell {
    /// An empty cell (space on the default background).
    pub const EMPTY: Self = Self {
        glyph: [b' ', 0, 0, 0],
        glyph_len: 1,
        display_width: 1,
        fg: Rgb::WHITE,
        bg: Rgb::BLACK,
        modifiers: Modifiers::empty(),
        flags: CellFlags::empty(),
    };

    /// Painted in place of glyphs that cannot be stored inline.
    pub const REPLACEMENT: char = '?';

    /// Create a cell from any character.
    #[inline]
    pub fn from_char(c: char) -> Self {
        let mut glyph = [0u8; 4];
        let len = c.encode_utf8(&mut glyph).len();
        let width = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);

        Self {
            glyph,
            glyph_len: u8::try_from(len).unwrap_or(4),
            display_width: u8::try_from(width).unwrap_or(1),
            ..Self::EMPTY
        }
    }

    /// Create a cell from a grapheme cluster.
    ///
    /// Returns `None` if the grapheme does not fit in 4 bytes.
    #[inline]
    pub fn from_grapheme(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() > 4 {
            return None;
        }

        let mut glyph = [0u8; 4];
        glyph[..bytes.len()].copy_from_slice(bytes);
        let width = unicode_width::UnicodeWidthStr::width(s);

        Some(Self {
            glyph,
            glyph_len: u8::try_from(bytes.len()).unwrap_or(4),
            display_width: u8::try_from(width).unwrap_or(1),
            ..Self::EMPTY
        })
    }

    /// Create the right half of a wide glyph.
    #[inline]
    pub const fn wide_continuation() -> Self {
        Self {
            glyph: [0, 0, 0, 0],
            glyph_len: 0,
            display_width: 0,
            flags: CellFlags::WIDE_CONTINUATION,
            ..Self::EMPTY
        }
    }

    /// Get the glyph as a string slice.
    #[inline]
    pub fn glyph(&self) -> &str {
        std::str::from_utf8(&self.glyph[..self.glyph_len as usize]).unwrap_or(" ")
    }

    /// Check if this is a wide-glyph continuation.
    #[inline]
    pub const fn is_wide_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// Get the display width (0, 1, or 2).
    #[inline]
    pub const fn display_width(&self) -> u8 {
        self.display_width
    }

    /// Get the foreground color.
    #[inline]
    pub const fn fg(&self) -> Rgb {
        self.fg
    }

    /// Get the background color.
    #[inline]
    pub const fn bg(&self) -> Rgb {
        self.bg
    }

    /// Get the modifiers.
    #[inline]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Set the foreground color (builder pattern).
    #[inline]
    #[must_use]
    pub const fn with_fg(mut self, fg: Rgb) -> Self {
        self.fg = fg;
        self
    }

    /// Set the background color (builder pattern).
    #[inline]
    #[must_use]
    pub const fn with_bg(mut self, bg: Rgb) -> Self {
        self.bg = bg;
        self
    }

    /// Set the modifiers (builder pattern).
    #[inline]
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("glyph", &self.glyph())
            .field("width", &self.display_width)
            .field("fg", &self.fg)
            .field("bg", &self.bg)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_hex() {
        let rgb: Rgb = 0xFF8000.into();
        assert_eq!(rgb, Rgb::new(255, 128, 0));
    }

    #[test]
    fn test_cell_from_char_wide() {
        let cell = Cell::from_char('日');
        assert_eq!(cell.glyph(), "日");
        assert_eq!(cell.display_width(), 2);
    }

    #[test]
    fn test_cell_from_grapheme_too_long() {
        assert!(Cell::from_grapheme("👨‍👩‍👧").is_none());
        assert_eq!(Cell::from_grapheme("é").unwrap().glyph(), "é");
    }

    #[test]
    fn test_cell_equality_includes_colors() {
        let a = Cell::from_char('A').with_fg(Rgb::new(255, 0, 0));
        let b = Cell::from_char('A').with_fg(Rgb::new(255, 0, 0));
        let c = Cell::from_char('A').with_fg(Rgb::new(0, 255, 0));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_wide_continuation() {
        let cont = Cell::wide_continuation();
        assert!(cont.is_wide_continuation());
        assert_eq!(cont.display_width(), 0);
    }
}
