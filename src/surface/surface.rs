//! Surface: the grid of cells the table is drawn into each frame.
//!
//! Cells are stored contiguously in row-major order:
//! `index = y * width + x`.

use super::cell::{Cell, Rgb};
use unicode_segmentation::UnicodeSegmentation;

/// A grid of cells representing the visible terminal area.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    /// Contiguous cell storage (row-major order).
    cells: Vec<Cell>,
    width: u16,
    height: u16,
}

impl Surface {
    /// Create a new surface filled with [`Cell::EMPTY`].
    ///
    /// Zero dimensions are clamped to 1 so the grid is never empty; a
    /// terminal can briefly report a zero size while being resized.
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            cells: vec![Cell::EMPTY; usize::from(width) * usize::from(height)],
            width,
            height,
        }
    }

    /// Get the surface width in columns.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Get the surface height in rows.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Get the underlying cell slice.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Convert (x, y) coordinates to a linear index.
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub fn index_of(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(usize::from(y) * usize::from(self.width) + usize::from(x))
        } else {
            None
        }
    }

    /// Get a reference to a cell at (x, y).
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index_of(x, y).map(|i| &self.cells[i])
    }

    /// Set a cell at (x, y).
    ///
    /// Returns `false` if coordinates are out of bounds.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if let Some(idx) = self.index_of(x, y) {
            self.cells[idx] = cell;
            true
        } else {
            false
        }
    }

    /// Set a cell at signed coordinates, ignoring anything off-surface.
    ///
    /// Projected world positions routinely fall left of or above the
    /// visible area.
    #[inline]
    pub fn set_signed(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match (u16::try_from(x), u16::try_from(y)) {
            (Ok(x), Ok(y)) => self.set(x, y, cell),
            _ => false,
        }
    }

    /// Set a grapheme at (x, y).
    ///
    /// Wide glyphs also claim a continuation cell at (x+1, y). Returns the
    /// display width written, or 0 if out of bounds.
    pub fn set_grapheme(&mut self, x: u16, y: u16, grapheme: &str, fg: Rgb, bg: Rgb) -> u8 {
        let Some(idx) = self.index_of(x, y) else {
            return 0;
        };

        let cell = Cell::from_grapheme(grapheme)
            .unwrap_or_else(|| Cell::from_char(Cell::REPLACEMENT))
            .with_fg(fg)
            .with_bg(bg);
        let width = cell.display_width();
        self.cells[idx] = cell;

        if width == 2 {
            if let Some(next_idx) = self.index_of(x.saturating_add(1), y) {
                self.cells[next_idx] = Cell::wide_continuation().with_bg(bg);
            }
        }

        width
    }

    /// Draw text starting at (x, y), clipped at the right edge.
    ///
    /// Returns the number of columns used.
    pub fn draw_text(&mut self, x: u16, y: u16, text: &str, fg: Rgb, bg: Rgb) -> u16 {
        let mut col = x;
        for grapheme in text.graphemes(true) {
            if col >= self.width {
                break;
            }
            let width = self.set_grapheme(col, y, grapheme, fg, bg);
            col = col.saturating_add(u16::from(width.max(1)));
        }
        col - x
    }

    /// Fill a rectangular region with a cell.
    pub fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16, cell: Cell) {
        for row in y..y.saturating_add(height).min(self.height) {
            for col in x..x.saturating_add(width).min(self.width) {
                if let Some(idx) = self.index_of(col, row) {
                    self.cells[idx] = cell;
                }
            }
        }
    }

    /// Clear the whole surface to `background`.
    pub fn clear(&mut self, background: Rgb) {
        self.cells.fill(Cell::EMPTY.with_bg(background));
    }

    /// Resize the surface, preserving content where possible.
    pub fn resize(&mut self, new_width: u16, new_height: u16) {
        let new_width = new_width.max(1);
        let new_height = new_height.max(1);
        if new_width == self.width && new_height == self.height {
            return;
        }

        let mut new_cells = vec![Cell::EMPTY; usize::from(new_width) * usize::from(new_height)];
        let copy_width = usize::from(self.width.min(new_width));
        let copy_height = usize::from(self.height.min(new_height));

        for y in 0..copy_height {
            let old_start = y * usize::from(self.width);
            let new_start = y * usize::from(new_width);
            new_cells[new_start..new_start + copy_width]
                .copy_from_slice(&self.cells[old_start..old_start + copy_width]);
        }

        self.cells = new_cells;
        self.width = new_width;
        self.height = new_height;
    }

    /// Copy content from another surface of the same size.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);
        self.cells.copy_from_slice(&other.cells);
    }

    /// Render one row as plain text (glyphs only).
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.get(x, y))
            .filter(|cell| !cell.is_wide_continuation())
            .map(Cell::glyph)
            .collect()
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_zero_size_is_clamped() {
        let surface = Surface::new(0, 0);
        assert_eq!(surface.width(), 1);
        assert_eq!(surface.height(), 1);
    }

    #[test]
    fn test_surface_bounds() {
        let surface = Surface::new(80, 24);
        assert!(surface.get(79, 23).is_some());
        assert!(surface.get(80, 23).is_none());
        assert!(surface.get(79, 24).is_none());
    }

    #[test]
    fn test_set_signed_ignores_negative() {
        let mut surface = Surface::new(10, 10);
        assert!(!surface.set_signed(-1, 3, Cell::from_char('X')));
        assert!(surface.set_signed(2, 3, Cell::from_char('X')));
        assert_eq!(surface.get(2, 3).unwrap().glyph(), "X");
    }

    #[test]
    fn test_draw_text_clips() {
        let mut surface = Surface::new(5, 1);
        let used = surface.draw_text(2, 0, "hello", Rgb::WHITE, Rgb::BLACK);
        assert_eq!(used, 3);
        assert_eq!(surface.row_text(0), "  hel");
    }

    #[test]
    fn test_wide_grapheme_claims_two_columns() {
        let mut surface = Surface::new(10, 1);
        assert_eq!(surface.set_grapheme(0, 0, "日", Rgb::WHITE, Rgb::BLACK), 2);
        assert!(surface.get(1, 0).unwrap().is_wide_continuation());
    }

    #[test]
    fn test_clear_uses_background() {
        let mut surface = Surface::new(4, 4);
        surface.set(1, 1, Cell::from_char('X'));
        surface.clear(Rgb::FELT);
        assert_eq!(surface.get(1, 1), Some(&Cell::EMPTY.with_bg(Rgb::FELT)));
    }

    #[test]
    fn test_resize_preserves_content() {
        let mut surface = Surface::new(80, 24);
        surface.set(5, 5, Cell::from_char('X'));

        surface.resize(100, 30);
        assert_eq!(surface.get(5, 5).unwrap().glyph(), "X");

        surface.resize(10, 10);
        assert_eq!(surface.get(5, 5).unwrap().glyph(), "X");
        assert!(surface.get(15, 15).is_none());
    }
}
