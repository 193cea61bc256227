//! Diff encoder: turn the change between two surfaces into ANSI output.
//!
//! Only cells that differ are emitted. Cursor moves are skipped for
//! adjacent cells and SGR color/style sequences are only emitted when the
//! tracked terminal state actually changes. Everything is accumulated into
//! one byte buffer so a frame is flushed with a single write.

use super::{Modifiers, Rgb, Surface};
use std::io::Write;

/// Last known terminal state, used to suppress redundant sequences.
#[derive(Debug, Clone)]
pub struct DiffState {
    cursor_x: u16,
    cursor_y: u16,
    fg: Option<Rgb>,
    bg: Option<Rgb>,
    modifiers: Option<Modifiers>,
}

impl Default for DiffState {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffState {
    /// Create a diff state with unknown terminal state.
    pub const fn new() -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            fg: None,
            bg: None,
            modifiers: None,
        }
    }

    /// Forget everything (e.g. after a full redraw or a resize).
    pub const fn reset(&mut self) {
        self.fg = None;
        self.bg = None;
        self.modifiers = None;
        self.cursor_x = u16::MAX;
        self.cursor_y = u16::MAX;
    }
}

/// Statistics about one diff pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Number of cells that were different.
    pub cells_changed: usize,
    /// Number of cursor move sequences emitted.
    pub cursor_moves: usize,
    /// Number of color change sequences emitted.
    pub color_changes: usize,
}

/// Encode the difference between `current` and `next` into `output`.
pub fn render_diff(
    current: &Surface,
    next: &Surface,
    output: &mut Vec<u8>,
    state: &mut DiffState,
) -> DiffResult {
    debug_assert_eq!(current.width(), next.width());
    debug_assert_eq!(current.height(), next.height());

    let mut result = DiffResult::default();
    let width = next.width();

    for (idx, (current_cell, next_cell)) in current.cells().iter().zip(next.cells()).enumerate() {
        if current_cell == next_cell || next_cell.is_wide_continuation() {
            continue;
        }

        let x = u16::try_from(idx % usize::from(width)).unwrap_or(u16::MAX);
        let y = u16::try_from(idx / usize::from(width)).unwrap_or(u16::MAX);
        result.cells_changed += 1;

        if state.cursor_y != y || state.cursor_x != x {
            emit_cursor_move(output, x, y);
            state.cursor_x = x;
            state.cursor_y = y;
            result.cursor_moves += 1;
        }

        // Dropping a modifier needs a full SGR reset, which also drops colors.
        let next_mods = next_cell.modifiers();
        let current_mods = state.modifiers.unwrap_or(Modifiers::empty());
        if !current_mods.difference(next_mods).is_empty() {
            output.extend_from_slice(b"\x1b[0m");
            state.fg = None;
            state.bg = None;
            state.modifiers = None;
        }

        if state.fg != Some(next_cell.fg()) {
            emit_fg_color(output, next_cell.fg());
            state.fg = Some(next_cell.fg());
            result.color_changes += 1;
        }
        if state.bg != Some(next_cell.bg()) {
            emit_bg_color(output, next_cell.bg());
            state.bg = Some(next_cell.bg());
            result.color_changes += 1;
        }
        if state.modifiers != Some(next_mods) {
            emit_modifier_set(output, next_mods.difference(state.modifiers.unwrap_or_default()));
            state.modifiers = Some(next_mods);
        }

        output.extend_from_slice(next_cell.glyph().as_bytes());
        state.cursor_x = state
            .cursor_x
            .saturating_add(u16::from(next_cell.display_width().max(1)));
    }

    result
}

/// Encode a full redraw of `surface` (no diffing).
pub fn render_full(surface: &Surface, output: &mut Vec<u8>) {
    output.extend_from_slice(b"\x1b[?25l\x1b[H");

    let mut last_fg: Option<Rgb> = None;
    let mut last_bg: Option<Rgb> = None;
    let mut last_mods: Option<Modifiers> = None;

    for y in 0..surface.height() {
        if y > 0 {
            output.extend_from_slice(b"\r\n");
        }
        for x in 0..surface.width() {
            let Some(cell) = surface.get(x, y) else {
                continue;
            };
            if cell.is_wide_continuation() {
                continue;
            }
            if last_mods.is_some_and(|mods| !mods.difference(cell.modifiers()).is_empty()) {
                output.extend_from_slice(b"\x1b[0m");
                last_fg = None;
                last_bg = None;
                last_mods = None;
            }
            if last_fg != Some(cell.fg()) {
                emit_fg_color(output, cell.fg());
                last_fg = Some(cell.fg());
            }
            if last_bg != Some(cell.bg()) {
                emit_bg_color(output, cell.bg());
                last_bg = Some(cell.bg());
            }
            if last_mods != Some(cell.modifiers()) {
                emit_modifier_set(output, cell.modifiers());
                last_mods = Some(cell.modifiers());
            }
            output.extend_from_slice(cell.glyph().as_bytes());
        }
    }

    output.extend_from_slice(b"\x1b[0m");
}

/// Emit a cursor move, using the short forms where possible.
#[inline]
fn emit_cursor_move(output: &mut Vec<u8>, x: u16, y: u16) {
    let row = u32::from(y) + 1;
    let col = u32::from(x) + 1;

    if row == 1 && col == 1 {
        output.extend_from_slice(b"\x1b[H");
    } else if col == 1 {
        let _ = write!(output, "\x1b[{row}H");
    } else {
        let _ = write!(output, "\x1b[{row};{col}H");
    }
}

#[inline]
fn emit_fg_color(output: &mut Vec<u8>, color: Rgb) {
    let _ = write!(output, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b);
}

#[inline]
fn emit_bg_color(output: &mut Vec<u8>, color: Rgb) {
    let _ = write!(output, "\x1b[48;2;{};{};{}m", color.r, color.g, color.b);
}

fn emit_modifier_set(output: &mut Vec<u8>, modifiers: Modifiers) {
    if modifiers.contains(Modifiers::BOLD) {
        output.extend_from_slice(b"\x1b[1m");
    }
}
