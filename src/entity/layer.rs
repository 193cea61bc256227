//! Layer: what one entity drew during the draw fan-out.
//!
//! Workers cannot share the surface, so each entity records world-space
//! draw operations into its own layer. Once every worker has finished, the
//! layers are composited onto the surface on the calling thread in
//! registry order.

use super::Bounds;
use crate::asset::Frame;
use crate::camera::Camera;
use crate::surface::{Cell, Modifiers, Rgb, Surface};
use glam::DVec2;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// A single world-space draw operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Blit a glyph frame centered on a world position.
    Sprite {
        /// Frame to blit.
        frame: Arc<Frame>,
        /// World-space center.
        center: DVec2,
        /// Extra style applied to every glyph.
        modifiers: Modifiers,
        /// Foreground override.
        tint: Option<Rgb>,
    },
    /// Draw a rectangle outline around world-space bounds.
    Outline {
        /// Bounds to outline.
        bounds: Bounds,
        /// Outline color.
        color: Rgb,
    },
}

/// Ordered draw operations from one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    ops: Vec<DrawOp>,
}

impl Layer {
    /// Create an empty layer.
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Record a draw operation.
    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Recorded operations in draw order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Whether nothing was drawn.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Paint every operation onto `surface` through `camera`.
    pub fn composite(&self, surface: &mut Surface, camera: &Camera) {
        for op in &self.ops {
            match op {
                DrawOp::Sprite {
                    frame,
                    center,
                    modifiers,
                    tint,
                } => blit(surface, camera, frame, *center, *modifiers, *tint),
                DrawOp::Outline { bounds, color } => outline(surface, camera, bounds, *color),
            }
        }
    }
}

/// Paint `frame` so that its middle cell lands on the projection of `center`.
fn blit(
    surface: &mut Surface,
    camera: &Camera,
    frame: &Frame,
    center: DVec2,
    modifiers: Modifiers,
    tint: Option<Rgb>,
) {
    let viewport = (surface.width(), surface.height());
    let (cx, cy) = camera.project(center, viewport);
    let left = cx - i32::from(frame.width()) / 2;
    let top = cy - i32::from(frame.height()) / 2;
    let fg = tint.unwrap_or_else(|| frame.fg());
    let bg = frame.bg();

    for (row_index, row) in frame.rows.iter().enumerate() {
        let y = top + i32::try_from(row_index).unwrap_or(i32::MAX);
        let mut x = left;
        for grapheme in row.graphemes(true) {
            let cell = Cell::from_grapheme(grapheme)
                .unwrap_or_else(|| Cell::from_char(Cell::REPLACEMENT))
                .with_fg(fg)
                .with_bg(bg)
                .with_modifiers(modifiers);
            let width = i32::from(cell.display_width().max(1));
            surface.set_signed(x, y, cell);
            x += width;
        }
    }
}

/// Outline the on-screen footprint of `bounds` with box-drawing glyphs.
///
/// Only the visible part of each edge is walked.
fn outline(surface: &mut Surface, camera: &Camera, bounds: &Bounds, color: Rgb) {
    let viewport = (surface.width(), surface.height());
    let footprint = camera.footprint(bounds);
    let (left, bottom) = camera.project(footprint.min, viewport);
    let (right, top) = camera.project(footprint.max, viewport);

    let columns = left.max(0)..=right.min(i32::from(viewport.0) - 1);
    let rows = top.max(0)..=bottom.min(i32::from(viewport.1) - 1);

    let mut paint = |x: i32, y: i32, glyph: char| {
        let bg = match (u16::try_from(x), u16::try_from(y)) {
            (Ok(ux), Ok(uy)) => surface.get(ux, uy).map_or(Rgb::BLACK, Cell::bg),
            _ => return,
        };
        surface.set_signed(x, y, Cell::from_char(glyph).with_fg(color).with_bg(bg));
    };

    for x in columns {
        paint(x, top, '─');
        paint(x, bottom, '─');
    }
    for y in rows {
        paint(left, y, '│');
        paint(right, y, '│');
    }
    paint(left, top, '┌');
    paint(right, top, '┐');
    paint(left, bottom, '└');
    paint(right, bottom, '┘');
}
