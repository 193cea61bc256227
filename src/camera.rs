//! Camera: maps world space onto the terminal grid.
//!
//! World space is continuous with +y pointing up. The terminal grid has
//! +row pointing down, and one cell covers `cell_size` world units at zoom
//! 1. The camera position is projected onto the center of the viewport.
//!
//! Zoom spreads positions apart or together but glyph art keeps its cell
//! size, so anything sized in cells covers `1 / zoom` as much world space
//! as it does at zoom 1. [`Camera::footprint`] applies that to bounds.

use crate::config::CameraConfig;
use crate::entity::Bounds;
use glam::DVec2;

/// Smallest zoom reachable by scrolling.
pub const MIN_ZOOM: f64 = 1.0 / 64.0;
/// Largest zoom reachable by scrolling.
pub const MAX_ZOOM: f64 = 64.0;

/// Pan direction flags for one tick, one per held key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pan {
    /// West (negative x).
    pub west: bool,
    /// East (positive x).
    pub east: bool,
    /// South (negative y).
    pub south: bool,
    /// North (positive y).
    pub north: bool,
}

/// The view onto the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World position shown at the viewport center.
    pub position: DVec2,
    /// Zoom factor (1.0 = one cell per `cell_size`).
    pub zoom: f64,
    /// Base of the exponential scroll zoom.
    pub zoom_speed: f64,
    /// Pan speed in world units per second.
    pub speed: f64,
    /// World size of one terminal cell at zoom 1.
    pub cell_size: DVec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    /// Build a camera at the origin from configuration.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: DVec2::ZERO,
            zoom: config.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            zoom_speed: config.zoom_speed,
            speed: config.speed,
            cell_size: DVec2::new(config.cell_width, config.cell_height),
        }
    }

    /// Move the camera for each active direction by `speed * elapsed`.
    ///
    /// Opposite directions cancel. No clamping is applied.
    pub fn pan(&mut self, pan: Pan, elapsed: f64) {
        let step = self.speed * elapsed;
        if pan.west {
            self.position.x -= step;
        }
        if pan.east {
            self.position.x += step;
        }
        if pan.south {
            self.position.y -= step;
        }
        if pan.north {
            self.position.y += step;
        }
    }

    /// Scale zoom by `zoom_speed ^ scroll`, kept within
    /// [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    pub fn zoom_by(&mut self, scroll: f64) {
        if scroll == 0.0 {
            return;
        }
        let zoom = self.zoom * self.zoom_speed.powf(scroll);
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// World area covered on screen by something whose zoom-1 bounds are
    /// `bounds` and whose art is drawn in whole cells.
    pub fn footprint(&self, bounds: &Bounds) -> Bounds {
        bounds.scaled(1.0 / self.zoom)
    }

    /// Project a world point to a (column, row) on a viewport of the given size.
    ///
    /// The result may lie outside the viewport.
    #[allow(clippy::cast_possible_truncation)]
    pub fn project(&self, world: DVec2, viewport: (u16, u16)) -> (i32, i32) {
        let half = DVec2::new(f64::from(viewport.0), f64::from(viewport.1)) / 2.0;
        let offset = (world - self.position) * self.zoom / self.cell_size;
        let col = (half.x + offset.x).floor();
        let row = (half.y - offset.y).floor();
        (col as i32, row as i32)
    }

    /// Unproject the center of a viewport cell back to world space.
    pub fn unproject(&self, col: u16, row: u16, viewport: (u16, u16)) -> DVec2 {
        let half = DVec2::new(f64::from(viewport.0), f64::from(viewport.1)) / 2.0;
        let cell = DVec2::new(f64::from(col) + 0.5, f64::from(row) + 0.5);
        let offset = DVec2::new(cell.x - half.x, half.y - cell.y);
        self.position + offset * self.cell_size / self.zoom
    }
}
