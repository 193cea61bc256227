//! Entities: the simulated objects living on the table.
//!
//! An [`Entity`] is owned by the [`Registry`](crate::registry::Registry)
//! and is only ever touched through `&mut self` during the update fan-out
//! or `&self` during the draw fan-out. Entities never see the registry
//! itself, so they cannot change its structure while a pass is in flight;
//! structural changes go through commands between passes.

mod card;
mod layer;

pub use card::{Card, CardArt, CardFace};
pub use layer::{DrawOp, Layer};

use glam::DVec2;
use std::fmt;

/// Stable identity of an entity within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned world-space rectangle used for hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower-left corner.
    pub min: DVec2,
    /// Upper-right corner.
    pub max: DVec2,
}

impl Bounds {
    /// Build bounds of `size` centered on `center`.
    pub fn from_center(center: DVec2, size: DVec2) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Whether `point` lies inside (edges inclusive).
    pub fn contains(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Center point.
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    /// Width and height.
    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    /// Same center, size multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_center(self.center(), self.size() * factor)
    }
}

/// A simulated object on the table.
///
/// `update` may only mutate the entity's own state; `draw` records what the
/// entity looks like into its own [`Layer`]. Both run on worker threads.
pub trait Entity: Send + Sync {
    /// Identity used by the registry.
    fn id(&self) -> EntityId;

    /// Human-readable kind name.
    fn name(&self) -> &str;

    /// World-space extent at zoom 1. Hit-testing and outlines go through
    /// [`Camera::footprint`](crate::camera::Camera::footprint).
    fn bounds(&self) -> Bounds;

    /// Advance the entity by `delta_time` seconds.
    fn update(&mut self, delta_time: f64);

    /// Record draw operations. `show_bounds` asks for a debug outline.
    fn draw(&self, layer: &mut Layer, show_bounds: bool);

    /// Mark the entity as selected (or not).
    fn set_selected(&mut self, _selected: bool) {}

    /// Move the entity so its bounds are centered on `position`.
    fn move_to(&mut self, _position: DVec2) {}
}

impl fmt::Debug for dyn Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_contains_edges() {
        let bounds = Bounds::from_center(DVec2::new(10.0, 10.0), DVec2::new(4.0, 2.0));
        assert!(bounds.contains(DVec2::new(8.0, 9.0)));
        assert!(bounds.contains(DVec2::new(12.0, 11.0)));
        assert!(!bounds.contains(DVec2::new(12.1, 10.0)));
        assert_eq!(bounds.center(), DVec2::new(10.0, 10.0));
        assert_eq!(bounds.size(), DVec2::new(4.0, 2.0));
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(7).to_string(), "#7");
    }
}
