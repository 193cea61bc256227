//! Card: the placeable entity of the table.

use super::{Bounds, DrawOp, Entity, EntityId, Layer};
use crate::asset::{AssetCatalog, Frame, CARD_BACK, CARD_FRONT};
use crate::surface::{Modifiers, Rgb};
use glam::DVec2;
use std::sync::Arc;

/// Which side of a card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardFace {
    /// Back showing (as placed).
    #[default]
    Down,
    /// Front showing.
    Up,
}

/// The two frames a card is drawn with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardArt {
    /// Frame shown face down.
    pub back: Arc<Frame>,
    /// Frame shown face up.
    pub front: Arc<Frame>,
}

impl CardArt {
    /// Look up both faces in the catalog.
    ///
    /// A missing front falls back to the back; a missing back means no card
    /// can be drawn and yields `None`.
    pub fn from_catalog(catalog: &AssetCatalog) -> Option<Self> {
        let back = catalog.image(CARD_BACK)?;
        let front = catalog.image(CARD_FRONT).unwrap_or_else(|| Arc::clone(&back));
        Some(Self { back, front })
    }
}

/// A card lying on the table.
#[derive(Debug, Clone)]
pub struct Card {
    id: EntityId,
    art: CardArt,
    position: DVec2,
    size: DVec2,
    face: CardFace,
    selected: bool,
    age: f64,
}

impl Card {
    /// Kind name reported by [`Entity::name`].
    pub const NAME: &'static str = "card";

    /// Place a face-down card centered on `position`.
    ///
    /// `cell_size` is the world size of one glyph, used to size the bounds
    /// from the back frame.
    pub fn new(id: EntityId, art: CardArt, position: DVec2, cell_size: DVec2) -> Self {
        let cells = DVec2::new(f64::from(art.back.width()), f64::from(art.back.height()));
        Self {
            id,
            art,
            position,
            size: cells * cell_size,
            face: CardFace::Down,
            selected: false,
            age: 0.0,
        }
    }

    /// Current face.
    pub const fn face(&self) -> CardFace {
        self.face
    }

    /// Flip to the other face.
    pub const fn flip(&mut self) {
        self.face = match self.face {
            CardFace::Down => CardFace::Up,
            CardFace::Up => CardFace::Down,
        };
    }

    /// Whether the card is selected.
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Seconds of simulated time since the card was placed.
    pub const fn age(&self) -> f64 {
        self.age
    }

    /// World-space center.
    pub const fn position(&self) -> DVec2 {
        self.position
    }
}

impl Entity for Card {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_center(self.position, self.size)
    }

    fn update(&mut self, delta_time: f64) {
        self.age += delta_time;
    }

    fn draw(&self, layer: &mut Layer, show_bounds: bool) {
        let frame = match self.face {
            CardFace::Down => &self.art.back,
            CardFace::Up => &self.art.front,
        };
        let (modifiers, tint) = if self.selected {
            (Modifiers::BOLD, Some(Rgb::GOLD))
        } else {
            (Modifiers::empty(), None)
        };
        layer.push(DrawOp::Sprite {
            frame: Arc::clone(frame),
            center: self.position,
            modifiers,
            tint,
        });
        if show_bounds {
            layer.push(DrawOp::Outline {
                bounds: self.bounds(),
                color: Rgb::BOUNDS,
            });
        }
    }

    // Selecting a card turns it face up.
    fn set_selected(&mut self, selected: bool) {
        if selected && !self.selected && self.face == CardFace::Down {
            self.flip();
        }
        self.selected = selected;
    }

    fn move_to(&mut self, position: DVec2) {
        self.position = position;
    }
}
