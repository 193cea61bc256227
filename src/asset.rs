//! Asset catalog: glyph frames looked up by description.
//!
//! Assets are a tagged variant rather than a bag of trait objects, so a
//! caller asks for the shape it needs ([`AssetCatalog::animation`],
//! [`AssetCatalog::image`]) and gets either a typed value or `None`.
//!
//! The catalog ships with built-in art for the cursor and both card faces;
//! a JSON file with the same layout can replace it.

use crate::error::{Error, Result};
use crate::surface::Rgb;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Description of the cursor animation (idle frame, pressed frame).
pub const CURSOR: &str = "cursor";
/// Description of the card back image.
pub const CARD_BACK: &str = "card_back";
/// Description of the card front image.
pub const CARD_FRONT: &str = "card_front";

/// A rectangular block of glyphs, one string per row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Frame {
    /// Rows of glyphs, top to bottom.
    pub rows: Vec<String>,
    /// Foreground color as 0xRRGGBB.
    #[serde(default = "default_fg")]
    pub fg: u32,
    /// Background color as 0xRRGGBB.
    #[serde(default)]
    pub bg: u32,
}

const fn default_fg() -> u32 {
    0x00FF_FFFF
}

impl Frame {
    /// Build a frame from rows and colors.
    pub fn new(rows: &[&str], fg: Rgb, bg: Rgb) -> Self {
        Self {
            rows: rows.iter().map(|row| (*row).to_string()).collect(),
            fg: to_hex(fg),
            bg: to_hex(bg),
        }
    }

    /// Width in columns (the widest row).
    pub fn width(&self) -> u16 {
        let widest = self
            .rows
            .iter()
            .map(|row| unicode_width::UnicodeWidthStr::width(row.as_str()))
            .max()
            .unwrap_or(0);
        u16::try_from(widest).unwrap_or(u16::MAX)
    }

    /// Height in rows.
    pub fn height(&self) -> u16 {
        u16::try_from(self.rows.len()).unwrap_or(u16::MAX)
    }

    /// Foreground color.
    pub const fn fg(&self) -> Rgb {
        Rgb::from_u32(self.fg)
    }

    /// Background color.
    pub const fn bg(&self) -> Rgb {
        Rgb::from_u32(self.bg)
    }
}

const fn to_hex(color: Rgb) -> u32 {
    ((color.r as u32) << 16) | ((color.g as u32) << 8) | color.b as u32
}

/// An ordered set of frames sharing one description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnimationSheet {
    /// Lookup key.
    pub description: String,
    /// Frames in playback order.
    pub frames: Vec<Arc<Frame>>,
}

impl AnimationSheet {
    /// Get a frame by index.
    pub fn frame(&self, index: usize) -> Option<&Arc<Frame>> {
        self.frames.get(index)
    }
}

/// A single still frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    /// Lookup key.
    pub description: String,
    /// The frame.
    pub frame: Arc<Frame>,
}

/// Any asset the catalog can hold.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    /// Multi-frame asset.
    Animation(AnimationSheet),
    /// Single-frame asset.
    Image(Image),
}

impl Asset {
    /// The description this asset is looked up by.
    pub fn description(&self) -> &str {
        match self {
            Self::Animation(sheet) => &sheet.description,
            Self::Image(image) => &image.description,
        }
    }

    /// This asset as an animation, if it is one.
    pub const fn as_animation(&self) -> Option<&AnimationSheet> {
        match self {
            Self::Animation(sheet) => Some(sheet),
            Self::Image(_) => None,
        }
    }

    /// This asset as a single frame. Animations answer with their first frame.
    pub fn as_frame(&self) -> Option<&Arc<Frame>> {
        match self {
            Self::Animation(sheet) => sheet.frame(0),
            Self::Image(image) => Some(&image.frame),
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    assets: Vec<Asset>,
}

/// The set of loaded assets.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
}

impl AssetCatalog {
    /// Create a catalog from a list of assets.
    pub const fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    /// The art the table ships with.
    pub fn builtin() -> Self {
        let ivory = Rgb::new(245, 240, 225);
        let navy = Rgb::new(30, 40, 110);
        let ink = Rgb::new(20, 20, 20);

        let cursor = AnimationSheet {
            description: CURSOR.to_string(),
            frames: vec![
                Arc::new(Frame::new(&["+"], Rgb::WHITE, Rgb::FELT)),
                Arc::new(Frame::new(&["✚"], Rgb::GOLD, Rgb::FELT)),
            ],
        };
        let back = Image {
            description: CARD_BACK.to_string(),
            frame: Arc::new(Frame::new(
                &["╔═════╗", "║░░░░░║", "║░░░░░║", "║░░░░░║", "╚═════╝"],
                ivory,
                navy,
            )),
        };
        let front = Image {
            description: CARD_FRONT.to_string(),
            frame: Arc::new(Frame::new(
                &["┌─────┐", "│A    │", "│  ♠  │", "│    A│", "└─────┘"],
                ink,
                ivory,
            )),
        };

        Self::new(vec![
            Asset::Animation(cursor),
            Asset::Image(back),
            Asset::Image(front),
        ])
    }

    /// Load a catalog from a JSON file of the form `{"assets": [...]}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| Error::Asset(e.to_string()))?;
        Ok(Self::new(file.assets))
    }

    /// Whether any asset carries `description`.
    pub fn is_description_available(&self, description: &str) -> bool {
        self.find(description).is_some()
    }

    /// Find an asset by description.
    pub fn find(&self, description: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.description() == description)
    }

    /// Find an animation by description.
    pub fn animation(&self, description: &str) -> Option<&AnimationSheet> {
        self.find(description).and_then(Asset::as_animation)
    }

    /// Find a single frame by description.
    pub fn image(&self, description: &str) -> Option<Arc<Frame>> {
        self.find(description).and_then(Asset::as_frame).cloned()
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_cursor_and_cards() {
        let catalog = AssetCatalog::builtin();
        let cursor = catalog.animation(CURSOR).unwrap();
        assert_eq!(cursor.frames.len(), 2);
        assert!(catalog.image(CARD_BACK).is_some());
        assert!(catalog.image(CARD_FRONT).is_some());
    }

    #[test]
    fn test_image_is_not_an_animation() {
        let catalog = AssetCatalog::builtin();
        assert!(catalog.animation(CARD_BACK).is_none());
        assert!(catalog.image(CURSOR).is_some());
    }

    #[test]
    fn test_missing_description() {
        let catalog = AssetCatalog::default();
        assert!(!catalog.is_description_available(CURSOR));
        assert!(catalog.animation(CURSOR).is_none());
    }

    #[test]
    fn test_frame_dimensions() {
        let catalog = AssetCatalog::builtin();
        let back = catalog.image(CARD_BACK).unwrap();
        assert_eq!(back.width(), 7);
        assert_eq!(back.height(), 5);
        assert_eq!(back.fg(), Rgb::new(245, 240, 225));
    }

    #[test]
    fn test_from_json() {
        let json = r###"{
            "assets": [
                {"kind": "animation", "description": "cursor",
                 "frames": [{"rows": ["o"]}, {"rows": ["O"], "fg": 16711680}]},
                {"kind": "image", "description": "card_back",
                 "frame": {"rows": ["##", "##"]}}
            ]
        }"###;
        let catalog = AssetCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        let cursor = catalog.animation(CURSOR).unwrap();
        assert_eq!(cursor.frame(1).unwrap().fg(), Rgb::new(255, 0, 0));
        assert_eq!(catalog.image(CARD_BACK).unwrap().height(), 2);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(AssetCatalog::from_json("{"), Err(Error::Asset(_))));
    }
}
