//! Surface module: the cell grid the table is drawn into.
//!
//! - [`Cell`]: one glyph with colors and style
//! - [`Surface`]: a grid of cells sized to the terminal
//! - [`diff`]: encoder producing minimal ANSI output between two surfaces

mod cell;
#[allow(clippy::module_inception)]
mod surface;
pub mod diff;

pub use cell::{Cell, CellFlags, Modifiers, Rgb};
pub use surface::Surface;
