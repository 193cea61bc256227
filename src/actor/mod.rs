//! Actors: the threads around the tick loop.
//!
//! Each actor owns one blocking resource and talks to the tick loop over
//! crossbeam channels, so the loop itself only ever does non-blocking
//! checks:
//!
//! ```text
//! ┌──────────────┐     InputEvent      ┌──────────────┐
//! │ Input Thread │ ──────────────────▶ │              │
//! └──────────────┘                     │              │
//! ┌──────────────┐       Sample        │  Tick Loop   │
//! │Ticker Thread │ ──────────────────▶ │              │
//! └──────────────┘                     │              │
//! ┌──────────────┐    RenderCommand    │              │
//! │Render Thread │ ◀────────────────── │              │
//! └──────────────┘                     └──────────────┘
//! ```

mod input;
mod renderer;
mod ticker;

pub use input::{convert_event, InputActor};
pub use renderer::{RenderCommand, RenderStats, RendererActor};
pub use ticker::{Sample, TelemetryTicker};
