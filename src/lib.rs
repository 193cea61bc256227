//! # Tabletop
//!
//! A parallel card-table simulation loop for the terminal, steered by an
//! external console.
//!
//! Each tick the loop translates terminal input and at most one console
//! message into deferred commands, runs those commands against the entity
//! registry, then fans entity update and draw work out over a worker pool,
//! waiting on a barrier after each pass before moving on.
//!
//! ## Core Concepts
//!
//! - **Registry fan-out**: one unit of work per entity on a `rayon` pool,
//!   joined before the next phase starts
//! - **Command table**: keyed, last-write-wins deferred operations, run
//!   between input translation and the update pass
//! - **Control channel**: bounded and non-blocking on both ends; a full
//!   channel drops its oldest message
//! - **Actor model**: input, rendering and telemetry each on their own thread
//!
//! ## Example
//!
//! ```rust,no_run
//! use tabletop::{control, AssetCatalog, Config, Orchestrator, TerminalWindow};
//!
//! # fn main() -> tabletop::Result<()> {
//! let config = Config::default();
//! let (_console, receiver) = control::channel(config.engine.control_capacity);
//! let window = TerminalWindow::open(&config.window)?;
//! let mut table = Orchestrator::new(window, &config, &AssetCatalog::builtin(), receiver)?;
//! table.run()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod asset;
pub mod camera;
pub mod command;
pub mod config;
pub mod console;
pub mod control;
pub mod device;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod input;
pub mod orchestrator;
pub mod registry;
pub mod surface;
pub mod window;

// Re-exports for convenience
pub use asset::AssetCatalog;
pub use camera::Camera;
pub use command::{Command, CommandContext, CommandKey, CommandTable, Persistence};
pub use config::Config;
pub use console::ConsoleServer;
pub use control::{ControlMessage, ControlReceiver, ControlSender, Topic};
pub use diagnostics::{DiagnosticsEntry, DiagnosticsLog, STOP_SENTINEL};
pub use entity::{Card, Entity, EntityId};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use registry::Registry;
pub use surface::{Cell, Rgb, Surface};
pub use window::{TerminalWindow, Window};
