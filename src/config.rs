//! Configuration for the table, its window and the console service.
//!
//! Every field has a default, so an empty (or missing) TOML file yields a
//! working setup. Values that used to be ambient toggles, such as whether
//! the console service runs, are plain fields passed at construction.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Terminal window settings.
    pub window: WindowConfig,
    /// Camera tuning.
    pub camera: CameraConfig,
    /// Tick loop and worker settings.
    pub engine: EngineConfig,
    /// Console service settings.
    pub console: ConsoleConfig,
    /// Log output settings.
    pub log: LogConfig,
    /// JSON asset catalog to load instead of the built-in one.
    pub assets: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// Fails on unknown fields and on camera values that cannot project.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.camera.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_toml_file)
    }
}

/// Terminal window settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Base window title; telemetry is appended to it.
    pub title: String,
    /// Frame cap. 0 runs unpaced.
    pub target_fps: u32,
    /// How long the input thread waits for an event before rechecking shutdown.
    pub input_poll_timeout_ms: u64,
    /// Whether to capture mouse events.
    pub enable_mouse: bool,
    /// Whether to draw on the alternate screen.
    pub alternate_screen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "tabletop".to_string(),
            target_fps: 0,
            input_poll_timeout_ms: 10,
            enable_mouse: true,
            alternate_screen: true,
        }
    }
}

impl WindowConfig {
    /// Input poll timeout as a duration.
    pub const fn input_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.input_poll_timeout_ms)
    }

    /// Minimum frame duration, or `None` when unpaced.
    pub fn frame_duration(&self) -> Option<Duration> {
        (self.target_fps > 0).then(|| Duration::from_secs(1) / self.target_fps)
    }
}

/// Camera tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Pan speed in world units per second.
    pub speed: f64,
    /// Initial zoom.
    pub zoom: f64,
    /// Base of the exponential scroll zoom.
    pub zoom_speed: f64,
    /// World units covered by one terminal column at zoom 1.
    pub cell_width: f64,
    /// World units covered by one terminal row at zoom 1.
    pub cell_height: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 500.0,
            zoom: 1.0,
            zoom_speed: 1.2,
            cell_width: 8.0,
            cell_height: 16.0,
        }
    }
}

impl CameraConfig {
    /// Cell size, zoom and zoom speed must be finite and positive; speed
    /// must be finite.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cell_width", self.cell_width),
            ("cell_height", self.cell_height),
            ("zoom", self.zoom),
            ("zoom_speed", self.zoom_speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "camera.{name} must be finite and positive, got {value}"
                )));
            }
        }
        if !self.speed.is_finite() {
            return Err(Error::Config(format!(
                "camera.speed must be finite, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

/// Tick loop and worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fan-out worker threads. 0 picks one per core.
    pub workers: usize,
    /// Pending control messages held before the oldest is dropped.
    pub control_capacity: usize,
    /// Pause between the stop request and teardown.
    pub shutdown_grace_ms: u64,
    /// Interval between title telemetry updates.
    pub telemetry_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            control_capacity: 1,
            shutdown_grace_ms: 2000,
            telemetry_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    /// Shutdown grace interval as a duration.
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Telemetry interval as a duration.
    pub const fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }
}

/// Console service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Whether to start the console server.
    pub enabled: bool,
    /// Address to listen on.
    pub addr: SocketAddr,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: SocketAddr::from(([127, 0, 0, 1], 7070)),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// File the log is written to; the terminal itself is the render surface.
    pub file: PathBuf,
    /// Emit JSON lines instead of the compact format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("tabletop.log"),
            json: false,
        }
    }
}
