//! Frame Orchestrator: drives one tick at a time.
//!
//! A running tick is, strictly in order:
//!
//! 1. measure elapsed time since the previous tick;
//! 2. fold window input and translate it (with at most one control message);
//! 3. execute the command table;
//! 4. update fan-out, then its barrier;
//! 5. clear the frame;
//! 6. draw fan-out, then its barrier, then the cursor on top;
//! 7. present, and publish title telemetry when a sampling window closes;
//! 8. inspect the diagnostics log for the stop sentinel.
//!
//! A sentinel moves the loop to `Stopping`. The next tick does no command
//! execution and no fan-out: it waits out the grace interval, destroys the
//! window and reports `Terminated`.

use crate::actor::TelemetryTicker;
use crate::asset::AssetCatalog;
use crate::camera::Camera;
use crate::command::{CommandContext, CommandTable};
use crate::config::Config;
use crate::control::ControlReceiver;
use crate::diagnostics::DiagnosticsLog;
use crate::entity::{DrawOp, EntityId, Layer};
use crate::error::Result;
use crate::input::{Controls, CursorView, InputState, Translator};
use crate::registry::Registry;
use crate::surface::{Modifiers, Rgb, Surface};
use crate::window::Window;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Ticking normally.
    Running,
    /// Stop requested; the next tick tears down after the grace interval.
    Stopping,
    /// Window destroyed; ticks are no-ops.
    Terminated,
}

/// Owns the table and drives it through ticks.
#[derive(Debug)]
pub struct Orchestrator<W: Window> {
    window: W,
    registry: Registry,
    commands: CommandTable,
    translator: Translator,
    camera: Camera,
    input: InputState,
    surface: Surface,
    ticker: TelemetryTicker,
    state: OrchestratorState,
    show_bounds: bool,
    selection: Option<EntityId>,
    title: String,
    grace: Duration,
    frame_duration: Option<Duration>,
    last_tick: Instant,
    frames: u64,
}

impl<W: Window> Orchestrator<W> {
    /// Build the table around an open window.
    ///
    /// Fails if the worker pool cannot be built.
    pub fn new(
        window: W,
        config: &Config,
        catalog: &AssetCatalog,
        control: ControlReceiver,
    ) -> Result<Self> {
        let registry = Registry::new(config.engine.workers)?;
        let camera = Camera::from_config(&config.camera);
        let translator = Translator::new(catalog, control, camera.cell_size);
        let (width, height) = window.size();

        Ok(Self {
            window,
            registry,
            commands: CommandTable::new(),
            translator,
            camera,
            input: InputState::new((width, height)),
            surface: Surface::new(width, height),
            ticker: TelemetryTicker::spawn(config.engine.telemetry_interval()),
            state: OrchestratorState::Running,
            show_bounds: false,
            selection: None,
            title: config.window.title.clone(),
            grace: config.engine.shutdown_grace(),
            frame_duration: config.window.frame_duration(),
            last_tick: Instant::now(),
            frames: 0,
        })
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> OrchestratorState {
        self.state
    }

    /// The live entities.
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The live entities, for seeding the table before the loop starts.
    pub const fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// The camera.
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The window.
    pub const fn window(&self) -> &W {
        &self.window
    }

    /// The last composed frame.
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    /// The input translator.
    pub const fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Whether debug bounds are drawn.
    pub const fn show_bounds(&self) -> bool {
        self.show_bounds
    }

    /// Currently selected entity.
    pub const fn selection(&self) -> Option<EntityId> {
        self.selection
    }

    /// Tick until the window is gone.
    pub fn run(&mut self) -> Result<()> {
        info!(title = %self.title, "tick loop started");
        while self.tick()? != OrchestratorState::Terminated {}
        info!("tick loop finished");
        Ok(())
    }

    /// Advance the loop by one tick and report the resulting state.
    pub fn tick(&mut self) -> Result<OrchestratorState> {
        match self.state {
            OrchestratorState::Running => self.tick_running()?,
            OrchestratorState::Stopping => self.shut_down()?,
            OrchestratorState::Terminated => {}
        }
        Ok(self.state)
    }

    fn tick_running(&mut self) -> Result<()> {
        let tick_start = Instant::now();
        let elapsed = tick_start.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = tick_start;

        let raw = self.input.fold(self.window.poll_input());
        if raw.close_requested {
            info!("window closed by user");
            self.window.destroy()?;
            self.state = OrchestratorState::Terminated;
            return Ok(());
        }
        self.surface.resize(raw.viewport.0, raw.viewport.1);

        let translation = self.translator.translate(
            &raw,
            elapsed,
            Controls {
                commands: &mut self.commands,
                camera: &mut self.camera,
                show_bounds: &mut self.show_bounds,
                selection: self.selection,
            },
        );
        let mut log = translation.log;

        let cursor_world = raw
            .pointer
            .map(|(col, row)| self.camera.unproject(col, row, raw.viewport));
        self.commands.execute_all(&mut CommandContext {
            registry: &mut self.registry,
            camera: &mut self.camera,
            cursor_world,
            selection: &mut self.selection,
            log: &mut log,
        });

        self.registry.update_all(elapsed);

        self.surface.clear(Rgb::FELT);
        self.registry
            .draw_all(&mut self.surface, &self.camera, self.show_bounds);
        self.draw_cursor(translation.cursor)?;

        self.window.present(&self.surface)?;
        self.frames += 1;
        if self.ticker.try_sample().is_some() {
            self.publish_telemetry()?;
        }

        if self.inspect(&log) {
            info!(grace_ms = self.grace.as_millis(), "stop requested, shutting down");
            self.state = OrchestratorState::Stopping;
            return Ok(());
        }

        if let Some(frame_duration) = self.frame_duration {
            let spent = tick_start.elapsed();
            if spent < frame_duration {
                thread::sleep(frame_duration - spent);
            }
        }
        Ok(())
    }

    /// Draw the cursor sprite last, over everything else.
    ///
    /// An unset cursor is skipped; the system cursor stays hidden anyway so
    /// the pointer is simply not shown.
    fn draw_cursor(&mut self, view: CursorView) -> Result<()> {
        let CursorView::Sprite { col, row } = view else {
            return self.window.set_cursor_visible(true);
        };
        self.window.set_cursor_visible(false)?;

        if let Some(frame) = self.translator.cursor_frame() {
            let viewport = (self.surface.width(), self.surface.height());
            let mut layer = Layer::new();
            layer.push(DrawOp::Sprite {
                frame: Arc::clone(frame),
                center: self.camera.unproject(col, row, viewport),
                modifiers: Modifiers::empty(),
                tint: None,
            });
            layer.composite(&mut self.surface, &self.camera);
        }
        Ok(())
    }

    fn publish_telemetry(&mut self) -> Result<()> {
        let title = format!(
            "{} | FPS: {} | Entities: {}",
            self.title,
            self.frames,
            self.registry.count()
        );
        self.frames = 0;
        self.window.set_title(&title)
    }

    /// Log every entry and report whether the stop sentinel is among them.
    fn inspect(&self, log: &DiagnosticsLog) -> bool {
        for entry in log {
            debug!(message = %entry, "diagnostics");
        }
        log.contains_stop()
    }

    fn shut_down(&mut self) -> Result<()> {
        thread::sleep(self.grace);
        self.window.destroy()?;
        self.state = OrchestratorState::Terminated;
        info!("window destroyed");
        Ok(())
    }
}
