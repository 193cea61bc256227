//! Window: the backend the orchestrator draws to and reads input from.
//!
//! [`Window`] is the seam between the tick loop and the terminal. The real
//! backend, [`TerminalWindow`], puts the terminal into raw mode on an
//! alternate screen and runs the input and render actors; tests drive the
//! loop through a scripted implementation instead.

use crate::actor::{InputActor, RenderCommand, RendererActor};
use crate::config::WindowConfig;
use crate::error::{Error, Result};
use crate::input::InputEvent;
use crate::surface::Surface;
use crossbeam_channel::{bounded, Receiver, Sender};
use crossterm::{
    cursor,
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;
use tracing::{debug, info};

/// What the orchestrator needs from a window.
pub trait Window {
    /// Size in cells when the window was opened.
    fn size(&self) -> (u16, u16);

    /// Drain every input event that arrived since the last call.
    fn poll_input(&mut self) -> Vec<InputEvent>;

    /// Put a finished frame on screen.
    fn present(&mut self, surface: &Surface) -> Result<()>;

    /// Replace the window title.
    fn set_title(&mut self, title: &str) -> Result<()>;

    /// Show or hide the system cursor.
    fn set_cursor_visible(&mut self, visible: bool) -> Result<()>;

    /// Tear the window down. Further calls are no-ops.
    fn destroy(&mut self) -> Result<()>;

    /// Whether [`destroy`](Self::destroy) has run.
    fn is_destroyed(&self) -> bool;
}

/// A full-screen terminal window.
#[derive(Debug)]
pub struct TerminalWindow {
    config: WindowConfig,
    size: (u16, u16),
    input_rx: Receiver<InputEvent>,
    render_tx: Sender<RenderCommand>,
    input_actor: Option<InputActor>,
    renderer_actor: Option<RendererActor>,
    cursor_visible: Option<bool>,
    presented: u64,
    destroyed: bool,
}

impl TerminalWindow {
    /// Take over the terminal.
    ///
    /// Fails if the terminal cannot be queried or switched to raw mode.
    pub fn open(config: &WindowConfig) -> Result<Self> {
        let size = terminal::size()?;
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        if config.alternate_screen {
            execute!(stdout, EnterAlternateScreen)?;
        }
        if config.enable_mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        execute!(stdout, EnableFocusChange, cursor::Hide)?;

        let (input_tx, input_rx) = bounded::<InputEvent>(256);
        let (render_tx, render_rx) = bounded::<RenderCommand>(4);

        let input_actor = InputActor::spawn(input_tx, config.input_poll_timeout());
        let renderer_actor = RendererActor::spawn(render_rx);

        info!(width = size.0, height = size.1, "terminal window opened");

        Ok(Self {
            config: config.clone(),
            size,
            input_rx,
            render_tx,
            input_actor: Some(input_actor),
            renderer_actor: Some(renderer_actor),
            cursor_visible: None,
            presented: 0,
            destroyed: false,
        })
    }

    fn send(&self, command: RenderCommand) -> Result<()> {
        self.render_tx
            .send(command)
            .map_err(|_| Error::Io(io::Error::other("render thread stopped")))
    }
}

impl Window for TerminalWindow {
    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn poll_input(&mut self) -> Vec<InputEvent> {
        let events: Vec<_> = self.input_rx.try_iter().collect();
        for event in &events {
            if let InputEvent::Resize { width, height } = *event {
                self.size = (width, height);
            }
        }
        events
    }

    fn present(&mut self, surface: &Surface) -> Result<()> {
        let frame = Box::new(surface.clone());
        let command = if self.presented == 0 {
            RenderCommand::FullRedraw(frame)
        } else {
            RenderCommand::Update(frame)
        };
        self.presented += 1;
        self.send(command)
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.send(RenderCommand::SetTitle(title.to_string()))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        if self.cursor_visible == Some(visible) {
            return Ok(());
        }
        self.cursor_visible = Some(visible);
        self.send(RenderCommand::SetCursorVisible(visible))
    }

    fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        // Queued frames are flushed before the render thread exits
        let _ = self.render_tx.send(RenderCommand::Shutdown);
        if let Some(renderer) = self.renderer_actor.take() {
            renderer.join();
        }
        // Dropping the receiver unblocks an input thread stuck on a full channel
        self.input_rx = crossbeam_channel::never();
        if let Some(input) = self.input_actor.take() {
            input.join();
        }

        let mut stdout = io::stdout();
        execute!(stdout, DisableFocusChange, cursor::Show)?;
        if self.config.enable_mouse {
            execute!(stdout, DisableMouseCapture)?;
        }
        if self.config.alternate_screen {
            execute!(stdout, LeaveAlternateScreen)?;
        }
        terminal::disable_raw_mode()?;

        debug!(frames = self.presented, "terminal window destroyed");
        Ok(())
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for TerminalWindow {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}

/// Best-effort terminal restore, for panic hooks.
pub fn restore_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(
        stdout,
        DisableMouseCapture,
        DisableFocusChange,
        LeaveAlternateScreen,
        cursor::Show
    );
    let _ = terminal::disable_raw_mode();
}
