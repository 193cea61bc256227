//! Renderer Actor: dedicated thread writing frames to the terminal.
//!
//! The tick loop composes each frame into a [`Surface`] and hands it over;
//! this thread diffs it against what is on screen and flushes the result
//! with a single write. Title and cursor-visibility changes travel the same
//! channel so every byte that reaches the terminal is written by one thread.

use crate::surface::diff::{render_diff, render_full, DiffState};
use crate::surface::Surface;
use crossbeam_channel::Receiver;
use crossterm::{cursor, queue, terminal::SetTitle};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Commands sent to the render thread.
#[derive(Debug)]
pub enum RenderCommand {
    /// Redraw every cell of this frame.
    FullRedraw(Box<Surface>),
    /// Draw only what changed since the last frame.
    Update(Box<Surface>),
    /// Show or hide the terminal cursor.
    SetCursorVisible(bool),
    /// Replace the window title.
    SetTitle(String),
    /// Stop the render thread.
    Shutdown,
}

/// Render statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames rendered.
    pub frames: u64,
    /// Cells changed across all diffed frames.
    pub cells_changed: u64,
    /// Bytes written to the terminal.
    pub bytes_written: u64,
    /// Smoothed render time in microseconds.
    pub avg_render_us: u64,
    /// Last render time in microseconds.
    pub last_render_us: u64,
}

/// Diffing state and the sink it writes to.
struct Renderer<W: Write> {
    /// What is on screen.
    current: Surface,
    diff_state: DiffState,
    /// Pre-allocated output buffer.
    output: Vec<u8>,
    sink: W,
    stats: RenderStats,
    needs_full_redraw: bool,
}

impl<W: Write> Renderer<W> {
    fn new(sink: W) -> Self {
        Self {
            current: Surface::new(1, 1),
            diff_state: DiffState::new(),
            output: Vec::with_capacity(65536),
            sink,
            stats: RenderStats::default(),
            needs_full_redraw: true,
        }
    }

    /// Put `next` on screen.
    fn render(&mut self, next: &Surface, full: bool) -> io::Result<()> {
        let start = Instant::now();
        self.output.clear();

        let size_changed =
            next.width() != self.current.width() || next.height() != self.current.height();
        if full || size_changed || self.needs_full_redraw {
            render_full(next, &mut self.output);
            self.needs_full_redraw = false;
            self.diff_state.reset();
        } else {
            let result = render_diff(&self.current, next, &mut self.output, &mut self.diff_state);
            self.stats.cells_changed += result.cells_changed as u64;
        }

        self.flush()?;

        if size_changed {
            self.current.resize(next.width(), next.height());
        }
        self.current.copy_from(next);

        let elapsed = start.elapsed();
        self.stats.frames += 1;
        self.stats.last_render_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.stats.avg_render_us = if self.stats.avg_render_us == 0 {
            self.stats.last_render_us
        } else {
            (self.stats.avg_render_us * 15 + self.stats.last_render_us) / 16
        };

        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.output.clear();
        if visible {
            queue!(self.output, cursor::Show)?;
        } else {
            queue!(self.output, cursor::Hide)?;
        }
        self.flush()
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        self.output.clear();
        queue!(self.output, SetTitle(title))?;
        self.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.output.is_empty() {
            self.sink.write_all(&self.output)?;
            self.sink.flush()?;
            self.stats.bytes_written += self.output.len() as u64;
        }
        Ok(())
    }

    /// Apply one command. Returns `false` once told to shut down.
    fn apply(&mut self, command: RenderCommand) -> io::Result<bool> {
        match command {
            RenderCommand::FullRedraw(surface) => self.render(&surface, true)?,
            RenderCommand::Update(surface) => self.render(&surface, false)?,
            RenderCommand::SetCursorVisible(visible) => self.set_cursor_visible(visible)?,
            RenderCommand::SetTitle(title) => self.set_title(&title)?,
            RenderCommand::Shutdown => return Ok(false),
        }
        Ok(true)
    }
}

/// Renderer actor that owns terminal output.
#[derive(Debug)]
pub struct RendererActor {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl RendererActor {
    /// Spawn the render thread writing to stdout.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to spawn the thread.
    pub fn spawn(receiver: Receiver<RenderCommand>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("tabletop-render".to_string())
            .spawn(move || {
                let mut renderer = Renderer::new(io::stdout());
                if let Err(e) = Self::run_loop(&mut renderer, &receiver, &shutdown_clone) {
                    error!(error = %e, "render thread failed");
                }
                debug!(stats = ?renderer.stats, "render thread finished");
            })
            .expect("Failed to spawn render thread");

        Self {
            handle: Some(handle),
            shutdown,
        }
    }

    /// Signal the render thread to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the render thread to finish.
    ///
    /// Commands already queued are drained first.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop<W: Write>(
        renderer: &mut Renderer<W>,
        receiver: &Receiver<RenderCommand>,
        shutdown: &AtomicBool,
    ) -> io::Result<()> {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            // Timeout keeps the shutdown flag responsive
            if let Ok(command) = receiver.recv_timeout(Duration::from_millis(16)) {
                if !renderer.apply(command)? {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Drop for RendererActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Cell, Rgb};

    fn frame(text: &str) -> Surface {
        let mut surface = Surface::new(10, 2);
        surface.draw_text(0, 0, text, Rgb::WHITE, Rgb::BLACK);
        surface
    }

    #[test]
    fn test_first_frame_is_full_then_diffed() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.render(&frame("hello"), false).unwrap();
        let first = renderer.sink.len();
        assert!(first > 0);
        assert_eq!(renderer.stats.cells_changed, 0);

        let mut next = frame("hello");
        next.set(0, 1, Cell::from_char('x'));
        renderer.render(&next, false).unwrap();
        assert_eq!(renderer.stats.frames, 2);
        assert_eq!(renderer.stats.cells_changed, 1);
        assert!(renderer.sink.len() - first < first);
    }

    #[test]
    fn test_unchanged_frame_writes_nothing() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.render(&frame("same"), false).unwrap();
        let written = renderer.sink.len();
        renderer.render(&frame("same"), false).unwrap();
        assert_eq!(renderer.sink.len(), written);
    }

    #[test]
    fn test_resize_forces_full_redraw() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.render(&frame("a"), false).unwrap();
        renderer.render(&Surface::new(20, 4), false).unwrap();
        assert_eq!(renderer.current.width(), 20);
        assert_eq!(renderer.stats.cells_changed, 0);
    }

    #[test]
    fn test_title_and_cursor_commands() {
        let mut renderer = Renderer::new(Vec::new());
        assert!(renderer
            .apply(RenderCommand::SetTitle("tabletop | FPS: 60".to_string()))
            .unwrap());
        let text = String::from_utf8_lossy(&renderer.sink).into_owned();
        assert!(text.contains("tabletop | FPS: 60"));

        renderer.sink.clear();
        renderer.apply(RenderCommand::SetCursorVisible(false)).unwrap();
        assert_eq!(renderer.sink, b"\x1b[?25l");

        assert!(!renderer.apply(RenderCommand::Shutdown).unwrap());
    }

    #[test]
    fn test_run_loop_drains_until_shutdown() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(RenderCommand::Update(Box::new(frame("x")))).unwrap();
        tx.send(RenderCommand::Shutdown).unwrap();
        let mut renderer = Renderer::new(Vec::new());
        RendererActor::run_loop(&mut renderer, &rx, &AtomicBool::new(false)).unwrap();
        assert_eq!(renderer.stats.frames, 1);
    }
}
