//! Input Actor: dedicated thread polling terminal events.
//!
//! Uses crossterm's event polling so keyboard, mouse, focus and resize
//! events are captured without blocking the tick loop, which drains them
//! once per tick.

use crate::input::{InputEvent, KeyCode, KeyModifiers, MouseButton, MouseEvent};
use crossbeam_channel::{SendTimeoutError, Sender};
use crossterm::event::{self, Event, KeyEventKind};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long one delivery attempt waits on a full channel.
const SEND_RETRY: Duration = Duration::from_millis(20);

/// Input actor that polls terminal events.
#[derive(Debug)]
pub struct InputActor {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl InputActor {
    /// Spawn the input thread.
    ///
    /// `poll_timeout` bounds how long the thread waits for an event before
    /// rechecking the shutdown flag.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to spawn the thread.
    pub fn spawn(sender: Sender<InputEvent>, poll_timeout: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("tabletop-input".to_string())
            .spawn(move || {
                Self::run_loop(&sender, &shutdown_clone, poll_timeout);
            })
            .expect("Failed to spawn input thread");

        Self {
            handle: Some(handle),
            shutdown,
        }
    }

    /// Signal the input thread to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the input thread to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(sender: &Sender<InputEvent>, shutdown: &AtomicBool, poll_timeout: Duration) {
        pump(sender, shutdown, || {
            if event::poll(poll_timeout)? {
                event::read().map(Some)
            } else {
                Ok(None)
            }
        });
    }
}

/// Forward events from `next` until shutdown or until the receiver is gone.
///
/// A full channel never wedges the thread: delivery is retried in
/// [`SEND_RETRY`] slices with the shutdown flag checked in between.
fn pump<F>(sender: &Sender<InputEvent>, shutdown: &AtomicBool, mut next: F)
where
    F: FnMut() -> io::Result<Option<Event>>,
{
    while !shutdown.load(Ordering::Relaxed) {
        let delivered = match next() {
            Ok(Some(event)) => match convert_event(event) {
                Some(input_event) => deliver(sender, input_event, shutdown),
                None => true,
            },
            Ok(None) => true,
            Err(e) => deliver(sender, InputEvent::Error(e.to_string()), shutdown),
        };
        if !delivered {
            break;
        }
    }
    let _ = sender.try_send(InputEvent::Shutdown);
}

/// Returns `false` if the event was abandoned (shutdown or disconnect).
fn deliver(sender: &Sender<InputEvent>, mut event: InputEvent, shutdown: &AtomicBool) -> bool {
    loop {
        match sender.send_timeout(event, SEND_RETRY) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(unsent)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                event = unsent;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

impl Drop for InputActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Convert a crossterm event, dropping the kinds the table ignores.
pub fn convert_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Key(key_event) => {
            // Presses and auto-repeats both mean "held this tick"
            if key_event.kind == KeyEventKind::Release {
                return None;
            }
            let code = convert_key_code(key_event.code)?;
            let modifiers = convert_modifiers(key_event.modifiers);
            Some(InputEvent::Key { code, modifiers })
        }
        Event::Mouse(mouse_event) => convert_mouse_event(mouse_event),
        Event::Resize(width, height) => Some(InputEvent::Resize { width, height }),
        Event::FocusGained => Some(InputEvent::FocusGained),
        Event::FocusLost => Some(InputEvent::FocusLost),
        Event::Paste(_) => None,
    }
}

const fn convert_key_code(code: event::KeyCode) -> Option<KeyCode> {
    Some(match code {
        event::KeyCode::Char(c) => KeyCode::Char(c),
        event::KeyCode::Backspace => KeyCode::Backspace,
        event::KeyCode::Enter => KeyCode::Enter,
        event::KeyCode::Left => KeyCode::Left,
        event::KeyCode::Right => KeyCode::Right,
        event::KeyCode::Up => KeyCode::Up,
        event::KeyCode::Down => KeyCode::Down,
        event::KeyCode::Delete => KeyCode::Delete,
        event::KeyCode::Esc => KeyCode::Esc,
        _ => return None,
    })
}

fn convert_modifiers(mods: event::KeyModifiers) -> KeyModifiers {
    KeyModifiers {
        shift: mods.contains(event::KeyModifiers::SHIFT),
        control: mods.contains(event::KeyModifiers::CONTROL),
        alt: mods.contains(event::KeyModifiers::ALT),
    }
}

fn convert_mouse_event(mouse: event::MouseEvent) -> Option<InputEvent> {
    let modifiers = convert_modifiers(mouse.modifiers);
    let at = |button: Option<MouseButton>| MouseEvent {
        x: mouse.column,
        y: mouse.row,
        button,
        modifiers,
    };

    match mouse.kind {
        event::MouseEventKind::Down(button) => {
            Some(InputEvent::MouseDown(at(Some(convert_mouse_button(button)))))
        }
        event::MouseEventKind::Up(button) => {
            Some(InputEvent::MouseUp(at(Some(convert_mouse_button(button)))))
        }
        event::MouseEventKind::Drag(button) => {
            Some(InputEvent::MouseMove(at(Some(convert_mouse_button(button)))))
        }
        event::MouseEventKind::Moved => Some(InputEvent::MouseMove(at(None))),
        event::MouseEventKind::ScrollUp => Some(InputEvent::MouseScroll {
            x: mouse.column,
            y: mouse.row,
            delta: 1,
        }),
        event::MouseEventKind::ScrollDown => Some(InputEvent::MouseScroll {
            x: mouse.column,
            y: mouse.row,
            delta: -1,
        }),
        _ => None,
    }
}

const fn convert_mouse_button(button: event::MouseButton) -> MouseButton {
    match button {
        event::MouseButton::Left => MouseButton::Left,
        event::MouseButton::Right => MouseButton::Right,
        event::MouseButton::Middle => MouseButton::Middle,
    }
}
