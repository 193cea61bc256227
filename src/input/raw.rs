//! Per-tick input snapshot.
//!
//! The input thread delivers a stream of [`InputEvent`]s. Once per tick the
//! orchestrator drains that stream and folds it into a [`RawInput`]
//! through an [`InputState`], which carries what persists across ticks
//! (pointer position, held button, Ctrl) and resets what is per-tick
//! (presses, releases, scroll).
//!
//! Terminals report no key releases, so a key counts as held for a tick
//! when it was pressed or auto-repeated during that tick. Ctrl is only
//! known from the modifiers of the most recent mouse event.

use super::event::{InputEvent, KeyCode, MouseButton};
use tracing::warn;

/// One mouse button over one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Held at the end of the tick.
    pub pressed: bool,
    /// Went down during the tick.
    pub just_pressed: bool,
    /// Went up during the tick.
    pub just_released: bool,
}

/// Everything the translator needs to know about one tick of input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInput {
    /// Pointer cell, or `None` when the pointer is outside the window.
    pub pointer: Option<(u16, u16)>,
    /// Window size in cells.
    pub viewport: (u16, u16),
    /// Left mouse button.
    pub left: ButtonState,
    /// Ctrl held.
    pub ctrl: bool,
    /// Keys pressed this tick, deduplicated, in arrival order.
    pub keys: Vec<KeyCode>,
    /// Accumulated scroll delta (positive = up).
    pub scroll: f64,
    /// The user asked to close the window.
    pub close_requested: bool,
}

impl RawInput {
    /// Whether `key` was pressed this tick.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }
}

/// Input that persists from one tick to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pointer: Option<(u16, u16)>,
    viewport: (u16, u16),
    left_down: bool,
    ctrl: bool,
}

impl InputState {
    /// Start with the pointer outside a window of `viewport` cells.
    pub const fn new(viewport: (u16, u16)) -> Self {
        Self {
            pointer: None,
            viewport,
            left_down: false,
            ctrl: false,
        }
    }

    /// Current window size in cells.
    pub const fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    /// Fold one tick's events into a snapshot.
    pub fn fold(&mut self, events: impl IntoIterator<Item = InputEvent>) -> RawInput {
        let mut input = RawInput::default();

        for event in events {
            match event {
                InputEvent::Key { code, modifiers } => {
                    let close = matches!(code, KeyCode::Esc | KeyCode::Char('q'))
                        || (modifiers.control && code == KeyCode::Char('c'));
                    if close {
                        input.close_requested = true;
                    } else if !input.keys.contains(&code) {
                        input.keys.push(code);
                    }
                }
                InputEvent::MouseDown(mouse) => {
                    self.pointer = Some((mouse.x, mouse.y));
                    self.ctrl = mouse.modifiers.control;
                    if mouse.button == Some(MouseButton::Left) {
                        self.left_down = true;
                        input.left.just_pressed = true;
                    }
                }
                InputEvent::MouseUp(mouse) => {
                    self.pointer = Some((mouse.x, mouse.y));
                    self.ctrl = mouse.modifiers.control;
                    if mouse.button == Some(MouseButton::Left) {
                        self.left_down = false;
                        input.left.just_released = true;
                    }
                }
                InputEvent::MouseMove(mouse) => {
                    self.pointer = Some((mouse.x, mouse.y));
                    self.ctrl = mouse.modifiers.control;
                }
                InputEvent::MouseScroll { x, y, delta } => {
                    self.pointer = Some((x, y));
                    input.scroll += f64::from(delta);
                }
                InputEvent::Resize { width, height } => {
                    self.viewport = (width, height);
                }
                InputEvent::FocusLost => {
                    self.pointer = None;
                    self.ctrl = false;
                }
                InputEvent::FocusGained | InputEvent::Shutdown => {}
                InputEvent::Error(message) => warn!(%message, "input thread error"),
            }
        }

        input.pointer = self.pointer;
        input.viewport = self.viewport;
        input.left.pressed = self.left_down;
        input.ctrl = self.ctrl;
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::event::{KeyModifiers, MouseEvent};

    fn key(c: char) -> InputEvent {
        InputEvent::Key {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_keys_are_per_tick_and_deduplicated() {
        let mut state = InputState::new((80, 24));
        let input = state.fold([key('d'), key('d'), key('w')]);
        assert_eq!(input.keys, [KeyCode::Char('d'), KeyCode::Char('w')]);
        assert!(input.key_pressed(KeyCode::Char('w')));

        let next = state.fold([]);
        assert!(next.keys.is_empty());
    }

    #[test]
    fn test_button_edges_and_hold() {
        let mut state = InputState::new((80, 24));
        let down = state.fold([InputEvent::MouseDown(MouseEvent::left(3, 4, KeyModifiers::NONE))]);
        assert_eq!(
            down.left,
            ButtonState {
                pressed: true,
                just_pressed: true,
                just_released: false
            }
        );
        assert_eq!(down.pointer, Some((3, 4)));

        let held = state.fold([]);
        assert!(held.left.pressed);
        assert!(!held.left.just_pressed);

        let up = state.fold([InputEvent::MouseUp(MouseEvent::left(5, 4, KeyModifiers::NONE))]);
        assert!(!up.left.pressed);
        assert!(up.left.just_released);
        assert_eq!(up.pointer, Some((5, 4)));
    }

    #[test]
    fn test_click_within_one_tick() {
        let mut state = InputState::new((80, 24));
        let input = state.fold([
            InputEvent::MouseDown(MouseEvent::left(1, 1, KeyModifiers::NONE)),
            InputEvent::MouseUp(MouseEvent::left(1, 1, KeyModifiers::NONE)),
        ]);
        assert!(input.left.just_pressed);
        assert!(input.left.just_released);
        assert!(!input.left.pressed);
    }

    #[test]
    fn test_ctrl_follows_mouse_modifiers() {
        let mut state = InputState::new((80, 24));
        let input = state.fold([InputEvent::MouseMove(MouseEvent::at(2, 2, KeyModifiers::CONTROL))]);
        assert!(input.ctrl);
        assert!(state.fold([]).ctrl);

        let input = state.fold([InputEvent::MouseMove(MouseEvent::at(2, 3, KeyModifiers::NONE))]);
        assert!(!input.ctrl);
    }

    #[test]
    fn test_close_keys() {
        let mut state = InputState::new((80, 24));
        assert!(state.fold([key('q')]).close_requested);
        assert!(state
            .fold([InputEvent::Key {
                code: KeyCode::Esc,
                modifiers: KeyModifiers::NONE
            }])
            .close_requested);
        let ctrl_c = state.fold([InputEvent::Key {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
        }]);
        assert!(ctrl_c.close_requested);
        assert!(ctrl_c.keys.is_empty());
        assert!(!state.fold([key('c')]).close_requested);
    }

    #[test]
    fn test_focus_lost_moves_pointer_outside() {
        let mut state = InputState::new((80, 24));
        state.fold([InputEvent::MouseMove(MouseEvent::at(9, 9, KeyModifiers::NONE))]);
        let input = state.fold([InputEvent::FocusLost]);
        assert_eq!(input.pointer, None);
    }

    #[test]
    fn test_scroll_and_resize() {
        let mut state = InputState::new((80, 24));
        let input = state.fold([
            InputEvent::MouseScroll { x: 0, y: 0, delta: 1 },
            InputEvent::MouseScroll { x: 0, y: 0, delta: 1 },
            InputEvent::Resize {
                width: 100,
                height: 30,
            },
        ]);
        assert_eq!(input.scroll, 2.0);
        assert_eq!(input.viewport, (100, 30));
        assert_eq!(state.viewport(), (100, 30));
    }
}
