//! Input events sent from the input thread to the tick loop.

/// Key codes the table reacts to.
///
/// A subset of crossterm's key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    /// Backspace key.
    Backspace,
    /// Enter/Return key.
    Enter,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Delete key.
    Delete,
    /// Escape key.
    Esc,
}

/// Key modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyModifiers {
    /// Shift key held.
    pub shift: bool,
    /// Control key held.
    pub control: bool,
    /// Alt/Option key held.
    pub alt: bool,
}

impl KeyModifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
    };

    /// Only Control.
    pub const CONTROL: Self = Self {
        shift: false,
        control: true,
        alt: false,
    };
}

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
}

/// Mouse event details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
    /// Button involved, if any.
    pub button: Option<MouseButton>,
    /// Modifiers held during the event.
    pub modifiers: KeyModifiers,
}

impl MouseEvent {
    /// A left-button event at `(x, y)`.
    pub const fn left(x: u16, y: u16, modifiers: KeyModifiers) -> Self {
        Self {
            x,
            y,
            button: Some(MouseButton::Left),
            modifiers,
        }
    }

    /// A button-less event at `(x, y)`.
    pub const fn at(x: u16, y: u16, modifiers: KeyModifiers) -> Self {
        Self {
            x,
            y,
            button: None,
            modifiers,
        }
    }
}

/// Events from the input thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key was pressed (or auto-repeated).
    Key {
        /// The key code.
        code: KeyCode,
        /// Modifiers held during the keypress.
        modifiers: KeyModifiers,
    },

    /// Mouse button pressed.
    MouseDown(MouseEvent),

    /// Mouse button released.
    MouseUp(MouseEvent),

    /// Mouse moved, with or without a button held.
    MouseMove(MouseEvent),

    /// Mouse scroll.
    MouseScroll {
        /// Column.
        x: u16,
        /// Row.
        y: u16,
        /// Scroll delta (positive = up).
        delta: i16,
    },

    /// Terminal was resized.
    Resize {
        /// New width in columns.
        width: u16,
        /// New height in rows.
        height: u16,
    },

    /// Terminal gained focus.
    FocusGained,

    /// Terminal lost focus; the pointer is treated as outside the window.
    FocusLost,

    /// Input thread encountered an error.
    Error(String),

    /// Input thread is shutting down.
    Shutdown,
}
