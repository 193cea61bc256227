//! Input: terminal events, the per-tick snapshot, and the translator that
//! turns them into commands.

mod event;
mod raw;
mod translator;

pub use event::{InputEvent, KeyCode, KeyModifiers, MouseButton, MouseEvent};
pub use raw::{ButtonState, InputState, RawInput};
pub use translator::{Controls, CursorSprite, CursorState, CursorView, Translation, Translator};
