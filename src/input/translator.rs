//! Input Translator: turns one tick of input into commands and state changes.
//!
//! Work happens in a fixed order each tick:
//!
//! 1. diagnostics left over from construction are emitted (first tick only);
//! 2. at most one control message is taken from the control channel. `Poke`
//!    toggles the cursor state; `Stop` appends the stop sentinel and ends
//!    translation for the tick;
//! 3. pointer state: cursor visibility, Ctrl+click selection, drag;
//! 4. keys: place card, toggle bounds, remove selection, pan, zoom.

use crate::asset::{AssetCatalog, Frame, CARD_BACK, CURSOR};
use crate::camera::{Camera, Pan};
use crate::command::{self, CommandKey, CommandTable};
use crate::control::{ControlReceiver, Topic};
use crate::diagnostics::{DiagnosticsEntry, DiagnosticsLog};
use crate::entity::{CardArt, EntityId};
use crate::input::{KeyCode, RawInput};
use glam::DVec2;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The two-state cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    /// At rest.
    #[default]
    Idle,
    /// Button held, Ctrl held, or poked.
    Pressed,
}

impl CursorState {
    /// The other state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Idle => Self::Pressed,
            Self::Pressed => Self::Idle,
        }
    }
}

/// Cursor art, one frame per [`CursorState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorSprite {
    idle: Arc<Frame>,
    pressed: Arc<Frame>,
}

impl CursorSprite {
    /// Resolve the cursor animation from the catalog.
    ///
    /// Frame 0 is idle, frame 1 pressed; a sheet with a single frame uses
    /// it for both.
    pub fn resolve(catalog: &AssetCatalog) -> Option<Self> {
        let sheet = catalog.animation(CURSOR)?;
        let idle = Arc::clone(sheet.frame(0)?);
        let pressed = sheet.frame(1).map_or_else(|| Arc::clone(&idle), Arc::clone);
        Some(Self { idle, pressed })
    }

    /// Frame for `state`.
    pub fn frame(&self, state: CursorState) -> &Arc<Frame> {
        match state {
            CursorState::Idle => &self.idle,
            CursorState::Pressed => &self.pressed,
        }
    }
}

/// How the pointer should be shown this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorView {
    /// Show the terminal's own cursor; draw no sprite.
    #[default]
    System,
    /// Hide the terminal cursor and draw the sprite at this cell.
    Sprite {
        /// Column.
        col: u16,
        /// Row.
        row: u16,
    },
}

/// State the translator mutates directly, outside the command table.
#[derive(Debug)]
pub struct Controls<'a> {
    /// Where commands are filed.
    pub commands: &'a mut CommandTable,
    /// Camera, panned and zoomed in place.
    pub camera: &'a mut Camera,
    /// Debug bounds toggle.
    pub show_bounds: &'a mut bool,
    /// Current selection, read to target remove and drag.
    pub selection: Option<EntityId>,
}

/// Output of one [`Translator::translate`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// Diagnostics produced this tick.
    pub log: DiagnosticsLog,
    /// Pointer presentation for this tick.
    pub cursor: CursorView,
}

/// Translates input and control messages, owning the cursor state machine.
#[derive(Debug)]
pub struct Translator {
    control: ControlReceiver,
    /// `None` when the cursor asset is missing; never drawn then.
    sprite: Option<CursorSprite>,
    state: CursorState,
    card_art: Option<CardArt>,
    cell_size: DVec2,
    /// Produced during construction, emitted on the first tick.
    pending: DiagnosticsLog,
}

impl Translator {
    /// Resolve assets and take ownership of the control channel's consumer.
    ///
    /// Missing assets are not fatal: the cursor stays unset and card
    /// placement is disabled, each with a diagnostics entry on the first
    /// tick.
    pub fn new(catalog: &AssetCatalog, control: ControlReceiver, cell_size: DVec2) -> Self {
        let mut pending = DiagnosticsLog::new();

        let sprite = CursorSprite::resolve(catalog);
        if sprite.is_none() {
            warn!(asset = CURSOR, "cursor asset missing, cursor left unset");
            pending.note(format!("{CURSOR} is not in assets"));
        }

        let card_art = CardArt::from_catalog(catalog);
        if card_art.is_none() {
            warn!(asset = CARD_BACK, "card asset missing, placement disabled");
            pending.note(format!("{CARD_BACK} is not in assets"));
        }

        Self {
            control,
            sprite,
            state: CursorState::Idle,
            card_art,
            cell_size,
            pending,
        }
    }

    /// Current cursor state.
    pub const fn cursor_state(&self) -> CursorState {
        self.state
    }

    /// Cursor frame for the current state, or `None` if the cursor is unset.
    pub fn cursor_frame(&self) -> Option<&Arc<Frame>> {
        self.sprite.as_ref().map(|sprite| sprite.frame(self.state))
    }

    /// Whether the cursor asset was resolved.
    pub const fn is_cursor_set(&self) -> bool {
        self.sprite.is_some()
    }

    /// Translate one tick of input. `elapsed` is in seconds.
    pub fn translate(
        &mut self,
        input: &RawInput,
        elapsed: f64,
        controls: Controls<'_>,
    ) -> Translation {
        let mut out = Translation {
            log: std::mem::take(&mut self.pending),
            cursor: CursorView::System,
        };

        if let Some(message) = self.control.try_receive() {
            match message.topic {
                Topic::Poke => {
                    self.state = self.state.toggled();
                    debug!(state = ?self.state, "cursor poked");
                }
                Topic::Stop => {
                    debug!("stop requested by console");
                    out.log.push(DiagnosticsEntry::stop());
                    return out;
                }
                Topic::Other(name) => trace!(topic = %name, "ignoring control message"),
            }
        }

        let Controls {
            commands,
            camera,
            show_bounds,
            selection,
        } = controls;

        let pointer_world = input
            .pointer
            .map(|(col, row)| camera.unproject(col, row, input.viewport));

        self.translate_pointer(input, pointer_world, commands, selection, &mut out);
        Self::translate_keys(
            input,
            elapsed,
            pointer_world.unwrap_or(camera.position),
            self.card_art.as_ref(),
            self.cell_size,
            Controls {
                commands,
                camera,
                show_bounds,
                selection,
            },
            &mut out.log,
        );

        out
    }

    fn translate_pointer(
        &mut self,
        input: &RawInput,
        pointer_world: Option<DVec2>,
        commands: &mut CommandTable,
        selection: Option<EntityId>,
        out: &mut Translation,
    ) {
        if let Some((col, row)) = input.pointer {
            if !input.ctrl {
                out.cursor = CursorView::Sprite { col, row };
            }
        }

        if input.left.just_released {
            commands.remove(&CommandKey::Drag);
            if !input.ctrl {
                self.state = CursorState::Idle;
            }
        }

        if input.ctrl {
            self.state = CursorState::Pressed;
            if let (true, Some(at)) = (input.left.just_pressed, pointer_world) {
                let (key, command) = command::select_at(at);
                commands.set(key, command);
            }
        } else if input.left.pressed {
            self.state = CursorState::Pressed;
            if selection.is_some() && !commands.contains(&CommandKey::Drag) {
                let (key, command) = command::drag();
                commands.set(key, command);
            }
        }
    }

    fn translate_keys(
        input: &RawInput,
        elapsed: f64,
        target: DVec2,
        card_art: Option<&CardArt>,
        cell_size: DVec2,
        controls: Controls<'_>,
        log: &mut DiagnosticsLog,
    ) {
        let mut pan = Pan::default();

        for key in &input.keys {
            match key {
                KeyCode::Char('0') => match card_art {
                    Some(art) => {
                        let (key, command) = command::add_card_at(target, art.clone(), cell_size);
                        controls.commands.set(key, command);
                    }
                    None => log.note(format!("{CARD_BACK} is not in assets")),
                },
                KeyCode::Char('h') => *controls.show_bounds = !*controls.show_bounds,
                KeyCode::Delete | KeyCode::Backspace => {
                    if let Some(id) = controls.selection {
                        let (key, command) = command::remove(id);
                        controls.commands.set(key, command);
                    }
                }
                KeyCode::Char('a') | KeyCode::Left => pan.west = true,
                KeyCode::Char('d') | KeyCode::Right => pan.east = true,
                KeyCode::Char('s') | KeyCode::Down => pan.south = true,
                KeyCode::Char('w') | KeyCode::Up => pan.north = true,
                _ => {}
            }
        }

        controls.camera.pan(pan, elapsed);
        controls.camera.zoom_by(input.scroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{self, ControlMessage, ControlSender};
    use crate::diagnostics::STOP_SENTINEL;
    use crate::input::ButtonState;

    struct Harness {
        translator: Translator,
        console: ControlSender,
        commands: CommandTable,
        camera: Camera,
        show_bounds: bool,
        selection: Option<EntityId>,
    }

    impl Harness {
        fn with_catalog(catalog: &AssetCatalog) -> Self {
            let (console, receiver) = control::channel(1);
            let camera = Camera::default();
            Self {
                translator: Translator::new(catalog, receiver, camera.cell_size),
                console,
                commands: CommandTable::new(),
                camera,
                show_bounds: false,
                selection: None,
            }
        }

        fn new() -> Self {
            Self::with_catalog(&AssetCatalog::builtin())
        }

        fn translate(&mut self, input: &RawInput, elapsed: f64) -> Translation {
            self.translator.translate(
                input,
                elapsed,
                Controls {
                    commands: &mut self.commands,
                    camera: &mut self.camera,
                    show_bounds: &mut self.show_bounds,
                    selection: self.selection,
                },
            )
        }
    }

    fn idle_input() -> RawInput {
        RawInput {
            viewport: (80, 24),
            ..RawInput::default()
        }
    }

    fn keys(keys: &[KeyCode]) -> RawInput {
        RawInput {
            keys: keys.to_vec(),
            ..idle_input()
        }
    }

    #[test]
    fn test_two_pokes_round_trip() {
        let mut harness = Harness::new();
        assert_eq!(harness.translator.cursor_state(), CursorState::Idle);

        harness.console.try_send(ControlMessage::poke());
        harness.translate(&idle_input(), 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Pressed);

        harness.console.try_send(ControlMessage::poke());
        harness.translate(&idle_input(), 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Idle);
    }

    #[test]
    fn test_one_message_per_tick() {
        let (console, receiver) = control::channel(2);
        let mut harness = Harness::new();
        harness.translator.control = receiver;
        harness.console = console;

        harness.console.try_send(ControlMessage::poke());
        harness.console.try_send(ControlMessage::poke());
        harness.translate(&idle_input(), 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Pressed);
        harness.translate(&idle_input(), 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Idle);
    }

    #[test]
    fn test_unknown_topic_uses_up_the_tick() {
        let (console, receiver) = control::channel(2);
        let mut harness = Harness::new();
        harness.translator.control = receiver;
        harness.console = console;

        harness.console.try_send(ControlMessage::new(Topic::from("ping")));
        harness.console.try_send(ControlMessage::poke());

        let out = harness.translate(&idle_input(), 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Idle);
        assert!(!out.log.contains_stop());

        harness.translate(&idle_input(), 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Pressed);
    }

    #[test]
    fn test_stop_short_circuits_the_tick() {
        let mut harness = Harness::new();
        harness.console.try_send(ControlMessage::stop());

        let out = harness.translate(&keys(&[KeyCode::Char('d'), KeyCode::Char('h')]), 0.1);

        assert!(out.log.contains_stop());
        assert_eq!(out.log.entries().last().unwrap().message(), STOP_SENTINEL);
        assert_eq!(harness.camera.position, DVec2::ZERO);
        assert!(!harness.show_bounds);
    }

    #[test]
    fn test_pan_east() {
        let mut harness = Harness::new();
        harness.camera.speed = 500.0;
        harness.translate(&keys(&[KeyCode::Char('d')]), 0.1);
        assert_eq!(harness.camera.position.x, 50.0);
        assert_eq!(harness.camera.position.y, 0.0);
    }

    #[test]
    fn test_pan_is_additive_per_axis() {
        let mut harness = Harness::new();
        harness.camera.speed = 100.0;
        harness.translate(&keys(&[KeyCode::Char('w'), KeyCode::Char('a')]), 0.5);
        assert_eq!(harness.camera.position, DVec2::new(-50.0, 50.0));
    }

    #[test]
    fn test_toggle_bounds_is_direct() {
        let mut harness = Harness::new();
        harness.translate(&keys(&[KeyCode::Char('h')]), 0.016);
        assert!(harness.show_bounds);
        assert!(harness.commands.is_empty());
        harness.translate(&keys(&[KeyCode::Char('h')]), 0.016);
        assert!(!harness.show_bounds);
    }

    #[test]
    fn test_zero_key_files_add_card_at_pointer() {
        let mut harness = Harness::new();
        let input = RawInput {
            pointer: Some((40, 12)),
            ..keys(&[KeyCode::Char('0')])
        };
        harness.translate(&input, 0.016);

        let expected = harness.camera.unproject(40, 12, (80, 24));
        let filed: Vec<_> = harness.commands.keys().copied().collect();
        assert_eq!(filed, [CommandKey::add_card_at(expected)]);
    }

    #[test]
    fn test_ctrl_click_files_select() {
        let mut harness = Harness::new();
        let input = RawInput {
            pointer: Some((10, 5)),
            ctrl: true,
            left: ButtonState {
                pressed: true,
                just_pressed: true,
                just_released: false,
            },
            ..idle_input()
        };
        let out = harness.translate(&input, 0.016);

        assert_eq!(out.cursor, CursorView::System);
        assert_eq!(harness.translator.cursor_state(), CursorState::Pressed);
        let at = harness.camera.unproject(10, 5, (80, 24));
        assert!(harness.commands.contains(&CommandKey::select_at(at)));
        assert!(!harness.commands.contains(&CommandKey::Drag));
    }

    #[test]
    fn test_drag_arms_and_release_disarms() {
        let mut harness = Harness::new();
        harness.selection = Some(EntityId(1));
        let held = RawInput {
            pointer: Some((10, 5)),
            left: ButtonState {
                pressed: true,
                just_pressed: true,
                just_released: false,
            },
            ..idle_input()
        };
        let out = harness.translate(&held, 0.016);
        assert_eq!(out.cursor, CursorView::Sprite { col: 10, row: 5 });
        assert_eq!(harness.translator.cursor_state(), CursorState::Pressed);
        assert!(harness.commands.contains(&CommandKey::Drag));

        let released = RawInput {
            pointer: Some((12, 5)),
            left: ButtonState {
                pressed: false,
                just_pressed: false,
                just_released: true,
            },
            ..idle_input()
        };
        harness.translate(&released, 0.016);
        assert_eq!(harness.translator.cursor_state(), CursorState::Idle);
        assert!(!harness.commands.contains(&CommandKey::Drag));
    }

    #[test]
    fn test_delete_removes_selection() {
        let mut harness = Harness::new();
        harness.translate(&keys(&[KeyCode::Delete]), 0.016);
        assert!(harness.commands.is_empty());

        harness.selection = Some(EntityId(3));
        harness.translate(&keys(&[KeyCode::Backspace]), 0.016);
        assert!(harness.commands.contains(&CommandKey::Remove(EntityId(3))));
    }

    #[test]
    fn test_pointer_outside_shows_system_cursor() {
        let mut harness = Harness::new();
        let out = harness.translate(&idle_input(), 0.016);
        assert_eq!(out.cursor, CursorView::System);
    }

    #[test]
    fn test_scroll_zooms() {
        let mut harness = Harness::new();
        harness.camera.zoom_speed = 2.0;
        let input = RawInput {
            scroll: 1.0,
            ..idle_input()
        };
        harness.translate(&input, 0.016);
        assert_eq!(harness.camera.zoom, 2.0);
    }

    #[test]
    fn test_missing_cursor_asset_is_reported_once() {
        let mut harness = Harness::with_catalog(&AssetCatalog::default());
        assert!(!harness.translator.is_cursor_set());
        assert!(harness.translator.cursor_frame().is_none());

        let first = harness.translate(&idle_input(), 0.016);
        let messages: Vec<_> = first.log.entries().iter().map(DiagnosticsEntry::message).collect();
        assert_eq!(messages, ["cursor is not in assets", "card_back is not in assets"]);
        assert!(!first.log.contains_stop());

        let second = harness.translate(&idle_input(), 0.016);
        assert!(second.log.is_empty());
    }

    #[test]
    fn test_cursor_frame_follows_state() {
        let mut harness = Harness::new();
        let idle = Arc::clone(harness.translator.cursor_frame().unwrap());
        harness.console.try_send(ControlMessage::poke());
        harness.translate(&idle_input(), 0.016);
        let pressed = harness.translator.cursor_frame().unwrap();
        assert_ne!(&idle, pressed);
    }
}
