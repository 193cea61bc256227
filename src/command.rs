//! Command Table: deferred, keyed operations on the table.
//!
//! The input translator files commands under a [`CommandKey`]; filing a
//! second command under the same key replaces the first, so repeated
//! intents within one tick collapse into a single action. The orchestrator
//! runs the table once per tick, between input translation and the update
//! fan-out.
//!
//! Each action reports its own [`Persistence`]: `Once` actions leave the
//! table after running, `Rearm` actions stay and run again next tick until
//! someone removes them.

use crate::camera::Camera;
use crate::diagnostics::DiagnosticsLog;
use crate::entity::{Card, CardArt, EntityId};
use crate::registry::Registry;
use glam::DVec2;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// World coordinates are keyed at a fixed 1/1000 unit resolution.
const KEY_SCALE: f64 = 1000.0;

#[allow(clippy::cast_possible_truncation)]
fn quantize(value: f64) -> i64 {
    (value * KEY_SCALE).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn dequantize(value: i64) -> f64 {
    value as f64 / KEY_SCALE
}

/// Identity of a pending command: a verb plus its quantized parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKey {
    /// Place a new card centered on a world position.
    AddCardAt {
        /// Quantized world x.
        x: i64,
        /// Quantized world y.
        y: i64,
    },
    /// Select the topmost entity under a world position.
    SelectAt {
        /// Quantized world x.
        x: i64,
        /// Quantized world y.
        y: i64,
    },
    /// Remove an entity.
    Remove(EntityId),
    /// Keep the selection under the pointer.
    Drag,
}

impl CommandKey {
    /// Key for placing a card at `position`.
    pub fn add_card_at(position: DVec2) -> Self {
        Self::AddCardAt {
            x: quantize(position.x),
            y: quantize(position.y),
        }
    }

    /// Key for selecting at `position`.
    pub fn select_at(position: DVec2) -> Self {
        Self::SelectAt {
            x: quantize(position.x),
            y: quantize(position.y),
        }
    }

    /// The world position carried by positional keys.
    pub fn position(&self) -> Option<DVec2> {
        match *self {
            Self::AddCardAt { x, y } | Self::SelectAt { x, y } => {
                Some(DVec2::new(dequantize(x), dequantize(y)))
            }
            Self::Remove(_) | Self::Drag => None,
        }
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddCardAt { .. } | Self::SelectAt { .. } => {
                let verb = if matches!(self, Self::AddCardAt { .. }) {
                    "AddCardAt"
                } else {
                    "SelectAt"
                };
                let at = self.position().unwrap_or_default();
                write!(f, "{verb}(x: {:.3}, y: {:.3})", at.x, at.y)
            }
            Self::Remove(id) => write!(f, "Remove({id})"),
            Self::Drag => f.write_str("Drag"),
        }
    }
}

/// Whether an action stays in the table after it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Leave the table after this run.
    Once,
    /// Stay and run again next tick.
    Rearm,
}

/// Everything an action may touch while it runs.
///
/// Actions run sequentially on the tick thread with exclusive access to the
/// registry, so no fan-out can be in flight while they mutate it.
#[derive(Debug)]
pub struct CommandContext<'a> {
    /// Live entities.
    pub registry: &'a mut Registry,
    /// The view onto the table.
    pub camera: &'a mut Camera,
    /// Pointer position in world space, if the pointer is inside the window.
    pub cursor_world: Option<DVec2>,
    /// Currently selected entity.
    pub selection: &'a mut Option<EntityId>,
    /// This tick's diagnostics.
    pub log: &'a mut DiagnosticsLog,
}

type Action = Box<dyn FnMut(&mut CommandContext<'_>) -> Persistence + Send>;

/// A deferred unit of work.
pub struct Command {
    action: Action,
}

impl Command {
    /// Wrap an action.
    pub fn new<F>(action: F) -> Self
    where
        F: FnMut(&mut CommandContext<'_>) -> Persistence + Send + 'static,
    {
        Self {
            action: Box::new(action),
        }
    }

    /// Wrap an action that always runs exactly once.
    pub fn once<F>(mut action: F) -> Self
    where
        F: FnMut(&mut CommandContext<'_>) + Send + 'static,
    {
        Self::new(move |ctx| {
            action(ctx);
            Persistence::Once
        })
    }

    fn run(&mut self, ctx: &mut CommandContext<'_>) -> Persistence {
        (self.action)(ctx)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").finish_non_exhaustive()
    }
}

/// Pending commands, keyed for last-write-wins deduplication.
#[derive(Debug, Default)]
pub struct CommandTable {
    pending: BTreeMap<CommandKey, Command>,
}

impl CommandTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }

    /// File `command` under `key`, replacing any command already there.
    ///
    /// Returns `true` if a pending command was replaced.
    pub fn set(&mut self, key: CommandKey, command: Command) -> bool {
        let replaced = self.pending.insert(key, command).is_some();
        trace!(%key, replaced, "command set");
        replaced
    }

    /// Drop the command under `key`. Returns `true` if one was pending.
    pub fn remove(&mut self, key: &CommandKey) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Whether a command is pending under `key`.
    pub fn contains(&self, key: &CommandKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Pending keys in execution order.
    pub fn keys(&self) -> impl Iterator<Item = &CommandKey> {
        self.pending.keys()
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every pending command once, in key order.
    ///
    /// Returns only after every action, and any pool work an action
    /// started, has finished. `Once` actions are removed; `Rearm` actions
    /// stay. Returns the number of actions run.
    pub fn execute_all(&mut self, ctx: &mut CommandContext<'_>) -> usize {
        let mut executed = 0;
        self.pending.retain(|key, command| {
            executed += 1;
            let persistence = command.run(ctx);
            trace!(%key, ?persistence, "command executed");
            persistence == Persistence::Rearm
        });
        executed
    }
}

/// Place a face-down card centered on `position`.
///
/// A registry conflict is recorded in the diagnostics log.
pub fn add_card_at(position: DVec2, art: CardArt, cell_size: DVec2) -> (CommandKey, Command) {
    let command = Command::once(move |ctx| {
        let id = ctx.registry.allocate_id();
        let card = Card::new(id, art.clone(), position, cell_size);
        match ctx.registry.add(Box::new(card)) {
            Ok(id) => debug!(%id, x = position.x, y = position.y, "card placed"),
            Err(e) => ctx.log.note(e.to_string()),
        }
    });
    (CommandKey::add_card_at(position), command)
}

/// Select the topmost entity under `position`, deselecting the previous one.
///
/// Hit-testing fans out over the registry's pool and joins before the
/// action returns. A miss clears the selection and is noted in the log.
pub fn select_at(position: DVec2) -> (CommandKey, Command) {
    let command = Command::once(move |ctx| {
        if let Some(previous) = ctx.selection.take() {
            if let Some(entity) = ctx.registry.get_mut(previous) {
                entity.set_selected(false);
            }
        }

        match ctx.registry.hit_test(position, &*ctx.camera) {
            Some(id) => {
                if let Some(entity) = ctx.registry.get_mut(id) {
                    entity.set_selected(true);
                }
                *ctx.selection = Some(id);
                debug!(%id, "entity selected");
            }
            None => ctx.log.note(format!(
                "no entity at ({:.3}, {:.3})",
                position.x, position.y
            )),
        }
    });
    (CommandKey::select_at(position), command)
}

/// Remove `id` from the table, clearing the selection if it pointed there.
///
/// Removing an absent entity is recorded in the diagnostics log.
pub fn remove(id: EntityId) -> (CommandKey, Command) {
    let command = Command::once(move |ctx| match ctx.registry.remove(id) {
        Ok(entity) => {
            if *ctx.selection == Some(id) {
                *ctx.selection = None;
            }
            debug!(%id, name = entity.name(), "entity removed");
        }
        Err(e) => ctx.log.note(e.to_string()),
    });
    (CommandKey::Remove(id), command)
}

/// Move the selected entity to the pointer every tick until removed.
pub fn drag() -> (CommandKey, Command) {
    let command = Command::new(|ctx| {
        if let (Some(id), Some(position)) = (*ctx.selection, ctx.cursor_world) {
            if let Some(entity) = ctx.registry.get_mut(id) {
                entity.move_to(position);
            }
        }
        Persistence::Rearm
    });
    (CommandKey::Drag, command)
}
