//! Entity Registry: owns every live entity and fans work out over them.
//!
//! Fan-outs run on a dedicated `rayon` pool. `update_all` and `draw_all`
//! submit one unit of work per entity and return only after every unit has
//! finished, so from the caller's side each pass is a barrier.
//!
//! Structural changes (`add`, `remove`) take `&mut self` and therefore can
//! never overlap a pass: the borrow checker enforces the phase ordering
//! that keeps workers from racing registry structure.

use crate::camera::Camera;
use crate::entity::{Entity, EntityId, Layer};
use crate::error::{Error, Result};
use crate::surface::Surface;
use glam::DVec2;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{debug, trace};

/// The owning collection of entities.
pub struct Registry {
    /// Entities in insertion order; stable for the length of a pass.
    entities: Vec<Box<dyn Entity>>,
    pool: Arc<ThreadPool>,
    next_id: u64,
}

impl Registry {
    /// Create an empty registry with its own worker pool.
    ///
    /// `workers == 0` lets rayon pick one thread per core.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("tabletop-worker-{index}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        debug!(threads = pool.current_num_threads(), "registry worker pool ready");
        Ok(Self::with_pool(Arc::new(pool)))
    }

    /// Create an empty registry sharing an existing pool.
    pub const fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self {
            entities: Vec::new(),
            pool,
            next_id: 1,
        }
    }

    /// Hand out an id no entity in this registry has been given yet.
    pub const fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Take ownership of `entity`.
    ///
    /// Fails with [`Error::DuplicateEntity`] if its id is already present.
    pub fn add(&mut self, entity: Box<dyn Entity>) -> Result<EntityId> {
        let id = entity.id();
        if self.contains(id) {
            return Err(Error::DuplicateEntity(id));
        }
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        trace!(%id, name = entity.name(), "entity added");
        self.entities.push(entity);
        Ok(id)
    }

    /// Remove and return the entity with `id`.
    ///
    /// Fails with [`Error::EntityNotFound`] if it is absent.
    pub fn remove(&mut self, id: EntityId) -> Result<Box<dyn Entity>> {
        let index = self
            .entities
            .iter()
            .position(|entity| entity.id() == id)
            .ok_or(Error::EntityNotFound(id))?;
        trace!(%id, "entity removed");
        Ok(self.entities.remove(index))
    }

    /// Whether an entity with `id` is registered.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|entity| entity.id() == id)
    }

    /// Borrow an entity.
    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities
            .iter()
            .find(|entity| entity.id() == id)
            .map(|entity| &**entity)
    }

    /// Borrow an entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        self.entities
            .iter_mut()
            .find(|entity| entity.id() == id)
            .map(|entity| &mut **entity)
    }

    /// Number of live entities.
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids in registry order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|entity| entity.id()).collect()
    }

    /// Run one `update(delta_time)` per entity on the pool and wait for all.
    pub fn update_all(&mut self, delta_time: f64) {
        let entities = &mut self.entities;
        self.pool.install(|| {
            entities
                .par_iter_mut()
                .for_each(|entity| entity.update(delta_time));
        });
    }

    /// Run one `draw` per entity on the pool, wait for all, then composite
    /// the layers onto `surface` in registry order.
    pub fn draw_all(&self, surface: &mut Surface, camera: &Camera, show_bounds: bool) {
        let layers = self.draw_layers(show_bounds);
        for layer in &layers {
            layer.composite(surface, camera);
        }
    }

    /// The draw half of [`draw_all`](Self::draw_all): one layer per entity.
    pub fn draw_layers(&self, show_bounds: bool) -> Vec<Layer> {
        self.pool.install(|| {
            self.entities
                .par_iter()
                .map(|entity| {
                    let mut layer = Layer::new();
                    entity.draw(&mut layer, show_bounds);
                    layer
                })
                .collect()
        })
    }

    /// Find the topmost entity (last drawn) whose on-screen footprint
    /// under `camera` contains `point`.
    ///
    /// The bounds checks run in parallel on the pool.
    pub fn hit_test(&self, point: DVec2, camera: &Camera) -> Option<EntityId> {
        self.pool.install(|| {
            self.entities
                .par_iter()
                .position_last(|entity| camera.footprint(&entity.bounds()).contains(point))
                .map(|index| self.entities[index].id())
        })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.entities.len())
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Bounds, DrawOp};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every call it receives into shared trackers.
    struct Tracker {
        id: EntityId,
        center: DVec2,
        updates: Arc<AtomicUsize>,
        draws: Arc<AtomicUsize>,
        seen_dt: Arc<Mutex<Vec<f64>>>,
    }

    impl Tracker {
        fn boxed(id: u64, trackers: &Trackers) -> Box<dyn Entity> {
            Box::new(Self {
                id: EntityId(id),
                center: DVec2::new(id as f64 * 10.0, 0.0),
                updates: Arc::clone(&trackers.updates),
                draws: Arc::clone(&trackers.draws),
                seen_dt: Arc::clone(&trackers.seen_dt),
            })
        }
    }

    impl Entity for Tracker {
        fn id(&self) -> EntityId {
            self.id
        }

        fn name(&self) -> &str {
            "tracker"
        }

        fn bounds(&self) -> Bounds {
            Bounds::from_center(self.center, DVec2::splat(20.0))
        }

        fn update(&mut self, delta_time: f64) {
            self.seen_dt.lock().unwrap().push(delta_time);
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn draw(&self, layer: &mut Layer, _show_bounds: bool) {
            self.draws.fetch_add(1, Ordering::SeqCst);
            layer.push(DrawOp::Outline {
                bounds: self.bounds(),
                color: crate::surface::Rgb::WHITE,
            });
        }
    }

    #[derive(Default)]
    struct Trackers {
        updates: Arc<AtomicUsize>,
        draws: Arc<AtomicUsize>,
        seen_dt: Arc<Mutex<Vec<f64>>>,
    }

    fn registry_with(n: u64, trackers: &Trackers) -> Registry {
        let mut registry = Registry::new(4).unwrap();
        for id in 1..=n {
            registry.add(Tracker::boxed(id, trackers)).unwrap();
        }
        registry
    }

    #[test]
    fn test_update_all_calls_each_entity_once() {
        let trackers = Trackers::default();
        let mut registry = registry_with(3, &trackers);
        assert_eq!(registry.count(), 3);

        registry.update_all(0.016);

        assert_eq!(trackers.updates.load(Ordering::SeqCst), 3);
        assert_eq!(*trackers.seen_dt.lock().unwrap(), vec![0.016; 3]);
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn test_update_barrier_precedes_draw() {
        let trackers = Trackers::default();
        let mut registry = registry_with(64, &trackers);

        registry.update_all(0.5);
        // Every update has landed before draw_layers is even called.
        assert_eq!(trackers.updates.load(Ordering::SeqCst), 64);
        assert_eq!(trackers.draws.load(Ordering::SeqCst), 0);

        let layers = registry.draw_layers(false);
        assert_eq!(layers.len(), 64);
        assert_eq!(trackers.draws.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn test_add_duplicate_is_rejected() {
        let trackers = Trackers::default();
        let mut registry = registry_with(2, &trackers);
        let result = registry.add(Tracker::boxed(2, &trackers));
        assert!(matches!(result, Err(Error::DuplicateEntity(EntityId(2)))));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let trackers = Trackers::default();
        let mut registry = registry_with(1, &trackers);
        assert!(matches!(
            registry.remove(EntityId(9)),
            Err(Error::EntityNotFound(EntityId(9)))
        ));
        assert_eq!(registry.remove(EntityId(1)).unwrap().id(), EntityId(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_allocate_id_skips_added_ids() {
        let trackers = Trackers::default();
        let mut registry = registry_with(3, &trackers);
        assert_eq!(registry.allocate_id(), EntityId(4));
        assert_eq!(registry.allocate_id(), EntityId(5));
    }

    #[test]
    fn test_add_max_id_does_not_overflow() {
        let trackers = Trackers::default();
        let mut registry = registry_with(1, &trackers);
        registry.add(Tracker::boxed(u64::MAX, &trackers)).unwrap();
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.allocate_id(), EntityId(u64::MAX));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let trackers = Trackers::default();
        let mut registry = registry_with(3, &trackers);
        let camera = Camera::default();
        // tracker 2 spans x in [10, 30], tracker 3 spans [20, 40]
        assert_eq!(registry.hit_test(DVec2::new(25.0, 0.0), &camera), Some(EntityId(3)));
        assert_eq!(registry.hit_test(DVec2::new(12.0, 0.0), &camera), Some(EntityId(2)));
        assert_eq!(registry.hit_test(DVec2::new(500.0, 0.0), &camera), None);

        registry.remove(EntityId(3)).unwrap();
        assert_eq!(registry.hit_test(DVec2::new(25.0, 0.0), &camera), Some(EntityId(2)));
    }

    #[test]
    fn test_hit_test_follows_zoom() {
        let trackers = Trackers::default();
        let registry = registry_with(1, &trackers);
        // tracker 1 spans x in [0, 20] at zoom 1
        let zoomed_in = Camera {
            zoom: 2.0,
            ..Camera::default()
        };
        assert_eq!(registry.hit_test(DVec2::new(18.0, 0.0), &zoomed_in), None);
        assert_eq!(registry.hit_test(DVec2::new(12.0, 0.0), &zoomed_in), Some(EntityId(1)));

        let zoomed_out = Camera {
            zoom: 0.5,
            ..Camera::default()
        };
        assert_eq!(registry.hit_test(DVec2::new(25.0, 0.0), &zoomed_out), Some(EntityId(1)));
    }

    #[test]
    fn test_draw_all_composites_layers() {
        let trackers = Trackers::default();
        let registry = registry_with(1, &trackers);
        let mut surface = Surface::new(20, 10);
        registry.draw_all(&mut surface, &Camera::default(), false);
        assert!(surface.cells().iter().any(|cell| cell.glyph() == "┌"));
    }
}
