//! Host engine collaborators.
//!
//! The world never owns renderable or physical objects. It asks the host to
//! create and destroy them and refers to them through [`EntityId`] handles.
//! [`HeadlessHost`] is an in-memory host used by the `drift` binary and tests.

use ahash::{AHashMap, AHashSet};
use drift_common::{ChunkIndex, EntityId, EntityIdAllocator, HostError};
use glam::Vec3;
use tracing::debug;

use crate::generation::{ChunkContent, ObjectPlacement};

/// Builds and destroys chunk representations.
pub trait RepresentationBuilder {
    /// Builds the terrain representation for a chunk, placed at `anchor`
    /// in local space. The handle must be usable for destruction at once.
    fn build_representation(
        &mut self,
        content: &ChunkContent,
        anchor: Vec3,
    ) -> Result<EntityId, HostError>;

    /// Spawns one placed object as a child of a chunk representation.
    fn spawn_object(
        &mut self,
        parent: EntityId,
        placement: &ObjectPlacement,
    ) -> Result<EntityId, HostError>;

    /// Destroys a representation or spawned object.
    fn destroy_representation(&mut self, id: EntityId);
}

/// Access to the observer and to movable entities in the host scene.
///
/// Every `delta` is added to the entity's local position.
pub trait SceneHost {
    /// Observer's local position, or `None` if the observer reference is gone.
    fn observer_position(&self) -> Option<Vec3>;

    /// Moves the observer to a local position.
    fn set_observer_position(&mut self, position: Vec3);

    /// Translates a root transform.
    fn recenter_entity(&mut self, id: EntityId, delta: Vec3);

    /// Translates a rigid body together with its simulation state.
    fn recenter_body(&mut self, id: EntityId, delta: Vec3) {
        self.recenter_entity(id, delta);
    }

    /// Translates the live particles of a world-space particle system.
    fn recenter_particles(&mut self, id: EntityId, delta: Vec3);

    /// Drops the recorded points of a trail.
    fn clear_trail(&mut self, id: EntityId);
}

/// A host that provides every collaborator the world needs.
pub trait WorldHost: RepresentationBuilder + SceneHost {}

impl<T: RepresentationBuilder + SceneHost + ?Sized> WorldHost for T {}

/// What a headless entity stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessKind {
    /// Terrain root of a chunk
    ChunkRoot(ChunkIndex),
    /// Placed object, positioned relative to its parent
    Object {
        /// Owning chunk root
        parent: EntityId,
        /// Object kind selector
        kind: u32,
    },
    /// Free transform
    Prop,
    /// Rigid body
    Body,
    /// World-space particle system
    Particles,
    /// Trail renderer
    Trail,
}

/// An entity tracked by [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessEntity {
    /// What the entity is
    pub kind: HeadlessKind,
    /// Local position (relative to the parent for objects)
    pub position: Vec3,
    /// Live particle positions
    pub particles: Vec<Vec3>,
    /// Trail points
    pub trail: Vec<Vec3>,
}

impl HeadlessEntity {
    fn new(kind: HeadlessKind, position: Vec3) -> Self {
        Self {
            kind,
            position,
            particles: Vec::new(),
            trail: Vec::new(),
        }
    }
}

/// In-memory host with failure injection.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    ids: EntityIdAllocator,
    entities: AHashMap<EntityId, HeadlessEntity>,
    observer: Option<Vec3>,
    failing_chunks: AHashSet<ChunkIndex>,
    failing_objects: AHashSet<ChunkIndex>,
    built: usize,
    destroyed: usize,
    body_recenters: usize,
}

impl HeadlessHost {
    /// Creates a host with the observer at the local origin.
    #[must_use]
    pub fn new() -> Self {
        Self::with_observer(Vec3::ZERO)
    }

    /// Creates a host with the observer at `position`.
    #[must_use]
    pub fn with_observer(position: Vec3) -> Self {
        Self {
            observer: Some(position),
            ..Self::default()
        }
    }

    /// Replaces or removes the observer.
    pub fn set_observer(&mut self, observer: Option<Vec3>) {
        self.observer = observer;
    }

    /// Moves the observer by `delta`. No-op without an observer.
    pub fn move_observer(&mut self, delta: Vec3) {
        if let Some(position) = self.observer.as_mut() {
            *position += delta;
        }
    }

    /// Spawns a free transform.
    pub fn spawn_prop(&mut self, position: Vec3) -> EntityId {
        self.insert(HeadlessEntity::new(HeadlessKind::Prop, position))
    }

    /// Spawns a rigid body.
    pub fn spawn_body(&mut self, position: Vec3) -> EntityId {
        self.insert(HeadlessEntity::new(HeadlessKind::Body, position))
    }

    /// Spawns a world-space particle system with live particles.
    pub fn spawn_particles(&mut self, position: Vec3, particles: Vec<Vec3>) -> EntityId {
        let mut entity = HeadlessEntity::new(HeadlessKind::Particles, position);
        entity.particles = particles;
        self.insert(entity)
    }

    /// Spawns a trail with recorded points.
    pub fn spawn_trail(&mut self, position: Vec3, trail: Vec<Vec3>) -> EntityId {
        let mut entity = HeadlessEntity::new(HeadlessKind::Trail, position);
        entity.trail = trail;
        self.insert(entity)
    }

    /// Makes representation builds for `index` fail.
    pub fn fail_chunk(&mut self, index: ChunkIndex) {
        self.failing_chunks.insert(index);
    }

    /// Makes object spawns inside `index` fail after the terrain is built.
    pub fn fail_objects_in(&mut self, index: ChunkIndex) {
        self.failing_objects.insert(index);
    }

    /// Clears injected failures for `index`.
    pub fn heal_chunk(&mut self, index: ChunkIndex) {
        self.failing_chunks.remove(&index);
        self.failing_objects.remove(&index);
    }

    /// Returns an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&HeadlessEntity> {
        self.entities.get(&id)
    }

    /// Returns an entity's local position.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(&id).map(|e| e.position)
    }

    /// Checks whether an entity exists.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities of any kind.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of live chunk roots.
    #[must_use]
    pub fn chunk_root_count(&self) -> usize {
        self.entities
            .values()
            .filter(|e| matches!(e.kind, HeadlessKind::ChunkRoot(_)))
            .count()
    }

    /// Root handle of the live representation for `index`, if any.
    #[must_use]
    pub fn chunk_root(&self, index: ChunkIndex) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, e)| e.kind == HeadlessKind::ChunkRoot(index))
            .map(|(id, _)| *id)
    }

    /// Total representations and objects built.
    #[must_use]
    pub const fn built_count(&self) -> usize {
        self.built
    }

    /// Total representations and objects destroyed.
    #[must_use]
    pub const fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Number of explicit rigid body recenters.
    #[must_use]
    pub const fn body_recenter_count(&self) -> usize {
        self.body_recenters
    }

    fn insert(&mut self, entity: HeadlessEntity) -> EntityId {
        let id = self.ids.allocate();
        self.entities.insert(id, entity);
        id
    }
}

impl RepresentationBuilder for HeadlessHost {
    fn build_representation(
        &mut self,
        content: &ChunkContent,
        anchor: Vec3,
    ) -> Result<EntityId, HostError> {
        let index = content.index();
        if self.failing_chunks.contains(&index) {
            return Err(HostError::new(format!("injected failure for chunk {index}")));
        }
        self.built += 1;
        Ok(self.insert(HeadlessEntity::new(HeadlessKind::ChunkRoot(index), anchor)))
    }

    fn spawn_object(
        &mut self,
        parent: EntityId,
        placement: &ObjectPlacement,
    ) -> Result<EntityId, HostError> {
        let Some(parent_entity) = self.entities.get(&parent) else {
            return Err(HostError::new(format!("unknown parent {parent}")));
        };
        if let HeadlessKind::ChunkRoot(index) = parent_entity.kind {
            if self.failing_objects.contains(&index) {
                return Err(HostError::new(format!(
                    "injected object failure in chunk {index}"
                )));
            }
        }
        self.built += 1;
        let kind = HeadlessKind::Object {
            parent,
            kind: placement.kind,
        };
        Ok(self.insert(HeadlessEntity::new(kind, placement.position)))
    }

    fn destroy_representation(&mut self, id: EntityId) {
        if self.entities.remove(&id).is_some() {
            self.destroyed += 1;
        } else {
            debug!("Destroy requested for unknown entity {id}");
        }
    }
}

impl SceneHost for HeadlessHost {
    fn observer_position(&self) -> Option<Vec3> {
        self.observer
    }

    fn set_observer_position(&mut self, position: Vec3) {
        if let Some(observer) = self.observer.as_mut() {
            *observer = position;
        }
    }

    fn recenter_entity(&mut self, id: EntityId, delta: Vec3) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position += delta;
        }
    }

    fn recenter_body(&mut self, id: EntityId, delta: Vec3) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position += delta;
            self.body_recenters += 1;
        }
    }

    fn recenter_particles(&mut self, id: EntityId, delta: Vec3) {
        if let Some(entity) = self.entities.get_mut(&id) {
            for particle in &mut entity.particles {
                *particle += delta;
            }
        }
    }

    fn clear_trail(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.trail.clear();
        }
    }
}
