//! Floating origin.
//!
//! Local positions are single precision and lose detail far from zero. When
//! the observer drifts past a threshold, every tracked local position is
//! translated back toward the origin and the translation is added to an
//! accumulated double-precision offset, so that
//! `absolute = total_offset + local` holds across every shift.

use drift_common::{ConfigError, EntityId, WorldError, WorldResult};
use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::host::SceneHost;

/// Floating-origin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Observer distance from the local origin that triggers a shift
    pub threshold: f32,
    /// Shift automatically on update
    pub auto_shift: bool,
    /// Translate live world-space particles
    pub shift_particles: bool,
    /// Recenter rigid bodies through the physics path
    pub shift_rigid_bodies: bool,
    /// Clear trail points on shift
    pub clear_trails: bool,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            threshold: 1000.0,
            auto_shift: true,
            shift_particles: true,
            shift_rigid_bodies: true,
            clear_trails: true,
        }
    }
}

impl OriginConfig {
    /// Checks the shift threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold.is_finite() && self.threshold > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NonPositiveShiftThreshold(self.threshold))
        }
    }
}

/// How a tracked entity is recentered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackedKind {
    /// Plain transform
    Transform,
    /// Rigid body with simulation state
    RigidBody,
    /// World-space particle system
    Particles,
    /// Trail renderer
    Trail,
}

/// An entity whose local position follows origin shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedEntity {
    /// Host handle
    pub id: EntityId,
    /// Recentering behavior
    pub kind: TrackedKind,
    /// The observer itself or one of its children. These move with the
    /// observer and are not translated separately.
    pub attached_to_observer: bool,
}

impl TrackedEntity {
    /// Creates a free-standing tracked entity.
    #[must_use]
    pub const fn new(id: EntityId, kind: TrackedKind) -> Self {
        Self {
            id,
            kind,
            attached_to_observer: false,
        }
    }

    /// Marks the entity as attached to the observer.
    #[must_use]
    pub const fn attached(mut self) -> Self {
        self.attached_to_observer = true;
        self
    }
}

/// Record of one origin shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginShift {
    /// Translation removed from local positions
    pub offset: Vec3,
    /// Accumulated offset after the shift
    pub total_offset: DVec3,
    /// 1-based shift counter
    pub shift_number: u64,
    /// Chunk roots and tracked entities translated
    pub entities_affected: usize,
}

/// Keeps local coordinates small while preserving absolute positions.
#[derive(Debug, Default)]
pub struct FloatingOrigin {
    config: OriginConfig,
    total_offset: DVec3,
    shift_count: u64,
    tracked: Vec<TrackedEntity>,
    last_shift: Option<OriginShift>,
}

impl FloatingOrigin {
    /// Creates a floating origin at zero offset.
    #[must_use]
    pub fn new(config: OriginConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &OriginConfig {
        &self.config
    }

    /// Starts tracking an entity. Registering a handle twice replaces it.
    pub fn register(&mut self, entity: TrackedEntity) {
        self.unregister(entity.id);
        self.tracked.push(entity);
    }

    /// Stops tracking an entity. Returns `false` if it was not tracked.
    pub fn unregister(&mut self, id: EntityId) -> bool {
        let before = self.tracked.len();
        self.tracked.retain(|entity| entity.id != id);
        self.tracked.len() != before
    }

    /// Returns the tracked entities.
    #[must_use]
    pub fn tracked(&self) -> &[TrackedEntity] {
        &self.tracked
    }

    /// Converts a local position to an absolute one.
    #[must_use]
    pub fn to_absolute(&self, local: Vec3) -> DVec3 {
        self.total_offset + local.as_dvec3()
    }

    /// Converts an absolute position to a local one.
    #[must_use]
    pub fn to_local(&self, absolute: DVec3) -> Vec3 {
        (absolute - self.total_offset).as_vec3()
    }

    /// Observer's absolute position, or `None` without an observer.
    #[must_use]
    pub fn observer_world_position(&self, host: &impl SceneHost) -> Option<DVec3> {
        host.observer_position().map(|local| self.to_absolute(local))
    }

    /// Checks whether `observer_local` is past the shift threshold.
    #[must_use]
    pub fn needs_shift(&self, observer_local: Vec3) -> bool {
        observer_local.length() > self.config.threshold
    }

    /// Shifts when auto-shift is enabled and the observer is past the threshold.
    pub fn update(
        &mut self,
        observer_local: Vec3,
        host: &mut impl SceneHost,
        roots: impl IntoIterator<Item = EntityId>,
    ) -> Option<OriginShift> {
        if !self.config.auto_shift || !self.needs_shift(observer_local) {
            return None;
        }
        Some(self.shift(observer_local, host, roots))
    }

    /// Shifts by the observer's current local position, ignoring the threshold.
    pub fn force_shift(
        &mut self,
        host: &mut impl SceneHost,
        roots: impl IntoIterator<Item = EntityId>,
    ) -> WorldResult<OriginShift> {
        let observer = host.observer_position().ok_or(WorldError::MissingObserver)?;
        Ok(self.shift(observer, host, roots))
    }

    /// Zeroes the offset and counter. Only valid when the world is rebuilt.
    pub fn reset(&mut self) {
        self.total_offset = DVec3::ZERO;
        self.shift_count = 0;
        self.last_shift = None;
        info!("Floating origin reset");
    }

    /// Returns the accumulated offset.
    #[must_use]
    pub const fn total_offset(&self) -> DVec3 {
        self.total_offset
    }

    /// Returns the number of shifts performed.
    #[must_use]
    pub const fn shift_count(&self) -> u64 {
        self.shift_count
    }

    /// Returns the most recent shift.
    #[must_use]
    pub const fn last_shift(&self) -> Option<OriginShift> {
        self.last_shift
    }

    fn shift(
        &mut self,
        offset: Vec3,
        host: &mut impl SceneHost,
        roots: impl IntoIterator<Item = EntityId>,
    ) -> OriginShift {
        self.total_offset += offset.as_dvec3();
        self.shift_count += 1;
        let delta = -offset;

        let mut affected = 0;
        for root in roots {
            host.recenter_entity(root, delta);
            affected += 1;
        }

        for entity in self.tracked.iter().filter(|e| !e.attached_to_observer) {
            match entity.kind {
                TrackedKind::Transform => host.recenter_entity(entity.id, delta),
                TrackedKind::RigidBody => {
                    if self.config.shift_rigid_bodies {
                        host.recenter_body(entity.id, delta);
                    } else {
                        host.recenter_entity(entity.id, delta);
                    }
                },
                TrackedKind::Particles => {
                    host.recenter_entity(entity.id, delta);
                    if self.config.shift_particles {
                        host.recenter_particles(entity.id, delta);
                    }
                },
                TrackedKind::Trail => {
                    host.recenter_entity(entity.id, delta);
                    if self.config.clear_trails {
                        host.clear_trail(entity.id);
                    }
                },
            }
            affected += 1;
        }

        host.set_observer_position(Vec3::ZERO);

        let record = OriginShift {
            offset,
            total_offset: self.total_offset,
            shift_number: self.shift_count,
            entities_affected: affected,
        };
        info!(
            "Origin shift #{}: offset {offset}, total offset {}, {affected} entities",
            record.shift_number, record.total_offset
        );
        self.last_shift = Some(record);
        record
    }
}
