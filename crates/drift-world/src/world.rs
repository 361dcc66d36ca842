//! The world facade.
//!
//! [`InfiniteWorld`] owns the generator, the chunk manager and the floating
//! origin and runs them in a single cooperative tick. After every tick it
//! publishes a [`WorldSnapshot`] that other threads can read through a
//! [`SnapshotReader`].

use std::fmt;
use std::sync::Arc;

use drift_common::{ChunkIndex, ConfigError, EntityId, WorldError, WorldResult};
use glam::{DVec3, Vec3};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::WorldConfig;
use crate::generation::{GeneratorConfig, WorldGenerator};
use crate::host::{RepresentationBuilder, SceneHost, WorldHost};
use crate::origin::{FloatingOrigin, OriginConfig, OriginShift, TrackedEntity};
use crate::streaming::{ChunkManager, PassReport, StreamingConfig, StreamingStats};

/// Read-only view of the world after a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldSnapshot {
    /// Ticks run so far
    pub tick: u64,
    /// Chunk the streaming window is centered on
    pub observer_chunk: Option<ChunkIndex>,
    /// Number of live chunks
    pub live_chunks: usize,
    /// Observer local position, `None` while the observer is missing
    pub observer_local: Option<Vec3>,
    /// Observer absolute position
    pub observer_absolute: Option<DVec3>,
    /// Accumulated origin offset
    pub total_offset: DVec3,
    /// Origin shifts performed
    pub shift_count: u64,
    /// Streaming totals
    pub streaming: StreamingStats,
}

impl fmt::Display for WorldSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {}: ", self.tick)?;
        match (self.observer_absolute, self.observer_chunk) {
            (Some(position), Some(chunk)) => write!(
                f,
                "observer at ({:.1}, {:.1}, {:.1}) in chunk {chunk}",
                position.x, position.y, position.z
            )?,
            (Some(position), None) => write!(
                f,
                "observer at ({:.1}, {:.1}, {:.1})",
                position.x, position.y, position.z
            )?,
            (None, _) => write!(f, "observer missing")?,
        }
        write!(
            f,
            ", {} live chunks, offset ({:.1}, {:.1}, {:.1}) after {} shifts, {} loaded / {} released / {} failed",
            self.live_chunks,
            self.total_offset.x,
            self.total_offset.y,
            self.total_offset.z,
            self.shift_count,
            self.streaming.materialized,
            self.streaming.released,
            self.streaming.failures
        )
    }
}

/// Shared read access to the latest [`WorldSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotReader(Arc<RwLock<WorldSnapshot>>);

impl SnapshotReader {
    /// Returns a copy of the latest snapshot.
    #[must_use]
    pub fn get(&self) -> WorldSnapshot {
        *self.0.read()
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Streaming pass, if one ran
    pub pass: Option<PassReport>,
    /// Origin shift, if one happened
    pub shift: Option<OriginShift>,
    /// The observer was missing and the tick was skipped
    pub observer_missing: bool,
}

/// Builder for [`InfiniteWorld`].
#[derive(Debug, Default)]
pub struct InfiniteWorldBuilder {
    config: WorldConfig,
    tracked: Vec<TrackedEntity>,
}

impl InfiniteWorldBuilder {
    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the streaming configuration.
    #[must_use]
    pub fn streaming(mut self, streaming: StreamingConfig) -> Self {
        self.config.streaming = streaming;
        self
    }

    /// Sets the floating-origin configuration.
    #[must_use]
    pub fn origin(mut self, origin: OriginConfig) -> Self {
        self.config.origin = origin;
        self
    }

    /// Sets the generation configuration.
    #[must_use]
    pub fn generation(mut self, generation: GeneratorConfig) -> Self {
        self.config.generation = generation;
        self
    }

    /// Tracks an entity from the start.
    #[must_use]
    pub fn track(mut self, entity: TrackedEntity) -> Self {
        self.tracked.push(entity);
        self
    }

    /// Validates the configuration and builds the world.
    pub fn build(self) -> Result<InfiniteWorld, ConfigError> {
        self.config.validate()?;

        let streaming = ChunkManager::new(self.config.streaming.clone())?;
        let mut origin = FloatingOrigin::new(self.config.origin.clone());
        for entity in self.tracked {
            origin.register(entity);
        }

        info!(
            "World initialized: seed {}, chunk size {}, view distance {} ({:?})",
            self.config.generation.seed,
            self.config.streaming.chunk_size,
            self.config.streaming.view_distance,
            self.config.streaming.view_shape
        );

        Ok(InfiniteWorld {
            generator: WorldGenerator::new(self.config.generation.clone()),
            streaming,
            origin,
            config: self.config,
            snapshot: Arc::new(RwLock::new(WorldSnapshot::default())),
            observer_missing: false,
            ticks: 0,
        })
    }
}

/// An infinite, chunk-streamed world with a floating origin.
#[derive(Debug)]
pub struct InfiniteWorld {
    config: WorldConfig,
    generator: WorldGenerator,
    streaming: ChunkManager,
    origin: FloatingOrigin,
    snapshot: Arc<RwLock<WorldSnapshot>>,
    /// Set while the observer reference is gone
    observer_missing: bool,
    ticks: u64,
}

impl InfiniteWorld {
    /// Starts building a world.
    #[must_use]
    pub fn builder() -> InfiniteWorldBuilder {
        InfiniteWorldBuilder::default()
    }

    /// Loads the window around the observer without waiting for the timer.
    ///
    /// Returns `None` when the observer is missing.
    pub fn start(&mut self, host: &mut impl WorldHost) -> Option<PassReport> {
        let observer = self.observed(&*host)?;
        let report = self.streaming.force_update(
            self.origin.to_absolute(observer),
            self.origin.total_offset(),
            &self.generator,
            host,
        );
        self.publish(Some(observer));
        Some(report)
    }

    /// Advances the world by `dt` seconds.
    ///
    /// Streaming runs first, then the origin shift check. With no observer
    /// both are skipped.
    pub fn tick(&mut self, dt: f32, host: &mut impl WorldHost) -> TickReport {
        self.ticks += 1;
        let Some(observer) = self.observed(&*host) else {
            self.publish(None);
            return TickReport {
                observer_missing: true,
                ..TickReport::default()
            };
        };

        let pass = self.streaming.update(
            dt,
            self.origin.to_absolute(observer),
            self.origin.total_offset(),
            &self.generator,
            host,
        );
        let shift = self
            .origin
            .update(observer, host, self.streaming.store().representation_roots());

        self.publish(host.observer_position());
        TickReport {
            pass,
            shift,
            observer_missing: false,
        }
    }

    /// Runs a streaming pass now, ignoring the timer.
    pub fn force_streaming_pass(&mut self, host: &mut impl WorldHost) -> WorldResult<PassReport> {
        let observer = self
            .observed(&*host)
            .ok_or(WorldError::MissingObserver)?;
        let report = self.streaming.force_update(
            self.origin.to_absolute(observer),
            self.origin.total_offset(),
            &self.generator,
            host,
        );
        self.publish(Some(observer));
        Ok(report)
    }

    /// Shifts the origin to the observer now, ignoring the threshold.
    pub fn force_origin_shift(&mut self, host: &mut impl SceneHost) -> WorldResult<OriginShift> {
        self.observed(&*host).ok_or(WorldError::MissingObserver)?;
        let shift = self
            .origin
            .force_shift(host, self.streaming.store().representation_roots())?;
        self.publish(host.observer_position());
        Ok(shift)
    }

    /// Ground height under an absolute position, if its chunk is live.
    #[must_use]
    pub fn ground_height(&self, absolute: DVec3) -> Option<f32> {
        let coordinate = self.streaming.grid().coordinate(absolute).ok()?;
        self.streaming
            .get_chunk_at(coordinate.chunk)?
            .content()
            .sample_height(coordinate.local)
    }

    /// Tracks an entity through origin shifts.
    pub fn track(&mut self, entity: TrackedEntity) {
        self.origin.register(entity);
    }

    /// Stops tracking an entity.
    pub fn untrack(&mut self, id: EntityId) -> bool {
        self.origin.unregister(id)
    }

    /// Converts a local position to an absolute one.
    #[must_use]
    pub fn to_absolute(&self, local: Vec3) -> DVec3 {
        self.origin.to_absolute(local)
    }

    /// Converts an absolute position to a local one.
    #[must_use]
    pub fn to_local(&self, absolute: DVec3) -> Vec3 {
        self.origin.to_local(absolute)
    }

    /// Releases every chunk. Returns how many were live.
    pub fn shutdown(&mut self, host: &mut impl RepresentationBuilder) -> usize {
        let released = self.streaming.clear_all_chunks(host);
        info!(
            "World shut down after {} ticks, {} origin shifts",
            self.ticks,
            self.origin.shift_count()
        );
        self.publish(None);
        released
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the generator.
    #[must_use]
    pub const fn generator(&self) -> &WorldGenerator {
        &self.generator
    }

    /// Returns the chunk manager.
    #[must_use]
    pub const fn streaming(&self) -> &ChunkManager {
        &self.streaming
    }

    /// Returns the floating origin.
    #[must_use]
    pub const fn origin(&self) -> &FloatingOrigin {
        &self.origin
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        *self.snapshot.read()
    }

    /// Returns a reader for the published snapshots.
    #[must_use]
    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader(Arc::clone(&self.snapshot))
    }

    /// Reads the observer, logging transitions to and from missing.
    fn observed(&mut self, host: &impl SceneHost) -> Option<Vec3> {
        match host.observer_position() {
            Some(position) => {
                if self.observer_missing {
                    info!("Observer reference restored");
                    self.observer_missing = false;
                }
                Some(position)
            },
            None => {
                if !self.observer_missing {
                    warn!("Observer reference is missing, streaming and origin shifts suspended");
                    self.observer_missing = true;
                }
                None
            },
        }
    }

    fn publish(&self, observer: Option<Vec3>) {
        let snapshot = WorldSnapshot {
            tick: self.ticks,
            observer_chunk: self.streaming.observer_chunk(),
            live_chunks: self.streaming.live_count(),
            observer_local: observer,
            observer_absolute: observer.map(|local| self.origin.to_absolute(local)),
            total_offset: self.origin.total_offset(),
            shift_count: self.origin.shift_count(),
            streaming: self.streaming.stats(),
        };
        *self.snapshot.write() = snapshot;
    }
}
