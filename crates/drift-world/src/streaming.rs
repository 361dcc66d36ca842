//! World streaming and chunk scheduling.
//!
//! The scheduler keeps the live chunk set equal to the view window around
//! the observer's chunk. It runs on a timer rather than every frame, and
//! only does work when the observer changes chunk or a previous pass left
//! wanted chunks unbuilt.

use drift_common::{ChunkGrid, ChunkIndex, ConfigError};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chunk::{ChunkEntry, ChunkStore};
use crate::generation::WorldGenerator;
use crate::host::RepresentationBuilder;

/// Shape of the loaded region around the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewShape {
    /// L1 distance, a diamond of `2d² + 2d + 1` chunks
    #[default]
    Diamond,
    /// Chebyshev distance, a full `(2d + 1)²` block
    Square,
}

impl ViewShape {
    /// Checks whether `index` is inside the window around `center`.
    #[must_use]
    pub const fn contains(self, center: ChunkIndex, index: ChunkIndex, view_distance: u32) -> bool {
        match self {
            Self::Diamond => center.distance(index) <= view_distance,
            Self::Square => center.chebyshev_distance(index) <= view_distance,
        }
    }
}

/// Chunk streaming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunk size in world units
    pub chunk_size: f64,
    /// Window radius in chunks
    pub view_distance: i32,
    /// Seconds between scheduling checks (0 = every update)
    pub tick_interval: f32,
    /// Window shape
    pub view_shape: ViewShape,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50.0,
            view_distance: 2,
            tick_interval: 0.5,
            view_shape: ViewShape::Diamond,
        }
    }
}

impl StreamingConfig {
    /// Checks the streaming parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ChunkGrid::new(self.chunk_size)?;
        if self.view_distance < 0 {
            return Err(ConfigError::NegativeViewDistance(self.view_distance));
        }
        if !(self.tick_interval.is_finite() && self.tick_interval >= 0.0) {
            return Err(ConfigError::NegativeTickInterval(self.tick_interval));
        }
        Ok(())
    }
}

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Observer chunk the pass was centered on
    pub observer_chunk: ChunkIndex,
    /// Chunks materialized
    pub loaded: Vec<ChunkIndex>,
    /// Chunks released
    pub released: Vec<ChunkIndex>,
    /// Wanted chunks whose build failed
    pub failed: Vec<ChunkIndex>,
}

impl PassReport {
    fn new(observer_chunk: ChunkIndex) -> Self {
        Self {
            observer_chunk,
            ..Self::default()
        }
    }

    /// Returns whether the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.released.is_empty() && self.failed.is_empty()
    }
}

/// Running totals across passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Passes run
    pub passes: u64,
    /// Chunks materialized
    pub materialized: u64,
    /// Chunks released
    pub released: u64,
    /// Build failures
    pub failures: u64,
}

/// Decides which chunks are live and drives the store.
#[derive(Debug)]
pub struct ChunkManager {
    /// Configuration
    config: StreamingConfig,
    /// Validated chunk size
    grid: ChunkGrid,
    /// Validated window radius
    view_distance: u32,
    /// Loaded chunks
    store: ChunkStore,
    /// Chunk the last pass was centered on
    current_chunk: Option<ChunkIndex>,
    /// Seconds since the last scheduling check
    timer: f32,
    /// Last pass left wanted chunks unbuilt
    retry_pending: bool,
    /// Running totals
    stats: StreamingStats,
}

impl ChunkManager {
    /// Creates a chunk manager, refusing invalid configuration.
    pub fn new(config: StreamingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = ChunkGrid::new(config.chunk_size)?;
        Ok(Self {
            view_distance: config.view_distance.unsigned_abs(),
            store: ChunkStore::new(config.chunk_size),
            grid,
            config,
            current_chunk: None,
            timer: 0.0,
            retry_pending: false,
            stats: StreamingStats::default(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Returns the chunk grid.
    #[must_use]
    pub const fn grid(&self) -> ChunkGrid {
        self.grid
    }

    /// Returns the chunk the last pass was centered on.
    #[must_use]
    pub const fn observer_chunk(&self) -> Option<ChunkIndex> {
        self.current_chunk
    }

    /// Returns the chunk store.
    #[must_use]
    pub const fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Returns running totals.
    #[must_use]
    pub const fn stats(&self) -> StreamingStats {
        self.stats
    }

    /// Returns the number of loaded chunks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.store.len()
    }

    /// Checks if a chunk is loaded.
    #[must_use]
    pub fn is_live(&self, index: ChunkIndex) -> bool {
        self.store.contains(index)
    }

    /// Returns a loaded chunk.
    #[must_use]
    pub fn get_chunk_at(&self, index: ChunkIndex) -> Option<&ChunkEntry> {
        self.store.get(index)
    }

    /// Checks whether `index` belongs to the window around `center`.
    #[must_use]
    pub fn in_window(&self, center: ChunkIndex, index: ChunkIndex) -> bool {
        self.config
            .view_shape
            .contains(center, index, self.view_distance)
    }

    /// Indices that should be live around `center`.
    pub fn window(&self, center: ChunkIndex) -> impl Iterator<Item = ChunkIndex> + '_ {
        let radius = self.view_distance as i32;
        (-radius..=radius)
            .flat_map(move |dz| {
                (-radius..=radius).filter_map(move |dx| center.checked_offset(dx, dz))
            })
            .filter(move |&index| self.in_window(center, index))
    }

    /// Chunk the observer stands in, pinned to the grid edge when it is
    /// beyond the addressable range.
    fn center_of(&self, observer: DVec3) -> ChunkIndex {
        match self.grid.chunk_of(observer) {
            Ok(index) => index,
            Err(err) => {
                let index = self.grid.clamped_chunk_of(observer);
                if self.current_chunk != Some(index) {
                    warn!("{err}; streaming around edge chunk {index}");
                }
                index
            },
        }
    }

    /// Advances the timer and runs a pass when one is due.
    ///
    /// `observer` is the observer's absolute position and `origin_offset` the
    /// accumulated floating-origin offset, used to anchor new chunks in local
    /// space.
    pub fn update(
        &mut self,
        dt: f32,
        observer: DVec3,
        origin_offset: DVec3,
        generator: &WorldGenerator,
        host: &mut impl RepresentationBuilder,
    ) -> Option<PassReport> {
        self.timer += dt;
        if self.timer < self.config.tick_interval {
            return None;
        }
        self.timer = 0.0;

        let center = self.center_of(observer);
        if self.current_chunk == Some(center) && !self.retry_pending {
            return None;
        }
        Some(self.run_pass(center, origin_offset, generator, host))
    }

    /// Runs a pass immediately, ignoring the timer.
    pub fn force_update(
        &mut self,
        observer: DVec3,
        origin_offset: DVec3,
        generator: &WorldGenerator,
        host: &mut impl RepresentationBuilder,
    ) -> PassReport {
        self.timer = 0.0;
        let center = self.center_of(observer);
        self.run_pass(center, origin_offset, generator, host)
    }

    /// Releases every chunk and forgets the observer chunk.
    pub fn clear_all_chunks(&mut self, host: &mut impl RepresentationBuilder) -> usize {
        self.current_chunk = None;
        self.retry_pending = false;
        let released = self.store.clear(host);
        self.stats.released += released as u64;
        info!("Cleared {released} chunks");
        released
    }

    /// Load pass over the whole window, then unload pass over the live set.
    fn run_pass(
        &mut self,
        center: ChunkIndex,
        origin_offset: DVec3,
        generator: &WorldGenerator,
        host: &mut impl RepresentationBuilder,
    ) -> PassReport {
        self.current_chunk = Some(center);
        let mut report = PassReport::new(center);

        let wanted: Vec<ChunkIndex> = self
            .window(center)
            .filter(|&index| !self.store.contains(index))
            .collect();
        for index in wanted {
            let anchor = (self.grid.origin(index) - origin_offset).as_vec3();
            match self.store.materialize(index, generator, host, anchor) {
                Ok(_) => report.loaded.push(index),
                Err(err) => {
                    warn!("Skipping chunk {index} this pass: {err}");
                    report.failed.push(index);
                },
            }
        }

        let stale: Vec<ChunkIndex> = self
            .store
            .indices()
            .filter(|&index| !self.in_window(center, index))
            .collect();
        for index in stale {
            if self.store.release(index, host) {
                report.released.push(index);
            }
        }

        self.retry_pending = !report.failed.is_empty();
        self.stats.passes += 1;
        self.stats.materialized += report.loaded.len() as u64;
        self.stats.released += report.released.len() as u64;
        self.stats.failures += report.failed.len() as u64;

        if !report.is_empty() {
            info!(
                "Streaming pass around {center}: {} loaded, {} released, {} failed, {} live",
                report.loaded.len(),
                report.released.len(),
                report.failed.len(),
                self.store.len()
            );
        }
        report
    }
}
