//! Procedural world generation.
//!
//! Generation is a pure function of the seed, chunk index and configuration.
//! Chunks are thrown away when they leave the view window and regenerated
//! when they come back, so nothing here may keep state between calls.

use drift_common::{ChunkIndex, ConfigError};
use glam::{DVec2, Vec3};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Modulus used to turn a chunk hash into a unit float.
const HASH_UNIT_MODULUS: u32 = 10_000;

/// Range of the per-axis seed jitter in world units.
const SEED_OFFSET_RANGE: f64 = 10_000.0;

/// Normalized height above which terrain takes the high color.
const PALETTE_HEADROOM: f64 = 1.5;

/// One noise layer of the height field.
struct Octave {
    frequency: f64,
    amplitude: f64,
    phase: f64,
}

const OCTAVES: [Octave; 3] = [
    Octave {
        frequency: 1.0,
        amplitude: 1.0,
        phase: 0.0,
    },
    Octave {
        frequency: 2.0,
        amplitude: 0.5,
        phase: 1000.0,
    },
    Octave {
        frequency: 4.0,
        amplitude: 0.25,
        phase: 2000.0,
    },
];

/// Independent per-object decisions. Each one gets its own hash salt.
#[derive(Debug, Clone, Copy)]
#[repr(i32)]
enum Decision {
    Count = 0,
    LocalX = 1,
    LocalZ = 2,
    SpawnChance = 3,
    Kind = 4,
    Rotation = 5,
    TerrainKind = 6,
}

/// Salt for a decision about one object slot. Distinct for every pair.
fn salt(slot: u32, decision: Decision) -> i32 {
    (slot as i32).wrapping_mul(8).wrapping_add(decision as i32)
}

/// Positional hash of `(seed, chunk, salt)`.
///
/// `((seed * 31 + x) * 31 + z) * 31 + salt` in wrapping 32-bit arithmetic,
/// folded to its absolute value.
#[must_use]
pub fn chunk_hash(seed: i32, index: ChunkIndex, salt: i32) -> u32 {
    seed.wrapping_mul(31)
        .wrapping_add(index.x)
        .wrapping_mul(31)
        .wrapping_add(index.z)
        .wrapping_mul(31)
        .wrapping_add(salt)
        .unsigned_abs()
}

/// [`chunk_hash`] mapped to `[0, 1)`.
#[must_use]
pub fn chunk_hash_unit(seed: i32, index: ChunkIndex, salt: i32) -> f64 {
    f64::from(chunk_hash(seed, index, salt) % HASH_UNIT_MODULUS) / f64::from(HASH_UNIT_MODULUS)
}

/// Seed-derived jitter for one axis. The same for every chunk.
fn seed_offset(seed: i32, axis: i64) -> f64 {
    let mut rng = fastrand::Rng::with_seed((i64::from(seed) + axis * 1000) as u64);
    rng.f64() * SEED_OFFSET_RANGE
}

/// Height-to-color mapping for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainPalette {
    /// Color at normalized height 0
    pub deep: [f32; 3],
    /// Color at normalized height 1/3
    pub mid: [f32; 3],
    /// Color at and above normalized height 2/3
    pub high: [f32; 3],
}

impl Default for TerrainPalette {
    fn default() -> Self {
        Self {
            deep: [0.2, 0.3, 0.1],
            mid: [0.3, 0.5, 0.2],
            high: [0.6, 0.6, 0.5],
        }
    }
}

impl TerrainPalette {
    /// Classifies a terrain height into a vertex color.
    #[must_use]
    pub fn color_for(&self, height: f32, height_multiplier: f64) -> [f32; 3] {
        let normalized =
            (f64::from(height) / (height_multiplier * PALETTE_HEADROOM)).clamp(0.0, 1.0) as f32;
        let deep = Vec3::from(self.deep);
        let mid = Vec3::from(self.mid);
        let high = Vec3::from(self.high);

        let color = if normalized < 1.0 / 3.0 {
            deep.lerp(mid, normalized * 3.0)
        } else if normalized < 2.0 / 3.0 {
            mid.lerp(high, (normalized - 1.0 / 3.0) * 3.0)
        } else {
            high
        };
        color.to_array()
    }
}

/// World generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// World seed
    pub seed: i32,
    /// Base noise frequency (world units to noise units)
    pub noise_scale: f64,
    /// Base terrain amplitude
    pub height_multiplier: f64,
    /// Height field cells per chunk side
    pub resolution: u32,
    /// Layered noise height field when true; otherwise a single noise octave
    /// and one terrain variant per chunk
    pub procedural_terrain: bool,
    /// Number of terrain variants to pick from without procedural terrain
    /// (0 = none)
    pub terrain_kinds: u32,
    /// Upper bound on object candidates per chunk
    pub max_objects_per_chunk: u32,
    /// Candidates whose spawn sample is below this are dropped
    pub spawn_threshold: f32,
    /// Number of distinct object kinds (0 disables objects)
    pub object_kinds: u32,
    /// Height classification colors
    pub palette: TerrainPalette,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            noise_scale: 0.1,
            height_multiplier: 10.0,
            resolution: 20,
            procedural_terrain: true,
            terrain_kinds: 3,
            max_objects_per_chunk: 5,
            spawn_threshold: 0.5,
            object_kinds: 3,
            palette: TerrainPalette::default(),
        }
    }
}

impl GeneratorConfig {
    /// Checks the generation parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.noise_scale.is_finite() && self.noise_scale > 0.0) {
            return Err(ConfigError::NonPositiveNoiseScale(self.noise_scale));
        }
        if !(self.height_multiplier.is_finite() && self.height_multiplier > 0.0) {
            return Err(ConfigError::NonPositiveHeightMultiplier(
                self.height_multiplier,
            ));
        }
        if !(0.0..=1.0).contains(&self.spawn_threshold) {
            return Err(ConfigError::SpawnThresholdOutOfRange(self.spawn_threshold));
        }
        if self.resolution == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        Ok(())
    }
}

/// A decorative object placed inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPlacement {
    /// Candidate slot the object came from
    pub slot: u32,
    /// Object kind selector, below `object_kinds`
    pub kind: u32,
    /// Position relative to the chunk corner; `y` is the ground height
    pub position: Vec3,
    /// Yaw in degrees, `[0, 360)`
    pub rotation_degrees: f32,
}

/// A prebuilt terrain piece standing in for the height field mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainVariant {
    /// Variant selector, below `terrain_kinds`
    pub kind: u32,
    /// Position relative to the chunk corner
    pub position: Vec3,
}

/// Generated content for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkContent {
    index: ChunkIndex,
    chunk_size: f64,
    resolution: u32,
    /// Vertex heights, row-major by z then x
    heights: Vec<f32>,
    /// Vertex colors, same layout as `heights`
    colors: Vec<[f32; 3]>,
    variant: Option<TerrainVariant>,
    objects: Vec<ObjectPlacement>,
}

impl ChunkContent {
    /// Returns the chunk index.
    #[must_use]
    pub const fn index(&self) -> ChunkIndex {
        self.index
    }

    /// Returns the chunk size in world units.
    #[must_use]
    pub const fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    /// Returns the number of height field cells per side.
    #[must_use]
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Vertices per side of the height grid.
    #[must_use]
    pub const fn vertices_per_side(&self) -> u32 {
        self.resolution + 1
    }

    /// Distance between neighbouring vertices.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.chunk_size / f64::from(self.resolution)
    }

    /// Returns all vertex heights.
    #[must_use]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Returns all vertex colors.
    #[must_use]
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Returns the terrain variant, present only without procedural terrain.
    #[must_use]
    pub const fn variant(&self) -> Option<TerrainVariant> {
        self.variant
    }

    /// Returns the placed objects in slot order.
    #[must_use]
    pub fn objects(&self) -> &[ObjectPlacement] {
        &self.objects
    }

    /// Height of the grid vertex at `(x, z)`.
    #[must_use]
    pub fn height_at_vertex(&self, x: u32, z: u32) -> Option<f32> {
        let side = self.vertices_per_side();
        if x >= side || z >= side {
            return None;
        }
        self.heights.get((z * side + x) as usize).copied()
    }

    /// Local position of the grid vertex at `(x, z)`, including its height.
    #[must_use]
    pub fn vertex_position(&self, x: u32, z: u32) -> Option<Vec3> {
        let height = self.height_at_vertex(x, z)?;
        let step = self.step();
        Some(Vec3::new(
            (f64::from(x) * step) as f32,
            height,
            (f64::from(z) * step) as f32,
        ))
    }

    /// Bilinear ground height at a chunk-relative position.
    #[must_use]
    pub fn sample_height(&self, local: DVec2) -> Option<f32> {
        let bounds = 0.0..=self.chunk_size;
        if !bounds.contains(&local.x) || !bounds.contains(&local.y) {
            return None;
        }
        let step = self.step();
        let last = self.resolution - 1;
        let cell_x = ((local.x / step).floor() as u32).min(last);
        let cell_z = ((local.y / step).floor() as u32).min(last);
        let tx = (local.x / step - f64::from(cell_x)) as f32;
        let tz = (local.y / step - f64::from(cell_z)) as f32;

        let h00 = self.height_at_vertex(cell_x, cell_z)?;
        let h10 = self.height_at_vertex(cell_x + 1, cell_z)?;
        let h01 = self.height_at_vertex(cell_x, cell_z + 1)?;
        let h11 = self.height_at_vertex(cell_x + 1, cell_z + 1)?;
        let near = h00 + (h10 - h00) * tx;
        let far = h01 + (h11 - h01) * tx;
        Some(near + (far - near) * tz)
    }
}

/// Procedural world generator.
#[derive(Clone)]
pub struct WorldGenerator {
    /// Configuration
    config: GeneratorConfig,
    /// Terrain noise
    terrain_noise: Perlin,
    /// Seed jitter applied to every sample (`x`, `z`)
    seed_offset: DVec2,
}

impl WorldGenerator {
    /// Creates a new generator with the given config.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let terrain_noise = Perlin::new(config.seed as u32);
        let seed_offset = DVec2::new(seed_offset(config.seed, 0), seed_offset(config.seed, 1));

        Self {
            config,
            terrain_noise,
            seed_offset,
        }
    }

    /// Creates a generator with default config.
    #[must_use]
    pub fn with_seed(seed: i32) -> Self {
        Self::new(GeneratorConfig {
            seed,
            ..Default::default()
        })
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the world seed.
    #[must_use]
    pub const fn seed(&self) -> i32 {
        self.config.seed
    }

    /// Terrain height at a world-space `(x, z)`.
    #[must_use]
    pub fn height_at(&self, world_x: f64, world_z: f64) -> f32 {
        let octaves = if self.config.procedural_terrain {
            OCTAVES.len()
        } else {
            1
        };
        let x = world_x + self.seed_offset.x;
        let z = world_z + self.seed_offset.y;

        let height: f64 = OCTAVES
            .iter()
            .take(octaves)
            .map(|octave| {
                let frequency = self.config.noise_scale * octave.frequency;
                let sample = self
                    .terrain_noise
                    .get([(x + octave.phase) * frequency, (z + octave.phase) * frequency]);
                let normalized = ((sample + 1.0) * 0.5).clamp(0.0, 1.0);
                normalized * self.config.height_multiplier * octave.amplitude
            })
            .sum();
        height as f32
    }

    /// Generates the content of a chunk.
    #[must_use]
    pub fn generate(&self, index: ChunkIndex, chunk_size: f64) -> ChunkContent {
        let resolution = self.config.resolution.max(1);
        let side = resolution + 1;
        let step = chunk_size / f64::from(resolution);
        let origin = index.origin(chunk_size);

        let mut heights = Vec::with_capacity((side * side) as usize);
        for z in 0..side {
            for x in 0..side {
                let world_x = origin.x + f64::from(x) * step;
                let world_z = origin.z + f64::from(z) * step;
                heights.push(self.height_at(world_x, world_z));
            }
        }

        let colors = heights
            .iter()
            .map(|&h| {
                self.config
                    .palette
                    .color_for(h, self.config.height_multiplier)
            })
            .collect();

        ChunkContent {
            index,
            chunk_size,
            resolution,
            heights,
            colors,
            variant: self.pick_variant(index, chunk_size),
            objects: self.place_objects(index, chunk_size),
        }
    }

    /// Picks the terrain variant for a chunk, centered and raised to the
    /// ground height at the chunk corner.
    fn pick_variant(&self, index: ChunkIndex, chunk_size: f64) -> Option<TerrainVariant> {
        let config = &self.config;
        if config.procedural_terrain || config.terrain_kinds == 0 {
            return None;
        }
        let origin = index.origin(chunk_size);
        let kind = chunk_hash(config.seed, index, salt(0, Decision::TerrainKind))
            % config.terrain_kinds;
        let half = (chunk_size * 0.5) as f32;
        Some(TerrainVariant {
            kind,
            position: Vec3::new(half, self.height_at(origin.x, origin.z), half),
        })
    }

    /// Decides object placements from positional hashes only.
    fn place_objects(&self, index: ChunkIndex, chunk_size: f64) -> Vec<ObjectPlacement> {
        let config = &self.config;
        if config.object_kinds == 0 {
            return Vec::new();
        }
        let seed = config.seed;
        let origin = index.origin(chunk_size);

        let count = chunk_hash(seed, index, salt(0, Decision::Count))
            % config.max_objects_per_chunk.saturating_add(1);

        let mut objects = Vec::with_capacity(count as usize);
        for slot in 0..count {
            let chance = chunk_hash_unit(seed, index, salt(slot, Decision::SpawnChance));
            if chance < f64::from(config.spawn_threshold) {
                continue;
            }

            let local_x = chunk_hash_unit(seed, index, salt(slot, Decision::LocalX)) * chunk_size;
            let local_z = chunk_hash_unit(seed, index, salt(slot, Decision::LocalZ)) * chunk_size;
            let kind = chunk_hash(seed, index, salt(slot, Decision::Kind)) % config.object_kinds;
            let rotation = chunk_hash_unit(seed, index, salt(slot, Decision::Rotation)) * 360.0;
            let height = self.height_at(origin.x + local_x, origin.z + local_z);

            objects.push(ObjectPlacement {
                slot,
                kind,
                position: Vec3::new(local_x as f32, height, local_z as f32),
                rotation_degrees: rotation as f32,
            });
        }
        objects
    }
}

impl std::fmt::Debug for WorldGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldGenerator")
            .field("config", &self.config)
            .field("seed_offset", &self.seed_offset)
            .finish_non_exhaustive()
    }
}
