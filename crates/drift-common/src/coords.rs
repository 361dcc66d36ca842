//! Coordinate types for chunk indices and chunk-relative positions.
//!
//! World positions are 3D with `x`/`z` as the horizontal plane. Only the
//! horizontal axes take part in chunk addressing; `y` is height.

use std::fmt;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoordinateError};

/// Chunk index (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkIndex {
    /// X index in chunk space
    pub x: i32,
    /// Z index in chunk space
    pub z: i32,
}

impl ChunkIndex {
    /// The chunk containing the world origin.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new chunk index.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the chunk containing a world position.
    pub fn from_world_position(position: DVec3, chunk_size: f64) -> Result<Self, CoordinateError> {
        WorldCoordinate::from_world_position(position, chunk_size).map(|c| c.chunk)
    }

    /// World-space corner (minimum x/z) of this chunk.
    #[must_use]
    pub fn origin(self, chunk_size: f64) -> DVec3 {
        DVec3::new(
            f64::from(self.x) * chunk_size,
            0.0,
            f64::from(self.z) * chunk_size,
        )
    }

    /// Returns the index displaced by `(dx, dz)` chunks, or `None` past the
    /// edge of the grid.
    #[must_use]
    pub const fn checked_offset(self, dx: i32, dz: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.z.checked_add(dz)) {
            (Some(x), Some(z)) => Some(Self::new(x, z)),
            _ => None,
        }
    }

    /// L1 (Manhattan) distance to another chunk.
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.z.abs_diff(other.z))
    }

    /// Chebyshev distance to another chunk (largest per-axis difference).
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        if dx > dz {
            dx
        } else {
            dz
        }
    }
}

impl fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// L1 distance between two chunk indices.
///
/// This is the admission metric for streaming, so the loaded region is a
/// diamond rather than a circle.
#[must_use]
pub const fn chunk_distance(a: ChunkIndex, b: ChunkIndex) -> u32 {
    a.distance(b)
}

/// Rejects chunk sizes that cannot address a grid.
pub fn validate_chunk_size(chunk_size: f64) -> Result<(), ConfigError> {
    if chunk_size.is_finite() && chunk_size > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveChunkSize(chunk_size))
    }
}

/// A validated chunk size with infallible conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkGrid {
    chunk_size: f64,
}

impl ChunkGrid {
    /// Creates a grid, rejecting non-positive or non-finite sizes.
    pub fn new(chunk_size: f64) -> Result<Self, ConfigError> {
        validate_chunk_size(chunk_size)?;
        Ok(Self { chunk_size })
    }

    /// Returns the chunk size in world units.
    #[must_use]
    pub const fn chunk_size(self) -> f64 {
        self.chunk_size
    }

    /// Splits a world position into chunk index and local offset.
    ///
    /// Fails when the chunk index on either axis does not fit in an `i32`.
    pub fn coordinate(self, position: DVec3) -> Result<WorldCoordinate, CoordinateError> {
        let (x, local_x) = split_axis(position.x, self.chunk_size)?;
        let (z, local_z) = split_axis(position.z, self.chunk_size)?;
        Ok(WorldCoordinate {
            chunk: ChunkIndex::new(x, z),
            local: DVec2::new(local_x, local_z),
        })
    }

    /// Returns the chunk containing a world position.
    pub fn chunk_of(self, position: DVec3) -> Result<ChunkIndex, CoordinateError> {
        self.coordinate(position).map(|coordinate| coordinate.chunk)
    }

    /// Returns the chunk containing a world position, pinned to the nearest
    /// edge chunk when the position lies outside the grid.
    #[must_use]
    pub fn clamped_chunk_of(self, position: DVec3) -> ChunkIndex {
        // Float to int casts saturate, NaN maps to 0.
        ChunkIndex::new(
            (position.x / self.chunk_size).floor() as i32,
            (position.z / self.chunk_size).floor() as i32,
        )
    }

    /// World-space corner of a chunk.
    #[must_use]
    pub fn origin(self, index: ChunkIndex) -> DVec3 {
        index.origin(self.chunk_size)
    }
}

/// A position expressed as a chunk index plus an offset inside that chunk.
///
/// `local` is always within `[0, chunk_size)` on both axes, so every world
/// position has exactly one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldCoordinate {
    /// Chunk containing the position
    pub chunk: ChunkIndex,
    /// Offset from the chunk corner (`x`, `z`)
    pub local: DVec2,
}

impl WorldCoordinate {
    /// Creates a coordinate from its parts.
    #[must_use]
    pub const fn new(chunk: ChunkIndex, local: DVec2) -> Self {
        Self { chunk, local }
    }

    /// Splits a world position into chunk index and local offset.
    ///
    /// Uses floor division, so `(-1, -1)` with a chunk size of 50 lands in
    /// chunk `(-1, -1)` at local `(49, 49)`.
    pub fn from_world_position(
        position: DVec3,
        chunk_size: f64,
    ) -> Result<Self, CoordinateError> {
        ChunkGrid::new(chunk_size)?.coordinate(position)
    }

    /// Reassembles the world position (height 0).
    #[must_use]
    pub fn to_world_position(self, chunk_size: f64) -> DVec3 {
        self.chunk.origin(chunk_size) + DVec3::new(self.local.x, 0.0, self.local.y)
    }
}

impl fmt::Display for WorldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chunk({}, {}) Local({:.2}, {:.2})",
            self.chunk.x, self.chunk.z, self.local.x, self.local.y
        )
    }
}

/// Floor-divides one axis, keeping the remainder strictly inside `[0, size)`.
fn split_axis(value: f64, size: f64) -> Result<(i32, f64), CoordinateError> {
    let mut index = (value / size).floor();
    let mut local = value - index * size;
    // The quotient can round across an integer boundary.
    if local < 0.0 {
        index -= 1.0;
        local += size;
    }
    if local >= size {
        index += 1.0;
        local -= size;
    }
    if !(f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&index) {
        return Err(CoordinateError::OutOfRange(value));
    }
    Ok((index as i32, local.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_positive_position() {
        let coord = WorldCoordinate::from_world_position(DVec3::new(120.0, 7.0, 30.5), 50.0)
            .expect("valid chunk size");
        assert_eq!(coord.chunk, ChunkIndex::new(2, 0));
        assert!((coord.local.x - 20.0).abs() < 1e-9);
        assert!((coord.local.y - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_negative_position_uses_floor() {
        let coord = WorldCoordinate::from_world_position(DVec3::new(-1.0, 0.0, -1.0), 50.0)
            .expect("valid chunk size");
        assert_eq!(coord.chunk, ChunkIndex::new(-1, -1));
        assert!((coord.local.x - 49.0).abs() < 1e-9);
        assert!((coord.local.y - 49.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_boundary_belongs_to_next_chunk() {
        let coord = WorldCoordinate::from_world_position(DVec3::new(50.0, 0.0, -50.0), 50.0)
            .expect("valid chunk size");
        assert_eq!(coord.chunk, ChunkIndex::new(1, -1));
        assert_eq!(coord.local, DVec2::ZERO);
    }

    #[test]
    fn test_tiny_negative_stays_in_bounds() {
        let coord = WorldCoordinate::from_world_position(DVec3::new(-1e-20, 0.0, 0.0), 50.0)
            .expect("valid chunk size");
        assert!(coord.local.x >= 0.0 && coord.local.x < 50.0);
        let back = coord.to_world_position(50.0);
        assert!((back.x - -1e-20).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_chunk_size() {
        for size in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let result = WorldCoordinate::from_world_position(DVec3::ZERO, size);
            assert!(matches!(
                result,
                Err(CoordinateError::ChunkSize(ConfigError::NonPositiveChunkSize(_)))
            ));
        }
    }

    #[test]
    fn test_grid_matches_free_conversion() {
        let grid = ChunkGrid::new(16.0).expect("valid chunk size");
        let position = DVec3::new(-33.5, 4.0, 70.25);
        assert_eq!(
            grid.coordinate(position),
            WorldCoordinate::from_world_position(position, 16.0)
        );
        assert_eq!(grid.chunk_of(position), Ok(ChunkIndex::new(-3, 4)));
        assert_eq!(grid.clamped_chunk_of(position), ChunkIndex::new(-3, 4));
        assert_eq!(grid.origin(ChunkIndex::new(-3, 4)), DVec3::new(-48.0, 0.0, 64.0));
        assert!(ChunkGrid::new(0.0).is_err());
    }

    #[test]
    fn test_last_addressable_chunk_round_trips() {
        let x = 50.0 * f64::from(i32::MAX) + 10.0;
        let coord = WorldCoordinate::from_world_position(DVec3::new(x, 0.0, -x), 50.0)
            .expect("inside the grid");
        assert_eq!(coord.chunk.x, i32::MAX);
        assert!((coord.local.x - 10.0).abs() < 1e-6);
        assert_eq!(coord.to_world_position(50.0).x, x);
        assert_eq!(coord.chunk.z, i32::MIN);
    }

    #[test]
    fn test_position_beyond_grid_is_rejected() {
        let far = DVec3::new(50.0 * 2_147_483_650.0, 0.0, 0.0);
        assert_eq!(
            WorldCoordinate::from_world_position(far, 50.0),
            Err(CoordinateError::OutOfRange(far.x))
        );
        assert!(ChunkIndex::from_world_position(-far, 50.0).is_err());
        let nan = DVec3::new(f64::NAN, 0.0, 0.0);
        assert!(WorldCoordinate::from_world_position(nan, 50.0).is_err());

        let grid = ChunkGrid::new(50.0).expect("valid chunk size");
        assert_eq!(grid.clamped_chunk_of(far), ChunkIndex::new(i32::MAX, 0));
        assert_eq!(grid.clamped_chunk_of(-far), ChunkIndex::new(i32::MIN, 0));
    }

    #[test]
    fn test_checked_offset_stops_at_grid_edge() {
        let edge = ChunkIndex::new(i32::MAX, i32::MIN);
        assert_eq!(edge.checked_offset(1, 0), None);
        assert_eq!(edge.checked_offset(0, -1), None);
        assert_eq!(
            edge.checked_offset(-2, 3),
            Some(ChunkIndex::new(i32::MAX - 2, i32::MIN + 3))
        );
    }

    #[test]
    fn test_chunk_distance_is_manhattan() {
        let a = ChunkIndex::new(0, 0);
        assert_eq!(chunk_distance(a, ChunkIndex::new(2, 2)), 4);
        assert_eq!(chunk_distance(a, ChunkIndex::new(-3, 1)), 4);
        assert_eq!(a.chebyshev_distance(ChunkIndex::new(-3, 1)), 3);
        assert_eq!(chunk_distance(a, a), 0);
    }

    #[test]
    fn test_display() {
        let coord = WorldCoordinate::new(ChunkIndex::new(3, -2), DVec2::new(1.5, 2.25));
        assert_eq!(coord.to_string(), "Chunk(3, -2) Local(1.50, 2.25)");
        assert_eq!(ChunkIndex::new(3, -2).to_string(), "(3, -2)");
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            x in -1.0e7f64..1.0e7,
            z in -1.0e7f64..1.0e7,
            size in 0.5f64..500.0,
        ) {
            let position = DVec3::new(x, 0.0, z);
            let coord = WorldCoordinate::from_world_position(position, size).expect("valid size");
            prop_assert!(coord.local.x >= 0.0 && coord.local.x < size);
            prop_assert!(coord.local.y >= 0.0 && coord.local.y < size);

            let back = coord.to_world_position(size);
            let tolerance = 1e-9 * (1.0 + x.abs().max(z.abs()));
            prop_assert!((back.x - x).abs() <= tolerance);
            prop_assert!((back.z - z).abs() <= tolerance);
        }

        #[test]
        fn prop_distance_symmetric(
            ax in -10_000i32..10_000, az in -10_000i32..10_000,
            bx in -10_000i32..10_000, bz in -10_000i32..10_000,
        ) {
            let a = ChunkIndex::new(ax, az);
            let b = ChunkIndex::new(bx, bz);
            prop_assert_eq!(chunk_distance(a, b), chunk_distance(b, a));
            prop_assert!(a.chebyshev_distance(b) <= a.distance(b));
        }
    }
}
