//! Error types for Project Drift.

use thiserror::Error;

use crate::coords::ChunkIndex;

/// Invalid configuration values. These are fatal: the world refuses to run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Chunk size must be positive and finite
    #[error("Chunk size must be positive, got {0}")]
    NonPositiveChunkSize(f64),

    /// View distance must be zero or more
    #[error("View distance must not be negative, got {0}")]
    NegativeViewDistance(i32),

    /// Tick interval must be zero or more
    #[error("Tick interval must not be negative, got {0}")]
    NegativeTickInterval(f32),

    /// Origin shift threshold must be positive
    #[error("Origin shift threshold must be positive, got {0}")]
    NonPositiveShiftThreshold(f32),

    /// Noise scale must be positive
    #[error("Noise scale must be positive, got {0}")]
    NonPositiveNoiseScale(f64),

    /// Height multiplier must be positive
    #[error("Height multiplier must be positive, got {0}")]
    NonPositiveHeightMultiplier(f64),

    /// Spawn threshold must lie in `[0, 1]`
    #[error("Object spawn threshold must be within [0, 1], got {0}")]
    SpawnThresholdOutOfRange(f32),

    /// Terrain resolution must be at least one cell
    #[error("Terrain resolution must be at least 1")]
    ZeroResolution,
}

/// A world position that cannot be expressed as a chunk coordinate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// Invalid chunk size
    #[error(transparent)]
    ChunkSize(#[from] ConfigError),

    /// The chunk index along one axis does not fit the grid
    #[error("Position {0} lies outside the addressable chunk grid")]
    OutOfRange(f64),
}

/// World and chunk errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The host failed to build a chunk representation
    #[error("Failed to build representation for chunk {index}: {source}")]
    RepresentationBuild {
        /// Chunk that failed
        index: ChunkIndex,
        /// Host failure
        #[source]
        source: HostError,
    },

    /// The observer reference is missing
    #[error("Observer reference is missing")]
    MissingObserver,

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    /// Creates a host error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
