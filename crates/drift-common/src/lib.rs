//! # Drift Common
//!
//! Common types shared across Drift subsystems:
//! - Coordinate model (chunk index, chunk-relative position, chunk distance)
//! - Opaque entity handles for host-owned objects
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_chunk_index_from_world_position() {
        let index = ChunkIndex::from_world_position(DVec3::new(100.0, 0.0, 200.0), 32.0)
            .expect("valid chunk size");
        assert_eq!(index, ChunkIndex::new(3, 6));
        assert_eq!(index.origin(32.0), DVec3::new(96.0, 0.0, 192.0));
    }

    #[test]
    fn test_entity_id_allocation() {
        let mut ids = EntityIdAllocator::new();
        let id1 = ids.allocate();
        let id2 = ids.allocate();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!EntityId::NULL.is_valid());
        assert_eq!(EntityId::from_raw(id2.raw()), id2);
    }

    #[test]
    fn test_host_error_message() {
        let err = WorldError::RepresentationBuild {
            index: ChunkIndex::new(1, -2),
            source: HostError::new("mesh upload failed"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to build representation for chunk (1, -2): mesh upload failed"
        );
    }
}
