//! Live chunk entries and the store that owns them.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use drift_common::{ChunkIndex, EntityId, WorldError, WorldResult};
use glam::Vec3;
use tracing::debug;

use crate::generation::{ChunkContent, WorldGenerator};
use crate::host::RepresentationBuilder;

/// A live chunk and the host handles it owns.
#[derive(Debug)]
pub struct ChunkEntry {
    /// Chunk index
    index: ChunkIndex,
    /// Terrain representation
    root: EntityId,
    /// Spawned objects, children of `root`
    objects: Vec<EntityId>,
    /// Content the representation was built from
    content: ChunkContent,
}

impl ChunkEntry {
    /// Returns the chunk index.
    #[must_use]
    pub const fn index(&self) -> ChunkIndex {
        self.index
    }

    /// Returns the terrain representation handle.
    #[must_use]
    pub const fn root(&self) -> EntityId {
        self.root
    }

    /// Returns the spawned object handles.
    #[must_use]
    pub fn objects(&self) -> &[EntityId] {
        &self.objects
    }

    /// Returns the generated content.
    #[must_use]
    pub const fn content(&self) -> &ChunkContent {
        &self.content
    }

    /// Destroys every owned handle, objects first.
    fn release(self, host: &mut impl RepresentationBuilder) {
        for object in self.objects {
            host.destroy_representation(object);
        }
        host.destroy_representation(self.root);
    }
}

/// Owns the set of live chunks.
///
/// An index either has a complete entry or none: a failed build is rolled
/// back before the error is returned.
#[derive(Debug)]
pub struct ChunkStore {
    /// Loaded chunks
    chunks: AHashMap<ChunkIndex, ChunkEntry>,
    /// Chunk size in world units
    chunk_size: f64,
}

impl ChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(chunk_size: f64) -> Self {
        Self {
            chunks: AHashMap::new(),
            chunk_size,
        }
    }

    /// Generates and builds a chunk, or returns the existing entry.
    ///
    /// `anchor` is the local-space position of the chunk corner.
    pub fn materialize(
        &mut self,
        index: ChunkIndex,
        generator: &WorldGenerator,
        host: &mut impl RepresentationBuilder,
        anchor: Vec3,
    ) -> WorldResult<&ChunkEntry> {
        let vacant = match self.chunks.entry(index) {
            Entry::Occupied(occupied) => return Ok(&*occupied.into_mut()),
            Entry::Vacant(vacant) => vacant,
        };

        let content = generator.generate(index, self.chunk_size);
        let root = host
            .build_representation(&content, anchor)
            .map_err(|source| WorldError::RepresentationBuild { index, source })?;

        let mut objects = Vec::with_capacity(content.objects().len());
        for placement in content.objects() {
            match host.spawn_object(root, placement) {
                Ok(id) => objects.push(id),
                Err(source) => {
                    for id in objects {
                        host.destroy_representation(id);
                    }
                    host.destroy_representation(root);
                    return Err(WorldError::RepresentationBuild { index, source });
                },
            }
        }

        debug!("Loaded chunk {index} with {} objects", objects.len());
        Ok(&*vacant.insert(ChunkEntry {
            index,
            root,
            objects,
            content,
        }))
    }

    /// Destroys a chunk's representation and forgets it.
    ///
    /// Returns `false` if the chunk was not loaded.
    pub fn release(&mut self, index: ChunkIndex, host: &mut impl RepresentationBuilder) -> bool {
        let Some(entry) = self.chunks.remove(&index) else {
            return false;
        };
        entry.release(host);
        debug!("Unloaded chunk {index}");
        true
    }

    /// Releases every chunk. Returns how many were loaded.
    pub fn clear(&mut self, host: &mut impl RepresentationBuilder) -> usize {
        let count = self.chunks.len();
        for (_, entry) in self.chunks.drain() {
            entry.release(host);
        }
        count
    }

    /// Returns a live chunk.
    #[must_use]
    pub fn get(&self, index: ChunkIndex) -> Option<&ChunkEntry> {
        self.chunks.get(&index)
    }

    /// Checks if a chunk is loaded.
    #[must_use]
    pub fn contains(&self, index: ChunkIndex) -> bool {
        self.chunks.contains_key(&index)
    }

    /// Returns the number of loaded chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns whether no chunk is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the chunk size in world units.
    #[must_use]
    pub const fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    /// Iterates over all live chunks.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkIndex, &ChunkEntry)> + '_ {
        self.chunks.iter().map(|(index, entry)| (*index, entry))
    }

    /// Iterates over the indices of all live chunks.
    pub fn indices(&self) -> impl Iterator<Item = ChunkIndex> + '_ {
        self.chunks.keys().copied()
    }

    /// Terrain roots of all live chunks. Objects are children and follow them.
    pub fn representation_roots(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.chunks.values().map(ChunkEntry::root)
    }
}
