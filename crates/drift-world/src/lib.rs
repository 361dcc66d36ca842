//! # Drift World
//!
//! An infinite, chunk-streamed world with a floating origin.
//!
//! This crate handles:
//! - Deterministic terrain and object generation
//! - Chunk loading/unloading around an observer
//! - Origin shifting to keep local coordinates small
//! - Host collaborator traits and an in-memory host

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod config;
pub mod generation;
pub mod host;
pub mod origin;
pub mod streaming;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::generation::*;
    pub use crate::host::*;
    pub use crate::origin::*;
    pub use crate::streaming::*;
    pub use crate::world::*;
}

pub use prelude::*;
