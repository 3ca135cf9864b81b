//! # Strata Utils
//!
//! Shared position types, math helpers, lock aliases and logging bootstrap
//! used by every Strata crate.

pub mod locks;
pub mod logger;
pub mod math;
mod types;

pub use types::{CellPos, ChunkPos, ParticleId, WorldId};
