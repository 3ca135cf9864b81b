//! Chunk level memoization of ambient temperature.
//!
//! - [`EnvChunk`] - One cubic chunk with its cached temperature and members
//! - [`ChunkCache`] - Lazily creates exactly one [`EnvChunk`] per key

mod chunk_cache;
mod env_chunk;

pub use chunk_cache::{ChunkCache, Viewport};
pub use env_chunk::{ChunkKey, EnvChunk};
