use std::sync::Arc;

use strata_utils::{CellPos, ChunkPos, WorldId};

use crate::{
    error::{EnvironmentError, ValidationError},
    store::{ThermalParticle, WorldConfigs, WorldLayout},
    temperature::AmbientSampler,
};

use super::{ChunkKey, EnvChunk};

/// An axis-aligned box of cells, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Lowest corner.
    pub min: CellPos,
    /// Highest corner.
    pub max: CellPos,
}

impl Viewport {
    /// Creates a viewport from two corners.
    #[must_use]
    pub const fn new(min: CellPos, max: CellPos) -> Self {
        Self { min, max }
    }

    /// Rejects a viewport whose minimum exceeds its maximum on any axis.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (lo, hi) = (self.min.0, self.max.0);
        for (axis, min, max) in [("x", lo.x, hi.x), ("y", lo.y, hi.y), ("z", lo.z, hi.z)] {
            if min > max {
                return Err(ValidationError::InvalidViewport { axis, min, max });
            }
        }
        Ok(())
    }

    /// The part of this viewport inside `layout`'s bounds, if any.
    fn clamp_to(&self, layout: &WorldLayout) -> Option<Self> {
        let (lo, hi) = (layout.bounds.min.0, layout.bounds.max.0);
        let min = CellPos::new(
            self.min.0.x.max(lo.x),
            self.min.0.y.max(lo.y),
            self.min.0.z.max(lo.z),
        );
        let max = CellPos::new(
            self.max.0.x.min(hi.x),
            self.max.0.y.min(hi.y),
            self.max.0.z.min(hi.z),
        );
        let clamped = Self::new(min, max);
        clamped.validate().ok().map(|()| clamped)
    }
}

/// Owns every live [`EnvChunk`], keyed by world and chunk coordinates.
///
/// Chunks are created on first access and live until [`ChunkCache::clear_cache`].
/// At most one chunk exists per key, even under concurrent first access.
pub struct ChunkCache {
    worlds: Arc<WorldConfigs>,
    sampler: Arc<dyn AmbientSampler>,
    chunks: scc::HashMap<ChunkKey, Arc<EnvChunk>>,
}

impl ChunkCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(worlds: Arc<WorldConfigs>, sampler: Arc<dyn AmbientSampler>) -> Self {
        Self {
            worlds,
            sampler,
            chunks: scc::HashMap::new(),
        }
    }

    /// Chunk size and bounds of `world`. Memoized after the first read.
    pub async fn config_for(&self, world: WorldId) -> Result<WorldLayout, EnvironmentError> {
        self.worlds.resolve(world).await
    }

    /// The chunk containing `cell`, created if needed.
    pub async fn chunk_for(
        &self,
        world: WorldId,
        cell: CellPos,
    ) -> Result<Arc<EnvChunk>, EnvironmentError> {
        let layout = self.config_for(world).await?;
        let pos = ChunkPos::from_cell(cell, layout.chunk_size);
        Ok(self.chunk_at(world, pos, layout.chunk_size).await)
    }

    /// The chunk a particle lives in. Does not change the chunk's membership.
    pub async fn chunk_for_particle(
        &self,
        world: WorldId,
        particle: &ThermalParticle,
    ) -> Result<Arc<EnvChunk>, EnvironmentError> {
        self.chunk_for(world, particle.position).await
    }

    async fn chunk_at(&self, world: WorldId, pos: ChunkPos, chunk_size: i32) -> Arc<EnvChunk> {
        let key = ChunkKey::new(world, pos);
        self.chunks
            .entry_async(key)
            .await
            .or_insert_with(|| {
                log::debug!("Creating chunk {pos:?} in world {world}");
                Arc::new(EnvChunk::new(key, chunk_size, self.sampler.clone()))
            })
            .get()
            .clone()
    }

    /// Every chunk of the world whose center lies within `radius` cells of
    /// `cell` (euclidean, inclusive). Chunks outside the world's bounds are
    /// never returned.
    pub async fn chunks_in_radius(
        &self,
        world: WorldId,
        cell: CellPos,
        radius: u32,
    ) -> Result<Vec<Arc<EnvChunk>>, EnvironmentError> {
        let layout = self.config_for(world).await?;
        let size = layout.chunk_size;
        let origin = ChunkPos::from_cell(cell, size).0;
        let first = ChunkPos::from_cell(layout.bounds.min, size).0;
        let last = ChunkPos::from_cell(layout.bounds.max, size).0;
        let point = cell.as_f64();
        let reach = i32::try_from(radius / size.unsigned_abs())
            .unwrap_or(i32::MAX)
            .saturating_add(1);
        let span = |origin: i32, first: i32, last: i32| {
            origin.saturating_sub(reach).max(first)..=origin.saturating_add(reach).min(last)
        };

        let mut found = Vec::new();
        for x in span(origin.x, first.x, last.x) {
            for y in span(origin.y, first.y, last.y) {
                for z in span(origin.z, first.z, last.z) {
                    let pos = ChunkPos::new(x, y, z);
                    if pos.center(size).distance(point) <= f64::from(radius) {
                        found.push(self.chunk_at(world, pos, size).await);
                    }
                }
            }
        }
        Ok(found)
    }

    /// Every chunk overlapping `viewport`, clipped to the world's bounds.
    pub async fn chunks_in_viewport(
        &self,
        world: WorldId,
        viewport: Viewport,
    ) -> Result<Vec<Arc<EnvChunk>>, EnvironmentError> {
        viewport.validate()?;
        let layout = self.config_for(world).await?;
        let Some(clipped) = viewport.clamp_to(&layout) else {
            return Ok(Vec::new());
        };

        let size = layout.chunk_size;
        let lo = ChunkPos::from_cell(clipped.min, size).0;
        let hi = ChunkPos::from_cell(clipped.max, size).0;
        let mut found = Vec::new();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    found.push(self.chunk_at(world, ChunkPos::new(x, y, z), size).await);
                }
            }
        }
        Ok(found)
    }

    /// Marks every cached chunk of `world` dirty. Returns how many were marked.
    pub fn invalidate_world(&self, world: WorldId) -> usize {
        let mut marked = 0;
        self.chunks.iter_sync(|key, chunk| {
            if key.world == world {
                chunk.mark_dirty();
                marked += 1;
            }
            true
        });
        log::debug!("Invalidated {marked} chunks of world {world}");
        marked
    }

    /// Drops every chunk and every memoized world layout.
    pub fn clear_cache(&self) {
        self.chunks.clear_sync();
        self.worlds.clear();
        log::info!("Chunk cache cleared");
    }

    /// Number of live chunks.
    #[must_use]
    pub fn cached_chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
