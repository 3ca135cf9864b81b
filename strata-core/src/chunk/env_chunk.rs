use std::{sync::Arc, time::Instant};

use rustc_hash::FxHashSet;
use strata_utils::{
    ChunkPos, ParticleId, WorldId,
    locks::{AsyncMutex, SyncMutex},
    math::Vector3,
};
use uuid::Uuid;

use crate::{error::EnvironmentError, temperature::AmbientSampler};

/// Identifies a chunk: its world and its chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    /// Owning world.
    pub world: WorldId,
    /// Chunk coordinates.
    pub pos: ChunkPos,
}

impl ChunkKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(world: WorldId, pos: ChunkPos) -> Self {
        Self { world, pos }
    }
}

#[derive(Debug)]
struct ChunkState {
    cached_temperature: Option<f64>,
    last_computed_at: Option<Instant>,
    dirty: bool,
    /// Bumped on every membership change, so a computation that raced a change
    /// does not clear the dirty flag the change set.
    generation: u64,
    particles: FxHashSet<ParticleId>,
    occupants: FxHashSet<Uuid>,
}

impl ChunkState {
    fn touch(&mut self) {
        self.dirty = true;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// A cubic region of one world with a memoized ambient temperature.
///
/// The temperature is computed at the chunk center the first time it is asked
/// for and whenever the chunk is dirty. Adding or removing a particle dirties
/// the chunk; occupants (characters) do not.
pub struct EnvChunk {
    key: ChunkKey,
    chunk_size: i32,
    sampler: Arc<dyn AmbientSampler>,
    state: SyncMutex<ChunkState>,
    refresh: AsyncMutex<()>,
}

impl EnvChunk {
    /// Creates a dirty, empty chunk.
    #[must_use]
    pub fn new(key: ChunkKey, chunk_size: i32, sampler: Arc<dyn AmbientSampler>) -> Self {
        Self {
            key,
            chunk_size,
            sampler,
            state: SyncMutex::new(ChunkState {
                cached_temperature: None,
                last_computed_at: None,
                dirty: true,
                generation: 0,
                particles: FxHashSet::default(),
                occupants: FxHashSet::default(),
            }),
            refresh: AsyncMutex::new(()),
        }
    }

    /// This chunk's key.
    #[must_use]
    pub const fn key(&self) -> ChunkKey {
        self.key
    }

    /// Owning world.
    #[must_use]
    pub const fn world(&self) -> WorldId {
        self.key.world
    }

    /// Chunk coordinates.
    #[must_use]
    pub const fn pos(&self) -> ChunkPos {
        self.key.pos
    }

    /// Edge length in cells.
    #[must_use]
    pub const fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Center of the chunk in cell coordinates.
    #[must_use]
    pub fn center(&self) -> Vector3<f64> {
        self.key.pos.center(self.chunk_size)
    }

    /// The ambient temperature at the chunk center.
    ///
    /// Returns the cached value while the chunk is clean; otherwise samples the
    /// model, stores the result and clears the dirty flag. Concurrent callers
    /// on a dirty chunk share a single sample.
    pub async fn temperature(&self) -> Result<f64, EnvironmentError> {
        if let Some(cached) = self.clean_temperature() {
            return Ok(cached);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(cached) = self.clean_temperature() {
            return Ok(cached);
        }

        let generation = self.state.lock().generation;
        let temperature = self
            .sampler
            .ambient_temperature(self.key.world, self.center(), None)
            .await?;

        let mut state = self.state.lock();
        state.cached_temperature = Some(temperature);
        state.last_computed_at = Some(Instant::now());
        if state.generation == generation {
            state.dirty = false;
        }
        Ok(temperature)
    }

    fn clean_temperature(&self) -> Option<f64> {
        let state = self.state.lock();
        if state.dirty {
            None
        } else {
            state.cached_temperature
        }
    }

    /// Last computed temperature, whether or not it is still valid.
    #[must_use]
    pub fn cached_temperature(&self) -> Option<f64> {
        self.state.lock().cached_temperature
    }

    /// When the temperature was last computed.
    #[must_use]
    pub fn last_computed_at(&self) -> Option<Instant> {
        self.state.lock().last_computed_at
    }

    /// Whether the cached temperature must be recomputed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Forces the next [`Self::temperature`] call to recompute.
    pub fn mark_dirty(&self) {
        self.state.lock().touch();
    }

    /// Adds a particle. Returns whether it was new. Always dirties the chunk.
    pub fn add_particle(&self, id: ParticleId) -> bool {
        let mut state = self.state.lock();
        state.touch();
        state.particles.insert(id)
    }

    /// Removes a particle. Returns whether it was present. Always dirties the chunk.
    pub fn remove_particle(&self, id: ParticleId) -> bool {
        let mut state = self.state.lock();
        state.touch();
        state.particles.remove(&id)
    }

    /// Adds an occupant. Does not dirty the chunk.
    pub fn add_occupant(&self, id: Uuid) -> bool {
        self.state.lock().occupants.insert(id)
    }

    /// Removes an occupant. Does not dirty the chunk.
    pub fn remove_occupant(&self, id: Uuid) -> bool {
        self.state.lock().occupants.remove(&id)
    }

    /// Snapshot of the member particles.
    #[must_use]
    pub fn particles(&self) -> Vec<ParticleId> {
        self.state.lock().particles.iter().copied().collect()
    }

    /// Snapshot of the occupants.
    #[must_use]
    pub fn occupants(&self) -> Vec<Uuid> {
        self.state.lock().occupants.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Returns the number of calls made so far, so every sample is distinct.
    #[derive(Default)]
    struct CountingSampler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AmbientSampler for CountingSampler {
        async fn ambient_temperature(
            &self,
            _world: WorldId,
            _point: Vector3<f64>,
            _surface_material: Option<&str>,
        ) -> Result<f64, EnvironmentError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(call as f64)
        }
    }

    fn chunk() -> (Arc<CountingSampler>, EnvChunk) {
        let sampler = Arc::new(CountingSampler::default());
        let key = ChunkKey::new(WorldId::new_random(), ChunkPos::new(1, 0, -1));
        (sampler.clone(), EnvChunk::new(key, 40, sampler))
    }

    #[tokio::test]
    async fn test_clean_chunk_is_not_resampled() {
        let (sampler, chunk) = chunk();
        assert!(chunk.is_dirty());
        let first = chunk.temperature().await.expect("sample");
        let second = chunk.temperature().await.expect("sample");
        assert!((first - second).abs() < f64::EPSILON);
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 1);
        assert!(!chunk.is_dirty());
        assert!(chunk.last_computed_at().is_some());
    }

    #[tokio::test]
    async fn test_membership_change_dirties() {
        let (sampler, chunk) = chunk();
        chunk.temperature().await.expect("sample");

        let particle = ParticleId::new_random();
        assert!(chunk.add_particle(particle));
        assert!(chunk.is_dirty());
        assert!((chunk.temperature().await.expect("sample") - 2.0).abs() < f64::EPSILON);

        assert!(chunk.remove_particle(particle));
        assert!(chunk.is_dirty());
        chunk.temperature().await.expect("sample");
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 3);
        assert!(chunk.particles().is_empty());
    }

    #[tokio::test]
    async fn test_occupants_do_not_dirty() {
        let (sampler, chunk) = chunk();
        chunk.temperature().await.expect("sample");

        let character = Uuid::new_v4();
        assert!(chunk.add_occupant(character));
        assert!(!chunk.add_occupant(character));
        assert!(!chunk.is_dirty());
        assert_eq!(chunk.occupants(), vec![character]);
        assert!(chunk.remove_occupant(character));
        chunk.temperature().await.expect("sample");
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_center() {
        let (_, chunk) = chunk();
        assert_eq!(chunk.center(), Vector3::new(60.0, 20.0, -20.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_samples_once() {
        let (sampler, chunk) = chunk();
        let chunk = Arc::new(chunk);
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let chunk = chunk.clone();
                tokio::spawn(async move { chunk.temperature().await })
            })
            .collect();
        for task in tasks {
            let temperature = task.await.expect("join").expect("sample");
            assert!((temperature - 1.0).abs() < f64::EPSILON);
        }
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 1);
    }
}
