//! The environment service handle.
//!
//! One [`Environment`] is built at startup and shared (behind an `Arc`) with
//! the scheduler and the read paths. It owns the clock, the temperature model
//! and the chunk cache; storage is reached only through the repository ports.

use std::sync::Arc;

use strata_utils::{CellPos, WorldId, math::Vector3};

use crate::{
    celestial::{CelestialClock, CelestialState},
    chunk::ChunkCache,
    config::EnvironmentConfig,
    error::{EnvironmentError, ValidationError},
    store::{ParticleRepository, WorldConfigRepository, WorldConfigs},
    temperature::{AmbientSampler, TemperatureModel},
    ticks::ThermalSweep,
};

/// Clock, temperature model and chunk cache for every world.
pub struct Environment {
    config: EnvironmentConfig,
    clock: Arc<CelestialClock>,
    model: Arc<TemperatureModel>,
    chunks: Arc<ChunkCache>,
    thermal_sweep: Arc<ThermalSweep>,
}

impl Environment {
    /// Builds the environment over the two repository ports.
    pub fn new(
        config: EnvironmentConfig,
        particles: Arc<dyn ParticleRepository>,
        world_configs: Arc<dyn WorldConfigRepository>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;

        let clock = Arc::new(CelestialClock::from_config(&config));
        let worlds = Arc::new(WorldConfigs::new(world_configs, config.chunk_size));
        let model = Arc::new(TemperatureModel::new(
            &config,
            clock.clone(),
            particles.clone(),
            worlds.clone(),
        ));
        let chunks = Arc::new(ChunkCache::new(worlds, model.clone()));
        let thermal_sweep = Arc::new(ThermalSweep::new(
            particles,
            model.clone(),
            config.min_thermal_inertia,
        ));

        log::info!(
            "Environment ready: time scale x{}, world radius {}m, chunk size {}",
            config.time_scale,
            config.world_radius,
            config.chunk_size
        );
        Ok(Self {
            config,
            clock,
            model,
            chunks,
            thermal_sweep,
        })
    }

    /// Builds the environment over one store implementing both ports.
    pub fn from_store<S>(config: EnvironmentConfig, store: Arc<S>) -> Result<Self, ValidationError>
    where
        S: ParticleRepository + WorldConfigRepository + 'static,
    {
        Self::new(config, store.clone(), store)
    }

    /// Snapshot of the sun, the moon and the time of day.
    #[must_use]
    pub fn celestial_state(&self) -> CelestialState {
        self.clock.state()
    }

    /// Ambient temperature at a point of the world identified by `world_id`.
    ///
    /// `world_id` must be a uuid and the coordinates finite; both are checked
    /// before any lookup.
    pub async fn temperature_at(
        &self,
        world_id: &str,
        x: f64,
        y: f64,
        z: f64,
        surface_material: Option<&str>,
    ) -> Result<f64, EnvironmentError> {
        let world: WorldId = world_id
            .parse()
            .map_err(|_| ValidationError::InvalidWorldId(world_id.to_owned()))?;
        let point = Vector3::new(x, y, z);
        if !point.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate.into());
        }
        self.model
            .ambient_temperature(world, point, surface_material)
            .await
    }

    /// The memoized temperature of the chunk containing `cell`.
    pub async fn chunk_temperature_at(
        &self,
        world: WorldId,
        cell: CellPos,
    ) -> Result<f64, EnvironmentError> {
        self.chunks.chunk_for(world, cell).await?.temperature().await
    }

    /// The configuration this environment was built from.
    #[must_use]
    pub const fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// The game clock.
    #[must_use]
    pub const fn clock(&self) -> &Arc<CelestialClock> {
        &self.clock
    }

    /// The temperature model.
    #[must_use]
    pub const fn model(&self) -> &Arc<TemperatureModel> {
        &self.model
    }

    /// The chunk cache.
    #[must_use]
    pub const fn chunks(&self) -> &Arc<ChunkCache> {
        &self.chunks
    }

    /// The thermal sweep the scheduler runs.
    #[must_use]
    pub const fn thermal_sweep(&self) -> &Arc<ThermalSweep> {
        &self.thermal_sweep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RamOnlyStore, WorldConfig};

    fn environment() -> (Environment, WorldId) {
        let store = Arc::new(RamOnlyStore::new());
        let world = WorldId::new_random();
        store.insert_world(
            world,
            WorldConfig {
                chunk_size: Some(40),
                width_meters: 1000.0,
                height_meters: 1000.0,
                min_z: 0,
                max_z: 200,
                cell_size_meters: 1.0,
            },
        );
        let env = Environment::from_store(EnvironmentConfig::default(), store).expect("valid");
        (env, world)
    }

    #[tokio::test]
    async fn test_temperature_at_validates_world_id() {
        let (env, _) = environment();
        let err = env
            .temperature_at("not-a-uuid", 0.0, 0.0, 0.0, None)
            .await
            .expect_err("malformed id");
        assert!(matches!(
            err,
            EnvironmentError::Validation(ValidationError::InvalidWorldId(ref id)) if id == "not-a-uuid"
        ));

        let err = env
            .temperature_at(&WorldId::new_random().to_string(), 0.0, 0.0, 0.0, None)
            .await
            .expect_err("unknown world");
        assert!(matches!(err, EnvironmentError::WorldNotFound(_)));
    }

    #[tokio::test]
    async fn test_temperature_at_rejects_non_finite() {
        let (env, world) = environment();
        let err = env
            .temperature_at(&world.to_string(), f64::INFINITY, 0.0, 0.0, None)
            .await
            .expect_err("infinite");
        assert!(matches!(
            err,
            EnvironmentError::Validation(ValidationError::NonFiniteCoordinate)
        ));
    }

    #[tokio::test]
    async fn test_temperature_at_known_world() {
        let (env, world) = environment();
        // Equator at noon, sea level, default albedo: 30 + 15 + 6.
        let t = env
            .temperature_at(&world.to_string(), 500.0, 0.0, 0.0, None)
            .await
            .expect("known world");
        assert!((t - 51.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_chunk_temperature_is_memoized() {
        let (env, world) = environment();
        let first = env
            .chunk_temperature_at(world, CellPos::new(5, 5, 5))
            .await
            .expect("known world");
        env.clock().advance(3_600.0);
        let second = env
            .chunk_temperature_at(world, CellPos::new(30, 1, 39))
            .await
            .expect("known world");
        assert!((first - second).abs() < f64::EPSILON);
        assert_eq!(env.chunks().cached_chunk_count(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EnvironmentConfig {
            time_scale: -1.0,
            ..EnvironmentConfig::default()
        };
        assert!(Environment::from_store(config, Arc::new(RamOnlyStore::new())).is_err());
    }

    #[test]
    fn test_celestial_state_at_start() {
        let (env, _) = environment();
        let state = env.celestial_state();
        assert!(state.game_seconds.abs() < f64::EPSILON);
        assert!((state.current_hour - 12.0).abs() < 1e-9);
        assert!(state.is_daytime);
    }
}
