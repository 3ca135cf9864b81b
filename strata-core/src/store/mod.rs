//! Ports to the particle and world stores.
//!
//! The core only talks to storage through [`ParticleRepository`] and
//! [`WorldConfigRepository`]. Adapters turn their driver's failures into a
//! [`StoreError`] so callers can tell a draining pool from a real fault
//! without looking at error text.

mod ram_only;
mod world_configs;

use async_trait::async_trait;
use serde::Deserialize;
use strata_utils::{CellPos, ParticleId, WorldId};
use thiserror::Error;

pub use ram_only::{RamOnlyStore, StoreStatus, StoredParticle};
pub use world_configs::{WorldBounds, WorldConfigs, WorldLayout};

/// Temperature assumed for a particle whose stored temperature is missing.
pub const DEFAULT_PARTICLE_TEMPERATURE: f64 = 20.0;

/// Failure reported by a store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store is shutting down (connection pool draining).
    #[error("store is closing")]
    Closing,
    /// The store is temporarily unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Unexpected failure inside the adapter.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this is the shutdown signal.
    #[must_use]
    pub const fn is_closing(&self) -> bool {
        matches!(self, Self::Closing)
    }

    /// Whether the condition is expected to clear by itself (closing or unreachable).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Closing | Self::Unavailable(_))
    }
}

/// Physical state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalState {
    /// Rigid matter.
    #[default]
    Solid,
    /// Flowing matter.
    Liquid,
    /// Gas.
    Gas,
    /// Plasma.
    Plasma,
}

/// Thermal and optical properties of a particle material.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaterialType {
    /// Lowercase material name.
    pub name: String,
    /// Reflectivity in `[0, 1]`, when known.
    #[serde(default)]
    pub albedo: Option<f64>,
    /// How strongly the material pulls its surroundings to its own temperature.
    #[serde(default = "default_conductivity")]
    pub thermal_conductivity: f64,
    /// How slowly the material follows the ambient temperature. `<= 0` never changes.
    #[serde(default)]
    pub thermal_inertia: f64,
    /// Physical state.
    #[serde(default)]
    pub physical_state: PhysicalState,
}

const fn default_conductivity() -> f64 {
    1.0
}

/// A particle returned by a neighborhood query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyParticle {
    /// Cell the particle occupies.
    pub position: CellPos,
    /// Lowercase material name.
    pub material_name: String,
    /// Stored temperature, if any.
    pub temperature: Option<f64>,
}

impl NearbyParticle {
    /// Stored temperature, or [`DEFAULT_PARTICLE_TEMPERATURE`] when missing.
    #[must_use]
    pub fn temperature_or_default(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_PARTICLE_TEMPERATURE)
    }
}

/// A particle eligible for thermal relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalParticle {
    /// Particle id.
    pub id: ParticleId,
    /// Cell the particle occupies.
    pub position: CellPos,
    /// Current temperature.
    pub temperature: f64,
    /// Thermal inertia of the particle's material.
    pub thermal_inertia: f64,
}

/// Per-world configuration as stored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Chunk edge length in cells, if the world overrides the default.
    #[serde(default)]
    pub chunk_size: Option<u32>,
    /// World width in meters.
    pub width_meters: f64,
    /// World depth in meters.
    pub height_meters: f64,
    /// Lowest cell layer.
    pub min_z: i32,
    /// Highest cell layer.
    pub max_z: i32,
    /// Edge length of one cell in meters.
    pub cell_size_meters: f64,
}

/// Read and write access to particles and materials.
#[async_trait]
pub trait ParticleRepository: Send + Sync {
    /// Non-extracted particles within `radius` cells (euclidean, inclusive) of `center`.
    async fn particles_near(
        &self,
        world: WorldId,
        center: CellPos,
        radius: u32,
    ) -> Result<Vec<NearbyParticle>, StoreError>;

    /// Looks a material up by name, ignoring case.
    async fn material_by_name(&self, name: &str) -> Result<Option<MaterialType>, StoreError>;

    /// Non-extracted particles of `world` whose material inertia is strictly above `min_inertia`.
    async fn particles_with_thermal_inertia(
        &self,
        world: WorldId,
        min_inertia: f64,
    ) -> Result<Vec<ThermalParticle>, StoreError>;

    /// Overwrites one particle's temperature.
    async fn update_particle_temperature(
        &self,
        id: ParticleId,
        temperature: f64,
    ) -> Result<(), StoreError>;

    /// Worlds that currently hold at least one non-extracted particle.
    async fn world_ids_with_particles(&self) -> Result<Vec<WorldId>, StoreError>;
}

/// Read access to world configuration.
#[async_trait]
pub trait WorldConfigRepository: Send + Sync {
    /// The configuration of `world`, or `None` if it does not exist.
    async fn world_config(&self, world: WorldId) -> Result<Option<WorldConfig>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classes() {
        assert!(StoreError::Closing.is_closing());
        assert!(StoreError::Closing.is_transient());
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(!StoreError::Unavailable("down".into()).is_closing());
        assert!(!StoreError::Backend("boom".into()).is_transient());
    }

    #[test]
    fn test_nearby_temperature_default() {
        let particle = NearbyParticle {
            position: CellPos::new(0, 0, 0),
            material_name: "water".into(),
            temperature: None,
        };
        assert!((particle.temperature_or_default() - 20.0).abs() < f64::EPSILON);
    }
}
