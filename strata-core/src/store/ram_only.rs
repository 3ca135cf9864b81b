//! RAM-only store.
//!
//! Implements both repository ports on in-memory maps. Nothing is persisted.
//! Useful for:
//! - Tests
//! - Demo worlds seeded from a file at startup
//!
//! The store can be switched to [`StoreStatus::Unavailable`] or
//! [`StoreStatus::Closing`] to exercise the failure paths of its callers.

use async_trait::async_trait;
use crossbeam::atomic::AtomicCell;
use rustc_hash::FxHashSet;
use scc::hash_map::Entry;
use strata_utils::{CellPos, ParticleId, WorldId};

use super::{
    DEFAULT_PARTICLE_TEMPERATURE, MaterialType, NearbyParticle, ParticleRepository, StoreError,
    ThermalParticle, WorldConfig, WorldConfigRepository,
};

/// Simulated backend condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreStatus {
    /// Every call succeeds.
    #[default]
    Online,
    /// Every call fails with [`StoreError::Unavailable`].
    Unavailable,
    /// Every call fails with [`StoreError::Closing`].
    Closing,
}

/// A particle as the RAM store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredParticle {
    /// Particle id.
    pub id: ParticleId,
    /// Owning world.
    pub world: WorldId,
    /// Cell the particle occupies.
    pub position: CellPos,
    /// Lowercase material name.
    pub material: String,
    /// Current temperature, if known.
    pub temperature: Option<f64>,
    /// Extracted particles are ignored by every query.
    pub extracted: bool,
}

/// In-memory implementation of [`ParticleRepository`] and [`WorldConfigRepository`].
#[derive(Default)]
pub struct RamOnlyStore {
    worlds: scc::HashMap<WorldId, WorldConfig>,
    materials: scc::HashMap<String, MaterialType>,
    particles: scc::HashMap<ParticleId, StoredParticle>,
    status: AtomicCell<StoreStatus>,
}

impl RamOnlyStore {
    /// Creates an empty, online store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the simulated backend condition.
    pub fn set_status(&self, status: StoreStatus) {
        let previous = self.status.swap(status);
        if previous != status {
            log::debug!("RAM store status {previous:?} -> {status:?}");
        }
    }

    /// Current simulated backend condition.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.status.load()
    }

    /// Adds or replaces a world.
    pub fn insert_world(&self, world: WorldId, config: WorldConfig) {
        match self.worlds.entry_sync(world) {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() = config;
            }
            Entry::Vacant(vacant) => {
                vacant.insert_entry(config);
            }
        }
    }

    /// Adds or replaces a material. The name is stored lowercase.
    pub fn insert_material(&self, mut material: MaterialType) {
        material.name = material.name.trim().to_lowercase();
        match self.materials.entry_sync(material.name.clone()) {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() = material;
            }
            Entry::Vacant(vacant) => {
                vacant.insert_entry(material);
            }
        }
    }

    /// Adds or replaces a particle. The material name is stored lowercase.
    pub fn insert_particle(&self, mut particle: StoredParticle) {
        particle.material = particle.material.trim().to_lowercase();
        match self.particles.entry_sync(particle.id) {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() = particle;
            }
            Entry::Vacant(vacant) => {
                vacant.insert_entry(particle);
            }
        }
    }

    /// Marks a particle as extracted (or back). Returns whether it exists.
    pub fn set_extracted(&self, id: ParticleId, extracted: bool) -> bool {
        self.particles
            .update_sync(&id, |_, particle| particle.extracted = extracted)
            .is_some()
    }

    /// A copy of one stored particle.
    #[must_use]
    pub fn particle(&self, id: ParticleId) -> Option<StoredParticle> {
        self.particles.read_sync(&id, |_, particle| particle.clone())
    }

    /// Number of stored particles, extracted ones included.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.status.load() {
            StoreStatus::Online => Ok(()),
            StoreStatus::Unavailable => Err(StoreError::Unavailable(
                "RAM store marked unavailable".to_owned(),
            )),
            StoreStatus::Closing => Err(StoreError::Closing),
        }
    }

    fn inertia_of(&self, material: &str) -> Option<f64> {
        self.materials
            .read_sync(material, |_, material| material.thermal_inertia)
    }
}

#[async_trait]
impl ParticleRepository for RamOnlyStore {
    async fn particles_near(
        &self,
        world: WorldId,
        center: CellPos,
        radius: u32,
    ) -> Result<Vec<NearbyParticle>, StoreError> {
        self.check()?;
        let radius_sq = i128::from(radius) * i128::from(radius);
        let distance_sq = |cell: CellPos| {
            let axis = |a: i32, b: i32| (i128::from(a) - i128::from(b)).pow(2);
            axis(cell.0.x, center.0.x) + axis(cell.0.y, center.0.y) + axis(cell.0.z, center.0.z)
        };

        let mut found = Vec::new();
        self.particles.iter_sync(|_, particle| {
            if particle.world == world
                && !particle.extracted
                && distance_sq(particle.position) <= radius_sq
            {
                found.push(NearbyParticle {
                    position: particle.position,
                    material_name: particle.material.clone(),
                    temperature: particle.temperature,
                });
            }
            true
        });
        found.sort_by_key(|particle| distance_sq(particle.position));
        Ok(found)
    }

    async fn material_by_name(&self, name: &str) -> Result<Option<MaterialType>, StoreError> {
        self.check()?;
        let name = name.trim().to_lowercase();
        Ok(self.materials.read_sync(&name, |_, material| material.clone()))
    }

    async fn particles_with_thermal_inertia(
        &self,
        world: WorldId,
        min_inertia: f64,
    ) -> Result<Vec<ThermalParticle>, StoreError> {
        self.check()?;
        let mut found = Vec::new();
        self.particles.iter_sync(|_, particle| {
            if particle.world == world
                && !particle.extracted
                && let Some(inertia) = self.inertia_of(&particle.material)
                && inertia > min_inertia
            {
                found.push(ThermalParticle {
                    id: particle.id,
                    position: particle.position,
                    temperature: particle.temperature.unwrap_or(DEFAULT_PARTICLE_TEMPERATURE),
                    thermal_inertia: inertia,
                });
            }
            true
        });
        found.sort_by_key(|particle| particle.id);
        Ok(found)
    }

    async fn update_particle_temperature(
        &self,
        id: ParticleId,
        temperature: f64,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.particles
            .update_async(&id, |_, particle| particle.temperature = Some(temperature))
            .await
            .ok_or_else(|| StoreError::Backend(format!("particle {id} does not exist")))
    }

    async fn world_ids_with_particles(&self) -> Result<Vec<WorldId>, StoreError> {
        self.check()?;
        let mut worlds = FxHashSet::default();
        self.particles.iter_sync(|_, particle| {
            if !particle.extracted {
                worlds.insert(particle.world);
            }
            true
        });
        let mut worlds: Vec<_> = worlds.into_iter().collect();
        worlds.sort();
        Ok(worlds)
    }
}

#[async_trait]
impl WorldConfigRepository for RamOnlyStore {
    async fn world_config(&self, world: WorldId) -> Result<Option<WorldConfig>, StoreError> {
        self.check()?;
        Ok(self.worlds.read_async(&world, |_, config| config.clone()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PhysicalState;

    fn material(name: &str, inertia: f64) -> MaterialType {
        MaterialType {
            name: name.to_owned(),
            albedo: None,
            thermal_conductivity: 1.0,
            thermal_inertia: inertia,
            physical_state: PhysicalState::Solid,
        }
    }

    fn particle(world: WorldId, pos: CellPos, material: &str) -> StoredParticle {
        StoredParticle {
            id: ParticleId::new_random(),
            world,
            position: pos,
            material: material.to_owned(),
            temperature: Some(15.0),
            extracted: false,
        }
    }

    #[tokio::test]
    async fn test_particles_near_is_spherical() {
        let store = RamOnlyStore::new();
        let world = WorldId::new_random();
        store.insert_particle(particle(world, CellPos::new(3, 4, 0), "water"));
        store.insert_particle(particle(world, CellPos::new(4, 4, 0), "water"));
        store.insert_particle(particle(WorldId::new_random(), CellPos::new(0, 0, 0), "water"));
        let mut extracted = particle(world, CellPos::new(1, 0, 0), "ice");
        extracted.extracted = true;
        store.insert_particle(extracted);

        let near = store
            .particles_near(world, CellPos::new(0, 0, 0), 5)
            .await
            .expect("online");
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].position, CellPos::new(3, 4, 0));
    }

    #[tokio::test]
    async fn test_material_lookup_ignores_case() {
        let store = RamOnlyStore::new();
        store.insert_material(material("Water", 4.0));
        let found = store.material_by_name("WATER").await.expect("online");
        assert_eq!(found.map(|m| m.name), Some("water".to_owned()));
        assert!(store.material_by_name("lava").await.expect("online").is_none());
    }

    #[tokio::test]
    async fn test_thermal_inertia_filter_is_strict() {
        let store = RamOnlyStore::new();
        let world = WorldId::new_random();
        store.insert_material(material("stone", 0.1));
        store.insert_material(material("water", 4.0));
        store.insert_particle(particle(world, CellPos::new(0, 0, 0), "stone"));
        let water = particle(world, CellPos::new(1, 0, 0), "water");
        let water_id = water.id;
        store.insert_particle(water);

        let found = store
            .particles_with_thermal_inertia(world, 0.1)
            .await
            .expect("online");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, water_id);
    }

    #[tokio::test]
    async fn test_status_toggles() {
        let store = RamOnlyStore::new();
        store.set_status(StoreStatus::Unavailable);
        assert!(matches!(
            store.world_ids_with_particles().await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_status(StoreStatus::Closing);
        assert_eq!(
            store.world_config(WorldId::new_random()).await,
            Err(StoreError::Closing)
        );
        store.set_status(StoreStatus::Online);
        assert!(store.world_ids_with_particles().await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_particle_fails() {
        let store = RamOnlyStore::new();
        let err = store
            .update_particle_temperature(ParticleId::new_random(), 10.0)
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
