//! Ambient temperature model.
//!
//! The ambient temperature at a point is the sum of four independent terms,
//! clamped to [`MIN_AMBIENT`]..=[`MAX_AMBIENT`]:
//!
//! 1. Latitude plus the day/night swing from the sun's intensity.
//! 2. Altitude lapse rate.
//! 3. Surface albedo.
//! 4. Pull toward nearby thermal bodies (water, ice), weighted by distance and
//!    the body's conductivity.

pub mod relaxation;

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_utils::{CellPos, WorldId, math::Vector3};

use crate::{
    celestial::CelestialClock,
    config::EnvironmentConfig,
    error::{EnvironmentError, ValidationError},
    store::{ParticleRepository, StoreError, WorldConfigs},
};

/// Lowest ambient temperature the model reports.
pub const MIN_AMBIENT: f64 = -50.0;
/// Highest ambient temperature the model reports.
pub const MAX_AMBIENT: f64 = 60.0;
/// Albedo used when the surface is unknown or has none.
pub const DEFAULT_ALBEDO: f64 = 0.2;
/// Thermal bodies farther than this (cells) have no effect.
pub const PROXIMITY_CUTOFF: f64 = 5.0;
/// Conductivity used when a thermal body's material is not found.
pub const DEFAULT_CONDUCTIVITY: f64 = 1.0;

const POLE_TEMPERATURE: f64 = -20.0;
const EQUATOR_TEMPERATURE: f64 = 30.0;
const FAR_POLE_TEMPERATURE: f64 = -40.0;
const LAPSE_RATE_PER_KM: f64 = -6.5;

/// Anything that can produce the ambient temperature at a point.
///
/// [`TemperatureModel`] is the real implementation; chunks only depend on this
/// trait so tests can count or script the samples.
#[async_trait]
pub trait AmbientSampler: Send + Sync {
    /// Ambient temperature in °C at `point` (cell coordinates, `z` up).
    async fn ambient_temperature(
        &self,
        world: WorldId,
        point: Vector3<f64>,
        surface_material: Option<&str>,
    ) -> Result<f64, EnvironmentError>;
}

/// Latitude term for a point `radius` cells from the world center.
///
/// Piecewise linear: -20 °C at the center, 30 °C at half the world radius and
/// -40 °C at the rim. Points past the rim keep cooling along the outer slope.
#[must_use]
pub fn latitude_temperature(radius: f64, world_radius: f64) -> f64 {
    let equator = world_radius * 0.5;
    if radius <= equator {
        let factor = if equator > 0.0 { radius / equator } else { 0.0 };
        POLE_TEMPERATURE + factor * (EQUATOR_TEMPERATURE - POLE_TEMPERATURE)
    } else {
        let span = world_radius - equator;
        let factor = if span > 0.0 {
            (radius - equator) / span
        } else {
            0.0
        };
        EQUATOR_TEMPERATURE - factor * (EQUATOR_TEMPERATURE - FAR_POLE_TEMPERATURE)
    }
}

/// Day/night swing: -10 °C with no sun up to +15 °C under a zenith sun.
#[must_use]
pub fn day_night_adjustment(sun_intensity: f64) -> f64 {
    sun_intensity * 25.0 - 10.0
}

/// Altitude term: -6.5 °C per 1000 cells of height.
#[must_use]
pub fn altitude_modifier(z: f64) -> f64 {
    LAPSE_RATE_PER_KM * (z / 1000.0)
}

/// Albedo term: reflective surfaces cool, dark surfaces warm.
#[must_use]
pub fn albedo_modifier(albedo: f64) -> f64 {
    (0.5 - albedo) * 20.0
}

/// Weight of a thermal body `distance` cells away with the given conductivity.
///
/// Inverse-square falloff, scaled linearly to zero at [`PROXIMITY_CUTOFF`].
#[must_use]
pub fn proximity_weight(distance: f64, conductivity: f64) -> f64 {
    let falloff = 1.0 / (1.0 + distance * distance);
    let proximity = (1.0 - distance / PROXIMITY_CUTOFF).max(0.0);
    falloff * conductivity * proximity
}

/// The ambient temperature model over a clock and the particle store.
pub struct TemperatureModel {
    clock: Arc<CelestialClock>,
    particles: Arc<dyn ParticleRepository>,
    worlds: Arc<WorldConfigs>,
    world_radius: f64,
    search_radius: u32,
    thermal_materials: FxHashSet<String>,
}

impl TemperatureModel {
    /// Creates a model reading from the given clock and stores.
    #[must_use]
    pub fn new(
        config: &EnvironmentConfig,
        clock: Arc<CelestialClock>,
        particles: Arc<dyn ParticleRepository>,
        worlds: Arc<WorldConfigs>,
    ) -> Self {
        Self {
            clock,
            particles,
            worlds,
            world_radius: config.world_radius,
            search_radius: config.thermal_search_radius,
            thermal_materials: config
                .thermal_materials
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
        }
    }

    /// The clock this model reads.
    #[must_use]
    pub fn clock(&self) -> &Arc<CelestialClock> {
        &self.clock
    }

    async fn surface_albedo(&self, surface_material: Option<&str>) -> Result<f64, StoreError> {
        let Some(name) = surface_material else {
            return Ok(DEFAULT_ALBEDO);
        };
        let albedo = self
            .particles
            .material_by_name(name)
            .await?
            .and_then(|material| material.albedo)
            .unwrap_or(DEFAULT_ALBEDO);
        Ok(albedo)
    }

    async fn thermal_body_modifier(
        &self,
        world: WorldId,
        point: Vector3<f64>,
        running_ambient: f64,
    ) -> Result<f64, StoreError> {
        let nearby = self
            .particles
            .particles_near(world, CellPos::containing(point), self.search_radius)
            .await?;

        let mut conductivities: FxHashMap<String, f64> = FxHashMap::default();
        let mut total = 0.0;
        for particle in nearby {
            let material = particle.material_name.to_lowercase();
            if !self.thermal_materials.contains(&material) {
                continue;
            }
            let distance = point.distance(particle.position.as_f64());
            if distance >= PROXIMITY_CUTOFF {
                continue;
            }

            let conductivity = match conductivities.get(&material) {
                Some(conductivity) => *conductivity,
                None => {
                    let conductivity = self
                        .particles
                        .material_by_name(&material)
                        .await?
                        .map_or(DEFAULT_CONDUCTIVITY, |m| m.thermal_conductivity);
                    conductivities.insert(material, conductivity);
                    conductivity
                }
            };

            let difference = particle.temperature_or_default() - running_ambient;
            total += difference * proximity_weight(distance, conductivity);
        }
        Ok(total)
    }
}

#[async_trait]
impl AmbientSampler for TemperatureModel {
    async fn ambient_temperature(
        &self,
        world: WorldId,
        point: Vector3<f64>,
        surface_material: Option<&str>,
    ) -> Result<f64, EnvironmentError> {
        if !point.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate.into());
        }
        self.worlds.resolve(world).await?;

        let intensity = self.clock.sun_intensity_at(point.x, point.y);
        let latitude = latitude_temperature(point.horizontal_length(), self.world_radius)
            + day_night_adjustment(intensity);
        let altitude = altitude_modifier(point.z);
        let albedo = albedo_modifier(self.surface_albedo(surface_material).await?);

        let running = latitude + altitude + albedo;
        let thermal = self.thermal_body_modifier(world, point, running).await?;

        Ok((running + thermal).clamp(MIN_AMBIENT, MAX_AMBIENT))
    }
}
