//! One pass of particle thermal relaxation over every world.

use std::sync::Arc;

use strata_utils::WorldId;
use tokio_util::sync::CancellationToken;

use crate::{
    error::EnvironmentError,
    store::{ParticleRepository, StoreError, ThermalParticle},
    temperature::{AmbientSampler, relaxation::relax},
};

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Worlds whose particles were listed.
    pub worlds: usize,
    /// Particles whose temperature was written.
    pub updated: usize,
    /// Particles already at their relaxed temperature.
    pub unchanged: usize,
    /// Particles (or worlds) skipped because of an unexpected error.
    pub failed: usize,
}

/// Relaxes every eligible particle once toward its ambient temperature.
///
/// A pass is best effort: an unexpected failure on one particle is counted and
/// skipped, while a transient store failure aborts the pass so the next
/// interval can retry.
pub struct ThermalSweep {
    particles: Arc<dyn ParticleRepository>,
    sampler: Arc<dyn AmbientSampler>,
    min_inertia: f64,
}

impl ThermalSweep {
    /// Creates a sweep over `particles` sampling ambient temperatures from `sampler`.
    #[must_use]
    pub fn new(
        particles: Arc<dyn ParticleRepository>,
        sampler: Arc<dyn AmbientSampler>,
        min_inertia: f64,
    ) -> Self {
        Self {
            particles,
            sampler,
            min_inertia,
        }
    }

    /// Runs one pass. Stops early, with a partial report, once `cancel_token` fires.
    pub async fn run_once(
        &self,
        cancel_token: &CancellationToken,
    ) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();
        let worlds = self.particles.world_ids_with_particles().await?;

        for world in worlds {
            if cancel_token.is_cancelled() {
                break;
            }
            let particles = match self
                .particles
                .particles_with_thermal_inertia(world, self.min_inertia)
                .await
            {
                Ok(particles) => particles,
                Err(err) if err.is_transient() => return Err(err),
                Err(err) => {
                    log::error!("Failed to list thermal particles of world {world}: {err}");
                    report.failed += 1;
                    continue;
                }
            };
            report.worlds += 1;

            for particle in &particles {
                if cancel_token.is_cancelled() {
                    break;
                }
                self.relax_particle(world, particle, &mut report).await?;
            }
        }
        Ok(report)
    }

    async fn relax_particle(
        &self,
        world: WorldId,
        particle: &ThermalParticle,
        report: &mut SweepReport,
    ) -> Result<(), StoreError> {
        let ambient = match self
            .sampler
            .ambient_temperature(world, particle.position.as_f64(), None)
            .await
        {
            Ok(ambient) => ambient,
            Err(EnvironmentError::Store(err)) if err.is_transient() => return Err(err),
            Err(err) => {
                log::debug!("Skipping particle {}: {err}", particle.id);
                report.failed += 1;
                return Ok(());
            }
        };

        let next = relax(particle, ambient);
        if (next - particle.temperature).abs() <= f64::EPSILON {
            report.unchanged += 1;
            return Ok(());
        }

        match self
            .particles
            .update_particle_temperature(particle.id, next)
            .await
        {
            Ok(()) => report.updated += 1,
            Err(err) if err.is_transient() => return Err(err),
            Err(err) => {
                log::debug!("Failed to store temperature of particle {}: {err}", particle.id);
                report.failed += 1;
            }
        }
        Ok(())
    }
}
