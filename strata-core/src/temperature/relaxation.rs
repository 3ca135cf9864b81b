//! One-step exponential approach of a particle's temperature to ambient.

use crate::store::ThermalParticle;

/// Lowest temperature a relaxed particle can reach.
pub const MIN_PARTICLE_TEMPERATURE: f64 = -50.0;
/// Highest temperature a relaxed particle can reach.
pub const MAX_PARTICLE_TEMPERATURE: f64 = 1000.0;

/// Moves `current` toward `ambient` by `1 / thermal_inertia` of the gap.
///
/// An inertia of 4 closes a quarter of the gap. Non-positive inertia leaves
/// the temperature untouched. The result is clamped to
/// [`MIN_PARTICLE_TEMPERATURE`]..=[`MAX_PARTICLE_TEMPERATURE`], which also
/// bounds the overshoot of very small inertias.
#[must_use]
pub fn relax_temperature(current: f64, ambient: f64, thermal_inertia: f64) -> f64 {
    if thermal_inertia <= 0.0 || thermal_inertia.is_nan() {
        return current;
    }
    let change_factor = 1.0 / thermal_inertia;
    let next = current + (ambient - current) * change_factor;
    if next.is_nan() {
        return current;
    }
    next.clamp(MIN_PARTICLE_TEMPERATURE, MAX_PARTICLE_TEMPERATURE)
}

/// [`relax_temperature`] for a swept particle.
#[must_use]
pub fn relax(particle: &ThermalParticle, ambient: f64) -> f64 {
    relax_temperature(particle.temperature, ambient, particle.thermal_inertia)
}

#[cfg(test)]
mod tests {
    use strata_utils::{CellPos, ParticleId};

    use super::*;

    fn particle(temperature: f64, thermal_inertia: f64) -> ThermalParticle {
        ThermalParticle {
            id: ParticleId::new_random(),
            position: CellPos::new(0, 0, 0),
            temperature,
            thermal_inertia,
        }
    }

    #[test]
    fn test_quarter_step() {
        assert!((relax(&particle(20.0, 4.0), 30.0) - 22.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_inertia_is_immutable() {
        assert!((relax(&particle(20.0, 0.0), 60.0) - 20.0).abs() < f64::EPSILON);
        assert!((relax(&particle(20.0, -1.0), 60.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tiny_inertia_respects_clamp() {
        let hot = relax(&particle(20.0, 0.001), 60.0);
        assert!((hot - MAX_PARTICLE_TEMPERATURE).abs() < f64::EPSILON);
        let cold = relax(&particle(20.0, 0.005), -50.0);
        assert!((cold - MIN_PARTICLE_TEMPERATURE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_converges_without_overshoot() {
        let mut temperature = 0.0;
        for _ in 0..100 {
            temperature = relax_temperature(temperature, 30.0, 2.0);
            assert!(temperature <= 30.0);
        }
        assert!((temperature - 30.0).abs() < 1e-9);
    }
}
