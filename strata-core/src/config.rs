//! Environment configuration.
//!
//! Loaded once at startup from a JSON5 file (written from the embedded default
//! when missing), then overridden by the recognized environment variables.

use std::{
    env,
    f64::consts::{FRAC_PI_2, PI, TAU},
    fs, io,
    path::Path,
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::error::ValidationError;

/// The config file written on first start.
pub const DEFAULT_CONFIG: &str = include_str!("../../package-content/strata_config.json5");

/// Failure to produce a usable [`EnvironmentConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("config io: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid JSON5 for this struct.
    #[error("config parse: {0}")]
    Parse(#[from] serde_json5::Error),
    /// A value is out of range.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Tunables for the celestial clock, the temperature model and the scheduler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Game-seconds per real second.
    pub time_scale: f64,
    /// Game-seconds on the clock at startup.
    pub initial_game_time: f64,
    /// World radius in meters.
    pub world_radius: f64,
    /// Sun orbit radius as a multiple of the world radius.
    pub sun_orbit_multiplier: f64,
    /// Moon orbit radius as a multiple of the world radius.
    pub moon_orbit_multiplier: f64,
    /// Sun height above the world plane in meters.
    pub sun_orbit_height: f64,
    /// Moon height above the world plane in meters.
    pub moon_orbit_height: f64,
    /// Game-seconds for one sun revolution.
    pub sun_cycle_seconds: f64,
    /// Game-seconds for one moon revolution.
    pub moon_cycle_seconds: f64,
    /// Hours in one sun revolution.
    pub hours_per_day: f64,
    /// First hour counted as day for the world-wide flag.
    pub sunrise_hour: f64,
    /// Last hour counted as day for the world-wide flag.
    pub sunset_hour: f64,
    /// Angular distance to the sun (radians) under which a point is lit.
    pub day_angle_threshold: f64,
    /// Real seconds between clock ticks.
    pub clock_tick_seconds: f64,
    /// Real seconds between thermal sweeps.
    pub thermal_sweep_interval_seconds: u64,
    /// Minimum thermal inertia (exclusive) for a particle to be swept.
    pub min_thermal_inertia: f64,
    /// Default chunk edge length in cells.
    pub chunk_size: u32,
    /// Radius in cells searched for thermal bodies.
    pub thermal_search_radius: u32,
    /// Material names treated as thermal bodies.
    pub thermal_materials: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            time_scale: 60.0,
            initial_game_time: 0.0,
            world_radius: 1000.0,
            sun_orbit_multiplier: 1.5,
            moon_orbit_multiplier: 1.5,
            sun_orbit_height: 500.0,
            moon_orbit_height: 500.0,
            sun_cycle_seconds: 86_400.0,
            moon_cycle_seconds: 2_419_200.0,
            hours_per_day: 24.0,
            sunrise_hour: 6.0,
            sunset_hour: 18.0,
            day_angle_threshold: FRAC_PI_2,
            clock_tick_seconds: 1.0,
            thermal_sweep_interval_seconds: 300,
            min_thermal_inertia: 0.1,
            chunk_size: 40,
            thermal_search_radius: 10,
            thermal_materials: ["water", "ocean", "dirty_water", "ice"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EnvironmentConfig {
    /// Reads the config at `path`, writing the embedded default there first if
    /// the file does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let config_str = fs::read_to_string(path)?;
            Self::parse(&config_str)?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            log::info!("Wrote default environment config to {}", path.display());
            Self::parse(DEFAULT_CONFIG)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON5 document. Missing fields take their defaults.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json5::from_str(source)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        for name in &mut self.thermal_materials {
            *name = name.trim().to_lowercase();
        }
    }

    /// Rejects values the clock, the model or the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = |value: f64| value.is_finite() && value > 0.0;

        if !positive(self.time_scale) {
            return Err(ValidationError::InvalidConfig("time_scale must be > 0"));
        }
        if !self.initial_game_time.is_finite() || self.initial_game_time < 0.0 {
            return Err(ValidationError::InvalidConfig(
                "initial_game_time must be >= 0",
            ));
        }
        if !positive(self.world_radius) {
            return Err(ValidationError::InvalidConfig("world_radius must be > 0"));
        }
        if !positive(self.sun_orbit_multiplier) || !positive(self.moon_orbit_multiplier) {
            return Err(ValidationError::InvalidConfig(
                "orbit multipliers must be > 0",
            ));
        }
        if !self.sun_orbit_height.is_finite() || !self.moon_orbit_height.is_finite() {
            return Err(ValidationError::InvalidConfig(
                "orbit heights must be finite",
            ));
        }
        if !positive(self.sun_cycle_seconds) || !positive(self.moon_cycle_seconds) {
            return Err(ValidationError::InvalidConfig("cycle lengths must be > 0"));
        }
        if !positive(self.hours_per_day) {
            return Err(ValidationError::InvalidConfig("hours_per_day must be > 0"));
        }
        if !(0.0..=self.hours_per_day).contains(&self.sunrise_hour)
            || !(0.0..=self.hours_per_day).contains(&self.sunset_hour)
            || self.sunrise_hour >= self.sunset_hour
        {
            return Err(ValidationError::InvalidConfig(
                "sunrise_hour must be before sunset_hour, both within the day",
            ));
        }
        if !(0.0..=PI).contains(&self.day_angle_threshold) {
            return Err(ValidationError::InvalidConfig(
                "day_angle_threshold must be within 0..=π",
            ));
        }
        if !positive(self.clock_tick_seconds) {
            return Err(ValidationError::InvalidConfig(
                "clock_tick_seconds must be > 0",
            ));
        }
        if self.thermal_sweep_interval_seconds == 0 {
            return Err(ValidationError::InvalidConfig(
                "thermal_sweep_interval_seconds must be > 0",
            ));
        }
        if !self.min_thermal_inertia.is_finite() || self.min_thermal_inertia < 0.0 {
            return Err(ValidationError::InvalidConfig(
                "min_thermal_inertia must be >= 0",
            ));
        }
        if self.chunk_size == 0 || i32::try_from(self.chunk_size).is_err() {
            return Err(ValidationError::InvalidConfig(
                "chunk_size must be within 1..=i32::MAX",
            ));
        }
        Ok(())
    }

    /// Applies the recognized environment variables on top of the loaded
    /// values, then re-validates.
    ///
    /// `lookup` resolves a variable name; [`Self::apply_process_env`] passes
    /// `std::env::var`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "TIME_SCALE", &mut self.time_scale)?;
        override_from(&lookup, "INITIAL_GAME_TIME", &mut self.initial_game_time)?;
        override_from(&lookup, "WORLD_RADIUS", &mut self.world_radius)?;
        override_from(&lookup, "SUN_ORBIT_MULTIPLIER", &mut self.sun_orbit_multiplier)?;
        override_from(&lookup, "MOON_ORBIT_MULTIPLIER", &mut self.moon_orbit_multiplier)?;
        override_from(&lookup, "DAY_ANGLE_THRESHOLD", &mut self.day_angle_threshold)?;
        override_from(
            &lookup,
            "THERMAL_SWEEP_INTERVAL_SECONDS",
            &mut self.thermal_sweep_interval_seconds,
        )?;
        override_from(&lookup, "CHUNK_SIZE", &mut self.chunk_size)?;
        self.validate()
    }

    /// [`Self::apply_env_overrides`] against the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ValidationError> {
        self.apply_env_overrides(|name| env::var(name).ok())
    }

    /// Sun orbit radius in meters.
    #[must_use]
    pub fn sun_orbit_radius(&self) -> f64 {
        self.world_radius * self.sun_orbit_multiplier
    }

    /// Moon orbit radius in meters.
    #[must_use]
    pub fn moon_orbit_radius(&self) -> f64 {
        self.world_radius * self.moon_orbit_multiplier
    }

    /// Sun angular velocity in radians per game-second.
    #[must_use]
    pub fn sun_angular_velocity(&self) -> f64 {
        TAU / self.sun_cycle_seconds
    }

    /// Moon angular velocity in radians per game-second.
    #[must_use]
    pub fn moon_angular_velocity(&self) -> f64 {
        TAU / self.moon_cycle_seconds
    }

    /// Real time between clock ticks.
    #[must_use]
    pub fn clock_tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.clock_tick_seconds)
    }

    /// Real time between thermal sweeps.
    #[must_use]
    pub fn thermal_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.thermal_sweep_interval_seconds)
    }
}

fn override_from<F, T>(lookup: &F, name: &'static str, slot: &mut T) -> Result<(), ValidationError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(name) else {
        return Ok(());
    };
    *slot = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidConfig(name))?;
    log::debug!("{name} overridden from the environment");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use uuid::Uuid;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_embedded_default_matches_default() {
        let parsed = EnvironmentConfig::parse(DEFAULT_CONFIG).expect("default config parses");
        assert_eq!(parsed, EnvironmentConfig::default());
        parsed.validate().expect("default config is valid");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let parsed = EnvironmentConfig::parse("{ time_scale: 120, chunk_size: 16 }")
            .expect("partial config parses");
        assert!((parsed.time_scale - 120.0).abs() < f64::EPSILON);
        assert_eq!(parsed.chunk_size, 16);
        assert_eq!(parsed.thermal_search_radius, 10);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(EnvironmentConfig::parse("{ tick_rate: 20 }").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EnvironmentConfig::default();
        config
            .apply_env_overrides(env(&[
                ("TIME_SCALE", "1"),
                ("CHUNK_SIZE", " 32 "),
                ("THERMAL_SWEEP_INTERVAL_SECONDS", "5"),
            ]))
            .expect("valid overrides");
        assert!((config.time_scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.thermal_sweep_interval(), Duration::from_secs(5));
        assert!((config.world_radius - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_env_override() {
        let mut config = EnvironmentConfig::default();
        let err = config
            .apply_env_overrides(env(&[("WORLD_RADIUS", "far")]))
            .expect_err("not a number");
        assert_eq!(err, ValidationError::InvalidConfig("WORLD_RADIUS"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut config = EnvironmentConfig::default();
        assert!(
            config
                .apply_env_overrides(env(&[("TIME_SCALE", "0")]))
                .is_err()
        );

        let config = EnvironmentConfig {
            sunrise_hour: 19.0,
            ..EnvironmentConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EnvironmentConfig {
            chunk_size: 0,
            ..EnvironmentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_values() {
        let config = EnvironmentConfig::default();
        assert!((config.sun_orbit_radius() - 1500.0).abs() < 1e-9);
        assert!((config.sun_angular_velocity() * 86_400.0 - TAU).abs() < 1e-9);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = env::temp_dir().join(format!("strata-config-{}", Uuid::new_v4()));
        let path = dir.join("strata_config.json5");

        let created = EnvironmentConfig::load_or_create(&path).expect("created");
        assert!(path.exists());
        let loaded = EnvironmentConfig::load_or_create(&path).expect("reloaded");
        assert_eq!(created, loaded);

        fs::remove_dir_all(dir).ok();
    }
}
