//! The authoritative game clock and everything derived from it.
//!
//! The clock stores a single scalar, `game_seconds`. Every celestial fact (sun
//! and moon angles, lunar phase, hour of day, lit hemisphere, orbital
//! positions) is a pure function of that scalar, so readers never observe a
//! half-updated state.

use std::f64::consts::{PI, TAU};

use crossbeam::atomic::AtomicCell;
use serde::Serialize;
use strata_utils::math::{Vector3, angular_distance};

use crate::config::EnvironmentConfig;

/// The moon starts opposite the sun.
pub const MOON_INITIAL_OFFSET: f64 = PI;

/// Constants the celestial queries are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CelestialParams {
    /// Sun radians per game-second.
    pub sun_angular_velocity: f64,
    /// Moon radians per game-second.
    pub moon_angular_velocity: f64,
    /// Sun orbit radius in meters.
    pub sun_orbit_radius: f64,
    /// Moon orbit radius in meters.
    pub moon_orbit_radius: f64,
    /// Sun height in meters.
    pub sun_orbit_height: f64,
    /// Moon height in meters.
    pub moon_orbit_height: f64,
    /// Hours in one sun revolution.
    pub hours_per_day: f64,
    /// First daytime hour.
    pub sunrise_hour: f64,
    /// Last daytime hour.
    pub sunset_hour: f64,
    /// Angular distance under which a point is lit.
    pub day_angle_threshold: f64,
}

impl From<&EnvironmentConfig> for CelestialParams {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            sun_angular_velocity: config.sun_angular_velocity(),
            moon_angular_velocity: config.moon_angular_velocity(),
            sun_orbit_radius: config.sun_orbit_radius(),
            moon_orbit_radius: config.moon_orbit_radius(),
            sun_orbit_height: config.sun_orbit_height,
            moon_orbit_height: config.moon_orbit_height,
            hours_per_day: config.hours_per_day,
            sunrise_hour: config.sunrise_hour,
            sunset_hour: config.sunset_hour,
            day_angle_threshold: config.day_angle_threshold,
        }
    }
}

impl CelestialParams {
    /// Sun angle in `[0, 2π)` at `game_seconds`.
    #[must_use]
    pub fn sun_angle(&self, game_seconds: f64) -> f64 {
        normalize_angle(game_seconds * self.sun_angular_velocity)
    }

    /// Moon angle in `[0, 2π)` at `game_seconds`.
    #[must_use]
    pub fn moon_angle(&self, game_seconds: f64) -> f64 {
        normalize_angle(game_seconds * self.moon_angular_velocity + MOON_INITIAL_OFFSET)
    }

    /// Lunar phase in `[0, 1)`: 0 new moon, 0.5 full moon.
    #[must_use]
    pub fn moon_phase(&self, game_seconds: f64) -> f64 {
        let phase = self.moon_angle(game_seconds) / TAU;
        if phase >= 1.0 { 0.0 } else { phase }
    }

    /// Hour of day in `[0, hours_per_day)`. Sun angle 0 is noon, π is midnight.
    #[must_use]
    pub fn current_hour(&self, game_seconds: f64) -> f64 {
        let shifted = normalize_angle(self.sun_angle(game_seconds) + PI);
        let hour = shifted / TAU * self.hours_per_day;
        if hour >= self.hours_per_day { 0.0 } else { hour }
    }

    /// Sun intensity in `[0, 1]` at the point with horizontal coordinates `(x, y)`.
    #[must_use]
    pub fn sun_intensity_at(&self, game_seconds: f64, x: f64, y: f64) -> f64 {
        let bearing = y.atan2(x);
        angular_distance(bearing, self.sun_angle(game_seconds))
            .cos()
            .max(0.0)
    }

    /// Whether the sun is within the day threshold of the bearing of `(x, y)`.
    #[must_use]
    pub fn is_daytime_at(&self, game_seconds: f64, x: f64, y: f64) -> bool {
        let bearing = y.atan2(x);
        angular_distance(bearing, self.sun_angle(game_seconds)) < self.day_angle_threshold
    }

    /// World-wide day flag: the current hour lies within sunrise..=sunset.
    #[must_use]
    pub fn is_daytime(&self, game_seconds: f64) -> bool {
        (self.sunrise_hour..=self.sunset_hour).contains(&self.current_hour(game_seconds))
    }

    /// Sun position in world coordinates.
    #[must_use]
    pub fn sun_position(&self, game_seconds: f64) -> Vector3<f64> {
        orbit_point(
            self.sun_angle(game_seconds),
            self.sun_orbit_radius,
            self.sun_orbit_height,
        )
    }

    /// Moon position in world coordinates.
    #[must_use]
    pub fn moon_position(&self, game_seconds: f64) -> Vector3<f64> {
        orbit_point(
            self.moon_angle(game_seconds),
            self.moon_orbit_radius,
            self.moon_orbit_height,
        )
    }
}

fn normalize_angle(angle: f64) -> f64 {
    let angle = angle.rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU for tiny negative inputs.
    if angle >= TAU { 0.0 } else { angle }
}

fn orbit_point(angle: f64, radius: f64, height: f64) -> Vector3<f64> {
    Vector3::new(radius * angle.cos(), radius * angle.sin(), height)
}

/// Snapshot of every celestial fact at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CelestialState {
    /// Game-seconds the snapshot was taken at.
    pub game_seconds: f64,
    /// Sun angle in radians.
    pub sun_angle: f64,
    /// Moon angle in radians.
    pub moon_angle: f64,
    /// Lunar phase in `[0, 1)`.
    pub moon_phase: f64,
    /// Hour of day.
    pub current_hour: f64,
    /// World-wide day flag.
    pub is_daytime: bool,
    /// Sun position in world coordinates.
    pub sun_position: Vector3<f64>,
    /// Moon position in world coordinates.
    pub moon_position: Vector3<f64>,
}

/// The game clock. Only the scheduler advances it; any number of readers may
/// query it concurrently.
#[derive(Debug)]
pub struct CelestialClock {
    game_seconds: AtomicCell<f64>,
    time_scale: f64,
    params: CelestialParams,
}

impl CelestialClock {
    /// Creates a clock starting at `initial_game_time`.
    #[must_use]
    pub fn new(initial_game_time: f64, time_scale: f64, params: CelestialParams) -> Self {
        Self {
            game_seconds: AtomicCell::new(initial_game_time.max(0.0)),
            time_scale,
            params,
        }
    }

    /// Creates a clock from the environment config.
    #[must_use]
    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(
            config.initial_game_time,
            config.time_scale,
            CelestialParams::from(config),
        )
    }

    /// Advances the clock by `delta_real_seconds` of real time.
    ///
    /// Negative or non-finite deltas are ignored so game time never goes back.
    pub fn advance(&self, delta_real_seconds: f64) {
        let delta = delta_real_seconds * self.time_scale;
        if !delta.is_finite() || delta <= 0.0 {
            log::debug!("Ignoring clock advance of {delta_real_seconds}s");
            return;
        }
        // Only the clock loop writes, so load then store cannot lose an update.
        self.game_seconds.store(self.game_seconds.load() + delta);
    }

    /// Current game time in seconds.
    #[must_use]
    pub fn game_seconds(&self) -> f64 {
        self.game_seconds.load()
    }

    /// Game-seconds per real second.
    #[must_use]
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// The constants this clock derives from.
    #[must_use]
    pub const fn params(&self) -> &CelestialParams {
        &self.params
    }

    /// Sun angle in `[0, 2π)`.
    #[must_use]
    pub fn sun_angle(&self) -> f64 {
        self.params.sun_angle(self.game_seconds())
    }

    /// Moon angle in `[0, 2π)`.
    #[must_use]
    pub fn moon_angle(&self) -> f64 {
        self.params.moon_angle(self.game_seconds())
    }

    /// Lunar phase in `[0, 1)`.
    #[must_use]
    pub fn moon_phase(&self) -> f64 {
        self.params.moon_phase(self.game_seconds())
    }

    /// Hour of day in `[0, hours_per_day)`.
    #[must_use]
    pub fn current_hour(&self) -> f64 {
        self.params.current_hour(self.game_seconds())
    }

    /// Sun intensity at `(x, y)` in `[0, 1]`.
    #[must_use]
    pub fn sun_intensity_at(&self, x: f64, y: f64) -> f64 {
        self.params.sun_intensity_at(self.game_seconds(), x, y)
    }

    /// Whether `(x, y)` faces the sun.
    #[must_use]
    pub fn is_daytime_at(&self, x: f64, y: f64) -> bool {
        self.params.is_daytime_at(self.game_seconds(), x, y)
    }

    /// Sun position in world coordinates.
    #[must_use]
    pub fn sun_position(&self) -> Vector3<f64> {
        self.params.sun_position(self.game_seconds())
    }

    /// Moon position in world coordinates.
    #[must_use]
    pub fn moon_position(&self) -> Vector3<f64> {
        self.params.moon_position(self.game_seconds())
    }

    /// Every celestial fact derived from a single clock read.
    #[must_use]
    pub fn state(&self) -> CelestialState {
        let t = self.game_seconds();
        let p = &self.params;
        CelestialState {
            game_seconds: t,
            sun_angle: p.sun_angle(t),
            moon_angle: p.moon_angle(t),
            moon_phase: p.moon_phase(t),
            current_hour: p.current_hour(t),
            is_daytime: p.is_daytime(t),
            sun_position: p.sun_position(t),
            moon_position: p.moon_position(t),
        }
    }
}
