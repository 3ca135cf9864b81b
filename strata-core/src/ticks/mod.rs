//! Background loops driving the environment.
//!
//! - Clock tick - advances the [`CelestialClock`] at a fixed real-time rate
//! - Thermal sweep - relaxes particle temperatures every sweep interval
//!
//! Both loops run on a [`TaskTracker`] and stop when the cancellation token
//! fires. They are independent of each other.

mod thermal_sweep;

pub use thermal_sweep::{SweepReport, ThermalSweep};

use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{celestial::CelestialClock, environment::Environment, store::StoreError};

/// Handle to the running background loops.
pub struct EnvironmentScheduler {
    cancel_token: CancellationToken,
    tracker: TaskTracker,
    clock_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
}

impl EnvironmentScheduler {
    /// Spawns the clock and sweep loops for `env`. They stop once
    /// `cancel_token` (or a parent of it) is cancelled.
    #[must_use]
    pub fn start(env: &Environment, cancel_token: CancellationToken) -> Self {
        let config = env.config();
        let tracker = TaskTracker::new();

        let clock_task = tracker.spawn(clock_loop(
            env.clock().clone(),
            config.clock_tick_interval(),
            config.clock_tick_seconds,
            cancel_token.clone(),
        ));
        let sweep_task = tracker.spawn(sweep_loop(
            env.thermal_sweep().clone(),
            config.thermal_sweep_interval(),
            cancel_token.clone(),
        ));
        tracker.close();

        Self {
            cancel_token,
            tracker,
            clock_task,
            sweep_task,
        }
    }

    /// Cancels both loops and waits for them to finish.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.tracker.wait().await;
        log::info!("Environment scheduler stopped");
    }

    /// Whether both loops have exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.tracker.is_closed() && self.tracker.is_empty()
    }

    /// Whether the clock loop has exited.
    #[must_use]
    pub fn is_clock_finished(&self) -> bool {
        self.clock_task.is_finished()
    }

    /// Whether the sweep loop has exited. It also stops by itself once the
    /// store reports it is closing.
    #[must_use]
    pub fn is_sweep_finished(&self) -> bool {
        self.sweep_task.is_finished()
    }
}

async fn clock_loop(
    clock: Arc<CelestialClock>,
    period: Duration,
    tick_seconds: f64,
    cancel_token: CancellationToken,
) {
    log::info!(
        "Celestial clock started at {:.0} game-seconds (x{})",
        clock.game_seconds(),
        clock.time_scale()
    );
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            () = cancel_token.cancelled() => break,
            _ = interval.tick() => clock.advance(tick_seconds),
        }
    }
    log::info!("Celestial clock stopped at {:.0} game-seconds", clock.game_seconds());
}

async fn sweep_loop(sweep: Arc<ThermalSweep>, period: Duration, cancel_token: CancellationToken) {
    log::info!("Thermal sweep scheduled every {}s", period.as_secs());
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            () = cancel_token.cancelled() => break,
            _ = interval.tick() => {}
        }

        log::info!("Thermal sweep starting");
        match sweep.run_once(&cancel_token).await {
            Ok(report) => log::info!(
                "Thermal sweep finished: {} worlds, {} updated, {} unchanged, {} failed",
                report.worlds,
                report.updated,
                report.unchanged,
                report.failed
            ),
            Err(StoreError::Closing) => {
                log::debug!("Store is closing, stopping thermal sweep");
                break;
            }
            Err(err @ StoreError::Unavailable(_)) => {
                log::warn!("Thermal sweep aborted, retrying next interval: {err}");
            }
            Err(err) => log::error!("Thermal sweep failed: {err}"),
        }
    }
    log::info!("Thermal sweep stopped");
}

#[cfg(test)]
mod tests {
    use strata_utils::{CellPos, ParticleId, WorldId};
    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::EnvironmentConfig,
        store::{MaterialType, PhysicalState, RamOnlyStore, StoreStatus, StoredParticle, WorldConfig},
    };

    fn environment(config: EnvironmentConfig) -> (Arc<RamOnlyStore>, Environment, ParticleId) {
        let store = Arc::new(RamOnlyStore::new());
        let world = WorldId::new_random();
        store.insert_world(
            world,
            WorldConfig {
                chunk_size: None,
                width_meters: 100.0,
                height_meters: 100.0,
                min_z: 0,
                max_z: 100,
                cell_size_meters: 1.0,
            },
        );
        store.insert_material(MaterialType {
            name: "water".into(),
            albedo: Some(0.06),
            thermal_conductivity: 0.6,
            thermal_inertia: 4.0,
            physical_state: PhysicalState::Liquid,
        });
        let id = ParticleId::new_random();
        store.insert_particle(StoredParticle {
            id,
            world,
            position: CellPos::new(10, 10, 0),
            material: "water".into(),
            temperature: Some(-40.0),
            extracted: false,
        });
        let env = Environment::from_store(config, store.clone()).expect("valid config");
        (store, env, id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_ticks_every_second() {
        let (_, env, _) = environment(EnvironmentConfig::default());
        let scheduler = EnvironmentScheduler::start(&env, CancellationToken::new());

        sleep(Duration::from_millis(3_500)).await;
        assert!((env.clock().game_seconds() - 180.0).abs() < 1e-9);

        scheduler.shutdown().await;
        assert!(scheduler.is_finished());
        assert!(scheduler.is_sweep_finished());
        let stopped_at = env.clock().game_seconds();
        sleep(Duration::from_secs(5)).await;
        assert!((env.clock().game_seconds() - stopped_at).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_waits_one_interval_then_runs() {
        let config = EnvironmentConfig {
            thermal_sweep_interval_seconds: 10,
            ..EnvironmentConfig::default()
        };
        let (store, env, id) = environment(config);
        let scheduler = EnvironmentScheduler::start(&env, CancellationToken::new());

        sleep(Duration::from_secs(9)).await;
        assert_eq!(store.particle(id).and_then(|p| p.temperature), Some(-40.0));

        sleep(Duration::from_secs(2)).await;
        let relaxed = store.particle(id).and_then(|p| p.temperature).expect("stored");
        assert!(relaxed > -40.0);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_survives_outage_and_stops_on_closing() {
        let config = EnvironmentConfig {
            thermal_sweep_interval_seconds: 10,
            ..EnvironmentConfig::default()
        };
        let (store, env, id) = environment(config);
        let token = CancellationToken::new();
        let scheduler = EnvironmentScheduler::start(&env, token.clone());

        store.set_status(StoreStatus::Unavailable);
        sleep(Duration::from_secs(11)).await;
        assert_eq!(store.particle(id).and_then(|p| p.temperature), Some(-40.0));

        store.set_status(StoreStatus::Online);
        sleep(Duration::from_secs(10)).await;
        let relaxed = store.particle(id).and_then(|p| p.temperature).expect("stored");
        assert!(relaxed > -40.0);

        assert!(!scheduler.is_sweep_finished());

        // Closing ends the sweep loop on its own; the clock keeps going.
        store.set_status(StoreStatus::Closing);
        sleep(Duration::from_secs(10)).await;
        assert!(scheduler.is_sweep_finished());
        assert!(!scheduler.is_clock_finished());
        assert!(!scheduler.is_finished());
        assert!(!token.is_cancelled());

        let ticking = env.clock().game_seconds();
        sleep(Duration::from_secs(1)).await;
        assert!(env.clock().game_seconds() > ticking);

        scheduler.shutdown().await;
        assert!(scheduler.is_clock_finished());
        assert!(scheduler.is_finished());
    }
}
