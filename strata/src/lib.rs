//! # Strata
//!
//! The Strata environment server: loads the config and seed world, builds
//! the [`Environment`] and drives it until shutdown.

use std::sync::Arc;

use strata_core::{
    Environment, config::EnvironmentConfig, error::ValidationError, store::RamOnlyStore,
    ticks::EnvironmentScheduler,
};
use tokio_util::sync::CancellationToken;

/// Seed world loading.
pub mod seed;

/// The main server struct.
pub struct StrataServer {
    /// The cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    /// The shared environment.
    pub environment: Arc<Environment>,
    /// The in-memory particle store backing the environment.
    pub store: Arc<RamOnlyStore>,
    scheduler: Option<EnvironmentScheduler>,
}

impl StrataServer {
    /// Creates a server over an already seeded store.
    pub fn new(config: EnvironmentConfig, store: Arc<RamOnlyStore>) -> Result<Self, ValidationError> {
        log::info!("Starting Strata Server");

        let environment = Environment::from_store(config, store.clone())?;

        Ok(Self {
            cancel_token: CancellationToken::new(),
            environment: Arc::new(environment),
            store,
            scheduler: None,
        })
    }

    /// Starts the background loops. Calling it again while running does nothing.
    pub fn start(&mut self) {
        if self.scheduler.is_some() {
            return;
        }
        self.scheduler = Some(EnvironmentScheduler::start(
            &self.environment,
            self.cancel_token.child_token(),
        ));

        let state = self.environment.celestial_state();
        log::info!(
            "Started Strata Server at hour {:.2} ({})",
            state.current_hour,
            if state.is_daytime { "day" } else { "night" }
        );
    }

    /// Whether the background loops are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Stops the server and waits for the background loops to exit.
    pub async fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }
        log::info!(
            "Stopped Strata Server at game second {:.0}",
            self.environment.clock().game_seconds()
        );
    }
}
