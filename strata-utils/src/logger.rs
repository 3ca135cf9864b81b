//! Process wide logging bootstrap.
//!
//! Library crates only use the `log` facade. The binary calls [`init`] once,
//! which bridges `log` records into `tracing` and installs a formatting
//! subscriber filtered by `RUST_LOG` (falling back to `info`).

use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Default filter when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Failure to install the global logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// A `log` logger was already installed.
    #[error("log bridge already installed: {0}")]
    Bridge(#[from] SetLoggerError),
    /// A global tracing subscriber was already installed.
    #[error("global subscriber already installed: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the `log` to `tracing` bridge and the global fmt subscriber.
pub fn init() -> Result<(), LoggerError> {
    LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));
    set_global_default(subscriber)?;

    log::debug!("Logger initialized");
    Ok(())
}
