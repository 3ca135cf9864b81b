//! Strata server entry point.

use std::{path::Path, sync::Arc};

use strata::{StrataServer, seed::WorldSeed};
use strata_core::{config::EnvironmentConfig, store::RamOnlyStore};
use strata_utils::logger;
use tokio::signal;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const CONFIG_PATH: &str = "strata_config.json5";
const SEED_PATH: &str = "demo_world.json5";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init()?;

    let mut config = EnvironmentConfig::load_or_create(Path::new(CONFIG_PATH))?;
    config.apply_process_env()?;

    let store = Arc::new(RamOnlyStore::new());
    let summary = WorldSeed::load_or_create(Path::new(SEED_PATH))?.apply(&store)?;
    log::info!(
        "Loaded {} worlds, {} materials and {} particles",
        summary.worlds,
        summary.materials,
        summary.particles
    );

    let mut server = StrataServer::new(config, store)?;
    server.start();

    signal::ctrl_c().await?;
    log::info!("Shutdown requested");
    server.stop().await;
    Ok(())
}
