//! Demo world seeding.
//!
//! Reads a JSON5 description of materials, worlds and particles and loads it
//! into a [`RamOnlyStore`]. The embedded demo world is written to disk on
//! first start, the same way the config file is.

use std::{fs, io, path::Path};

use serde::Deserialize;
use strata_core::store::{MaterialType, RamOnlyStore, StoredParticle, WorldConfig};
use strata_utils::{CellPos, ParticleId, WorldId};
use thiserror::Error;

/// The seed file written on first start.
pub const DEFAULT_SEED: &str = include_str!("../../package-content/demo_world.json5");

/// Upper bound on the cells a single region may fill.
pub const MAX_REGION_CELLS: u64 = 1 << 20;

/// Failure to load a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Reading or writing the seed file failed.
    #[error("seed io: {0}")]
    Io(#[from] io::Error),
    /// The file is not a valid seed document.
    #[error("seed parse: {0}")]
    Parse(#[from] serde_json5::Error),
    /// A region's corners are inverted or it covers too many cells.
    #[error("region of {material} in world {world} is invalid ({cells} cells)")]
    InvalidRegion {
        /// World the region belongs to.
        world: WorldId,
        /// Region material.
        material: String,
        /// Cells the region would fill (0 when inverted).
        cells: u64,
    },
}

/// Root of a seed document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldSeed {
    /// Materials shared by every world.
    #[serde(default)]
    pub materials: Vec<MaterialType>,
    /// Worlds with their particles.
    #[serde(default)]
    pub worlds: Vec<SeededWorld>,
}

/// One world in a seed document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeededWorld {
    /// World id.
    pub id: WorldId,
    /// World configuration.
    pub config: WorldConfig,
    /// Boxes filled with one material.
    #[serde(default)]
    pub regions: Vec<RegionSeed>,
    /// Individual particles.
    #[serde(default)]
    pub particles: Vec<ParticleSeed>,
}

/// An inclusive box of cells filled with one material.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSeed {
    /// Material name.
    pub material: String,
    /// Lowest corner.
    pub min: CellPos,
    /// Highest corner.
    pub max: CellPos,
    /// Starting temperature of every particle.
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl RegionSeed {
    fn cell_count(&self) -> u64 {
        let span = |lo: i32, hi: i32| u64::try_from(i64::from(hi) - i64::from(lo) + 1).unwrap_or(0);
        let (lo, hi) = (self.min.0, self.max.0);
        span(lo.x, hi.x)
            .saturating_mul(span(lo.y, hi.y))
            .saturating_mul(span(lo.z, hi.z))
    }
}

/// A single particle.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticleSeed {
    /// Material name.
    pub material: String,
    /// Cell the particle occupies.
    pub position: CellPos,
    /// Starting temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Whether the particle starts extracted.
    #[serde(default)]
    pub extracted: bool,
}

/// What a seed added to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Materials inserted.
    pub materials: usize,
    /// Worlds inserted.
    pub worlds: usize,
    /// Particles inserted.
    pub particles: usize,
}

impl WorldSeed {
    /// Parses a seed document.
    pub fn parse(source: &str) -> Result<Self, SeedError> {
        Ok(serde_json5::from_str(source)?)
    }

    /// Reads the seed at `path`, writing the embedded demo world there first
    /// if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, SeedError> {
        if !path.exists() {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_SEED)?;
            log::info!("Wrote demo world to {}", path.display());
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Inserts everything into `store`. Regions are validated before any
    /// particle is inserted.
    pub fn apply(&self, store: &RamOnlyStore) -> Result<SeedSummary, SeedError> {
        for world in &self.worlds {
            for region in &world.regions {
                let cells = region.cell_count();
                if cells == 0 || cells > MAX_REGION_CELLS {
                    return Err(SeedError::InvalidRegion {
                        world: world.id,
                        material: region.material.clone(),
                        cells,
                    });
                }
            }
        }

        let mut summary = SeedSummary::default();
        for material in &self.materials {
            store.insert_material(material.clone());
            summary.materials += 1;
        }

        for world in &self.worlds {
            store.insert_world(world.id, world.config.clone());
            summary.worlds += 1;

            for region in &world.regions {
                let (lo, hi) = (region.min.0, region.max.0);
                for x in lo.x..=hi.x {
                    for y in lo.y..=hi.y {
                        for z in lo.z..=hi.z {
                            store.insert_particle(StoredParticle {
                                id: ParticleId::new_random(),
                                world: world.id,
                                position: CellPos::new(x, y, z),
                                material: region.material.clone(),
                                temperature: region.temperature,
                                extracted: false,
                            });
                            summary.particles += 1;
                        }
                    }
                }
            }

            for particle in &world.particles {
                store.insert_particle(StoredParticle {
                    id: ParticleId::new_random(),
                    world: world.id,
                    position: particle.position,
                    material: particle.material.clone(),
                    temperature: particle.temperature,
                    extracted: particle.extracted,
                });
                summary.particles += 1;
            }
            log::debug!("Seeded world {}", world.id);
        }
        Ok(summary)
    }
}
