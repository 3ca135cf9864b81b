//! Memoized per-world layout (chunk size and cell bounds).

use std::sync::Arc;

use strata_utils::{CellPos, WorldId};

use crate::error::EnvironmentError;

use super::{StoreError, WorldConfig, WorldConfigRepository};

/// Inclusive cell extents of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldBounds {
    /// Lowest cell on every axis.
    pub min: CellPos,
    /// Highest cell on every axis.
    pub max: CellPos,
}

impl WorldBounds {
    /// Whether `cell` lies inside the world.
    #[must_use]
    pub fn contains(&self, cell: CellPos) -> bool {
        let (c, lo, hi) = (cell.0, self.min.0, self.max.0);
        (lo.x..=hi.x).contains(&c.x) && (lo.y..=hi.y).contains(&c.y) && (lo.z..=hi.z).contains(&c.z)
    }
}

/// What the chunk cache and the temperature model need to know about a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldLayout {
    /// Chunk edge length in cells.
    pub chunk_size: i32,
    /// Cell extents.
    pub bounds: WorldBounds,
}

impl WorldLayout {
    /// Derives the layout from a stored config. Horizontal cells start at 0.
    pub fn from_config(
        world: WorldId,
        config: &WorldConfig,
        default_chunk_size: u32,
    ) -> Result<Self, StoreError> {
        let chunk_size = config.chunk_size.unwrap_or(default_chunk_size);
        let chunk_size = i32::try_from(chunk_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| StoreError::Backend(format!("world {world} has chunk size {chunk_size}")))?;

        if !(config.cell_size_meters.is_finite() && config.cell_size_meters > 0.0) {
            return Err(StoreError::Backend(format!(
                "world {world} has cell size {}",
                config.cell_size_meters
            )));
        }
        let cells = |meters: f64| ((meters / config.cell_size_meters).floor() as i32).max(1);

        Ok(Self {
            chunk_size,
            bounds: WorldBounds {
                min: CellPos::new(0, 0, config.min_z.min(config.max_z)),
                max: CellPos::new(
                    cells(config.width_meters) - 1,
                    cells(config.height_meters) - 1,
                    config.max_z.max(config.min_z),
                ),
            },
        })
    }
}

/// Memo of [`WorldLayout`]s in front of a [`WorldConfigRepository`].
///
/// The first lookup of a world reads the repository; later lookups are served
/// from memory until [`WorldConfigs::clear`]. Unknown worlds are not memoized.
pub struct WorldConfigs {
    repository: Arc<dyn WorldConfigRepository>,
    default_chunk_size: u32,
    layouts: scc::HashMap<WorldId, WorldLayout>,
}

impl WorldConfigs {
    /// Creates an empty memo.
    #[must_use]
    pub fn new(repository: Arc<dyn WorldConfigRepository>, default_chunk_size: u32) -> Self {
        Self {
            repository,
            default_chunk_size,
            layouts: scc::HashMap::new(),
        }
    }

    /// The layout of `world`, reading the repository on first use.
    pub async fn resolve(&self, world: WorldId) -> Result<WorldLayout, EnvironmentError> {
        if let Some(layout) = self.layouts.read_async(&world, |_, layout| *layout).await {
            return Ok(layout);
        }

        let config = self
            .repository
            .world_config(world)
            .await?
            .ok_or(EnvironmentError::WorldNotFound(world))?;
        let layout = WorldLayout::from_config(world, &config, self.default_chunk_size)?;

        // A concurrent first lookup may have won; both read the same row.
        let _ = self.layouts.insert_async(world, layout).await;
        log::debug!("Loaded layout for world {world}: chunk size {}", layout.chunk_size);
        Ok(layout)
    }

    /// The memoized layout of `world`, without touching the repository.
    #[must_use]
    pub fn cached(&self, world: WorldId) -> Option<WorldLayout> {
        self.layouts.read_sync(&world, |_, layout| *layout)
    }

    /// Forgets every world.
    pub fn clear(&self) {
        self.layouts.clear_sync();
    }
}
