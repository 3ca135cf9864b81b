// Wrapper types so a world id, a particle id and a raw uuid can't be swapped by accident.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::Vector3;

/// Identifier of a world (one configured map/dimension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub Uuid);

impl WorldId {
    /// Creates a fresh random world id.
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WorldId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Identifier of a single particle in the particle store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(pub Uuid);

impl ParticleId {
    /// Creates a fresh random particle id.
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A cell position in the voxel grid. `z` is altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellPos(pub Vector3<i32>);

impl CellPos {
    /// Creates a cell position from its three coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The cell containing a continuous point (floors every axis).
    #[must_use]
    pub fn containing(point: Vector3<f64>) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }

    /// The cell coordinates as floating point, as used by the temperature model.
    #[must_use]
    pub fn as_f64(self) -> Vector3<f64> {
        self.0.as_f64()
    }
}

/// A chunk position: cell coordinates divided by the chunk size, floored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkPos(pub Vector3<i32>);

impl ChunkPos {
    /// Creates a chunk position from its three coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The chunk containing `cell` for the given chunk edge length.
    ///
    /// Uses euclidean division so negative cells land in negative chunks
    /// (`-1 / 40` is chunk `-1`, not `0`).
    #[must_use]
    pub fn from_cell(cell: CellPos, chunk_size: i32) -> Self {
        Self::new(
            cell.0.x.div_euclid(chunk_size),
            cell.0.y.div_euclid(chunk_size),
            cell.0.z.div_euclid(chunk_size),
        )
    }

    /// The geometric center of this chunk in cell coordinates.
    #[must_use]
    pub fn center(self, chunk_size: i32) -> Vector3<f64> {
        let size = f64::from(chunk_size);
        Vector3::new(
            (f64::from(self.0.x) + 0.5) * size,
            (f64::from(self.0.y) + 0.5) * size,
            (f64::from(self.0.z) + 0.5) * size,
        )
    }
}
