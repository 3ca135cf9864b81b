//! # Strata Core
//!
//! Environment simulation for a voxel world: the celestial clock, the ambient
//! temperature model, particle thermal relaxation, chunk level temperature
//! caching and the background loops that keep it all moving.

pub mod celestial;
pub mod chunk;
pub mod config;
pub mod environment;
pub mod error;
pub mod store;
pub mod temperature;
pub mod ticks;

pub use environment::Environment;
pub use error::{EnvironmentError, ValidationError};
