//! Terrain height-field synthesis library
//!
//! Noise-driven and diamond-square generation, thermal and hydraulic erosion,
//! and a lenient `HeightField` for downstream mesh and render consumers.

pub mod config;
pub mod diamond_square;
pub mod erosion;
pub mod error;
pub mod export;
pub mod heightfield;
pub mod noise_field;
pub mod seeds;
pub mod tilemap;

pub use config::{GenerationMethod, TerrainConfig};
pub use diamond_square::DiamondSquare;
pub use erosion::{ErosionParams, ErosionPreset, ErosionSimulator, ErosionStats};
pub use error::TerrainError;
pub use heightfield::{GenerationParams, HeightField, HeightStats};
pub use noise_field::{LatticeNoise, NoiseField, NoiseKind, NoiseParams};
pub use seeds::TerrainSeeds;
pub use tilemap::Tilemap;
