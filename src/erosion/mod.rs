//! Erosion simulation module
//!
//! Two complementary passes reshape a height grid in place:
//! - **Hydraulic erosion**: raindrops dissolve material on slopes and leave it
//!   downhill, carving channels and filling basins
//! - **Thermal erosion**: slopes steeper than the talus angle slump onto
//!   their lower neighbors
//!
//! Both passes only move material, so total volume is preserved.

pub mod hydraulic;
pub mod params;
pub mod thermal;

pub use params::{ErosionParams, ErosionPreset};

use crate::error::TerrainError;
use crate::tilemap::Tilemap;
use tracing::{info, warn};

/// Statistics from erosion simulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Total material eroded by raindrops (in height units)
    pub total_eroded: f64,
    /// Total material deposited by raindrops
    pub total_deposited: f64,
    /// Total number of raindrop steps taken
    pub steps_taken: u64,
    /// Number of raindrops processed
    pub iterations: usize,
    /// Largest single pickup
    pub max_erosion: f32,
    /// Largest single deposit
    pub max_deposition: f32,
    /// Material moved by thermal slumping
    pub material_moved: f64,
}

impl ErosionStats {
    /// Mean path length of a raindrop in cells.
    pub fn mean_path_length(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.steps_taken as f64 / self.iterations as f64
        }
    }
}

impl std::fmt::Display for ErosionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} drops, {:.1} steps/drop, eroded {:.4}, deposited {:.4}, slumped {:.4}",
            self.iterations,
            self.mean_path_length(),
            self.total_eroded,
            self.total_deposited,
            self.material_moved,
        )
    }
}

/// Runs the configured erosion passes over a height grid.
#[derive(Clone, Debug, Default)]
pub struct ErosionSimulator {
    params: ErosionParams,
}

impl ErosionSimulator {
    pub fn new(params: ErosionParams) -> Self {
        if params.sanitized() != params {
            warn!("erosion parameters out of range, clamping");
        }
        Self {
            params: params.sanitized(),
        }
    }

    pub fn from_preset(preset: ErosionPreset) -> Self {
        Self::new(ErosionParams::from_preset(preset))
    }

    pub fn params(&self) -> &ErosionParams {
        &self.params
    }

    /// Hydraulic pass (if enabled) followed by the thermal pass (if enabled).
    ///
    /// `cell_spacing` is the horizontal distance between neighboring cells in
    /// height units and sets the slope the talus angle is measured against.
    /// `seed` drives raindrop placement.
    pub fn run(&self, heightmap: &mut Tilemap<f32>, cell_spacing: f32, seed: u64) -> Result<ErosionStats, TerrainError> {
        if heightmap.is_empty() {
            return Err(TerrainError::EmptyGrid);
        }

        let mut stats = if self.params.parallel {
            hydraulic::simulate_parallel(heightmap, &self.params, seed)
        } else {
            hydraulic::simulate(heightmap, &self.params, seed)
        };
        if self.params.hydraulic_is_noop() {
            stats.iterations = 0;
        }

        stats.material_moved = thermal::simulate(heightmap, &self.params, cell_spacing);

        info!(
            width = heightmap.width,
            height = heightmap.height,
            drops = stats.iterations,
            eroded = stats.total_eroded,
            slumped = stats.material_moved,
            "erosion complete"
        );
        Ok(stats)
    }
}
