//! Diamond-square midpoint displacement.
//!
//! An alternative to noise-driven generation: starting from the four corners,
//! each round fills square centers (diamond step) and then edge midpoints
//! (square step) with the average of their neighbors plus a random offset.
//! The offset amplitude shrinks by `roughness` every round, which gives the
//! result its self-similar look.

use crate::error::TerrainError;
use crate::tilemap::Tilemap;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Diamond-square synthesizer settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiamondSquare {
    /// Per-round amplitude multiplier, clamped to [0, 1]
    pub roughness: f32,
    /// Initial offset amplitude and upper bound of every generated cell
    pub max_height: f32,
    /// Value written to the four corners
    pub corner_height: f32,
}

impl Default for DiamondSquare {
    fn default() -> Self {
        Self {
            roughness: 0.6,
            max_height: 1.0,
            corner_height: 0.0,
        }
    }
}

/// True if `size` is `2^n + 1` for some `n >= 0`.
pub fn is_power_of_two_plus_one(size: usize) -> bool {
    size >= 2 && (size - 1).is_power_of_two()
}

impl DiamondSquare {
    pub fn new(roughness: f32, max_height: f32) -> Self {
        Self {
            roughness,
            max_height,
            ..Default::default()
        }
    }

    fn clamped_roughness(&self) -> f32 {
        if self.roughness.is_nan() {
            0.5
        } else {
            self.roughness.clamp(0.0, 1.0)
        }
    }

    fn clamped_max_height(&self) -> f32 {
        if self.max_height.is_finite() {
            self.max_height.max(0.0)
        } else {
            0.0
        }
    }

    /// Fill `grid` in place. The grid must be square with a side of `2^n + 1`.
    ///
    /// Corners are set to `corner_height` and never touched again; every
    /// other cell ends up in `[0, max_height]`.
    pub fn generate(&self, grid: &mut Tilemap<f32>, seed: u64) -> Result<(), TerrainError> {
        let size = grid.width;
        if grid.height != size {
            return Err(TerrainError::NonSquareGrid {
                width: grid.width,
                height: grid.height,
            });
        }
        if !is_power_of_two_plus_one(size) {
            return Err(TerrainError::NotPowerOfTwoPlusOne {
                width: grid.width,
                height: grid.height,
            });
        }

        let roughness = self.clamped_roughness();
        let max_height = self.clamped_max_height();
        let last = size - 1;

        grid.fill(0.0);
        for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
            grid.set(x, y, self.corner_height);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut scale = max_height;
        let mut step = last;
        let mut rounds = 0;

        while step > 1 {
            let half = step / 2;

            // Diamond step: centers of each square
            for y in (half..size).step_by(step) {
                for x in (half..size).step_by(step) {
                    let avg = (*grid.get(x - half, y - half)
                        + *grid.get(x + half, y - half)
                        + *grid.get(x - half, y + half)
                        + *grid.get(x + half, y + half))
                        * 0.25;
                    grid.set(x, y, displace(avg, scale, max_height, &mut rng));
                }
            }

            // Square step: edge midpoints, in-bounds neighbors only
            for y in (0..size).step_by(half) {
                let x_start = if (y / half) % 2 == 0 { half } else { 0 };
                for x in (x_start..size).step_by(step) {
                    let avg = square_average(grid, x, y, half);
                    grid.set(x, y, displace(avg, scale, max_height, &mut rng));
                }
            }

            scale *= roughness;
            step = half;
            rounds += 1;
        }

        debug!(size, rounds, "diamond-square complete");
        Ok(())
    }

    /// Allocate a `size x size` grid and fill it.
    pub fn generate_grid(&self, size: usize, seed: u64) -> Result<Tilemap<f32>, TerrainError> {
        let mut grid = Tilemap::new_with(size, size, 0.0f32);
        self.generate(&mut grid, seed)?;
        Ok(grid)
    }
}

/// Average of the 2, 3 or 4 axis neighbors at distance `half` that exist.
fn square_average(grid: &Tilemap<f32>, x: usize, y: usize, half: usize) -> f32 {
    let (x, y, half) = (x as i64, y as i64, half as i64);
    let mut sum = 0.0;
    let mut count = 0;
    for (nx, ny) in [(x - half, y), (x + half, y), (x, y - half), (x, y + half)] {
        if let Some(&h) = grid.get_checked(nx, ny) {
            sum += h;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Add a symmetric random offset and fold the result into `[0, max_height]`.
#[inline]
fn displace(avg: f32, scale: f32, max_height: f32, rng: &mut ChaCha8Rng) -> f32 {
    let offset = rng.gen_range(-1.0f32..=1.0) * scale;
    (avg + offset).abs().min(max_height)
}
