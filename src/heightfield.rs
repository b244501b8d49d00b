//! Square terrain height-field with normals, local edits and erosion.
//!
//! The field owns its elevation grid plus a parallel grid of unit normals.
//! Integer access is lenient: reads outside the grid return 0.0 (or the up
//! vector for normals) and writes outside the grid are ignored, so
//! neighborhood math at the borders needs no special cases.

use crate::diamond_square::DiamondSquare;
use crate::erosion::{ErosionParams, ErosionSimulator, ErosionStats};
use crate::error::TerrainError;
use crate::export;
use crate::noise_field::{LatticeNoise, NoiseField, NoiseKind, NoiseParams};
use crate::seeds::TerrainSeeds;
use crate::tilemap::Tilemap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Normal of a flat surface, returned for out-of-range queries.
pub const UP: [f32; 3] = [0.0, 1.0, 0.0];

/// Noise-driven generation settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub kind: NoiseKind,
    /// 0 = smooth, 1 = rough; mapped linearly to persistence 0.25..0.75
    pub roughness: f32,
    pub octaves: u32,
    /// Lattice cells across the whole field for the first octave
    pub frequency: f64,
    pub lacunarity: f64,
    pub base: LatticeNoise,
    /// Elevation assigned to the lowest possible noise value
    pub min_height: f32,
    /// Elevation assigned to the highest possible noise value
    pub max_height: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            kind: NoiseKind::Fbm,
            roughness: 0.5,
            octaves: 6,
            frequency: 4.0,
            lacunarity: 2.0,
            base: LatticeNoise::Gradient,
            min_height: 0.0,
            max_height: 1.0,
        }
    }
}

impl GenerationParams {
    pub fn noise_params(&self) -> NoiseParams {
        NoiseParams {
            frequency: self.frequency,
            octaves: self.octaves,
            persistence: roughness_to_persistence(self.roughness),
            lacunarity: self.lacunarity,
            base: self.base,
        }
    }

    /// Output elevation range, swapped if given backwards.
    fn height_range(&self) -> (f32, f32) {
        sanitize_range(self.min_height, self.max_height)
    }
}

fn roughness_to_persistence(roughness: f32) -> f64 {
    let r = if roughness.is_nan() {
        0.5
    } else {
        roughness.clamp(0.0, 1.0)
    };
    0.25 + 0.5 * r as f64
}

fn sanitize_range(min: f32, max: f32) -> (f32, f32) {
    let min = if min.is_finite() { min } else { 0.0 };
    let max = if max.is_finite() { max } else { 1.0 };
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

/// Summary of the elevation grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
}

/// A `resolution x resolution` grid of elevations with cached normals.
#[derive(Clone, Debug)]
pub struct HeightField {
    resolution: usize,
    /// Horizontal distance between neighboring cells, in height units
    cell_spacing: f32,
    heights: Tilemap<f32>,
    normals: Tilemap<[f32; 3]>,
    normals_stale: bool,
    /// Master seed of the last generation call
    seed: u64,
    /// Erosion calls since the last generation, folded into raindrop seeds
    erosion_passes: u64,
}

impl HeightField {
    /// Flat field at elevation 0. `resolution` must be at least 2.
    pub fn new(resolution: usize) -> Result<Self, TerrainError> {
        if resolution < 2 {
            return Err(TerrainError::InvalidResolution { resolution });
        }
        Ok(Self {
            resolution,
            cell_spacing: 1.0 / (resolution - 1) as f32,
            heights: Tilemap::new_with(resolution, resolution, 0.0),
            normals: Tilemap::new_with(resolution, resolution, UP),
            normals_stale: false,
            seed: 0,
            erosion_passes: 0,
        })
    }

    /// Wrap an existing square grid. Non-finite cells become 0.
    pub fn from_heights(mut heights: Tilemap<f32>) -> Result<Self, TerrainError> {
        if heights.width != heights.height {
            return Err(TerrainError::NonSquareGrid {
                width: heights.width,
                height: heights.height,
            });
        }
        let mut field = Self::new(heights.width)?;
        for h in heights.as_mut_slice() {
            if !h.is_finite() {
                *h = 0.0;
            }
        }
        field.heights = heights;
        field.calculate_normals();
        Ok(field)
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn cell_spacing(&self) -> f32 {
        self.cell_spacing
    }

    /// Change the horizontal cell spacing. Non-positive or non-finite values
    /// are ignored.
    pub fn set_cell_spacing(&mut self, spacing: f32) {
        if !(spacing.is_finite() && spacing > 0.0) {
            warn!(spacing, "ignoring invalid cell spacing");
            return;
        }
        self.cell_spacing = spacing;
        self.normals_stale = true;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn heights(&self) -> &Tilemap<f32> {
        &self.heights
    }

    /// Mutable access to the raw grid; normals are marked stale.
    pub fn heights_mut(&mut self) -> &mut Tilemap<f32> {
        self.normals_stale = true;
        &mut self.heights
    }

    /// True if elevations changed since the last `calculate_normals`.
    pub fn normals_stale(&self) -> bool {
        self.normals_stale
    }

    /// Normal grid, recomputed first if elevations changed.
    pub fn normals(&mut self) -> &Tilemap<[f32; 3]> {
        if self.normals_stale {
            self.calculate_normals();
        }
        &self.normals
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// fBm terrain in [0, 1] from a seed, a roughness in [0, 1] and an
    /// octave count.
    pub fn generate_procedural(&mut self, seed: u64, roughness: f32, octaves: u32) {
        let params = GenerationParams {
            roughness,
            octaves,
            ..Default::default()
        };
        self.generate_procedural_with(seed, &params);
    }

    /// Noise-driven generation with full control over the noise kind and
    /// elevation range. Cells are sampled at normalized coordinates, so the
    /// shape does not depend on resolution.
    pub fn generate_procedural_with(&mut self, seed: u64, params: &GenerationParams) {
        let field = NoiseField::new(TerrainSeeds::from_master(seed).noise);
        let noise = params.noise_params();
        let kind = params.kind;
        let (lo, hi) = kind.range();
        let (min_h, max_h) = params.height_range();
        let span = (max_h - min_h) as f64;
        let res = self.resolution;
        let inv = 1.0 / (res - 1) as f64;

        self.heights
            .as_mut_slice()
            .par_chunks_mut(res)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let v = kind.sample_2d(&field, x as f64 * inv, y as f64 * inv, &noise);
                    let t = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
                    *cell = (min_h as f64 + t * span) as f32;
                }
            });

        self.seed = seed;
        self.erosion_passes = 0;
        self.calculate_normals();
        debug!(seed, kind = %kind, resolution = res, "procedural generation complete");
    }

    /// Fill from any `noise` crate source sampled at normalized coordinates.
    /// Source values are clamped to [-1, 1] and mapped onto [min, max].
    pub fn fill_from_noise<N>(&mut self, source: &N, min_height: f32, max_height: f32)
    where
        N: noise::NoiseFn<f64, 2> + Sync,
    {
        let (min_h, max_h) = sanitize_range(min_height, max_height);
        let span = max_h - min_h;
        let res = self.resolution;
        let inv = 1.0 / (res - 1) as f64;

        self.heights
            .as_mut_slice()
            .par_chunks_mut(res)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let v = source.get([x as f64 * inv, y as f64 * inv]);
                    let v = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
                    *cell = min_h + ((v as f32 + 1.0) * 0.5) * span;
                }
            });

        self.erosion_passes = 0;
        self.calculate_normals();
    }

    /// Diamond-square terrain in [0, max_height]. Requires a `2^n + 1`
    /// resolution.
    pub fn generate_diamond_square(&mut self, seed: u64, roughness: f32, max_height: f32) -> Result<(), TerrainError> {
        let synth = DiamondSquare {
            roughness,
            max_height,
            corner_height: 0.0,
        };
        synth.generate(&mut self.heights, TerrainSeeds::from_master(seed).displacement)?;
        self.seed = seed;
        self.erosion_passes = 0;
        self.calculate_normals();
        Ok(())
    }

    // =========================================================================
    // Access and editing
    // =========================================================================

    /// Elevation at a cell, 0.0 outside the grid.
    pub fn get_height(&self, x: i32, y: i32) -> f32 {
        self.heights.get_checked(x as i64, y as i64).copied().unwrap_or(0.0)
    }

    /// Set a cell; writes outside the grid or of non-finite values are ignored.
    pub fn set_height(&mut self, x: i32, y: i32, value: f32) {
        if !value.is_finite() || !self.heights.contains(x as i64, y as i64) {
            return;
        }
        self.heights.set(x as usize, y as usize, value);
        self.normals_stale = true;
    }

    /// Bilinear sample at continuous grid coordinates, clamped to the edges.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        self.heights.sample_bilinear(x, y)
    }

    /// Raise (or lower, for negative `delta`) every cell within `radius` of
    /// `(cx, cy)` by `delta * weight`.
    ///
    /// `weight = 1 - t^p` with `t = distance / radius` and
    /// `p = 1 / (1 - 0.95 * falloff)`: falloff 0 is a linear cone, falloff 1
    /// a near-flat plateau with a steep rim. Normals are marked stale but not
    /// recomputed.
    pub fn modify_height_area(&mut self, cx: f32, cy: f32, delta: f32, radius: f32, falloff: f32) {
        if !(radius.is_finite() && radius > 0.0) || !delta.is_finite() || !cx.is_finite() || !cy.is_finite() {
            return;
        }
        let falloff = if falloff.is_nan() { 0.0 } else { falloff.clamp(0.0, 1.0) };
        let exponent = 1.0 / (1.0 - 0.95 * falloff);
        let last = (self.resolution - 1) as f32;

        let x0 = (cx - radius).floor().clamp(0.0, last) as usize;
        let x1 = (cx + radius).ceil().clamp(0.0, last) as usize;
        let y0 = (cy - radius).floor().clamp(0.0, last) as usize;
        let y1 = (cy + radius).ceil().clamp(0.0, last) as usize;

        let mut touched = 0usize;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d >= radius {
                    continue;
                }
                let weight = 1.0 - (d / radius).powf(exponent);
                *self.heights.get_mut(x, y) += delta * weight;
                touched += 1;
            }
        }

        if touched > 0 {
            self.normals_stale = true;
        }
    }

    // =========================================================================
    // Normals
    // =========================================================================

    /// Recompute every normal from central differences, replicating edge
    /// cells at the border.
    pub fn calculate_normals(&mut self) {
        let heights = &self.heights;
        let spacing = self.cell_spacing;
        let res = self.resolution;

        self.normals
            .as_mut_slice()
            .par_chunks_mut(res)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, n) in row.iter_mut().enumerate() {
                    *n = normal_at(heights, x as i64, y as i64, spacing);
                }
            });

        self.normals_stale = false;
    }

    /// Unit normal at a cell, `(0, 1, 0)` outside the grid. While elevations
    /// are newer than the cached normals the value is derived directly.
    pub fn get_normal(&self, x: i32, y: i32) -> [f32; 3] {
        let (x, y) = (x as i64, y as i64);
        if !self.heights.contains(x, y) {
            return UP;
        }
        if self.normals_stale {
            normal_at(&self.heights, x, y, self.cell_spacing)
        } else {
            *self.normals.get(x as usize, y as usize)
        }
    }

    // =========================================================================
    // Erosion
    // =========================================================================

    /// Hydraulic erosion with the given raindrop settings, then normals.
    pub fn apply_erosion(
        &mut self,
        iterations: usize,
        rain_rate: f32,
        solubility: f32,
        evaporation: f32,
    ) -> Result<ErosionStats, TerrainError> {
        self.apply_erosion_with(&ErosionParams::hydraulic(iterations, rain_rate, solubility, evaporation))
    }

    /// Thermal erosion only, then normals.
    pub fn apply_thermal_erosion(&mut self, iterations: usize, talus_angle: f32) -> Result<ErosionStats, TerrainError> {
        self.apply_erosion_with(&ErosionParams::thermal(iterations, talus_angle))
    }

    /// Run every enabled erosion pass in `params`, then normals.
    ///
    /// Raindrops are seeded from the generation seed and the number of
    /// erosion calls made since, so repeating a call sequence repeats the
    /// result exactly.
    pub fn apply_erosion_with(&mut self, params: &ErosionParams) -> Result<ErosionStats, TerrainError> {
        let seed = TerrainSeeds::from_master(self.seed)
            .erosion
            .wrapping_add(self.erosion_passes.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let stats = ErosionSimulator::new(params.clone()).run(&mut self.heights, self.cell_spacing, seed)?;
        self.erosion_passes += 1;
        self.calculate_normals();
        Ok(stats)
    }

    // =========================================================================
    // Statistics and images
    // =========================================================================

    pub fn stats(&self) -> HeightStats {
        let (min, max) = self.heights.min_max();
        HeightStats {
            min,
            max,
            mean: self.heights.mean(),
        }
    }

    /// Import a square grayscale image, mapping black to `min_height` and
    /// white to `max_height`.
    pub fn load_from_image<P: AsRef<Path>>(path: P, min_height: f32, max_height: f32) -> Result<Self, TerrainError> {
        let (min_h, max_h) = sanitize_range(min_height, max_height);
        let heights = export::load_heightmap(path, min_h, max_h)?;
        Self::from_heights(heights)
    }

    /// Export as a 16-bit grayscale PNG stretched over the field's own range.
    pub fn save_to_image<P: AsRef<Path>>(&self, path: P) -> Result<(), TerrainError> {
        export::save_heightmap_png(&self.heights, path)
    }
}

/// `(h(x-1,y) - h(x+1,y), 2 * spacing, h(x,y-1) - h(x,y+1))`, normalized.
fn normal_at(heights: &Tilemap<f32>, x: i64, y: i64, spacing: f32) -> [f32; 3] {
    let h_l = *heights.get_clamped(x - 1, y);
    let h_r = *heights.get_clamped(x + 1, y);
    let h_u = *heights.get_clamped(x, y - 1);
    let h_d = *heights.get_clamped(x, y + 1);

    let n = [h_l - h_r, 2.0 * spacing, h_u - h_d];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 && len.is_finite() {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        UP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noise::{Perlin, Seedable};

    fn length(n: [f32; 3]) -> f32 {
        (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt()
    }

    #[test]
    fn test_resolution_precondition() {
        assert!(matches!(HeightField::new(1), Err(TerrainError::InvalidResolution { resolution: 1 })));
        assert!(HeightField::new(0).is_err());
        let field = HeightField::new(2).unwrap();
        assert_eq!(field.resolution(), 2);
        assert_eq!(field.cell_spacing(), 1.0);
    }

    #[test]
    fn test_out_of_range_access_is_lenient() {
        let mut field = HeightField::new(9).unwrap();
        field.generate_procedural(1, 0.5, 4);

        assert_eq!(field.get_height(-1, 0), 0.0);
        assert_eq!(field.get_height(9, 0), 0.0);
        assert_eq!(field.get_height(0, i32::MAX), 0.0);
        assert_eq!(field.get_normal(-1, 0), UP);
        assert_eq!(field.get_normal(9, 3), UP);

        let before = field.heights().clone();
        field.set_height(-1, 4, 100.0);
        field.set_height(4, 9, 100.0);
        field.set_height(3, 3, f32::NAN);
        assert_eq!(field.heights(), &before);
        assert!(!field.normals_stale());

        field.set_height(3, 3, 0.25);
        assert_eq!(field.get_height(3, 3), 0.25);
        assert!(field.normals_stale());
    }

    #[test]
    fn test_generation_is_deterministic_and_in_range() {
        let mut a = HeightField::new(33).unwrap();
        let mut b = HeightField::new(33).unwrap();
        a.generate_procedural(7, 0.5, 6);
        b.generate_procedural(7, 0.5, 6);
        assert_eq!(a.heights(), b.heights());

        let stats = a.stats();
        assert!(stats.min >= 0.0 && stats.max <= 1.0);
        assert!(stats.max > stats.min);

        b.generate_procedural(8, 0.5, 6);
        assert_ne!(a.heights(), b.heights());
    }

    #[test]
    fn test_generation_with_kinds_respects_range() {
        let mut field = HeightField::new(17).unwrap();
        for &kind in NoiseKind::all() {
            let params = GenerationParams {
                kind,
                min_height: -20.0,
                max_height: 80.0,
                ..Default::default()
            };
            field.generate_procedural_with(3, &params);
            let stats = field.stats();
            assert!(stats.min >= -20.0 && stats.max <= 80.0, "{} out of range", kind);
        }
    }

    #[test]
    fn test_extreme_frequency_never_yields_nan() {
        let mut field = HeightField::new(17).unwrap();
        for &kind in NoiseKind::all() {
            let params = GenerationParams {
                kind,
                frequency: 1e308,
                octaves: 2,
                ..Default::default()
            };
            field.generate_procedural_with(1, &params);
            assert!(field.heights().all_finite(), "{} produced a non-finite cell", kind);
            let stats = field.stats();
            assert!(stats.min >= 0.0 && stats.max <= 1.0);
        }
    }

    #[test]
    fn test_falloff_decays_monotonically() {
        for falloff in [0.0, 0.3, 0.7, 1.0] {
            let mut field = HeightField::new(33).unwrap();
            field.modify_height_area(16.0, 16.0, 1.0, 10.0, falloff);

            let profile: Vec<f32> = (16..=30).map(|x| field.get_height(x, 16)).collect();
            assert!((profile[0] - 1.0).abs() < 1e-6);
            for pair in profile.windows(2) {
                assert!(pair[1] <= pair[0], "falloff {} not monotonic: {:?}", falloff, profile);
            }
            // Distance 10 and beyond untouched
            assert_eq!(field.get_height(26, 16), 0.0);
            assert_eq!(field.get_height(0, 0), 0.0);
        }

        // Sharp falloff keeps a plateau at half radius
        let mut sharp = HeightField::new(33).unwrap();
        sharp.modify_height_area(16.0, 16.0, 1.0, 10.0, 1.0);
        assert!(sharp.get_height(21, 16) > 0.99);
        let mut linear = HeightField::new(33).unwrap();
        linear.modify_height_area(16.0, 16.0, 1.0, 10.0, 0.0);
        assert!((linear.get_height(21, 16) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_modify_area_degenerate_radius_is_noop() {
        let mut field = HeightField::new(9).unwrap();
        for radius in [0.0, -3.0, f32::NAN, f32::INFINITY] {
            field.modify_height_area(4.0, 4.0, 1.0, radius, 0.5);
        }
        // Circle entirely off the grid
        field.modify_height_area(-50.0, -50.0, 1.0, 5.0, 0.5);
        assert!(field.heights().as_slice().iter().all(|&h| h == 0.0));
        assert!(!field.normals_stale());
    }

    #[test]
    fn test_normals_are_unit_length() {
        let mut field = HeightField::new(33).unwrap();
        field.generate_procedural(11, 0.8, 8);
        for y in 0..33 {
            for x in 0..33 {
                assert!((length(field.get_normal(x, y)) - 1.0).abs() < 1e-5);
            }
        }

        let flat = HeightField::new(5).unwrap();
        assert_eq!(flat.get_normal(2, 2), UP);
    }

    #[test]
    fn test_stale_normals_are_never_served() {
        let mut field = HeightField::new(9).unwrap();
        field.modify_height_area(4.0, 4.0, 2.0, 3.0, 0.0);
        assert!(field.normals_stale());

        let live = field.get_normal(3, 4);
        // Ground rises toward +x, so the normal leans toward -x
        assert!(live[0] < 0.0);
        let cached = *field.normals().get(3, 4);
        assert_eq!(live, cached);
        assert!(!field.normals_stale());
    }

    #[test]
    fn test_end_to_end_erosion_scenario() {
        let run = || {
            let mut field = HeightField::new(65).unwrap();
            field.generate_procedural(42, 0.5, 6);
            let before = field.stats().mean;
            field.apply_erosion(1000, 0.01, 0.01, 0.5).unwrap();
            (field, before)
        };

        let (field, before) = run();
        assert!(field.heights().all_finite());
        assert!(field.stats().mean <= before + 1e-6);
        assert!(!field.normals_stale());

        let (again, _) = run();
        assert_eq!(field.heights(), again.heights());
    }

    #[test]
    fn test_repeated_erosion_passes_differ() {
        let mut field = HeightField::new(33).unwrap();
        field.generate_procedural(5, 0.5, 6);
        field.apply_erosion(300, 0.01, 0.5, 0.5).unwrap();
        let once = field.heights().clone();
        field.apply_erosion(300, 0.01, 0.5, 0.5).unwrap();
        assert_ne!(field.heights(), &once);
    }

    #[test]
    fn test_thermal_erosion_conserves_mass() {
        let mut field = HeightField::new(33).unwrap();
        field.generate_procedural_with(
            9,
            &GenerationParams {
                kind: NoiseKind::Ridged,
                max_height: 5.0,
                ..Default::default()
            },
        );
        let before = field.heights().total();
        let stats = field.apply_thermal_erosion(10, 0.5).unwrap();
        assert!(stats.material_moved > 0.0);
        assert!((field.heights().total() - before).abs() < 1e-2);
    }

    #[test]
    fn test_diamond_square_generation() {
        let mut field = HeightField::new(33).unwrap();
        field.generate_diamond_square(4, 0.55, 30.0).unwrap();
        let stats = field.stats();
        assert!(stats.min >= 0.0 && stats.max <= 30.0);
        assert_eq!(field.get_height(0, 0), 0.0);
        assert_eq!(field.get_height(32, 32), 0.0);

        let mut odd = HeightField::new(32).unwrap();
        assert!(odd.generate_diamond_square(4, 0.55, 30.0).is_err());
    }

    #[test]
    fn test_fill_from_noise_crate_source() {
        let perlin = Perlin::new(1).set_seed(77);
        let mut field = HeightField::new(17).unwrap();
        field.fill_from_noise(&perlin, 10.0, 20.0);
        let stats = field.stats();
        assert!(stats.min >= 10.0 && stats.max <= 20.0);

        let sampler = NoiseField::new(3).sampler(NoiseKind::Fbm, NoiseParams::default());
        field.fill_from_noise(&sampler, 0.0, 1.0);
        assert!(field.heights().all_finite());
    }

    #[test]
    fn test_from_heights_requires_square_grid() {
        let grid = Tilemap::new_with(4, 3, 0.0f32);
        assert!(matches!(
            HeightField::from_heights(grid),
            Err(TerrainError::NonSquareGrid { width: 4, height: 3 })
        ));

        let mut grid = Tilemap::new_with(3, 3, 1.0f32);
        grid.set(1, 1, f32::INFINITY);
        let field = HeightField::from_heights(grid).unwrap();
        assert_eq!(field.get_height(1, 1), 0.0);
    }
}
