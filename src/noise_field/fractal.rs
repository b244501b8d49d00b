//! Fractal combinators layering a lattice primitive over several octaves.

use super::gradient::{perlin_2d, perlin_3d};
use super::permutation::PermutationTable;
use super::simplex::{simplex_2d, simplex_3d};
use super::{LatticeNoise, NoiseParams, MAX_FREQUENCY};

#[inline]
fn lattice_2d(table: &PermutationTable, base: LatticeNoise, x: f64, y: f64) -> f64 {
    match base {
        LatticeNoise::Gradient => perlin_2d(table, x, y),
        LatticeNoise::Simplex => simplex_2d(table, x, y),
    }
}

#[inline]
fn lattice_3d(table: &PermutationTable, base: LatticeNoise, x: f64, y: f64, z: f64) -> f64 {
    match base {
        LatticeNoise::Gradient => perlin_3d(table, x, y, z),
        LatticeNoise::Simplex => simplex_3d(table, x, y, z),
    }
}

/// Fractional Brownian motion in 2D. `params` must already be sanitized.
///
/// The octave sum is divided by the sum of amplitudes, so the result stays
/// in [-1, 1] for any octave count.
pub fn fbm_2d(table: &PermutationTable, x: f64, y: f64, params: &NoiseParams) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = params.frequency;
    let mut amplitude_sum = 0.0;

    for _ in 0..params.octaves {
        total += lattice_2d(table, params.base, x * frequency, y * frequency) * amplitude;
        amplitude_sum += amplitude;
        amplitude *= params.persistence;
        frequency = (frequency * params.lacunarity).min(MAX_FREQUENCY);
    }

    if amplitude_sum > 0.0 {
        (total / amplitude_sum).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Fractional Brownian motion in 3D, normalized like [`fbm_2d`].
pub fn fbm_3d(table: &PermutationTable, x: f64, y: f64, z: f64, params: &NoiseParams) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = params.frequency;
    let mut amplitude_sum = 0.0;

    for _ in 0..params.octaves {
        total += lattice_3d(
            table,
            params.base,
            x * frequency,
            y * frequency,
            z * frequency,
        ) * amplitude;
        amplitude_sum += amplitude;
        amplitude *= params.persistence;
        frequency = (frequency * params.lacunarity).min(MAX_FREQUENCY);
    }

    if amplitude_sum > 0.0 {
        (total / amplitude_sum).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Ridged multifractal in 2D, in [0, 1].
///
/// Each layer folds the base noise into sharp crests (`(1 - |n|)^2`) and is
/// weighted by the previous layer, so detail gathers along ridges and valleys
/// stay smooth.
pub fn ridged_2d(table: &PermutationTable, x: f64, y: f64, params: &NoiseParams) -> f64 {
    const GAIN: f64 = 2.0;

    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = params.frequency;
    let mut amplitude_sum = 0.0;
    let mut weight = 1.0;

    for _ in 0..params.octaves {
        let n = lattice_2d(table, params.base, x * frequency, y * frequency);
        let mut signal = 1.0 - n.abs();
        signal *= signal;
        signal *= weight;
        weight = (signal * GAIN).clamp(0.0, 1.0);

        total += signal * amplitude;
        amplitude_sum += amplitude;
        amplitude *= params.persistence;
        frequency = (frequency * params.lacunarity).min(MAX_FREQUENCY);
    }

    if amplitude_sum > 0.0 {
        (total / amplitude_sum).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
