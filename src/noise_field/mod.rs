//! Deterministic coherent noise for terrain synthesis.
//!
//! A [`NoiseField`] owns a seeded permutation table and exposes the lattice
//! primitives (gradient, simplex, cellular) plus the fractal combinators built
//! on top of them. Identical seeds give bit-identical output, and a field can
//! be cloned and sampled from many threads at once.

pub mod cellular;
pub mod fractal;
pub mod gradient;
pub mod permutation;
pub mod simplex;

pub use permutation::PermutationTable;

use crate::tilemap::Tilemap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound on octaves; deeper stacks fall below f32 resolution anyway.
pub const MAX_OCTAVES: u32 = 32;

/// Upper bound on any octave's frequency. Past this, f64 sample coordinates
/// have no fractional part left and octaves stop adding detail.
pub const MAX_FREQUENCY: f64 = 1.0e12;

/// Lattice primitive used by the fractal layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatticeNoise {
    #[default]
    Gradient,
    Simplex,
}

/// Shape parameters for fractal noise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Base frequency in lattice cells per input unit
    pub frequency: f64,
    /// Number of layers; 0 is treated as 1
    pub octaves: u32,
    /// Amplitude multiplier per octave, clamped to [0, 1]
    pub persistence: f64,
    /// Frequency multiplier per octave, clamped to [1, 4]
    pub lacunarity: f64,
    pub base: LatticeNoise,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
            base: LatticeNoise::Gradient,
        }
    }
}

impl NoiseParams {
    pub fn new(frequency: f64, octaves: u32, persistence: f64, lacunarity: f64) -> Self {
        Self {
            frequency,
            octaves,
            persistence,
            lacunarity,
            base: LatticeNoise::Gradient,
        }
    }

    pub fn with_base(mut self, base: LatticeNoise) -> Self {
        self.base = base;
        self
    }

    /// Clamp every field into a range the combinators can evaluate without
    /// producing NaN or infinity.
    pub fn sanitized(&self) -> Self {
        let persistence = if self.persistence.is_finite() {
            self.persistence.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let lacunarity = if self.lacunarity.is_finite() {
            self.lacunarity.clamp(1.0, 4.0)
        } else {
            2.0
        };
        Self {
            frequency: sanitize_frequency(self.frequency),
            octaves: self.octaves.clamp(1, MAX_OCTAVES),
            persistence,
            lacunarity,
            base: self.base,
        }
    }
}

/// Zero, negative and non-finite frequencies collapse the field to a constant.
/// Larger ones are capped at [`MAX_FREQUENCY`].
#[inline]
fn sanitize_frequency(frequency: f64) -> f64 {
    if frequency.is_finite() {
        frequency.clamp(0.0, MAX_FREQUENCY)
    } else {
        0.0
    }
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Noise variants selectable at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    /// Single layer of gradient noise
    Gradient,
    /// Single layer of simplex noise
    Simplex,
    /// Distance to the nearest feature point
    Cellular,
    /// Fractional Brownian motion
    #[default]
    Fbm,
    /// Ridged multifractal
    Ridged,
}

impl NoiseKind {
    pub fn all() -> &'static [Self] {
        &[Self::Gradient, Self::Simplex, Self::Cellular, Self::Fbm, Self::Ridged]
    }

    /// Closed output range of [`NoiseKind::sample_2d`].
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Gradient | Self::Simplex | Self::Fbm => (-1.0, 1.0),
            Self::Cellular | Self::Ridged => (0.0, 1.0),
        }
    }

    /// Sample this variant. Single-layer kinds only read `params.frequency`
    /// (and ignore `params.base`).
    pub fn sample_2d(&self, field: &NoiseField, x: f64, y: f64, params: &NoiseParams) -> f64 {
        match self {
            Self::Gradient => field.gradient_noise_2d(x, y, params.frequency),
            Self::Simplex => field.simplex_noise_2d(x, y, params.frequency),
            Self::Cellular => field.cellular_noise_2d(x, y, params.frequency),
            Self::Fbm => field.fractal_brownian_motion_2d(x, y, params),
            Self::Ridged => field.ridged_multifractal_2d(x, y, params),
        }
    }
}

impl std::fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gradient => write!(f, "gradient"),
            Self::Simplex => write!(f, "simplex"),
            Self::Cellular => write!(f, "cellular"),
            Self::Fbm => write!(f, "fbm"),
            Self::Ridged => write!(f, "ridged"),
        }
    }
}

impl std::str::FromStr for NoiseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gradient" | "perlin" => Ok(Self::Gradient),
            "simplex" => Ok(Self::Simplex),
            "cellular" | "worley" => Ok(Self::Cellular),
            "fbm" => Ok(Self::Fbm),
            "ridged" => Ok(Self::Ridged),
            other => Err(format!("unknown noise kind '{}'", other)),
        }
    }
}

/// Seeded source of coherent noise.
///
/// Cloning is cheap: clones share the permutation table. Reseeding swaps in
/// a fresh table and leaves existing clones untouched.
#[derive(Clone, Debug)]
pub struct NoiseField {
    seed: u64,
    table: Arc<PermutationTable>,
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            table: Arc::new(PermutationTable::new(seed)),
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.table = Arc::new(PermutationTable::new(seed));
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Perlin gradient noise in [-1, 1].
    pub fn gradient_noise_2d(&self, x: f64, y: f64, frequency: f64) -> f64 {
        let f = sanitize_frequency(frequency);
        gradient::perlin_2d(&self.table, finite_or_zero(x) * f, finite_or_zero(y) * f)
    }

    pub fn gradient_noise_3d(&self, x: f64, y: f64, z: f64, frequency: f64) -> f64 {
        let f = sanitize_frequency(frequency);
        gradient::perlin_3d(
            &self.table,
            finite_or_zero(x) * f,
            finite_or_zero(y) * f,
            finite_or_zero(z) * f,
        )
    }

    /// Simplex noise in [-1, 1].
    pub fn simplex_noise_2d(&self, x: f64, y: f64, frequency: f64) -> f64 {
        let f = sanitize_frequency(frequency);
        simplex::simplex_2d(&self.table, finite_or_zero(x) * f, finite_or_zero(y) * f)
    }

    pub fn simplex_noise_3d(&self, x: f64, y: f64, z: f64, frequency: f64) -> f64 {
        let f = sanitize_frequency(frequency);
        simplex::simplex_3d(
            &self.table,
            finite_or_zero(x) * f,
            finite_or_zero(y) * f,
            finite_or_zero(z) * f,
        )
    }

    /// Worley F1 noise in [0, 1].
    pub fn cellular_noise_2d(&self, x: f64, y: f64, frequency: f64) -> f64 {
        let f = sanitize_frequency(frequency);
        cellular::worley_2d(&self.table, finite_or_zero(x) * f, finite_or_zero(y) * f)
    }

    /// fBm in [-1, 1] for any octave count.
    pub fn fractal_brownian_motion_2d(&self, x: f64, y: f64, params: &NoiseParams) -> f64 {
        fractal::fbm_2d(
            &self.table,
            finite_or_zero(x),
            finite_or_zero(y),
            &params.sanitized(),
        )
    }

    pub fn fractal_brownian_motion_3d(&self, x: f64, y: f64, z: f64, params: &NoiseParams) -> f64 {
        fractal::fbm_3d(
            &self.table,
            finite_or_zero(x),
            finite_or_zero(y),
            finite_or_zero(z),
            &params.sanitized(),
        )
    }

    /// Ridged multifractal in [0, 1].
    pub fn ridged_multifractal_2d(&self, x: f64, y: f64, params: &NoiseParams) -> f64 {
        fractal::ridged_2d(
            &self.table,
            finite_or_zero(x),
            finite_or_zero(y),
            &params.sanitized(),
        )
    }

    /// Wrap this field as a [`noise::NoiseFn`] source.
    pub fn sampler(&self, kind: NoiseKind, params: NoiseParams) -> NoiseSampler {
        NoiseSampler {
            field: self.clone(),
            kind,
            params: params.sanitized(),
        }
    }
}

/// Fill a `width x height` grid with noise sampled at `(x * scale, y * scale)`.
/// Rows are evaluated in parallel.
pub fn noise_map(
    field: &NoiseField,
    width: usize,
    height: usize,
    kind: NoiseKind,
    scale: f64,
    params: &NoiseParams,
) -> Tilemap<f32> {
    let mut map = Tilemap::new_with(width, height, 0.0f32);
    if map.is_empty() {
        return map;
    }
    let scale = finite_or_zero(scale);
    let params = params.sanitized();

    map.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = kind.sample_2d(field, x as f64 * scale, y as f64 * scale, &params) as f32;
            }
        });

    map
}

/// Adapter exposing a configured field through the `noise` crate's trait.
#[derive(Clone, Debug)]
pub struct NoiseSampler {
    field: NoiseField,
    kind: NoiseKind,
    params: NoiseParams,
}

impl noise::NoiseFn<f64, 2> for NoiseSampler {
    fn get(&self, point: [f64; 2]) -> f64 {
        self.kind.sample_2d(&self.field, point[0], point[1], &self.params)
    }
}
