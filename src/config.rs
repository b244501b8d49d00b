//! JSON terrain configuration.
//!
//! A `TerrainConfig` captures everything needed to rebuild a height-field:
//! size, seed, generation method and erosion settings. Missing fields take
//! their defaults, so a config file only needs the values it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::diamond_square::is_power_of_two_plus_one;
use crate::erosion::ErosionParams;
use crate::error::TerrainError;
use crate::heightfield::{GenerationParams, HeightField};

/// How the base terrain is synthesized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    #[default]
    Noise,
    DiamondSquare,
}

impl std::fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noise => write!(f, "noise"),
            Self::DiamondSquare => write!(f, "diamond-square"),
        }
    }
}

impl std::str::FromStr for GenerationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "noise" => Ok(Self::Noise),
            "diamond-square" | "ds" => Ok(Self::DiamondSquare),
            other => Err(format!("unknown generation method '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub resolution: usize,
    pub seed: u64,
    pub method: GenerationMethod,
    pub generation: GenerationParams,
    /// `None` skips erosion entirely
    pub erosion: Option<ErosionParams>,
    /// Horizontal cell spacing; defaults to a unit-square footprint
    pub cell_spacing: Option<f32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            resolution: 257,
            seed: 0,
            method: GenerationMethod::Noise,
            generation: GenerationParams::default(),
            erosion: Some(ErosionParams::default()),
            cell_spacing: None,
        }
    }
}

impl TerrainConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TerrainError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TerrainError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Generate (and erode, if configured) a height-field.
    pub fn build(&self) -> Result<HeightField, TerrainError> {
        let mut field = HeightField::new(self.resolution)?;
        if let Some(spacing) = self.cell_spacing {
            field.set_cell_spacing(spacing);
        }

        match self.method {
            GenerationMethod::Noise => field.generate_procedural_with(self.seed, &self.generation),
            GenerationMethod::DiamondSquare => {
                if !is_power_of_two_plus_one(self.resolution) {
                    return Err(TerrainError::NotPowerOfTwoPlusOne {
                        width: self.resolution,
                        height: self.resolution,
                    });
                }
                field.generate_diamond_square(
                    self.seed,
                    self.generation.roughness,
                    self.generation.max_height,
                )?;
            }
        }

        if let Some(erosion) = &self.erosion {
            let stats = field.apply_erosion_with(erosion)?;
            info!(%stats, "applied erosion");
        }

        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_field::NoiseKind;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.json");

        let config = TerrainConfig {
            resolution: 65,
            seed: 42,
            method: GenerationMethod::DiamondSquare,
            generation: GenerationParams {
                kind: NoiseKind::Ridged,
                roughness: 0.7,
                ..Default::default()
            },
            erosion: None,
            cell_spacing: Some(2.0),
        };
        config.save(&path).unwrap();
        assert_eq!(TerrainConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TerrainConfig = serde_json::from_str(r#"{ "seed": 9, "generation": { "kind": "simplex" } }"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.resolution, 257);
        assert_eq!(config.generation.kind, NoiseKind::Simplex);
        assert_eq!(config.generation.octaves, 6);
        assert_eq!(config.erosion, Some(ErosionParams::default()));
    }

    #[test]
    fn test_build_is_reproducible() {
        let config = TerrainConfig {
            resolution: 33,
            seed: 5,
            erosion: Some(ErosionParams {
                iterations: 400,
                ..Default::default()
            }),
            ..Default::default()
        };
        let a = config.build().unwrap();
        let b = config.build().unwrap();
        assert_eq!(a.heights(), b.heights());
    }

    #[test]
    fn test_build_rejects_bad_diamond_square_size() {
        let config = TerrainConfig {
            resolution: 100,
            method: GenerationMethod::DiamondSquare,
            erosion: None,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(TerrainError::NotPowerOfTwoPlusOne { .. })));
    }

    #[test]
    fn test_bad_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ resolution: ").unwrap();
        assert!(matches!(TerrainConfig::load(&path), Err(TerrainError::Config(_))));
    }
}
