//! Erosion simulation parameters and presets

use serde::{Deserialize, Serialize};

/// Largest usable talus angle; steeper values make `tan` blow up.
pub const MAX_TALUS_ANGLE: f32 = 1.55;

/// Erosion intensity preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErosionPreset {
    /// No erosion - raw terrain
    None,
    /// Minimal erosion - light weathering
    Minimal,
    /// Normal erosion - balanced
    #[default]
    Normal,
    /// Dramatic erosion - carved gullies and slumped slopes
    Dramatic,
}

impl ErosionPreset {
    pub fn all() -> &'static [Self] {
        &[Self::None, Self::Minimal, Self::Normal, Self::Dramatic]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No erosion (raw terrain)",
            Self::Minimal => "Light weathering",
            Self::Normal => "Balanced erosion",
            Self::Dramatic => "Carved gullies and slumped slopes",
        }
    }
}

impl std::fmt::Display for ErosionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Minimal => write!(f, "minimal"),
            Self::Normal => write!(f, "normal"),
            Self::Dramatic => write!(f, "dramatic"),
        }
    }
}

impl std::str::FromStr for ErosionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "minimal" => Ok(Self::Minimal),
            "normal" => Ok(Self::Normal),
            "dramatic" => Ok(Self::Dramatic),
            other => Err(format!("unknown erosion preset '{}'", other)),
        }
    }
}

/// Erosion simulation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    // =========================================================================
    // Hydraulic Erosion Parameters
    // =========================================================================

    /// Number of raindrops over the whole grid (default: 50000)
    pub iterations: usize,

    /// Water carried by a fresh raindrop
    pub rain_rate: f32,

    /// Fraction of carried water that can dissolve terrain per step
    pub solubility: f32,

    /// Fraction of water lost per step (0.0-1.0)
    pub evaporation: f32,

    /// Maximum path length (steps) per raindrop
    pub max_droplet_steps: usize,

    // =========================================================================
    // Thermal Erosion Parameters
    // =========================================================================

    /// Angle of repose in radians; slopes steeper than this slump
    pub talus_angle: f32,

    /// Outer thermal iterations
    pub thermal_iterations: usize,

    /// Relaxation sub-steps per outer iteration
    pub thermal_sub_iterations: usize,

    /// Fraction of the excess moved per sub-step (0.0-1.0)
    pub thermal_rate: f32,

    // =========================================================================
    // General Settings
    // =========================================================================

    pub enable_hydraulic: bool,

    pub enable_thermal: bool,

    /// Simulate raindrops in parallel snapshot batches
    pub parallel: bool,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            iterations: 50_000,
            rain_rate: 0.01,
            solubility: 0.01,
            evaporation: 0.5,
            max_droplet_steps: 512,

            talus_angle: 0.785, // ~45 degrees
            thermal_iterations: 10,
            thermal_sub_iterations: 4,
            thermal_rate: 0.5,

            enable_hydraulic: true,
            enable_thermal: true,
            parallel: false,
        }
    }
}

impl ErosionParams {
    /// Hydraulic pass only, with the given raindrop settings
    pub fn hydraulic(iterations: usize, rain_rate: f32, solubility: f32, evaporation: f32) -> Self {
        Self {
            iterations,
            rain_rate,
            solubility,
            evaporation,
            enable_thermal: false,
            ..Default::default()
        }
    }

    /// Thermal pass only
    pub fn thermal(iterations: usize, talus_angle: f32) -> Self {
        Self {
            thermal_iterations: iterations,
            talus_angle,
            enable_hydraulic: false,
            ..Default::default()
        }
    }

    /// Create parameters from a preset
    pub fn from_preset(preset: ErosionPreset) -> Self {
        match preset {
            ErosionPreset::None => Self {
                enable_hydraulic: false,
                enable_thermal: false,
                ..Default::default()
            },
            ErosionPreset::Minimal => Self {
                iterations: 10_000,
                thermal_iterations: 3,
                talus_angle: 1.0,
                ..Default::default()
            },
            ErosionPreset::Normal => Self::default(),
            ErosionPreset::Dramatic => Self {
                iterations: 200_000,
                solubility: 0.02,
                evaporation: 0.3,
                talus_angle: 0.6,
                thermal_iterations: 30,
                ..Default::default()
            },
        }
    }

    /// Scale the raindrop count to a grid size. Counts are quoted for a 257x257
    /// grid; other sizes get the same drops-per-cell density.
    pub fn scaled_to(mut self, width: usize, height: usize) -> Self {
        const REFERENCE_CELLS: f64 = 257.0 * 257.0;
        let factor = (width * height) as f64 / REFERENCE_CELLS;
        self.iterations = (self.iterations as f64 * factor).round() as usize;
        self
    }

    /// Copy with every value clamped into its valid range. NaN becomes 0.
    pub fn sanitized(&self) -> Self {
        fn non_negative(v: f32) -> f32 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, f32::MAX)
            }
        }
        fn unit(v: f32) -> f32 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        }

        Self {
            rain_rate: non_negative(self.rain_rate),
            solubility: non_negative(self.solubility),
            evaporation: unit(self.evaporation),
            talus_angle: if self.talus_angle.is_nan() {
                0.0
            } else {
                self.talus_angle.clamp(0.0, MAX_TALUS_ANGLE)
            },
            thermal_rate: unit(self.thermal_rate),
            ..self.clone()
        }
    }

    /// True when the hydraulic pass would change nothing.
    pub fn hydraulic_is_noop(&self) -> bool {
        !self.enable_hydraulic
            || self.iterations == 0
            || self.max_droplet_steps == 0
            || self.rain_rate <= 0.0
            || self.solubility <= 0.0
    }

    /// True when the thermal pass would change nothing.
    pub fn thermal_is_noop(&self) -> bool {
        !self.enable_thermal
            || self.thermal_iterations == 0
            || self.thermal_sub_iterations == 0
            || self.thermal_rate <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ErosionParams::default();
        assert_eq!(params.iterations, 50_000);
        assert_eq!(params.rain_rate, 0.01);
        assert_eq!(params.solubility, 0.01);
        assert_eq!(params.evaporation, 0.5);
    }

    #[test]
    fn test_presets() {
        let none = ErosionParams::from_preset(ErosionPreset::None);
        assert!(none.hydraulic_is_noop());
        assert!(none.thermal_is_noop());
        assert_eq!(ErosionParams::from_preset(ErosionPreset::Normal), ErosionParams::default());
        let dramatic = ErosionParams::from_preset(ErosionPreset::Dramatic);
        assert!(dramatic.iterations > ErosionParams::default().iterations);

        for preset in ErosionPreset::all() {
            assert_eq!(preset.to_string().parse::<ErosionPreset>().unwrap(), *preset);
        }
    }

    #[test]
    fn test_sanitize_clamps() {
        let params = ErosionParams {
            rain_rate: f32::NAN,
            evaporation: 3.0,
            talus_angle: 10.0,
            thermal_rate: -1.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(params.rain_rate, 0.0);
        assert_eq!(params.evaporation, 1.0);
        assert_eq!(params.talus_angle, MAX_TALUS_ANGLE);
        assert_eq!(params.thermal_rate, 0.0);
        assert!(params.hydraulic_is_noop());
        assert!(params.thermal_is_noop());
    }

    #[test]
    fn test_scaled_to_reference_grid_is_identity() {
        let params = ErosionParams::default().scaled_to(257, 257);
        assert_eq!(params.iterations, 50_000);
        let small = ErosionParams::default().scaled_to(65, 65);
        assert!(small.iterations < 5_000);
    }
}
