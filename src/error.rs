//! Error type shared by grid construction, synthesis and the image/config boundary.
//!
//! Sampling and point access never fail; only operations with a real
//! precondition (grid size) or an I/O boundary return `TerrainError`.

/// Errors that can occur while building or persisting terrain.
#[derive(Debug)]
pub enum TerrainError {
    /// Height-fields need at least a 2x2 grid
    InvalidResolution { resolution: usize },
    /// Diamond-square needs a square grid of size 2^n + 1
    NotPowerOfTwoPlusOne { width: usize, height: usize },
    /// Height-fields are square
    NonSquareGrid { width: usize, height: usize },
    /// Imported height images must be square
    NonSquareImage { width: u32, height: u32 },
    /// Erosion was asked to run on a grid with no cells
    EmptyGrid,
    /// Image decode/encode error
    Image(image::ImageError),
    /// IO error (file not found, permissions, etc.)
    Io(std::io::Error),
    /// Configuration file could not be parsed or written
    Config(serde_json::Error),
}

impl std::fmt::Display for TerrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainError::InvalidResolution { resolution } => {
                write!(f, "Height-field resolution must be at least 2, got {}", resolution)
            }
            TerrainError::NotPowerOfTwoPlusOne { width, height } => write!(
                f,
                "Diamond-square needs a square 2^n+1 grid, got {}x{}",
                width, height
            ),
            TerrainError::NonSquareGrid { width, height } => {
                write!(f, "Height-field grid must be square, got {}x{}", width, height)
            }
            TerrainError::NonSquareImage { width, height } => {
                write!(f, "Height image must be square, got {}x{}", width, height)
            }
            TerrainError::EmptyGrid => write!(f, "Cannot erode an empty grid"),
            TerrainError::Image(e) => write!(f, "Image error: {}", e),
            TerrainError::Io(e) => write!(f, "IO error: {}", e),
            TerrainError::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for TerrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerrainError::Image(e) => Some(e),
            TerrainError::Io(e) => Some(e),
            TerrainError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for TerrainError {
    fn from(e: image::ImageError) -> Self {
        TerrainError::Image(e)
    }
}

impl From<std::io::Error> for TerrainError {
    fn from(e: std::io::Error) -> Self {
        TerrainError::Io(e)
    }
}

impl From<serde_json::Error> for TerrainError {
    fn from(e: serde_json::Error) -> Self {
        TerrainError::Config(e)
    }
}
