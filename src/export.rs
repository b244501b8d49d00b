//! Image boundary: 16-bit grayscale height images and shaded previews.

use std::path::Path;

use image::{ImageBuffer, Luma, Rgb, RgbImage};

use crate::error::TerrainError;
use crate::heightfield::HeightField;
use crate::tilemap::Tilemap;

pub type GrayImage16 = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Encode a grid as 16-bit grayscale, stretching its own [min, max] over
/// the full pixel range. A flat grid encodes as all zeros.
pub fn to_luma16(heightmap: &Tilemap<f32>) -> GrayImage16 {
    let (min_h, max_h) = heightmap.min_max();
    let range = max_h - min_h;

    ImageBuffer::from_fn(heightmap.width as u32, heightmap.height as u32, |x, y| {
        let h = *heightmap.get(x as usize, y as usize);
        let t = if range > 0.0 && range.is_finite() {
            ((h - min_h) / range).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Luma([(t * u16::MAX as f32).round() as u16])
    })
}

/// Decode a square 16-bit grayscale image, mapping 0 to `min_height` and
/// 65535 to `max_height`.
pub fn from_luma16(img: &GrayImage16, min_height: f32, max_height: f32) -> Result<Tilemap<f32>, TerrainError> {
    let (width, height) = img.dimensions();
    if width != height {
        return Err(TerrainError::NonSquareImage { width, height });
    }

    let span = max_height - min_height;
    let data: Vec<f32> = img
        .pixels()
        .map(|p| min_height + (p[0] as f32 / u16::MAX as f32) * span)
        .collect();

    Tilemap::from_vec(width as usize, height as usize, data).ok_or(TerrainError::EmptyGrid)
}

/// Save a grid as a 16-bit grayscale PNG.
pub fn save_heightmap_png<P: AsRef<Path>>(heightmap: &Tilemap<f32>, path: P) -> Result<(), TerrainError> {
    to_luma16(heightmap).save(path)?;
    Ok(())
}

/// Load any grayscale-convertible image the `image` crate can decode.
pub fn load_heightmap<P: AsRef<Path>>(path: P, min_height: f32, max_height: f32) -> Result<Tilemap<f32>, TerrainError> {
    let img = image::open(path)?.to_luma16();
    from_luma16(&img, min_height, max_height)
}

/// Hillshaded color preview lit from the north-west, using the field's
/// normals. Colors run from lowland green through rock to snow.
pub fn render_shaded(field: &HeightField) -> RgbImage {
    let res = field.resolution();
    let stats = field.stats();
    let range = (stats.max - stats.min).max(f32::EPSILON);

    // Direction toward the light in (x, up, y) space
    let light = normalize([-0.6, 0.55, -0.6]);
    let ambient = 0.3;

    let mut img: RgbImage = ImageBuffer::new(res as u32, res as u32);

    for y in 0..res {
        for x in 0..res {
            let h = field.get_height(x as i32, y as i32);
            let normalized = ((h - stats.min) / range).clamp(0.0, 1.0);

            let n = field.get_normal(x as i32, y as i32);
            let diffuse = (n[0] * light[0] + n[1] * light[1] + n[2] * light[2]).max(0.0);
            let lighting = (ambient + (1.0 - ambient) * diffuse).min(1.0);

            let base = elevation_color(normalized);
            img.put_pixel(
                x as u32,
                y as u32,
                Rgb([
                    (base[0] as f32 * lighting) as u8,
                    (base[1] as f32 * lighting) as u8,
                    (base[2] as f32 * lighting) as u8,
                ]),
            );
        }
    }

    img
}

/// Land color ramp over normalized elevation.
fn elevation_color(t: f32) -> [u8; 3] {
    if t < 0.3 {
        [80, 140, 60]
    } else if t < 0.6 {
        let s = (t - 0.3) / 0.3;
        [
            (80.0 + s * 80.0) as u8,
            (140.0 - s * 60.0) as u8,
            (60.0 - s * 20.0) as u8,
        ]
    } else if t < 0.85 {
        let s = (t - 0.6) / 0.25;
        let v = (160.0 - s * 40.0) as u8;
        [v, v - 10, v - 20]
    } else {
        [240, 240, 245]
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.png");

        let mut field = HeightField::new(17).unwrap();
        field.generate_procedural(12, 0.6, 5);
        field.save_to_image(&path).unwrap();

        let stats = field.stats();
        let loaded = HeightField::load_from_image(&path, stats.min, stats.max).unwrap();
        assert_eq!(loaded.resolution(), 17);

        let step = (stats.max - stats.min) / u16::MAX as f32;
        for y in 0..17 {
            for x in 0..17 {
                let diff = (loaded.get_height(x, y) - field.get_height(x, y)).abs();
                assert!(diff <= step + 1e-6, "cell ({}, {}) off by {}", x, y, diff);
            }
        }
    }

    #[test]
    fn test_flat_grid_encodes_black() {
        let map = Tilemap::new_with(4, 4, 3.5f32);
        let img = to_luma16(&map);
        assert!(img.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_non_square_image_rejected() {
        let img: GrayImage16 = ImageBuffer::new(8, 4);
        assert!(matches!(
            from_luma16(&img, 0.0, 1.0),
            Err(TerrainError::NonSquareImage { width: 8, height: 4 })
        ));
    }

    #[test]
    fn test_shaded_preview_dimensions() {
        let mut field = HeightField::new(9).unwrap();
        field.generate_procedural(1, 0.5, 3);
        let img = render_shaded(&field);
        assert_eq!(img.dimensions(), (9, 9));
    }
}
