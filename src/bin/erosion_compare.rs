//! Debug tool for comparing erosion parameters visually
//! Renders one base terrain under several erosion settings into a shaded grid

use std::error::Error;

use image::{ImageBuffer, Rgb, RgbImage};
use terrain_forge::erosion::{ErosionParams, ErosionPreset};
use terrain_forge::export::render_shaded;
use terrain_forge::heightfield::{GenerationParams, HeightField};
use terrain_forge::noise_field::NoiseKind;

const RESOLUTION: usize = 257;
const SEED: u64 = 42;
const COLS: usize = 3;
const GUTTER: u32 = 4;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("Generating erosion comparison grid...");

    let mut base = HeightField::new(RESOLUTION)?;
    base.generate_procedural_with(
        SEED,
        &GenerationParams {
            kind: NoiseKind::Ridged,
            roughness: 0.55,
            max_height: 0.6,
            ..Default::default()
        },
    );

    let variants: Vec<(&str, Option<ErosionParams>)> = vec![
        ("No erosion", None),
        ("Thermal only", Some(ErosionParams::thermal(20, 0.6))),
        ("Hydraulic only", Some(ErosionParams::hydraulic(100_000, 0.01, 0.05, 0.3))),
        ("Minimal preset", Some(ErosionParams::from_preset(ErosionPreset::Minimal))),
        ("Normal preset", Some(ErosionParams::from_preset(ErosionPreset::Normal))),
        ("Dramatic preset", Some(ErosionParams::from_preset(ErosionPreset::Dramatic))),
    ];

    let mut images: Vec<RgbImage> = Vec::new();
    for (i, (name, params)) in variants.iter().enumerate() {
        let mut field = base.clone();
        let before = field.stats();
        if let Some(params) = params {
            let stats = field.apply_erosion_with(params)?;
            println!("  {}. {}: {}", i + 1, name, stats);
        } else {
            println!("  {}. {}", i + 1, name);
        }
        let after = field.stats();
        println!(
            "     range {:.4}..{:.4} -> {:.4}..{:.4}",
            before.min, before.max, after.min, after.max
        );
        images.push(render_shaded(&field));
    }

    let rows = images.len().div_ceil(COLS);
    let grid = create_grid(&images, COLS, rows);
    grid.save("erosion_comparison.png")?;
    println!("Saved erosion_comparison.png (panels numbered left to right, top to bottom)");

    Ok(())
}

fn create_grid(images: &[RgbImage], cols: usize, rows: usize) -> RgbImage {
    if images.is_empty() {
        return ImageBuffer::new(1, 1);
    }

    let cell_width = images[0].width();
    let cell_height = images[0].height();
    let grid_width = cols as u32 * (cell_width + GUTTER) + GUTTER;
    let grid_height = rows as u32 * (cell_height + GUTTER) + GUTTER;

    let mut grid: RgbImage = ImageBuffer::from_pixel(grid_width, grid_height, Rgb([40, 40, 40]));

    for (idx, img) in images.iter().enumerate() {
        let x_offset = GUTTER + (idx % cols) as u32 * (cell_width + GUTTER);
        let y_offset = GUTTER + (idx / cols) as u32 * (cell_height + GUTTER);
        for (x, y, pixel) in img.enumerate_pixels() {
            grid.put_pixel(x_offset + x, y_offset + y, *pixel);
        }
    }

    grid
}
