//! Profiling tool to identify performance bottlenecks

use std::error::Error;
use std::time::Instant;

use terrain_forge::erosion::ErosionParams;
use terrain_forge::heightfield::HeightField;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let resolution = 513;
    let seed = 1337u64;

    println!("=== Performance Profiling ===");
    println!("Grid size: {0}x{0} ({1} cells)", resolution, resolution * resolution);
    println!();

    let start = Instant::now();
    let mut field = HeightField::new(resolution)?;
    field.generate_procedural(seed, 0.5, 8);
    let noise_time = start.elapsed();
    println!("Noise generation: {:?}", noise_time);

    let start = Instant::now();
    let mut ds_field = HeightField::new(resolution)?;
    ds_field.generate_diamond_square(seed, 0.6, 1.0)?;
    let ds_time = start.elapsed();
    println!("Diamond-square: {:?}", ds_time);

    let start = Instant::now();
    field.calculate_normals();
    let normals_time = start.elapsed();
    println!("Normals: {:?}", normals_time);

    let params = ErosionParams::default().scaled_to(resolution, resolution);
    println!("\nErosion parameters:");
    println!("  Raindrops: {}", params.iterations);
    println!("  Thermal iterations: {} x {}", params.thermal_iterations, params.thermal_sub_iterations);
    println!();

    let mut sequential = field.clone();
    let start = Instant::now();
    let stats = sequential.apply_erosion_with(&ErosionParams {
        enable_thermal: false,
        ..params.clone()
    })?;
    let hydraulic_time = start.elapsed();
    println!("Hydraulic (sequential): {:?}", hydraulic_time);
    println!("  {}", stats);

    let mut parallel = field.clone();
    let start = Instant::now();
    parallel.apply_erosion_with(&ErosionParams {
        enable_thermal: false,
        parallel: true,
        ..params.clone()
    })?;
    let parallel_time = start.elapsed();
    println!("Hydraulic (parallel): {:?}", parallel_time);

    let start = Instant::now();
    let stats = field.apply_erosion_with(&ErosionParams {
        enable_hydraulic: false,
        ..params
    })?;
    let thermal_time = start.elapsed();
    println!("Thermal: {:?}", thermal_time);
    println!("  Slumped: {:.4}", stats.material_moved);

    // Summary
    let total = noise_time + ds_time + normals_time + hydraulic_time + parallel_time + thermal_time;
    let pct = |d: std::time::Duration| 100.0 * d.as_secs_f64() / total.as_secs_f64();
    println!("\n=== Summary ===");
    println!("Noise:            {:>8.2}% ({:?})", pct(noise_time), noise_time);
    println!("Diamond-square:   {:>8.2}% ({:?})", pct(ds_time), ds_time);
    println!("Normals:          {:>8.2}% ({:?})", pct(normals_time), normals_time);
    println!("Hydraulic seq:    {:>8.2}% ({:?})", pct(hydraulic_time), hydraulic_time);
    println!("Hydraulic par:    {:>8.2}% ({:?})", pct(parallel_time), parallel_time);
    println!("Thermal:          {:>8.2}% ({:?})", pct(thermal_time), thermal_time);
    println!("TOTAL:            {:>8}  {:?}", "100%", total);

    Ok(())
}
