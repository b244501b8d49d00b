use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_forge::config::{GenerationMethod, TerrainConfig};
use terrain_forge::erosion::{ErosionParams, ErosionPreset};
use terrain_forge::export;
use terrain_forge::noise_field::NoiseKind;
use terrain_forge::seeds::TerrainSeeds;

#[derive(Parser, Debug)]
#[command(name = "terrain_forge")]
#[command(about = "Generate eroded terrain height-fields")]
struct Args {
    /// Grid resolution (cells per side; diamond-square needs 2^n+1)
    #[arg(short, long)]
    resolution: Option<usize>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Generation method: noise or diamond-square
    #[arg(short, long)]
    method: Option<GenerationMethod>,

    /// Noise kind: gradient, simplex, cellular, fbm or ridged
    #[arg(short, long)]
    kind: Option<NoiseKind>,

    /// Roughness in [0, 1]
    #[arg(long)]
    roughness: Option<f32>,

    /// Number of fractal octaves
    #[arg(long)]
    octaves: Option<u32>,

    /// Highest elevation
    #[arg(long)]
    max_height: Option<f32>,

    /// Erosion preset: none, minimal, normal or dramatic
    #[arg(short, long)]
    preset: Option<ErosionPreset>,

    /// Raindrop count (overrides the preset)
    #[arg(long)]
    erosion_iterations: Option<usize>,

    /// Scale the raindrop count to the grid size
    #[arg(long)]
    scale_erosion: bool,

    /// Simulate raindrops in parallel batches
    #[arg(long)]
    parallel: bool,

    /// Load settings from a JSON config (flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings to a JSON config
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Output 16-bit grayscale PNG
    #[arg(short, long, default_value = "terrain.png")]
    output: PathBuf,

    /// Also write a hillshaded color preview
    #[arg(long)]
    shaded: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            println!("Loading config from {}", path.display());
            TerrainConfig::load(path)?
        }
        None => TerrainConfig::default(),
    };

    // Command line flags override the config file
    config.seed = args.seed.unwrap_or_else(|| if args.config.is_some() { config.seed } else { rand::random() });
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(kind) = args.kind {
        config.generation.kind = kind;
    }
    if let Some(roughness) = args.roughness {
        config.generation.roughness = roughness;
    }
    if let Some(octaves) = args.octaves {
        config.generation.octaves = octaves;
    }
    if let Some(max_height) = args.max_height {
        config.generation.max_height = max_height;
    }
    if let Some(preset) = args.preset {
        println!("Erosion preset: {} ({})", preset, preset.description());
        config.erosion = match preset {
            ErosionPreset::None => None,
            other => Some(ErosionParams::from_preset(other)),
        };
    }
    if let Some(erosion) = config.erosion.as_mut() {
        if let Some(iterations) = args.erosion_iterations {
            erosion.iterations = iterations;
        }
        if args.scale_erosion {
            *erosion = erosion.clone().scaled_to(config.resolution, config.resolution);
        }
        erosion.parallel |= args.parallel;
    }

    println!("Generating terrain with seed: {}", config.seed);
    println!("  {}", TerrainSeeds::from_master(config.seed));
    println!("Grid size: {0}x{0}", config.resolution);
    match config.method {
        GenerationMethod::Noise => println!(
            "Method: {} noise, roughness {:.2}, {} octaves",
            config.generation.kind, config.generation.roughness, config.generation.octaves
        ),
        GenerationMethod::DiamondSquare => println!(
            "Method: diamond-square, roughness {:.2}",
            config.generation.roughness
        ),
    }
    match &config.erosion {
        Some(erosion) => println!(
            "Erosion: {} drops, talus {:.3} rad{}",
            erosion.iterations,
            erosion.talus_angle,
            if erosion.parallel { ", parallel" } else { "" }
        ),
        None => println!("Erosion: none"),
    }

    if let Some(path) = &args.save_config {
        config.save(path)?;
        println!("Saved config to {}", path.display());
    }

    let field = config.build()?;
    let stats = field.stats();
    println!(
        "Height range: {:.4} to {:.4} (mean {:.4})",
        stats.min, stats.max, stats.mean
    );

    field.save_to_image(&args.output)?;
    println!("Saved heightmap to {}", args.output.display());

    if let Some(path) = &args.shaded {
        export::render_shaded(&field).save(path)?;
        println!("Saved shaded preview to {}", path.display());
    }

    Ok(())
}
