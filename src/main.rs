//! Terrasim CLI - heightmap synthesis with hydraulic erosion.
//!
//! Generates a fractal noise heightmap, erodes it with simulated rain droplets,
//! smooths it, optionally carves rivers, and writes the result to disk.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use terrasim::erosion::{SlopeRule, WriteBack};
use terrasim::export::{
    export_grid_png, export_grid_raw, PngExportOptions, RawExportOptions, RawFormat,
};
use terrasim::noise::NormalizeMode;
use terrasim::pipeline::{Simulation, SimulationConfig};
use terrasim::terrain::{Grid, HeightCurve};

/// Heightmap generator with droplet erosion and river carving.
#[derive(Parser)]
#[command(name = "terrasim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, erode and export a heightmap.
    Generate(GenerateArgs),
    /// Print the effective configuration as JSON.
    Info {
        /// JSON configuration file to load instead of the defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Map width in cells.
    #[arg(long)]
    width: Option<usize>,

    /// Map height in cells.
    #[arg(long)]
    height: Option<usize>,

    /// Random seed for reproducible generation.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory for generated files.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base name for output files.
    #[arg(short, long, default_value = "terrain")]
    name: String,

    /// Export format.
    #[arg(short, long, default_value = "png")]
    format: ExportFormat,

    /// Number of noise octaves.
    #[arg(long)]
    octaves: Option<u32>,

    /// Amplitude multiplier per octave.
    #[arg(long)]
    persistence: Option<f32>,

    /// Frequency multiplier per octave.
    #[arg(long)]
    lacunarity: Option<f32>,

    /// Noise feature size in cells.
    #[arg(long)]
    scale: Option<f32>,

    /// Normalize by the theoretical amplitude so neighbouring tiles line up.
    #[arg(long)]
    global_normalize: bool,

    /// Flatten lowlands with a height curve after noise generation.
    #[arg(long)]
    flatten_lowlands: bool,

    /// Total droplet trials.
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Droplet trials per simulation step.
    #[arg(long)]
    steps_per_tick: Option<usize>,

    /// Droplet inertia in [0, 1].
    #[arg(long)]
    inertia: Option<f32>,

    /// Spread erode/deposit amounts bilinearly instead of onto one cell.
    #[arg(long)]
    bilinear: bool,

    /// Spread erode/deposit amounts over a box of this odd width.
    #[arg(long, conflicts_with = "bilinear")]
    brush_width: Option<usize>,

    /// Skip droplet erosion. Smoothing still runs.
    #[arg(long)]
    skip_erosion: bool,

    /// Number of rivers to carve (0 disables carving).
    #[arg(short, long)]
    rivers: Option<usize>,

    /// Sea level for flooding and river termination.
    #[arg(long)]
    sea_level: Option<f32>,

    /// Upper bound for river source heights.
    #[arg(long)]
    max_river_height: Option<f32>,

    /// River half-width in cells.
    #[arg(long)]
    river_width: Option<usize>,

    /// Trace rivers downhill instead of toward the highest neighbour.
    #[arg(long)]
    rivers_downhill: bool,

    /// Also export the water map.
    #[arg(long)]
    water_map: bool,

    /// Save the effective configuration next to the output.
    #[arg(long)]
    save_config: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit PNG (universal compatibility).
    Png,
    /// 16-bit RAW little-endian (Unity).
    Raw,
    /// 16-bit RAW big-endian.
    RawBe,
    /// 32-bit float RAW (high precision).
    RawFloat,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Info { config } => run_info(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> SimulationConfig {
    match path {
        Some(path) => SimulationConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => SimulationConfig::default(),
    }
}

fn build_config(args: &GenerateArgs) -> SimulationConfig {
    let mut config = load_config(args.config.as_deref());

    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let noise = &mut config.noise;
    if let Some(octaves) = args.octaves {
        noise.octaves = octaves;
    }
    if let Some(persistence) = args.persistence {
        noise.persistence = persistence;
    }
    if let Some(lacunarity) = args.lacunarity {
        noise.lacunarity = lacunarity;
    }
    if let Some(scale) = args.scale {
        noise.scale = scale;
    }
    if args.global_normalize {
        noise.normalize = NormalizeMode::Global;
    }
    if args.flatten_lowlands {
        config.height_curve = Some(HeightCurve::lowland_flatten());
    }

    let erosion = &mut config.erosion;
    if let Some(iterations) = args.iterations {
        erosion.iteration_count = iterations;
    }
    if args.skip_erosion {
        erosion.iteration_count = 0;
    }
    if let Some(inertia) = args.inertia {
        erosion.inertia = inertia;
    }
    if args.bilinear {
        erosion.write_back = WriteBack::Bilinear;
    }
    if let Some(width) = args.brush_width {
        erosion.write_back = WriteBack::Kernel { width };
    }
    if let Some(batch) = args.steps_per_tick {
        config.batch_size = batch;
    }

    let rivers = &mut config.rivers;
    if let Some(count) = args.rivers {
        rivers.river_count = count;
    }
    if let Some(sea_level) = args.sea_level {
        rivers.sea_level = sea_level;
    }
    if let Some(max) = args.max_river_height {
        rivers.max_river_height = max;
    }
    if let Some(width) = args.river_width {
        rivers.river_width = width;
    }
    if args.rivers_downhill {
        rivers.slope_rule = SlopeRule::SteepestDescent;
    }

    config
}

fn run_generate(args: GenerateArgs) {
    let config = build_config(&args);

    if config.batch_size == 0 {
        eprintln!("Error: --steps-per-tick must be at least 1");
        std::process::exit(1);
    }

    println!("Terrasim - Heightmap Generator");
    println!("==============================");
    println!("Size: {}x{}", config.width, config.height);
    println!("Seed: {}", config.seed);
    println!("Output: {}", args.output.display());

    let start = Instant::now();

    let mut sim = Simulation::new(config.clone()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("\nGenerating noise...");
    sim.generate().unwrap_or_else(|e| {
        eprintln!("Error generating noise: {}", e);
        std::process::exit(1);
    });

    if config.erosion.iteration_count > 0 {
        println!(
            "Eroding: {} droplets in batches of {}",
            config.erosion.iteration_count, config.batch_size
        );
    } else {
        println!("Erosion: SKIPPED");
    }

    let mut last_percent = 0;
    sim.run_with_progress(config.batch_size, |processed, total| {
        if total == 0 {
            return;
        }
        let percent = processed * 100 / total;
        if percent >= last_percent + 10 || (processed == total && percent != last_percent) {
            println!("  [{}/{}] {}%", processed, total, percent);
            last_percent = percent;
        }
    })
    .unwrap_or_else(|e| {
        eprintln!("Error during erosion: {}", e);
        std::process::exit(1);
    });

    if config.rivers.river_count > 0 {
        println!("Carving {} rivers...", config.rivers.river_count);
        if let Err(e) = sim.carve_rivers() {
            // Terrain is untouched when carving fails.
            eprintln!("Warning: river carving skipped: {}", e);
        }
    }

    println!("Generation completed in {:.2?}", start.elapsed());

    let (min_h, max_h) = sim.grid().value_range();
    println!("Height range: [{:.4}, {:.4}]", min_h, max_h);

    println!("\nExporting...");
    std::fs::create_dir_all(&args.output).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    export(sim.grid(), &args.output, &args.name, args.format);

    if args.water_map {
        match sim.water() {
            Some(water) => {
                export(water, &args.output, &format!("{}_water", args.name), args.format)
            }
            None => println!("  No water map: rivers were not carved"),
        }
    }

    if args.save_config {
        let path = args.output.join(format!("{}.json", args.name));
        config.to_json_file(&path).unwrap_or_else(|e| {
            eprintln!("Error saving config: {}", e);
            std::process::exit(1);
        });
        println!("  Saved config: {}", path.display());
    }

    println!("Done in {:.2?}", start.elapsed());
}

fn export(grid: &Grid, dir: &Path, name: &str, format: ExportFormat) {
    let options = PngExportOptions::auto_range(grid);

    let raw_format = match format {
        ExportFormat::Png => {
            let path = dir.join(format!("{}.png", name));
            export_grid_png(grid, &path, &options).unwrap_or_else(|e| {
                eprintln!("Error exporting PNG: {}", e);
                std::process::exit(1);
            });
            println!("  Exported {}", path.display());
            return;
        }
        ExportFormat::Raw => RawFormat::R16LittleEndian,
        ExportFormat::RawBe => RawFormat::R16BigEndian,
        ExportFormat::RawFloat => RawFormat::R32Float,
    };

    let path = dir.join(format!("{}.raw", name));
    let options = RawExportOptions {
        format: raw_format,
        min_height: options.min_height,
        max_height: options.max_height,
    };
    export_grid_raw(grid, &path, &options).unwrap_or_else(|e| {
        eprintln!("Error exporting RAW: {}", e);
        std::process::exit(1);
    });
    println!(
        "  Exported {} ({:?}, {}x{})",
        path.display(),
        raw_format,
        grid.width(),
        grid.height()
    );
}

fn run_info(config_path: Option<&Path>) {
    let config = load_config(config_path);
    let cells = config.width * config.height;

    println!("Terrasim - Configuration");
    println!("========================");
    println!("Grid: {}x{} ({} cells)", config.width, config.height, cells);
    println!(
        "Height grid memory: {:.2} MB",
        (cells * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0)
    );
    println!(
        "Erosion: {} droplets, {} per step",
        config.erosion.iteration_count, config.batch_size
    );
    println!();

    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
