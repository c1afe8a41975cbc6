use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use terraformer::ascii;
use terraformer::dem::{ElevationField, GeoBounds};
use terraformer::fractal::{generate_fractal, generate_fractal_seeded, FractalConfig};
use terraformer::score;

#[derive(Parser, Debug)]
#[command(name = "terraformer")]
#[command(about = "Generate and grade fractal terrain with the terraforming engine")]
struct Args {
    /// Width of the DEM in cells
    #[arg(short = 'W', long, default_value = "129")]
    width: usize,

    /// Height of the DEM in cells
    #[arg(short = 'H', long, default_value = "65")]
    height: usize,

    /// Roughness in (0, 1]; higher is smoother at fine scales
    #[arg(short, long, default_value = "0.8")]
    roughness: f64,

    /// Maximum elevation in meters
    #[arg(long, default_value = "500.0")]
    max_height: f64,

    /// Gaussian blur radius in grid pixels (0 disables)
    #[arg(short, long, default_value = "2.0")]
    blur: f64,

    /// Random seed (uses OS entropy if not specified)
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    // Synthetic all-valid reference: one degree square at 30 m/pixel.
    let bounds = GeoBounds {
        min_lon: 0.0,
        min_lat: 0.0,
        max_lon: 1.0,
        max_lat: 1.0,
    };
    let mut reference = ElevationField::new(args.width, args.height, -9999.0, 30.0, 0.0, 0.0, bounds);
    for row in 0..args.height {
        for col in 0..args.width {
            reference.set(row, col, 0.0);
        }
    }

    let config = FractalConfig {
        roughness: args.roughness,
        min_height: 0.0,
        max_height: args.max_height,
        blur_radius: args.blur,
    };

    let result = match args.seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            generate_fractal_seeded(&reference, &config, &mut rng)
        }
        None => generate_fractal(&reference, &config),
    };

    let field = match result {
        Ok(field) => field,
        Err(e) => {
            eprintln!("invalid generator configuration: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", ascii::render_elevation(&field, 100));

    let (min, max) = field.elevation_range();
    println!("\nelevation range: {:.1} .. {:.1} m", min, max);

    // How far flat ground is from this terrain, i.e. the starting grade a
    // player would see before terraforming.
    let mut flat = field.clone();
    flat.fill_valid(0.0);
    let pct = score::percentage(score::score(&flat, &field));
    println!("flat-start grade: {} ({:.1}%)", score::letter_grade(pct), pct);
}
