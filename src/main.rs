//! Lenia CLI - Run simulations from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use lenia_engine::{
    compute::{Field, StepEngine},
    schema::{EngineConfig, Seed},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [steps]", args[0]);
        eprintln!();
        eprintln!("Run a Lenia simulation from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to engine configuration file");
        eprintln!("  steps        Number of simulation steps (default: 100)");
        eprintln!();
        eprintln!("An example configuration is printed with --example.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let steps: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: EngineConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Load or create seed
    let seed_path = config_path.with_extension("seed.json");
    let seed: Seed = if seed_path.exists() {
        let seed_str = fs::read_to_string(&seed_path).unwrap_or_else(|e| {
            eprintln!("Error reading seed file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&seed_str).unwrap_or_else(|e| {
            eprintln!("Error parsing seed: {}", e);
            std::process::exit(1);
        })
    } else {
        Seed::default()
    };

    println!("Lenia Simulation");
    println!("================");
    println!(
        "Grid: {}x{} ({} channels)",
        config.width, config.height, config.channels
    );
    println!("Growth: {:?}  Kernel: {:?}", config.growth, config.kernel.shape);
    println!("Rules: {}", config.rules.len());
    println!("dt: {}", config.dt);
    println!("Steps: {}", steps);
    println!();

    let mut field = Field::new(config.width, config.height, config.channels);
    seed.apply(&mut field);

    let mut engine = StepEngine::new(config.width, config.height);
    let initial = engine.analyze(&field, 0.01);

    println!("Initial state:");
    println!("  Total mass: {:.6}", initial.total_mass);
    println!("  Alive cells: {}", initial.alive_count);
    println!();

    let multi_channel = config.channels > 1 && !config.rules.is_empty();

    println!("Running simulation...");
    let start = Instant::now();

    let report_every = (steps / 10).max(1);
    let mut run = 0;
    while run < steps {
        let chunk = report_every.min(steps - run);
        if multi_channel {
            engine.step_multi_channel(&mut field, &config, chunk);
        } else {
            engine.step(&mut field, &config, chunk);
        }
        run += chunk;

        let snapshot = engine.analyze(&field, 0.01);
        let elapsed = start.elapsed().as_secs_f32();
        println!(
            "  Step {}/{}: mass={:.6}, alive={}, {:.1} steps/s",
            run,
            steps,
            snapshot.total_mass,
            snapshot.alive_count,
            run as f32 / elapsed
        );
    }

    let elapsed = start.elapsed();
    let last = engine.analyze(&field, 0.01);
    let analysis = engine.analysis();

    println!();
    println!("Final state:");
    println!("  Total mass: {:.6}", last.total_mass);
    println!("  Alive cells: {}", last.alive_count);
    println!(
        "  Centroid: ({:.2}, {:.2}), speed {:.3}",
        last.centroid_x, last.centroid_y, last.movement_speed
    );
    println!("  Stabilized: {}", analysis.is_stabilized());
    println!("  Empty: {}", analysis.is_empty());
    if analysis.is_periodic() {
        println!(
            "  Periodic: period {} (confidence {:.3})",
            analysis.detected_period(),
            analysis.period_confidence()
        );
    } else {
        println!("  Periodic: false");
    }
    println!();
    println!(
        "Time: {:.2}s ({:.1} steps/s)",
        elapsed.as_secs_f32(),
        steps as f32 / elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    let config = EngineConfig::default();
    let seed = Seed::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).expect("serializable config"));
    println!();
    println!("Example seed (config.seed.json):");
    println!("{}", serde_json::to_string_pretty(&seed).expect("serializable seed"));
}
