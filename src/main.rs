//! Smoke CLI - Run headless simulations from JSON parameters.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use smoke_sim::{
    compute::{FrameOutcome, SimulationStats, SmokeSimulation},
    schema::{Scene, ScriptedController, SmokeParams},
};

/// Cells per frame a velocity may cover before the state counts as unstable.
const MAX_CELLS_PER_FRAME: f32 = 20.0;

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <params.json> [frames]", args[0]);
        eprintln!();
        eprintln!("Run a headless smoke simulation from JSON parameters.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  params.json  Path to simulation parameter file");
        eprintln!("  frames       Number of frames to simulate (default: 100)");
        eprintln!();
        eprintln!("A scene is read from <params>.scene.json when present.");
        eprintln!("Example files are printed with the --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let params_path = PathBuf::from(&args[1]);
    let frames: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);

    let params = SmokeParams::from_json_file(&params_path).unwrap_or_else(|e| {
        eprintln!("Error loading parameters: {}", e);
        std::process::exit(1);
    });

    let scene_path = params_path.with_extension("scene.json");
    let scene = if scene_path.exists() {
        Scene::from_json_file(&scene_path).unwrap_or_else(|e| {
            eprintln!("Error loading scene: {}", e);
            std::process::exit(1);
        })
    } else {
        Scene::default()
    };

    println!("Smoke Simulation");
    println!("================");
    let [nx, ny, nz] = params.resolution;
    if params.is_3d() {
        println!("Grid: {}x{}x{} (h = {})", nx, ny, nz, params.spacing);
    } else {
        println!("Grid: {}x{} (h = {})", nx, ny, params.spacing);
    }
    println!(
        "Projection: {} iterations, overrelaxation {}",
        params.iterations, params.overrelaxation
    );
    println!("Obstacles: {}", scene.obstacles.len());
    println!("Emitters: {}", params.emitters.len());
    println!("Frames: {}", frames);
    println!();

    let mut sim = SmokeSimulation::new(&params, scene).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    let mut controller = ScriptedController::new(params);

    let initial_stats = SimulationStats::from_simulation(&sim);
    println!("Initial state:");
    println!("  Total density: {:.6}", initial_stats.total_density);
    println!("  Mean pressure: {:.6}", initial_stats.mean_pressure);
    println!();

    println!("Running simulation...");
    let start = Instant::now();
    let mut last_frame = Instant::now();
    let mut resets = 0u32;

    for i in 0..frames {
        let frame_dt = last_frame.elapsed().as_secs_f32();
        last_frame = Instant::now();

        let report = match sim.run_frame(&mut controller, frame_dt) {
            Ok(FrameOutcome::Stepped(report)) => report,
            Ok(FrameOutcome::Reset) => continue,
            Err(e) => {
                eprintln!("Frame {} rejected: {}", i + 1, e);
                std::process::exit(1);
            }
        };

        let stats = SimulationStats::from_simulation(&sim);
        let speed_limit = MAX_CELLS_PER_FRAME * sim.grid().h / report.dt.max(f32::EPSILON);
        if stats.is_unstable(speed_limit) {
            log::warn!(
                "Unstable state at frame {} (max speed {:.3}), requesting reset",
                i + 1,
                stats.max_speed
            );
            controller.request_reset();
            resets += 1;
        }

        // Print progress every 10%
        if (i + 1) % (frames / 10).max(1) == 0 {
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Frame {}/{}: density={:.4}, max speed={:.4}, divergence={:.2e}, {:.1} frames/s",
                i + 1,
                frames,
                stats.total_density,
                stats.max_speed,
                report.residual,
                (i + 1) as f32 / elapsed
            );
        }
    }

    let elapsed = start.elapsed();
    let final_stats = SimulationStats::from_simulation(&sim);

    println!();
    println!("Final state:");
    println!("  Simulated time: {:.3}s", final_stats.time);
    println!("  Total density: {:.6}", final_stats.total_density);
    println!("  Max speed: {:.6}", final_stats.max_speed);
    println!("  Max divergence: {:.3e}", final_stats.max_divergence);
    println!("  Mean pressure: {:.6}", final_stats.mean_pressure);
    println!("  Resets: {}", resets);
    println!();
    println!(
        "Time: {:.2}s ({:.1} frames/s)",
        elapsed.as_secs_f32(),
        frames as f32 / elapsed.as_secs_f32()
    );

    if !final_stats.finite {
        std::process::exit(2);
    }
}

fn print_example_config() {
    let params = SmokeParams::default();
    let scene = Scene::default();

    println!("Example parameters (params.json):");
    match serde_json::to_string_pretty(&params) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing parameters: {}", e),
    }
    println!();
    println!("Example scene (params.scene.json):");
    match serde_json::to_string_pretty(&scene) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing scene: {}", e),
    }
}
