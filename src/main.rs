use clap::Parser;
use std::path::PathBuf;
use std::process;

use sky_graph::scene::SceneDescription;
use sky_graph::units::U_TO_KM;
use sky_graph::{GlobalClock, GraphError, GraphUpdater, SimInstant, TimeFrame};

const DEMO_SCENE: &str = include_str!("../demos/solar_system.toml");

#[derive(Parser)]
#[command(name = "sky-graph")]
#[command(about = "Propagates a scene graph and logs the state of its nodes", long_about = None)]
#[command(version)]
struct Cli {
    /// Scene description (TOML). The built-in solar system when omitted.
    scene: Option<PathBuf>,

    /// Number of frames to run
    #[arg(short, long, default_value = "10")]
    frames: u32,

    /// Simulated hours per frame
    #[arg(long, default_value = "24")]
    hours_per_frame: f64,

    /// Frame rate the simulation is stepped at
    #[arg(long, default_value = "60")]
    fps: f32,

    /// Start instant as a Julian date (defaults to J2000)
    #[arg(long)]
    start_jd: Option<f64>,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn run(cli: &Cli) -> Result<(), GraphError> {
    let description = match &cli.scene {
        Some(path) => SceneDescription::load(path)?,
        None => SceneDescription::from_toml(DEMO_SCENE)?,
    };
    let mut graph = description.build()?;
    let camera = description.camera()?;
    let mut updater = GraphUpdater::new(description.settings.clone());

    let start = cli
        .start_jd
        .map_or(SimInstant::J2000, SimInstant::from_julian_date);
    // Warp so that one fixed-rate frame covers the requested simulated hours.
    let warp = cli.hours_per_frame * 3600.0 * cli.fps as f64;
    let mut clock = GlobalClock::new(start, warp);
    clock.fixed_rate = Some(cli.fps);

    // First frame places everything without advancing time.
    clock.touch();
    let stats = updater.update(&mut graph, &clock, &camera);
    clock.settle();
    log::info!(
        "Initial frame at JD {:.3}: {} processed, {} skipped, {} faults",
        clock.instant().julian_date(),
        stats.processed,
        stats.skipped,
        stats.faults
    );

    for frame in 1..=cli.frames {
        clock.update(0.0);
        let stats = updater.update(&mut graph, &clock, &camera);
        log::info!(
            "Frame {frame} at JD {:.3}: {} processed, {} skipped, {} faults",
            clock.instant().julian_date(),
            stats.processed,
            stats.skipped,
            stats.faults
        );
    }

    for (id, node) in graph.iter() {
        if updater.tags().is_stale(id) {
            continue;
        }
        let t = node.translation.as_dvec3() * U_TO_KM;
        log::info!(
            "{:>10}  ra {:7.3} dec {:7.3}  d {:.4e} km  sa {:.3e}  opacity {:.3}{}",
            node.name,
            node.position_spherical.x,
            node.position_spherical.y,
            t.length(),
            node.solid_angle_apparent,
            node.opacity,
            if node.time_overflow { "  (no data)" } else { "" }
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if let Err(e) = run(&cli) {
        log::error!("{e}");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
