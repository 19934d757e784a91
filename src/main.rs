//! Headless simulation runner.
//!
//! Drives the ecosystem at a fixed frame cadence, logging domain events
//! and periodic stats. Rendering and interactive control are external
//! collaborators; this binary stands in for them on the command line.

use std::path::PathBuf;

use clap::Parser;

use vivarium::simulation::ecosystem::Ecosystem;
use vivarium::simulation::events::{EventSink, SimulationEvent};
use vivarium::simulation::params::Params;
use vivarium::simulation::stats::StatsSnapshot;

#[derive(Parser, Debug)]
#[command(name = "vivarium", about = "Evolving creature simulation")]
struct Args {
    /// RNG seed for the whole run.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Target population size (5-50).
    #[arg(long, default_value_t = 20)]
    population: usize,

    /// Speed multiplier (0.5-1000).
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Simulated seconds to run before exiting.
    #[arg(long, default_value_t = 600.0)]
    duration: f64,

    /// Load simulation parameters from a JSON file instead of defaults.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Import a genome document and seed the population from it.
    #[arg(long)]
    import: Option<PathBuf>,

    /// Write the best genome to this path on exit.
    #[arg(long)]
    export_best: Option<PathBuf>,
}

/// Sink that forwards events and stats to the logger.
struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, time: f64, event: SimulationEvent) {
        log::debug!("[t={time:>8.1}] {event:?}");
    }

    fn stats(&mut self, snapshot: &StatsSnapshot) {
        log::info!(
            "gen {:>3} | t={:>8.1}s | alive {:>3} | best {:>8.1} | avg {:>8.1}",
            snapshot.generation,
            snapshot.sim_time,
            snapshot.living,
            snapshot.best_fitness,
            snapshot.avg_fitness,
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let base = match &args.params {
        Some(path) => {
            log::info!("loading params from {}", path.display());
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        }
        None => Params::default(),
    };
    let params = Params {
        population_size: args
            .population
            .clamp(Params::POPULATION_RANGE.0, Params::POPULATION_RANGE.1),
        ..base
    };

    let mut sink = LogSink;
    let mut ecosystem = Ecosystem::new(params, args.seed);
    ecosystem.set_speed(args.speed);

    if let Some(path) = &args.import {
        let document = std::fs::read_to_string(path)?;
        ecosystem.import(&document, &mut sink)?;
        log::info!("imported genome from {}", path.display());
    }

    let frame = 1.0 / 60.0;
    let target = ecosystem.time() + args.duration;
    while ecosystem.time() < target {
        ecosystem.advance(frame, &mut sink);
    }

    let final_stats = ecosystem.snapshot();
    log::info!(
        "finished at gen {} after {:.1}s simulated, {} alive",
        final_stats.generation,
        final_stats.sim_time,
        final_stats.living,
    );

    if let Some(path) = &args.export_best {
        std::fs::write(path, ecosystem.export_best()?)?;
        log::info!("exported best genome to {}", path.display());
    }

    Ok(())
}
