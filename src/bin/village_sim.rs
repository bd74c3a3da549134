//! Headless Village Runner
//!
//! Builds the demo village, runs a number of ticks and prints a report of
//! what every being ended up doing.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use necro_village::content::ContentRegistry;
use necro_village::core::config::SimulationConfig;
use necro_village::core::error::Result;
use necro_village::core::types::{BeingId, GridPos};
use necro_village::scenario::demo_village;
use necro_village::simulation::{EntityThinkingSystem, TickDriver, TickReport, Watchdog};
use necro_village::world::World;

/// Headless Village Runner - run the demo village without a renderer
#[derive(Parser, Debug)]
#[command(name = "village_sim")]
#[command(about = "Run the necromancer village simulation headless and report the outcome")]
struct Args {
    /// Number of ticks to run
    #[arg(long, default_value_t = 400)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file (missing keys keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON content definitions replacing the built-in ones
    #[arg(long)]
    content: Option<PathBuf>,

    /// Think worker threads (default: cores - 1)
    #[arg(long)]
    workers: Option<usize>,

    /// Pace ticks at the configured tick rate instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Include every tick report in the JSON output
    #[arg(long)]
    full_log: bool,

    /// Also write the JSON report to this file
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct BeingSummary {
    id: BeingId,
    name: String,
    pos: GridPos,
    doing: Option<String>,
    hunger: f32,
    fatigue: f32,
    health: f32,
    carrying: Vec<(String, u32)>,
}

#[derive(Serialize)]
struct RunReport {
    seed: u64,
    ticks_completed: u64,
    ticks_skipped: u64,
    ticks_failed: u64,
    actions_applied: usize,
    actions_rejected: usize,
    deaths: Vec<BeingId>,
    beings: Vec<BeingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log: Option<Vec<TickReport>>,
}

fn summarize(world: &World) -> Vec<BeingSummary> {
    world
        .beings()
        .iter()
        .map(|b| BeingSummary {
            id: b.id,
            name: b.name.clone(),
            pos: b.position(),
            doing: b.display_name_of_current(),
            hunger: b.needs.hunger,
            fatigue: b.needs.fatigue,
            health: b.body.health(),
            carrying: b.inventory.iter().map(|(item, n)| (item.to_string(), n)).collect(),
        })
        .collect()
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.workers.is_some() {
        config.worker_threads = args.workers;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("necro_village=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let content = match &args.content {
        Some(path) => ContentRegistry::load(path)?,
        None => ContentRegistry::with_defaults(),
    };
    content.validate()?;

    let seed = config.seed;
    let ticks_per_second = config.ticks_per_second;
    let watchdog_ms = config.watchdog_timeout_ms;
    let village = demo_village(config, Arc::new(content))?;
    tracing::info!(beings = village.world.being_count(), seed, "demo village ready");

    let system = Arc::new(EntityThinkingSystem::new(village.world)?);
    tracing::info!(workers = system.worker_count(), "think pool started");

    let (reports, skipped, failed) = if args.realtime {
        let runtime = tokio::runtime::Runtime::new()?;
        let driver = TickDriver::new(Arc::clone(&system), ticks_per_second);
        let summary = runtime.block_on(driver.run_for(args.ticks));
        (summary.reports, summary.skipped, summary.failed)
    } else {
        let mut reports = Vec::new();
        let mut failed = 0;
        for _ in 0..args.ticks {
            match system.process_game_tick() {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(error = %e, "tick failed");
                    failed += 1;
                }
            }
        }
        (reports, 0, failed)
    };

    let world = system.world()?;
    let report = RunReport {
        seed,
        ticks_completed: reports.len() as u64,
        ticks_skipped: skipped,
        ticks_failed: failed,
        actions_applied: reports.iter().map(|r| r.applied.len() - r.rejected()).sum(),
        actions_rejected: reports.iter().map(TickReport::rejected).sum(),
        deaths: reports.iter().flat_map(|r| r.deaths.iter().copied()).collect(),
        beings: summarize(&world),
        log: args.full_log.then(|| reports.clone()),
    };
    drop(world);

    match args.format.as_str() {
        "text" => {
            println!("=== VILLAGE AFTER {} TICKS (seed {}) ===", report.ticks_completed, report.seed);
            println!(
                "actions applied: {}  rejected: {}  failed ticks: {}",
                report.actions_applied, report.actions_rejected, report.ticks_failed
            );
            for being in &report.beings {
                println!(
                    "  {:<8} at {}  {:<24} hunger {:.2}  fatigue {:.2}  health {:.2}",
                    being.name,
                    being.pos,
                    being.doing.as_deref().unwrap_or("Idle"),
                    being.hunger,
                    being.fatigue,
                    being.health
                );
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(path) = &args.out {
        // Autosave is side work: bounded by the watchdog, never fatal
        let json = serde_json::to_vec_pretty(&report)?;
        let runtime = tokio::runtime::Runtime::new()?;
        let watchdog = Watchdog::from_millis(watchdog_ms);
        let saved = runtime.block_on(watchdog.run("write report", tokio::fs::write(path, json)));
        match saved {
            Ok(Ok(())) => tracing::info!(path = %path.display(), "report written"),
            Ok(Err(e)) => tracing::warn!(path = %path.display(), error = %e, "could not write report"),
            Err(e) => tracing::warn!(error = %e, "report write abandoned"),
        }
    }

    Ok(())
}
