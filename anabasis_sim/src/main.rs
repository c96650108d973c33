//! Anabasis playback simulator CLI
//!
//! Run deterministic playback scenarios against a virtual clock.

use anabasis_core::{DatasetView, EngineConfig};
use anabasis_sim::scenarios::ScenarioId;
use anabasis_sim::{ScenarioResult, ScenarioRunner};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Anabasis deterministic playback simulation CLI
#[derive(Parser, Debug)]
#[command(name = "anabasis-sim")]
#[command(about = "Run deterministic playback scenarios for Anabasis", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run by name or code, or "all"
    /// (single_segment, teleport, territory_fallback, full_campaign, track_switch, speed_change)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Maximum virtual duration per scenario in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Playback speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Frame interval jitter as a fraction of the refresh period
    #[arg(long, default_value = "0.2")]
    jitter: f64,

    /// Campaign dataset JSON replacing the built-in demo
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Engine configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the frame trace of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn init_logging(verbose: bool) {
    let builder = FmtSubscriber::builder();
    let result = if verbose {
        tracing::subscriber::set_global_default(builder.with_max_level(Level::DEBUG).finish())
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
    };
    result.expect("Failed to set tracing subscriber");
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.json {
        info!("Anabasis playback simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e: String| {
            let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            fail(format!("{}\nAvailable scenarios: {}, all", e, names.join(", ")))
        })]
    };

    if args.export.is_some() && scenarios.len() > 1 {
        fail("--export only supports a single scenario, not 'all'");
    }

    let engine = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e))),
        None => EngineConfig::default(),
    };

    let dataset = args.dataset.as_ref().map(|path| {
        let view = DatasetView::from_path(path)
            .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)));
        info!(
            path = %path.display(),
            tracks = view.tracks().len(),
            "Loaded campaign dataset"
        );
        Arc::new(view)
    });

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let mut runner = ScenarioRunner::new(seed)
            .with_engine_config(engine.clone())
            .with_speed(args.speed)
            .with_jitter(args.jitter)
            .with_export(args.export.is_some());
        if let Some(duration) = args.duration {
            runner = runner.with_duration(duration);
        }
        if let Some(dataset) = &dataset {
            runner = runner.with_dataset(Arc::clone(dataset));
        }

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED in {:.1}s virtual, {} frames",
                        scenario.name(),
                        seed,
                        result.final_time_secs,
                        result.total_frames
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if let (Some(path), Some(export)) = (&args.export, &result.export) {
                match export.write_to_file(path) {
                    Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
                    Err(e) => error!("Failed to write export: {}", e),
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.total_frames,
                    "time_secs": r.final_time_secs,
                    "final_waypoint": r.final_waypoint,
                    "teleports": r.metrics.teleports,
                    "arrivals": r.metrics.arrivals,
                    "stale_frames": r.metrics.stale_frames,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
