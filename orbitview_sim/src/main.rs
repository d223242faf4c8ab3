//! OrbitView Simulator CLI
//!
//! Replays scripted viewer sessions against an n-body simulation.

use clap::Parser;
use orbitview_core::ViewerConfig;
use orbitview_sim::scenarios::ScenarioId;
use orbitview_sim::{RunReport, SimError, SimExport, ViewerRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// OrbitView viewer simulation CLI
#[derive(Parser, Debug)]
#[command(name = "orbitview-sim")]
#[command(about = "Run scripted OrbitView sessions against an n-body simulation", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,
    
    /// Scenario to run (solar, cluster, flicker, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,
    
    /// Simulated duration in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,
    
    /// Viewer configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,
    
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    
    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
    
    /// Export per-snapshot frame summaries to a JSON file
    #[arg(long)]
    export: Option<String>,
    
    /// Watch the run in a terminal dashboard
    #[cfg(feature = "dashboard")]
    #[arg(long)]
    dashboard: bool,
}

fn main() {
    let args = Args::parse();
    
    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
    
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(2);
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let config = match &args.config {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };
    
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().map_err(|_| SimError::UnknownScenario(args.scenario.clone()))?]
    };
    
    // Determine base seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };
    
    if !args.json {
        info!("OrbitView Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
    
    let runner = ViewerRunner::new(seed)
        .with_duration(args.duration)
        .with_config(config.clone());
    
    #[cfg(feature = "dashboard")]
    if args.dashboard {
        return watch(runner, scenarios[0], config);
    }
    
    let mut results: Vec<RunReport> = Vec::new();
    
    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            error!("--export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }
        let mut export = SimExport::new(scenarios[0].name(), seed);
        results.push(runner.run_with_export(scenarios[0], &mut export));
        export.write_to_file(export_path)?;
        info!("Exported {} frames to {}", export.frames.len(), export_path);
    } else {
        for scenario in &scenarios {
            results.push(runner.run(*scenario));
        }
    }
    
    let failed = results.iter().filter(|r| !r.passed).count();
    
    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.frames,
                    "renders": r.renders,
                    "degraded_renders": r.degraded_renders,
                    "selections": r.selections,
                    "final_scale": r.final_scale,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for r in &results {
            if r.passed {
                info!(
                    "✓ {} (seed={}) PASSED | {} renders ({} degraded) | zoom {:.3}",
                    r.scenario.name(),
                    r.seed,
                    r.renders,
                    r.degraded_renders,
                    r.final_scale
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    r.scenario.name(),
                    r.seed,
                    r.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    
    // Exit with proper code for CI
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Runs one scenario in real time on a worker thread while the terminal
/// dashboard renders the same snapshots.
#[cfg(feature = "dashboard")]
fn watch(runner: ViewerRunner, scenario: ScenarioId, config: ViewerConfig) -> Result<(), SimError> {
    let (tx, rx) = crossbeam::channel::unbounded();
    let runner = runner.with_feed(tx);
    let worker = std::thread::spawn(move || runner.run(scenario));
    
    orbitview_core::dashboard::run_dashboard(rx, config)?;
    
    match worker.join() {
        Ok(report) if report.passed => info!("✓ {} PASSED", scenario.name()),
        Ok(report) => error!(
            "✗ {} FAILED: {}",
            scenario.name(),
            report.failure_reason.as_deref().unwrap_or("unknown")
        ),
        Err(_) => error!("simulation thread panicked"),
    }
    Ok(())
}
