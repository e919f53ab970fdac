use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ridepool_core::demand::DemandConfig;
use ridepool_core::travel::{HaversineTravelModel, TravelModel};
use ridepool_core::{DispatchConfig, RequestRecord, Simulation};
use ridepool_experiments::export::{
    export_outcomes_json, export_rejections_csv, export_schedule_csv, export_schedule_parquet,
    export_summary_json, export_sweep_csv, schedule_legs,
};
use ridepool_experiments::logging::init_logging;
use ridepool_experiments::{
    calculate_sweep_scores, rank_results, read_requests_csv, read_travel_table_csv,
    run_parallel_sweeps, summarize, RequestWindow, ScoreWeights, WeightSpace,
};
use tracing::info;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ridepool",
    about = "Greedy ride-pooling dispatch simulator",
    long_about = "Replays a request stream against a fleet of pooled vehicles, inserting each\n\
                  request into the cheapest feasible route or rejecting it."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one request stream and export schedules, outcomes and a summary
    Run {
        #[command(flatten)]
        input: InputArgs,
        /// Output directory
        #[arg(long, default_value = "ridepool-out")]
        out: PathBuf,
    },
    /// Replay one request stream under many objective weight vectors
    Sweep {
        #[command(flatten)]
        input: InputArgs,
        /// Delay weights to explore
        #[arg(long, value_delimiter = ',')]
        delay: Vec<f64>,
        /// Pooling weights to explore
        #[arg(long, value_delimiter = ',')]
        pooling: Vec<f64>,
        /// Balance weights to explore
        #[arg(long, value_delimiter = ',')]
        balance: Vec<f64>,
        /// Distance weights to explore
        #[arg(long, value_delimiter = ',')]
        distance: Vec<f64>,
        /// Sample this many points at random instead of the full grid
        #[arg(long)]
        samples: Option<usize>,
        /// Seed for random sampling
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Worker threads (defaults to rayon's choice)
        #[arg(long)]
        threads: Option<usize>,
        /// Output directory
        #[arg(long, default_value = "ridepool-sweep")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Dispatch config (JSON); defaults apply when omitted
    #[arg(long, env = "RIDEPOOL_CONFIG")]
    config: Option<PathBuf>,
    /// Request stream (CSV)
    #[arg(long, conflicts_with = "synthetic")]
    requests: Option<PathBuf>,
    /// Synthetic demand config (JSON); the default demand is used when no input is given
    #[arg(long)]
    synthetic: Option<PathBuf>,
    /// Drop imported requests desired before this time (ms)
    #[arg(long, requires = "requests")]
    window_start_ms: Option<u64>,
    /// Drop imported requests desired after this time (ms)
    #[arg(long, requires = "requests")]
    window_end_ms: Option<u64>,
    /// Directed travel table (CSV); pairs not listed use straight-line travel
    #[arg(long)]
    travel_table: Option<PathBuf>,
}

// ── helpers ────────────────────────────────────────────────────────

struct Inputs {
    config: DispatchConfig,
    records: Vec<RequestRecord>,
    travel: Arc<dyn TravelModel>,
}

fn load_inputs(args: &InputArgs) -> Result<Inputs, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => DispatchConfig::from_json_file(path)?,
        None => DispatchConfig::default(),
    };
    config.validate()?;

    let records = match (&args.requests, &args.synthetic) {
        (Some(path), _) => {
            let window = match (args.window_start_ms, args.window_end_ms) {
                (None, None) => None,
                (start, end) => Some(RequestWindow::new(
                    start.unwrap_or(0),
                    end.unwrap_or(u64::MAX),
                )?),
            };
            read_requests_csv(path, window)?
        }
        (None, Some(path)) => DemandConfig::from_json_file(path)?.generate()?,
        (None, None) => DemandConfig::default().generate()?,
    };

    let fallback = HaversineTravelModel::new(config.speed_kmh);
    let travel: Arc<dyn TravelModel> = match &args.travel_table {
        Some(path) => Arc::new(read_travel_table_csv(path, config.resolution()?, fallback)?),
        None => Arc::new(fallback),
    };

    info!(requests = records.len(), "inputs loaded");
    Ok(Inputs {
        config,
        records,
        travel,
    })
}

fn run(input: &InputArgs, out: &Path) -> Result<(), Box<dyn Error>> {
    let Inputs {
        config,
        records,
        travel,
    } = load_inputs(input)?;
    fs::create_dir_all(out)?;

    let report = Simulation::new(&config, travel.clone())?.run(&records)?;
    let summary = summarize(&report, travel.as_ref());
    let legs = schedule_legs(&report.schedules, travel.as_ref(), config.dwell_ms);

    export_schedule_csv(&legs, out.join("schedule.csv"))?;
    if !legs.is_empty() {
        export_schedule_parquet(&legs, out.join("stops.parquet"))?;
    }
    export_outcomes_json(&report.outcomes, out.join("outcomes.json"))?;
    export_rejections_csv(&report.rejections, out.join("rejections.csv"))?;
    export_summary_json(&summary, out.join("summary.json"))?;

    println!("Requests:      {}", summary.total_requests);
    println!(
        "Committed:     {} ({:.1}%)",
        summary.committed,
        summary.acceptance_rate * 100.0
    );
    println!("Rejected:      {}", summary.rejected);
    println!("Pooled share:  {:.1}%", summary.pooled_share * 100.0);
    println!(
        "Dropoff delay: avg {:.0} s, p90 {:.0} s",
        summary.avg_dropoff_delay_ms / 1000.0,
        summary.p90_dropoff_delay_ms / 1000.0
    );
    println!(
        "Distance:      {:.1} km ({:.1} km occupied, {:.1} passenger-km)",
        summary.total_distance_km, summary.occupied_distance_km, summary.passenger_km
    );
    eprintln!("\nWrote results to {}", out.display());
    Ok(())
}

fn sweep(
    input: &InputArgs,
    space: WeightSpace,
    samples: Option<usize>,
    seed: u64,
    threads: Option<usize>,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    let Inputs {
        config,
        records,
        travel,
    } = load_inputs(input)?;
    fs::create_dir_all(out)?;

    let space = space.with_base(config.weights);
    let points = match samples {
        Some(count) => space.sample_random(count, seed),
        None => space.generate(),
    };
    let results = run_parallel_sweeps(&config, &records, travel, &points, threads, true)?;

    let score_weights = ScoreWeights::default();
    let scores = calculate_sweep_scores(&results, &score_weights);
    export_sweep_csv(&results, &scores, out.join("sweep.csv"))?;

    println!("\nTop weight vectors:");
    for &index in rank_results(&results, &score_weights).iter().take(5) {
        let result = &results[index];
        let weights = result.point.weights;
        println!(
            "  #{:<4} delay {:<5} pooling {:<5} balance {:<5} distance {:<5} -> score {:.3}, accepted {:.1}%",
            result.point.run_id,
            weights.delay,
            weights.pooling,
            weights.balance,
            weights.distance,
            scores[index],
            result.summary.acceptance_rate * 100.0
        );
    }
    eprintln!("\nWrote results to {}", out.join("sweep.csv").display());
    Ok(())
}

fn main() {
    if let Err(err) = init_logging("info") {
        eprintln!("warning: logging disabled: {err}");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { input, out } => run(&input, &out),
        Commands::Sweep {
            input,
            delay,
            pooling,
            balance,
            distance,
            samples,
            seed,
            threads,
            out,
        } => {
            let space = WeightSpace::grid()
                .delay(delay)
                .pooling(pooling)
                .balance(balance)
                .distance(distance);
            sweep(&input, space, samples, seed, threads, &out)
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        exit(1);
    }
}
