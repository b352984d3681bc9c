use std::fs::File;
use std::io::{BufReader, Write};
use std::num::NonZeroUsize;
use std::time::Instant;
use clap::Parser;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use cachelib::config::SimulationSuite;
use cachelib::io::load_trace;
use cachelib::parallel_sim::run_suite;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Replays a memory access trace against a suite of cache configurations"))]
struct Args {
    /// Trace file, one `L <hex address>` or `S <hex address>` record per line
    trace: String,

    /// JSON suite of configuration groups, the built in suite is used when absent
    #[arg(short, long)]
    config: Option<String>,

    /// Write the results to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Print the results as JSON rather than `<hits>,<accesses>;` rows
    #[arg(long)]
    json: bool,

    /// Number of worker threads, defaults to the available parallelism
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    TermLogger::init(level, simplelog::Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .map_err(|e| format!("Couldn't initialise logging: {e}"))?;

    let suite: SimulationSuite = match &args.config {
        Some(path) => {
            let config_file = File::open(path).map_err(|e| format!("Couldn't open the config file at path {path}: {e}"))?;
            serde_json::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?
        }
        None => SimulationSuite::default(),
    };
    let trace = load_trace(&args.trace).map_err(|e| format!("Couldn't load the trace file at path {}: {e}", args.trace))?;
    log::info!("Loaded {} accesses from {}", trace.len(), args.trace);

    let workers = args.workers
        .or_else(|| std::thread::available_parallelism().ok())
        .unwrap_or(NonZeroUsize::MIN);
    let simulation_start = Instant::now();
    let result = run_suite(&suite, &trace, workers).map_err(|e| e.to_string())?;
    let simulation_time = simulation_start.elapsed();

    let rendered = if args.json {
        let mut json = serde_json::to_string_pretty(&result).map_err(|e| format!("Couldn't serialise the output {e}"))?;
        json.push('\n');
        json
    } else {
        result.to_tuples()
    };
    match &args.output {
        Some(path) => {
            let mut file = File::create(path).map_err(|e| format!("Couldn't create the output file at path {path}: {e}"))?;
            file.write_all(rendered.as_bytes()).map_err(|e| format!("Couldn't write the output file: {e}"))?;
        }
        None => print!("{rendered}"),
    }

    if args.performance {
        let total_time = start.elapsed();
        println!("Simulation time ({} configurations on {workers} workers): {}s", suite.len(), simulation_time.as_nanos() as f64 / 1e9);
        for cache in result.groups.iter().flat_map(|g| &g.caches) {
            println!("  {}: {}s", cache.name, cache.simulation_time.as_nanos() as f64 / 1e9);
        }
        println!("Total execution time (includes trace loading, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {suite:?}");
        for group in &result.groups {
            let formatted = group.caches
                .iter()
                .map(|c| format!("{}: {}", c.name, c.uninitialised_lines))
                .collect::<Vec<_>>()
                .join(", ");
            println!("Uninitialised cache lines in {}: ({formatted})", group.name);
        }
        let total: usize = result.groups.iter().flat_map(|g| &g.caches).map(|c| c.uninitialised_lines).sum();
        println!("Total uninitialised cache lines: {total}")
    }
    Ok(())
}
