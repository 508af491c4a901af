//! PDPT Solver - Command Line Interface
//!
//! Builds and solves MILP formulations of the Pickup and Delivery Problem
//! with Transfers.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use rayon::prelude::*;

use pdpt_solver::formulations::{lyu, rais, sampaio, FormulationConfig};
use pdpt_solver::instance::{
    is_pdptwt_name, load_instances_from_dir, resolve_instance_path, Instance,
};
use pdpt_solver::generator::{write_instance, GeneratorConfig};
use pdpt_solver::model::Model;
use pdpt_solver::report::{
    log_result, median_instances, read_records, render_summary_table, summarize, SolveRecord,
};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdpt-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "MILP formulations for the Pickup and Delivery Problem with Transfers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance with the selected formulation
    Solve {
        /// Instance name (e.g. PDPT-R5-K2-T1-Q100-6 or 5R-2K-1T-8L-3) or a
        /// direct path to an instance file
        instance: String,

        /// Formulation to build
        #[arg(short, long, value_enum)]
        model: ModelKind,

        /// Emit the extended valid-inequalities/time-window block where
        /// optional
        #[arg(long)]
        vi: bool,

        /// Solver time limit in seconds
        #[arg(short, long, default_value_t = 3600.0)]
        time_limit: f64,

        /// Root directory of the benchmark data sets
        #[arg(long, default_value = "data")]
        data_root: PathBuf,

        /// Append the result to {PROBLEM}.csv in this directory
        #[arg(short, long)]
        results: Option<PathBuf>,
    },

    /// Solve every instance in a directory and log the results
    Batch {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Formulation to build
        #[arg(short, long, value_enum)]
        model: ModelKind,

        /// Emit the extended valid-inequalities/time-window block where
        /// optional
        #[arg(long)]
        vi: bool,

        /// Solver time limit per instance in seconds
        #[arg(short, long, default_value_t = 3600.0)]
        time_limit: f64,

        /// Output directory for the results CSV
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Summarize a results CSV per parameter configuration
    Aggregate {
        /// Path to a results CSV
        #[arg(short, long)]
        results: PathBuf,

        /// Restrict to one formulation (Rais, Lyu or Sampaio)
        #[arg(short, long)]
        model: Option<String>,

        /// Also print the given number of instances around the runtime
        /// median
        #[arg(long)]
        median: Option<usize>,
    },

    /// Generate a random instance file
    Generate {
        /// Number of requests
        #[arg(short, long, default_value_t = 5)]
        requests: usize,

        /// Number of vehicles
        #[arg(short = 'k', long, default_value_t = 2)]
        vehicles: usize,

        /// Number of transfer stations
        #[arg(short = 's', long, default_value_t = 1)]
        stations: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Pickup/delivery time-window width; omit for full-horizon windows
        #[arg(short, long)]
        window: Option<i64>,

        /// Output directory
        #[arg(short, long, default_value = "data/generated")]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ModelKind {
    /// Precedence-based formulation (PDPT only)
    Rais,
    /// Time-propagation formulation (PDPT and PDPTWT)
    Lyu,
    /// Closed-loop formulation (PDPTWT only)
    Sampaio,
}

impl ModelKind {
    fn name(&self) -> &'static str {
        match self {
            ModelKind::Rais => "Rais",
            ModelKind::Lyu => "Lyu",
            ModelKind::Sampaio => "Sampaio",
        }
    }

    fn build(
        &self,
        instance: &Instance,
        config: &FormulationConfig,
    ) -> Result<Model, String> {
        match self {
            ModelKind::Rais => {
                rais::build(&instance.graph, &instance.vehicles, &instance.requests, config)
            }
            ModelKind::Lyu => {
                lyu::build(&instance.graph, &instance.vehicles, &instance.requests, config)
            }
            ModelKind::Sampaio => {
                sampaio::build(&instance.graph, &instance.vehicles, &instance.requests, config)
            }
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { instance, model, vi, time_limit, data_root, results } => {
            solve_instance(&instance, model, vi, time_limit, &data_root, results);
        }

        Commands::Batch { dir, model, vi, time_limit, output } => {
            run_batch(&dir, model, vi, time_limit, &output);
        }

        Commands::Aggregate { results, model, median } => {
            aggregate_results(&results, model.as_deref(), median);
        }

        Commands::Generate { requests, vehicles, stations, seed, window, output } => {
            generate_instance(requests, vehicles, stations, seed, window, &output);
        }
    }
}

/// The Rais formulation has no time-window machinery in its base model, so
/// it only covers the untimed family; Sampaio's closed-loop convention is
/// tied to the time-windowed one.
fn check_model_compatibility(model: ModelKind, timed: bool) -> Result<(), String> {
    match model {
        ModelKind::Rais if timed => {
            Err("the Rais model cannot solve PDPTWT instances".to_string())
        }
        ModelKind::Sampaio if !timed => {
            Err("the Sampaio model only solves PDPTWT instances".to_string())
        }
        _ => Ok(()),
    }
}

fn solve_instance(
    name: &str,
    model_kind: ModelKind,
    vi: bool,
    time_limit: f64,
    data_root: &Path,
    results: Option<PathBuf>,
) {
    let direct = PathBuf::from(name);
    let path = if direct.exists() {
        direct
    } else {
        match resolve_instance_path(name, data_root) {
            Some(path) => path,
            None => {
                eprintln!("instance does not exist: {}", name);
                std::process::exit(1);
            }
        }
    };

    let instance_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let timed = is_pdptwt_name(&instance_name);

    if let Err(e) = check_model_compatibility(model_kind, timed) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let instance = match Instance::from_file(&path, model_kind == ModelKind::Sampaio) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("error loading instance: {}", e);
            std::process::exit(1);
        }
    };

    let config = FormulationConfig { vi, time_limit, ..FormulationConfig::default() };
    let mut model = match model_kind.build(&instance, &config) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("error building model: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "{}: {} with {} variables, {} constraints",
        instance.name,
        model_kind.name(),
        model.num_vars(),
        model.num_constrs()
    );

    if let Err(e) = model.optimize(config.time_limit) {
        eprintln!("solver error: {}", e);
        std::process::exit(1);
    }

    let result = model.result().expect("result available after optimize");
    println!("{}\t{}\t{}", instance.name, model_kind.name(), result);

    if let Some(results_dir) = results {
        let problem = if timed { "pdptwt" } else { "pdpt" };
        let record = SolveRecord::new(&instance.name, model_kind.name(), result);
        match log_result(&results_dir, problem, &record) {
            Ok(path) => println!("result appended to {}", path.display()),
            Err(e) => eprintln!("could not log result: {}", e),
        }
    }
}

fn run_batch(dir: &Path, model_kind: ModelKind, vi: bool, time_limit: f64, output: &Path) {
    let instances = load_instances_from_dir(dir, model_kind == ModelKind::Sampaio);
    if instances.is_empty() {
        eprintln!("no instances found in {}", dir.display());
        return;
    }
    println!("found {} instances", instances.len());

    let config = FormulationConfig { vi, time_limit, ..FormulationConfig::default() };

    // Entities are read-only, so the models of all instances can be
    // constructed in parallel; solving stays sequential since the solver
    // parallelizes internally.
    let bar = ProgressBar::new(instances.len() as u64);
    let mut models: Vec<(String, Result<Model, String>)> = instances
        .par_iter()
        .map(|instance| {
            let model = model_kind.build(instance, &config);
            bar.inc(1);
            (instance.name.clone(), model)
        })
        .collect();
    bar.finish();

    for (name, model) in &mut models {
        let model = match model {
            Ok(model) => model,
            Err(e) => {
                log::error!("{}: model construction failed: {}", name, e);
                continue;
            }
        };

        if let Err(e) = model.optimize(config.time_limit) {
            log::error!("{}: solver error: {}", name, e);
            continue;
        }
        let result = model.result().expect("result available after optimize");
        println!("{}\t{}\t{}", name, model_kind.name(), result);

        let problem = if is_pdptwt_name(name) { "pdptwt" } else { "pdpt" };
        let record = SolveRecord::new(name, model_kind.name(), result);
        if let Err(e) = log_result(output, problem, &record) {
            log::error!("{}: could not log result: {}", name, e);
        }
    }
}

fn aggregate_results(results: &Path, model: Option<&str>, median: Option<usize>) {
    let records = match read_records(results) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("error reading results: {}", e);
            std::process::exit(1);
        }
    };

    let summaries = summarize(&records, model);
    print!("{}", render_summary_table(&summaries));

    if let Some(k) = median {
        println!("\nInstances around the runtime median:");
        for name in median_instances(&records, k) {
            println!("  {}", name);
        }
    }
}

fn generate_instance(
    requests: usize,
    vehicles: usize,
    stations: usize,
    seed: u64,
    window: Option<i64>,
    output: &Path,
) {
    let config = GeneratorConfig {
        requests,
        vehicles,
        stations,
        seed,
        window_width: window,
        ..GeneratorConfig::default()
    };
    let path = output.join(format!("{}.txt", config.instance_name()));
    match write_instance(&config, &path) {
        Ok(()) => println!("instance written to {}", path.display()),
        Err(e) => {
            eprintln!("error generating instance: {}", e);
            std::process::exit(1);
        }
    }
}
