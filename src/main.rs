//! RBAS-TSP - Command Line Interface
//!
//! Solves symmetric TSP instances with the data-parallel Rank-Based Ant
//! System.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rbas_tsp::benchmark::{load_best_known, load_instances_from_dir, Benchmark, BenchmarkConfig};
use rbas_tsp::colony::{Colony, ColonyConfig};
use rbas_tsp::instance::TspInstance;
use rbas_tsp::runner::{Runner, StoppingPolicy};
use rbas_tsp::visualization::Visualizer;
use rbas_tsp::writer::{IterationWriter, RunHeader};

use std::path::{Path, PathBuf};

const DEFAULT_ITERATIONS: usize = 1000;

#[derive(Parser)]
#[command(name = "rbas-tsp")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "A data-parallel Rank-Based Ant System for the symmetric TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone, Debug)]
struct ColonyArgs {
    /// Number of ants (defaults to one per city)
    #[arg(short = 'm', long)]
    ants: Option<usize>,

    /// Heuristic importance (beta)
    #[arg(long, default_value = "2.0")]
    beta: f64,

    /// Evaporation rate (rho)
    #[arg(long, default_value = "0.1")]
    rho: f64,

    /// Rank window (w)
    #[arg(short = 'w', long, default_value = "6")]
    rank_window: usize,

    /// Random seed
    #[arg(short, long, default_value = "42")]
    seed: u32,
}

impl ColonyArgs {
    fn config(&self) -> ColonyConfig {
        ColonyConfig {
            num_ants: self.ants,
            beta: self.beta,
            rho: self.rho,
            rank_window: self.rank_window,
            seed: self.seed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        #[command(flatten)]
        colony: ColonyArgs,

        /// Maximum number of iterations
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Stop after this many iterations without improvement
        #[arg(long)]
        max_stagnation: Option<usize>,

        /// Append per-iteration rows to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output the run report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the best tour and the convergence chart
        #[arg(long)]
        visualize: bool,

        /// Print every iteration instead of a progress bar
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of seeded runs per instance
        #[arg(short, long, default_value = "5")]
        runs: usize,

        #[command(flatten)]
        colony: ColonyArgs,

        /// Maximum number of iterations per run
        #[arg(long, default_value = "500")]
        max_iterations: usize,

        /// Time limit per run
        #[arg(short, long, default_value = "60")]
        time_limit: f64,

        /// File of `name : length` best known values
        #[arg(long)]
        best_known: Option<PathBuf>,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Generate a random uniform instance
    Generate {
        /// Number of cities
        #[arg(short, long)]
        cities: usize,

        /// Side of the square the cities are scattered in
        #[arg(long, default_value = "1000")]
        side: f64,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output TSPLIB file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            colony,
            max_iterations,
            time_limit,
            max_stagnation,
            csv,
            output,
            visualize,
            verbose,
        } => {
            let mut policy = StoppingPolicy { max_iterations, max_time: time_limit, max_stagnation };
            if policy.validate().is_err() {
                policy.max_iterations = Some(DEFAULT_ITERATIONS);
            }
            solve_instance(&instance, colony.config(), policy, csv, output, visualize, verbose);
        }

        Commands::Benchmark { dir, output, runs, colony, max_iterations, time_limit, best_known, max_size } => {
            let config = BenchmarkConfig {
                num_runs: runs,
                colony: colony.config(),
                policy: StoppingPolicy {
                    max_iterations: Some(max_iterations),
                    max_time: Some(time_limit),
                    max_stagnation: None,
                },
            };
            run_benchmark(&dir, &output, config, best_known, max_size);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }

        Commands::Generate { cities, side, seed, output } => {
            generate_instance(cities, side, seed, &output);
        }
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn load_instance(path: &Path) -> TspInstance {
    println!("Loading instance from {:?}...", path);
    match TspInstance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => fail("Error loading instance", e),
    }
}

fn solve_instance(
    path: &Path,
    config: ColonyConfig,
    policy: StoppingPolicy,
    csv: Option<PathBuf>,
    output: Option<PathBuf>,
    visualize: bool,
    verbose: bool,
) {
    let instance = load_instance(path);
    let world = instance.world().unwrap_or_else(|e| fail("Invalid instance", e));
    let mut colony = Colony::rank_based(world, config).unwrap_or_else(|e| fail("Invalid configuration", e));
    let runner = Runner::new(policy).unwrap_or_else(|e| fail("Invalid stopping policy", e));

    let mut writer = IterationWriter::new(verbose);
    if let Some(csv_path) = &csv {
        writer = writer.with_csv(csv_path).unwrap_or_else(|e| fail("Cannot open CSV output", e));
    }
    writer.write_header(&RunHeader {
        instance: instance.name.clone(),
        variant: colony.variant().to_string(),
        num_ants: colony.num_ants(),
        beta: colony.beta(),
        rho: colony.rho(),
        rank_window: colony.rank_window(),
    });

    let progress = if verbose {
        ProgressBar::hidden()
    } else {
        match runner.policy().max_iterations {
            Some(max) => {
                let bar = ProgressBar::new(max as u64);
                bar.set_style(
                    ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        }
    };

    println!("Solving {} with RBAS...", instance.name);
    let report = runner
        .run(&mut colony, &instance.name, |line| {
            progress.inc(1);
            progress.set_message(format!("best {:.2}", line.global_best));
            if let Err(e) = writer.write(line) {
                log::warn!("failed to write iteration {}: {}", line.iteration, e);
            }
        })
        .unwrap_or_else(|e| fail("Run failed", e));
    progress.finish_and_clear();

    let best = &report.best;
    println!("\n========== Results ==========");
    println!("Algorithm: {}", best.algorithm);
    println!("Ants: {}", report.num_ants);
    println!("Greedy length: {:.2}", report.greedy_distance);
    println!("Best length: {:.2}", best.length);
    if let Some(gap) = best.gap_to(report.greedy_distance) {
        println!("Gap to greedy: {:.2}%", gap);
    }
    println!("Complete tour: {}", best.is_complete(colony.world()));
    println!("Stopped by: {:?}", report.stop_reason);
    println!("Time: {:.4}s", best.computation_time);
    if let Some(iter) = best.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\nTour: {}", best.tour_string());
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| fail("Cannot serialize report", e));
        if let Err(e) = std::fs::write(&out_path, json) {
            fail("Failed to write output", e);
        }
        println!("\nReport saved to {:?}", out_path);
    }

    if visualize {
        let viz = Visualizer::new();
        let tour_svg = viz.generate_tour_svg(&instance, best);
        save_figure(&viz, &tour_svg, path, "tour");
        let chart_svg = viz.generate_convergence_svg(&instance.name, &report.logs);
        save_figure(&viz, &chart_svg, path, "convergence");
    }
}

/// PNG when available, SVG otherwise. Figures sit next to the instance.
fn save_figure(viz: &Visualizer, svg: &str, instance_path: &Path, kind: &str) {
    let png_path = instance_path.with_extension(format!("{}.png", kind));
    match viz.save_png(svg, &png_path) {
        Ok(()) => println!("Visualization saved to {:?}", png_path),
        Err(e) => {
            let svg_path = instance_path.with_extension(format!("{}.svg", kind));
            match viz.save_svg(svg, &svg_path) {
                Ok(()) => println!("PNG export unavailable ({}). Saved SVG to {:?}", e, svg_path),
                Err(e) => eprintln!("Failed to save SVG: {}", e),
            }
        }
    }
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    config: BenchmarkConfig,
    best_known: Option<PathBuf>,
    max_size: Option<usize>,
) {
    println!("Loading instances from {:?}...", dir);
    let mut instances = load_instances_from_dir(dir);

    if let Some(max) = max_size {
        instances.retain(|i| i.dimension <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return;
    }

    if let Err(e) = std::fs::create_dir_all(output) {
        fail("Failed to create output directory", e);
    }

    let mut benchmark = Benchmark::new(config);
    if let Some(best_path) = best_known {
        let best = load_best_known(&best_path).unwrap_or_else(|e| fail("Cannot read best known values", e));
        for (name, length) in best {
            benchmark.set_best_known(&name, length);
        }
    }

    for (i, instance) in instances.iter().enumerate() {
        println!("\n[{}/{}] Processing {} (n={})...", i + 1, instances.len(), instance.name, instance.dimension);
        if let Err(e) = benchmark.run_instance(instance) {
            eprintln!("Skipping {}: {}", instance.name, e);
        }
    }

    let results_path = output.join("results.csv");
    if let Err(e) = benchmark.export_to_csv(&results_path) {
        fail("Failed to export results", e);
    }
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    if let Err(e) = benchmark.export_statistics_csv(&stats_path) {
        fail("Failed to export statistics", e);
    }
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    if let Err(e) = std::fs::write(&report_path, &report) {
        fail("Failed to save report", e);
    }
    println!("Report saved to {:?}", report_path);
}

fn analyze_instance(path: &Path) {
    let instance = load_instance(path);
    println!("{}", instance.statistics());

    let world = instance.world().unwrap_or_else(|e| fail("Invalid instance", e));
    let greedy_tour = world.greedy_tour();
    println!("Greedy tour length: {:.2}", world.tour_length(&greedy_tour));

    match Colony::rank_based(world, ColonyConfig::default()) {
        Ok(mut colony) => {
            colony.initialize();
            println!(
                "Default colony: {} ants, w = {}, tau0 = {:.6}",
                colony.num_ants(),
                colony.rank_window(),
                colony.initial_pheromone()
            );
        }
        Err(e) => println!("Cannot build a colony: {}", e),
    }
}

fn generate_instance(cities: usize, side: f64, seed: u64, output: &Path) {
    if !(side > 0.0 && side.is_finite()) {
        fail("Invalid side", side);
    }
    let instance = TspInstance::random_uniform(cities, side, seed);
    if let Err(e) = std::fs::write(output, instance.to_tsplib()) {
        fail("Failed to write instance", e);
    }
    println!("Generated {} ({} cities) at {:?}", instance.name, instance.dimension, output);
}
