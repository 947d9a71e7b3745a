//! Benchmarking and experimentation module.
//!
//! Runs the colony over several seeds per instance, collects one record per
//! run and aggregates them per instance.

use crate::colony::{Colony, ColonyConfig};
use crate::error::InstanceError;
use crate::instance::TspInstance;
use crate::runner::{Runner, StoppingPolicy};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Result of a single seeded run on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Instance name
    pub instance: String,
    /// Number of cities
    pub dimension: usize,
    /// Run index within the instance
    pub run: usize,
    pub seed: u32,
    /// Best tour length found
    pub length: f64,
    /// Nearest-neighbour tour length
    pub greedy_length: f64,
    /// Improvement over the greedy tour in percent (negative is better)
    pub gap_to_greedy: f64,
    /// Gap to best known (if available)
    pub gap_to_best: Option<f64>,
    pub iterations: usize,
    /// Computation time in seconds
    pub time: f64,
}

/// Aggregated statistics for one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStatistics {
    pub instance: String,
    pub dimension: usize,
    pub num_runs: usize,
    pub avg_length: f64,
    pub std_length: f64,
    pub best_length: f64,
    pub worst_length: f64,
    pub greedy_length: f64,
    pub avg_time: f64,
    /// Average gap to best known
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeded runs per instance
    pub num_runs: usize,
    /// Colony parameters; run `k` uses `colony.seed + k`
    pub colony: ColonyConfig,
    /// When each run stops
    pub policy: StoppingPolicy,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            colony: ColonyConfig::default(),
            policy: StoppingPolicy {
                max_iterations: Some(500),
                max_time: Some(60.0),
                max_stagnation: None,
            },
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    records: Vec<BenchmarkRecord>,
    best_known: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            records: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Set best known solution for an instance
    pub fn set_best_known(&mut self, instance_name: &str, length: f64) {
        self.best_known.insert(instance_name.to_string(), length);
    }

    /// Run every seed on one instance.
    pub fn run_instance(&mut self, instance: &TspInstance) -> Result<(), InstanceError> {
        log::info!("Running benchmark on instance: {}", instance.name);
        let world = instance.world()?;
        let runner = Runner::new(self.config.policy.clone())?;

        for run in 0..self.config.num_runs {
            let colony_config = ColonyConfig {
                seed: self.config.colony.seed.wrapping_add(run as u32),
                ..self.config.colony.clone()
            };
            let seed = colony_config.seed;
            let mut colony = Colony::rank_based(world.clone(), colony_config)?;
            let report = runner.run(&mut colony, &instance.name, |_| {})?;

            let greedy = report.greedy_distance;
            let record = BenchmarkRecord {
                instance: instance.name.clone(),
                dimension: instance.dimension,
                run,
                seed,
                length: report.best.length,
                greedy_length: greedy,
                gap_to_greedy: report.best.gap_to(greedy).unwrap_or(0.0),
                gap_to_best: self.best_known.get(&instance.name).and_then(|&best| report.best.gap_to(best)),
                iterations: report.logs.len(),
                time: report.best.computation_time,
            };
            log::debug!("run {} (seed {}): {:.2}", run, seed, record.length);
            self.records.push(record);
        }
        Ok(())
    }

    /// Run benchmark on multiple instances; an instance that fails is
    /// logged and skipped.
    pub fn run_on_instances(&mut self, instances: &[TspInstance]) {
        for instance in instances {
            if let Err(e) = self.run_instance(instance) {
                log::error!("Benchmark on {} failed: {}", instance.name, e);
            }
        }
    }

    /// Compute statistics for each instance, in order of first appearance
    pub fn compute_statistics(&self) -> Vec<BenchmarkStatistics> {
        let mut order: Vec<&str> = Vec::new();
        let mut by_instance: HashMap<&str, Vec<&BenchmarkRecord>> = HashMap::new();
        for record in &self.records {
            let runs = by_instance.entry(record.instance.as_str()).or_insert_with(|| {
                order.push(record.instance.as_str());
                Vec::new()
            });
            runs.push(record);
        }

        order
            .into_iter()
            .map(|name| {
                let runs = &by_instance[name];
                let lengths: Vec<f64> = runs.iter().map(|r| r.length).collect();
                let times: Vec<f64> = runs.iter().map(|r| r.time).collect();
                let gaps: Vec<f64> = runs.iter().filter_map(|r| r.gap_to_best).collect();

                let std_length = if lengths.len() > 1 { Statistics::std_dev(&lengths) } else { 0.0 };

                BenchmarkStatistics {
                    instance: name.to_string(),
                    dimension: runs[0].dimension,
                    num_runs: runs.len(),
                    avg_length: Statistics::mean(&lengths),
                    std_length,
                    best_length: Statistics::min(&lengths),
                    worst_length: Statistics::max(&lengths),
                    greedy_length: runs[0].greedy_length,
                    avg_time: Statistics::mean(&times),
                    avg_gap: if gaps.is_empty() { None } else { Some(Statistics::mean(&gaps)) },
                }
            })
            .collect()
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       RBAS Benchmark Report\n");
        report.push_str("========================================\n\n");

        let colony = &self.config.colony;
        report.push_str(&format!(
            "Runs per instance: {} | beta {} | rho {} | w {} | base seed {}\n\n",
            self.config.num_runs, colony.beta, colony.rho, colony.rank_window, colony.seed
        ));

        report.push_str(&format!(
            "{:<20} {:>6} {:>12} {:>10} {:>12} {:>12} {:>10} {:>10}\n",
            "Instance", "N", "Avg Len", "Std", "Best", "Greedy", "Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(98).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            let gap_str = stat.avg_gap.map(|g| format!("{:.2}%", g)).unwrap_or_else(|| "-".to_string());
            report.push_str(&format!(
                "{:<20} {:>6} {:>12.2} {:>10.2} {:>12.2} {:>12.2} {:>10} {:>10.3}\n",
                stat.instance,
                stat.dimension,
                stat.avg_length,
                stat.std_length,
                stat.best_length,
                stat.greedy_length,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(98).as_str());
        report.push('\n');
        report
    }

    /// Get all results
    pub fn records(&self) -> &[BenchmarkRecord] {
        &self.records
    }

    /// Get best known values
    pub fn best_known(&self) -> &HashMap<String, f64> {
        &self.best_known
    }
}

/// Helper function to load instances from a directory
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<TspInstance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "tsp").unwrap_or(false) {
                match TspInstance::from_file(&path) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => log::warn!("skipping {}: {}", path.display(), e),
                }
            }
        }
    }

    // Sort by dimension
    instances.sort_by(|a, b| a.dimension.cmp(&b.dimension).then_with(|| a.name.cmp(&b.name)));

    instances
}

/// Read best known lengths from lines of the form `name : length`.
/// Blank lines and lines starting with `#` are skipped.
pub fn load_best_known<P: AsRef<Path>>(path: P) -> Result<HashMap<String, f64>, InstanceError> {
    let reader = BufReader::new(File::open(path)?);
    let mut best = HashMap::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed = line
            .split_once(':')
            .and_then(|(name, value)| value.trim().parse::<f64>().ok().map(|v| (name.trim().to_string(), v)));
        match parsed {
            Some((name, value)) => {
                best.insert(name, value);
            }
            None => {
                return Err(InstanceError::Parse {
                    line: index + 1,
                    message: "expected 'name : length'".to_string(),
                })
            }
        }
    }
    Ok(best)
}
