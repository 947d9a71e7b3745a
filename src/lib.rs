//! RBAS-TSP Library
//!
//! A data-parallel Rank-Based Ant System for the symmetric Traveling
//! Salesman Problem.
//!
//! # Features
//!
//! - Colony engine running every ant in lockstep over a flattened candidate
//!   set (segmented weighted selection, stream compaction, prefix scans)
//! - Rank-based pheromone update with an elitist global-best deposit
//! - Deterministic for a fixed seed, whatever the thread count
//! - TSPLIB instance reading, run orchestration, benchmarking and SVG output
//!
//! # Example
//!
//! ```no_run
//! use rbas_tsp::colony::{Colony, ColonyConfig};
//! use rbas_tsp::instance::TspInstance;
//! use rbas_tsp::runner::{Runner, StoppingPolicy};
//!
//! let instance = TspInstance::from_file("berlin52.tsp").unwrap();
//! let mut colony = Colony::rank_based(instance.world().unwrap(), ColonyConfig::default()).unwrap();
//!
//! let runner = Runner::new(StoppingPolicy::iterations(500)).unwrap();
//! let report = runner.run(&mut colony, &instance.name, |_| {}).unwrap();
//!
//! println!("Best length: {:.2}", report.best.length);
//! ```

pub mod benchmark;
pub mod colony;
pub mod error;
pub mod instance;
pub mod runner;
pub mod solution;
pub mod visualization;
pub mod world;
pub mod writer;

pub use colony::{Colony, ColonyConfig, RankBasedAntSystem};
pub use error::{ColonyError, InstanceError};
pub use instance::TspInstance;
pub use solution::Solution;
pub use world::World;
