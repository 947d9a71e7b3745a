//! Data-parallel ant colony engine.
//!
//! A [`Colony`] owns the world, the pheromone and probability fields, the
//! flattened candidate set and every ant's tour. One call to
//! [`Colony::forage`] runs a full generation:
//!
//! 1. build one tour per ant (all ants in lockstep, see [`construction`]);
//! 2. score the tours and update the iteration/global records;
//! 3. let the [`PheromoneRule`] evaporate and deposit pheromone;
//! 4. rebuild the probability field for the next generation.
//!
//! Specific ant systems plug in through [`PheromoneRule`]; the crate ships
//! the Rank-Based Ant System.

pub mod candidates;
pub mod construction;
pub mod field;
pub mod random;
pub mod rank_based;

pub use candidates::CandidateSet;
pub use construction::START_CITY;
pub use rank_based::RankBasedAntSystem;

use crate::error::ColonyError;
use crate::world::{SquareMatrix, World};
use ordered_float::OrderedFloat;
use random::RandomStream;
use serde::{Deserialize, Serialize};

/// Colony configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonyConfig {
    /// Number of ants; `None` uses one ant per city
    pub num_ants: Option<usize>,
    /// Heuristic importance (beta); pheromone importance is fixed at 1
    pub beta: f64,
    /// Evaporation rate (rho)
    pub rho: f64,
    /// Rank window (w) of the rank-based update
    pub rank_window: usize,
    /// Seed of the draw stream
    pub seed: u32,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        ColonyConfig {
            num_ants: None,
            beta: 2.0,
            rho: 0.1,
            rank_window: RankBasedAntSystem::DEFAULT_RANK_WINDOW,
            seed: 42,
        }
    }
}

impl ColonyConfig {
    pub fn ants_for(&self, num_cities: usize) -> usize {
        self.num_ants.unwrap_or(num_cities)
    }

    pub fn validate(&self, num_cities: usize) -> Result<(), ColonyError> {
        if num_cities < 2 {
            return Err(ColonyError::TooFewCities(num_cities));
        }
        if self.ants_for(num_cities) == 0 {
            return Err(ColonyError::NoAnts);
        }
        validate_beta(self.beta)?;
        validate_rho(self.rho)?;
        if self.rank_window == 0 {
            return Err(ColonyError::InvalidRankWindow);
        }
        Ok(())
    }
}

fn validate_beta(beta: f64) -> Result<(), ColonyError> {
    if beta > 0.0 && beta.is_finite() {
        Ok(())
    } else {
        Err(ColonyError::InvalidBeta(beta))
    }
}

fn validate_rho(rho: f64) -> Result<(), ColonyError> {
    if (0.0..=1.0).contains(&rho) {
        Ok(())
    } else {
        Err(ColonyError::InvalidRho(rho))
    }
}

/// Best distances and stagnation bookkeeping, updated once per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Generations completed so far
    pub iteration: usize,
    /// Shortest tour of the latest generation
    pub iteration_best_distance: f64,
    /// Shortest tour ever seen
    pub global_best_distance: f64,
    pub global_best_tour: Vec<usize>,
    /// Consecutive generations without a new global best
    pub reps: usize,
}

impl IterationRecord {
    pub fn new() -> Self {
        IterationRecord {
            iteration: 0,
            iteration_best_distance: f64::INFINITY,
            global_best_distance: f64::INFINITY,
            global_best_tour: Vec::new(),
            reps: 0,
        }
    }
}

impl Default for IterationRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a finished generation handed to a [`PheromoneRule`].
pub struct Generation<'a> {
    pub num_cities: usize,
    pub rho: f64,
    /// Flat tours, `num_cities` entries per ant
    pub tours: &'a [usize],
    pub lengths: &'a [f64],
    pub record: &'a IterationRecord,
}

impl<'a> Generation<'a> {
    pub fn num_ants(&self) -> usize {
        self.lengths.len()
    }

    pub fn tour(&self, ant: usize) -> &'a [usize] {
        let tours = self.tours;
        &tours[ant * self.num_cities..(ant + 1) * self.num_cities]
    }
}

/// Hooks a specific ant system provides to the shared colony engine.
pub trait PheromoneRule: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self) -> Result<(), ColonyError> {
        Ok(())
    }

    /// Refresh derived parameters; called on initialization and whenever a
    /// tunable changes.
    fn compute_parameters(&mut self, num_ants: usize);

    /// Uniform starting pheromone level.
    fn initial_pheromone(&self, greedy_distance: f64, num_ants: usize, rho: f64) -> f64;

    /// Evaporate and deposit after a generation has been scored.
    fn update_pheromones(&self, pheromones: &mut SquareMatrix, generation: &Generation<'_>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColonyState {
    Uninitialized,
    Ready,
}

/// Ant colony over a fixed world, generic over its pheromone rule.
pub struct Colony<R: PheromoneRule> {
    world: World,
    config: ColonyConfig,
    rule: R,
    num_ants: usize,
    state: ColonyState,
    greedy_distance: f64,
    initial_pheromone: f64,
    pheromones: SquareMatrix,
    visibility: SquareMatrix,
    probabilities: SquareMatrix,
    candidates: CandidateSet,
    draws: RandomStream,
    tours: Vec<usize>,
    lengths: Vec<f64>,
    record: IterationRecord,
}

impl Colony<RankBasedAntSystem> {
    /// Rank-Based Ant System using `config.rank_window`.
    pub fn rank_based(world: World, config: ColonyConfig) -> Result<Self, ColonyError> {
        let rule = RankBasedAntSystem::new(config.rank_window);
        Colony::new(world, config, rule)
    }

    pub fn rank_window(&self) -> usize {
        self.rule.rank_window()
    }

    pub fn set_rank_window(&mut self, rank_window: usize) -> Result<(), ColonyError> {
        self.rule.set_rank_window(rank_window)?;
        self.config.rank_window = rank_window;
        self.rule.compute_parameters(self.num_ants);
        Ok(())
    }
}

impl<R: PheromoneRule> Colony<R> {
    pub fn new(world: World, config: ColonyConfig, rule: R) -> Result<Self, ColonyError> {
        let n = world.num_cities();
        config.validate(n)?;
        rule.validate()?;
        let num_ants = config.ants_for(n);

        Ok(Colony {
            world,
            rule,
            num_ants,
            state: ColonyState::Uninitialized,
            greedy_distance: 0.0,
            initial_pheromone: 0.0,
            pheromones: SquareMatrix::filled(n, 0.0),
            visibility: SquareMatrix::filled(n, 0.0),
            probabilities: SquareMatrix::filled(n, 0.0),
            candidates: CandidateSet::new(num_ants, n),
            draws: RandomStream::seeded(config.seed, num_ants, n),
            tours: vec![START_CITY; num_ants * n],
            lengths: vec![0.0; num_ants],
            record: IterationRecord::new(),
            config,
        })
    }

    /// Compute the greedy baseline, seed the pheromone field and the first
    /// probability field, and clear every per-run buffer.
    pub fn initialize(&mut self) {
        let n = self.world.num_cities();

        self.rule.compute_parameters(self.num_ants);
        self.greedy_distance = self.world.greedy_distance();
        self.compute_initial_pheromone();
        self.visibility = field::compute_visibility(&self.world, self.config.beta);
        self.compute_probabilities();

        self.candidates = CandidateSet::new(self.num_ants, n);
        self.draws = RandomStream::seeded(self.config.seed, self.num_ants, n);
        self.tours.iter_mut().for_each(|c| *c = START_CITY);
        self.lengths.iter_mut().for_each(|l| *l = 0.0);
        self.record = IterationRecord::new();
        self.state = ColonyState::Ready;

        log::info!(
            "{} colony ready: {} cities, {} ants, beta={}, rho={}, greedy={:.2}, tau0={:.6}",
            self.rule.name(),
            n,
            self.num_ants,
            self.config.beta,
            self.config.rho,
            self.greedy_distance,
            self.initial_pheromone
        );
    }

    fn compute_initial_pheromone(&mut self) {
        self.initial_pheromone =
            self.rule.initial_pheromone(self.greedy_distance, self.num_ants, self.config.rho);
        self.pheromones.fill(self.initial_pheromone);
    }

    /// Run one generation: construct, score, update pheromone, recompute
    /// probabilities.
    pub fn forage(&mut self) -> Result<(), ColonyError> {
        if self.state != ColonyState::Ready {
            return Err(ColonyError::NotInitialized);
        }

        construction::construct_tours(
            &mut self.candidates,
            &mut self.draws,
            &self.probabilities,
            &mut self.tours,
        );
        let improved = self.compute_ant_distances();

        let generation = Generation {
            num_cities: self.world.num_cities(),
            rho: self.config.rho,
            tours: &self.tours,
            lengths: &self.lengths,
            record: &self.record,
        };
        self.rule.update_pheromones(&mut self.pheromones, &generation);
        self.compute_probabilities();

        log::debug!(
            "iteration {}: best {:.4}, global {:.4}{}",
            self.record.iteration,
            self.record.iteration_best_distance,
            self.record.global_best_distance,
            if improved { " (improved)" } else { "" }
        );
        Ok(())
    }

    /// Score every ant's tour and update the records. Returns whether a new
    /// global best was found.
    pub fn compute_ant_distances(&mut self) -> bool {
        construction::compute_tour_lengths(&self.world, &self.tours, &mut self.lengths);

        let Some((best_ant, &best)) = self
            .lengths
            .iter()
            .enumerate()
            .min_by_key(|&(ant, &length)| (OrderedFloat(length), ant))
        else {
            return false;
        };

        let record = &mut self.record;
        record.iteration += 1;
        record.iteration_best_distance = best;

        if best < record.global_best_distance {
            let n = self.world.num_cities();
            record.global_best_distance = best;
            record.global_best_tour = self.tours[best_ant * n..(best_ant + 1) * n].to_vec();
            record.reps = 0;
            true
        } else {
            record.reps += 1;
            false
        }
    }

    /// Rebuild the probability field from the current pheromone field.
    pub fn compute_probabilities(&mut self) {
        field::compute_probabilities(&self.pheromones, &self.visibility, &mut self.probabilities);
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<(), ColonyError> {
        validate_beta(beta)?;
        self.config.beta = beta;
        if self.state == ColonyState::Ready {
            self.visibility = field::compute_visibility(&self.world, beta);
            self.compute_probabilities();
        }
        Ok(())
    }

    pub fn set_rho(&mut self, rho: f64) -> Result<(), ColonyError> {
        validate_rho(rho)?;
        self.config.rho = rho;
        self.rule.compute_parameters(self.num_ants);
        Ok(())
    }

    pub fn state(&self) -> ColonyState {
        self.state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn variant(&self) -> &str {
        self.rule.name()
    }

    pub fn beta(&self) -> f64 {
        self.config.beta
    }

    pub fn rho(&self) -> f64 {
        self.config.rho
    }

    pub fn num_ants(&self) -> usize {
        self.num_ants
    }

    pub fn num_cities(&self) -> usize {
        self.world.num_cities()
    }

    pub fn greedy_distance(&self) -> f64 {
        self.greedy_distance
    }

    pub fn initial_pheromone(&self) -> f64 {
        self.initial_pheromone
    }

    pub fn record(&self) -> &IterationRecord {
        &self.record
    }

    pub fn iteration(&self) -> usize {
        self.record.iteration
    }

    pub fn iteration_best_distance(&self) -> f64 {
        self.record.iteration_best_distance
    }

    pub fn global_best_distance(&self) -> f64 {
        self.record.global_best_distance
    }

    pub fn best_tour(&self) -> &[usize] {
        &self.record.global_best_tour
    }

    /// Consecutive generations without improving the global best.
    pub fn reps(&self) -> usize {
        self.record.reps
    }

    pub fn ant_tour(&self, ant: usize) -> &[usize] {
        let n = self.world.num_cities();
        &self.tours[ant * n..(ant + 1) * n]
    }

    pub fn ant_tours(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.tours.chunks(self.world.num_cities())
    }

    pub fn ant_distances(&self) -> &[f64] {
        &self.lengths
    }

    pub fn pheromones(&self) -> &SquareMatrix {
        &self.pheromones
    }

    pub fn probabilities(&self) -> &SquareMatrix {
        &self.probabilities
    }
}
