//! Run orchestration: drives a colony generation by generation until a
//! stopping policy fires, timing every iteration.

use crate::colony::{Colony, ColonyConfig, ColonyState, PheromoneRule};
use crate::error::ColonyError;
use crate::solution::Solution;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// When to stop foraging. Every limit is optional but at least one must be
/// set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoppingPolicy {
    /// Maximum number of generations
    pub max_iterations: Option<usize>,
    /// Wall-clock limit in seconds
    pub max_time: Option<f64>,
    /// Maximum consecutive generations without a new global best
    pub max_stagnation: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxIterations,
    TimeLimit,
    Stagnation,
}

impl StoppingPolicy {
    pub fn iterations(max_iterations: usize) -> Self {
        StoppingPolicy { max_iterations: Some(max_iterations), ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), ColonyError> {
        if self.max_iterations.is_none() && self.max_time.is_none() && self.max_stagnation.is_none() {
            return Err(ColonyError::UnboundedRun);
        }
        Ok(())
    }

    /// Checked after each generation.
    pub fn should_stop(&self, iterations: usize, elapsed: f64, reps: usize) -> Option<StopReason> {
        if self.max_iterations.map_or(false, |max| iterations >= max) {
            return Some(StopReason::MaxIterations);
        }
        if self.max_time.map_or(false, |max| elapsed >= max) {
            return Some(StopReason::TimeLimit);
        }
        if self.max_stagnation.map_or(false, |max| reps >= max) {
            return Some(StopReason::Stagnation);
        }
        None
    }
}

/// One line of the per-iteration log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationLog {
    pub iteration: usize,
    pub iteration_best: f64,
    pub global_best: f64,
    /// Seconds since the run started
    pub elapsed: f64,
    /// Seconds spent in this iteration
    pub iteration_time: f64,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub instance: String,
    pub variant: String,
    pub num_cities: usize,
    pub num_ants: usize,
    pub parameters: ColonyConfig,
    pub greedy_distance: f64,
    pub initial_pheromone: f64,
    pub best: Solution,
    pub stop_reason: StopReason,
    pub logs: Vec<IterationLog>,
}

pub struct Runner {
    policy: StoppingPolicy,
}

impl Runner {
    pub fn new(policy: StoppingPolicy) -> Result<Self, ColonyError> {
        policy.validate()?;
        Ok(Runner { policy })
    }

    pub fn policy(&self) -> &StoppingPolicy {
        &self.policy
    }

    /// Forage until the policy stops the run. `on_iteration` sees every log
    /// line as soon as it is produced.
    pub fn run<R, F>(&self, colony: &mut Colony<R>, instance: &str, mut on_iteration: F) -> Result<RunReport, ColonyError>
    where
        R: PheromoneRule,
        F: FnMut(&IterationLog),
    {
        if colony.state() != ColonyState::Ready {
            colony.initialize();
        }

        let start = Instant::now();
        let mut logs = Vec::new();

        let stop_reason = loop {
            let iteration_start = Instant::now();
            colony.forage()?;

            let log_line = IterationLog {
                iteration: colony.iteration(),
                iteration_best: colony.iteration_best_distance(),
                global_best: colony.global_best_distance(),
                elapsed: start.elapsed().as_secs_f64(),
                iteration_time: iteration_start.elapsed().as_secs_f64(),
            };
            on_iteration(&log_line);
            logs.push(log_line);

            if let Some(reason) =
                self.policy.should_stop(logs.len(), start.elapsed().as_secs_f64(), colony.reps())
            {
                break reason;
            }
        };

        let mut best = Solution::from_colony(colony);
        best.computation_time = start.elapsed().as_secs_f64();

        log::info!(
            "{} on {} stopped after {} iterations ({:?}): best {:.2}, greedy {:.2}",
            colony.variant(),
            instance,
            logs.len(),
            stop_reason,
            best.length,
            colony.greedy_distance()
        );

        Ok(RunReport {
            instance: instance.to_string(),
            variant: colony.variant().to_string(),
            num_cities: colony.num_cities(),
            num_ants: colony.num_ants(),
            parameters: colony.config().clone(),
            greedy_distance: colony.greedy_distance(),
            initial_pheromone: colony.initial_pheromone(),
            best,
            stop_reason,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    fn pentagon() -> World {
        World::from_points(&[(0.0, 0.0), (2.0, 0.0), (3.0, 2.0), (1.0, 3.0), (-1.0, 2.0)]).unwrap()
    }

    #[test]
    fn test_policy_requires_a_limit() {
        assert_eq!(Runner::new(StoppingPolicy::default()).err(), Some(ColonyError::UnboundedRun));
        assert!(Runner::new(StoppingPolicy::iterations(3)).is_ok());
    }

    #[test]
    fn test_should_stop() {
        let policy = StoppingPolicy { max_iterations: Some(10), max_time: Some(5.0), max_stagnation: Some(3) };
        assert_eq!(policy.should_stop(1, 0.1, 0), None);
        assert_eq!(policy.should_stop(10, 0.1, 0), Some(StopReason::MaxIterations));
        assert_eq!(policy.should_stop(2, 6.0, 0), Some(StopReason::TimeLimit));
        assert_eq!(policy.should_stop(2, 0.1, 3), Some(StopReason::Stagnation));
    }

    #[test]
    fn test_run_for_fixed_iterations() {
        let mut colony = Colony::rank_based(pentagon(), ColonyConfig::default()).unwrap();
        let runner = Runner::new(StoppingPolicy::iterations(12)).unwrap();

        let mut seen = 0;
        let report = runner.run(&mut colony, "pentagon", |_| seen += 1).unwrap();

        assert_eq!(seen, 12);
        assert_eq!(report.logs.len(), 12);
        assert_eq!(report.stop_reason, StopReason::MaxIterations);
        assert_eq!(report.best.iterations, Some(12));
        assert_eq!(report.num_ants, 5);
        assert!(report.best.is_complete(colony.world()));
        for pair in report.logs.windows(2) {
            assert!(pair[1].global_best <= pair[0].global_best);
            assert_eq!(pair[1].iteration, pair[0].iteration + 1);
        }
        assert_eq!(report.logs.last().map(|l| l.global_best), Some(report.best.length));
    }

    #[test]
    fn test_run_stops_on_stagnation() {
        let mut colony = Colony::rank_based(pentagon(), ColonyConfig::default()).unwrap();
        let policy = StoppingPolicy { max_iterations: Some(10_000), max_stagnation: Some(5), ..Default::default() };
        let report = Runner::new(policy).unwrap().run(&mut colony, "pentagon", |_| {}).unwrap();

        assert_eq!(report.stop_reason, StopReason::Stagnation);
        assert_eq!(colony.reps(), 5);
    }
}
