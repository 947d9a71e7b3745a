//! Rank-Based Ant System.
//!
//! After evaporation the best `w - 1` ants of the iteration deposit
//! pheromone weighted by their rank, and the all-time best tour receives an
//! elitist deposit of weight `w`.

use super::field::{clamp_non_negative, deposit_tour, evaporate};
use super::{Generation, PheromoneRule};
use crate::error::ColonyError;
use crate::world::SquareMatrix;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct RankBasedAntSystem {
    rank_window: usize,
    /// Deposit weight of rank `r` at index `r - 1`; only positive weights kept.
    rank_weights: Vec<f64>,
}

impl RankBasedAntSystem {
    pub const DEFAULT_RANK_WINDOW: usize = 6;

    pub fn new(rank_window: usize) -> Self {
        RankBasedAntSystem { rank_window, rank_weights: Vec::new() }
    }

    pub fn rank_window(&self) -> usize {
        self.rank_window
    }

    /// Takes effect once parameters are recomputed.
    pub fn set_rank_window(&mut self, rank_window: usize) -> Result<(), ColonyError> {
        if rank_window == 0 {
            return Err(ColonyError::InvalidRankWindow);
        }
        self.rank_window = rank_window;
        Ok(())
    }

    pub fn rank_weights(&self) -> &[f64] {
        &self.rank_weights
    }
}

impl Default for RankBasedAntSystem {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RANK_WINDOW)
    }
}

impl PheromoneRule for RankBasedAntSystem {
    fn name(&self) -> &str {
        "RBAS"
    }

    fn validate(&self) -> Result<(), ColonyError> {
        if self.rank_window == 0 {
            return Err(ColonyError::InvalidRankWindow);
        }
        Ok(())
    }

    fn compute_parameters(&mut self, num_ants: usize) {
        let w = self.rank_window;
        let ranked = w.saturating_sub(1).min(num_ants);
        self.rank_weights = (1..=ranked).map(|r| (w - r) as f64).collect();
    }

    /// `0.5 w (w - 1) / (rho C_nn)`, falling back to the Ant System value
    /// `m / C_nn` when that is zero or undefined.
    fn initial_pheromone(&self, greedy_distance: f64, num_ants: usize, rho: f64) -> f64 {
        if greedy_distance <= 0.0 || !greedy_distance.is_finite() {
            return 1.0;
        }
        let w = self.rank_window as f64;
        if self.rank_window > 1 && rho > 0.0 {
            0.5 * w * (w - 1.0) / (rho * greedy_distance)
        } else {
            num_ants as f64 / greedy_distance
        }
    }

    fn update_pheromones(&self, pheromones: &mut SquareMatrix, generation: &Generation<'_>) {
        evaporate(pheromones, generation.rho);

        let lengths = generation.lengths;
        let mut ranking: Vec<usize> = (0..lengths.len()).collect();
        ranking.par_sort_unstable_by_key(|&ant| (OrderedFloat(lengths[ant]), ant));

        for (&ant, &weight) in ranking.iter().zip(self.rank_weights.iter()) {
            if lengths[ant] > 0.0 {
                deposit_tour(pheromones, generation.tour(ant), weight / lengths[ant]);
            }
        }

        let best = generation.record.global_best_distance;
        if best > 0.0 && best.is_finite() {
            deposit_tour(
                pheromones,
                &generation.record.global_best_tour,
                self.rank_window as f64 / best,
            );
        }

        clamp_non_negative(pheromones);
    }
}
