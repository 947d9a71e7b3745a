//! Solution representation for the TSP.
//!
//! A `Solution` is a serializable snapshot of a tour, detached from the
//! colony that produced it.

use crate::colony::{Colony, PheromoneRule};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Represents a solution to the TSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of city indices, implicitly closed back to the
    /// first city
    pub tour: Vec<usize>,
    /// Total closed tour length
    pub length: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            length: f64::INFINITY,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from a tour
    pub fn from_tour(world: &World, tour: Vec<usize>, algorithm: &str) -> Self {
        let length = world.tour_length(&tour);
        Solution {
            tour,
            length,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Snapshot of a colony's all-time best tour.
    pub fn from_colony<R: PheromoneRule>(colony: &Colony<R>) -> Self {
        let mut solution = Solution::from_tour(colony.world(), colony.best_tour().to_vec(), colony.variant());
        solution.iterations = Some(colony.iteration());
        solution
    }

    /// Check if all cities are visited exactly once
    pub fn is_complete(&self, world: &World) -> bool {
        let n = world.num_cities();
        if self.tour.len() != n {
            return false;
        }

        let unique: HashSet<usize> = self.tour.iter().cloned().collect();
        unique.len() == n && self.tour.iter().all(|&c| c < n)
    }

    /// Space separated city ids.
    pub fn tour_string(&self) -> String {
        self.tour
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Relative gap to a reference length, in percent.
    pub fn gap_to(&self, reference: f64) -> Option<f64> {
        if reference > 0.0 && self.length.is_finite() {
            Some((self.length - reference) / reference * 100.0)
        } else {
            None
        }
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Length: {:.2}", self.length)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {}", self.tour_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::ColonyConfig;

    fn unit_square() -> World {
        World::from_points(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.tour.is_empty());
        assert_eq!(sol.length, f64::INFINITY);
        assert_eq!(sol.gap_to(10.0), None);
    }

    #[test]
    fn test_from_tour_and_completeness() {
        let world = unit_square();
        let sol = Solution::from_tour(&world, vec![0, 3, 2, 1], "manual");
        assert!((sol.length - 4.0).abs() < 1e-12);
        assert!(sol.is_complete(&world));
        assert_eq!(sol.tour_string(), "0 3 2 1");
        assert!((sol.gap_to(2.0).unwrap() - 100.0).abs() < 1e-9);

        let partial = Solution::from_tour(&world, vec![0, 1, 1, 2], "manual");
        assert!(!partial.is_complete(&world));
    }

    #[test]
    fn test_from_colony() {
        let mut colony = Colony::rank_based(unit_square(), ColonyConfig::default()).unwrap();
        colony.initialize();
        colony.forage().unwrap();
        let sol = Solution::from_colony(&colony);
        assert_eq!(sol.algorithm, "RBAS");
        assert_eq!(sol.iterations, Some(1));
        assert!(sol.is_complete(colony.world()));
        assert_eq!(sol.length, colony.global_best_distance());
    }
}
