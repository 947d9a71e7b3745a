//! Pheromone and probability field operations.
//!
//! Both fields are dense `SquareMatrix` values owned by the colony. The
//! probability field is `pheromone(i, j) * distance(i, j)^(-beta)` (alpha is
//! fixed at 1) and is rebuilt in full after every pheromone update.

use crate::world::{SquareMatrix, World};
use rayon::prelude::*;

/// Upper bound on any edge desirability.
///
/// Zero distances between distinct cities (and very short edges under a large
/// beta) saturate here instead of becoming infinite, which keeps every
/// segment mass finite during selection.
pub const DESIRABILITY_CEILING: f64 = 1e150;

/// `distance^(-beta)`, saturated at [`DESIRABILITY_CEILING`].
#[inline]
pub fn visibility(distance: f64, beta: f64) -> f64 {
    if distance <= 0.0 {
        return DESIRABILITY_CEILING;
    }
    let value = distance.powf(-beta);
    if value.is_finite() {
        value.min(DESIRABILITY_CEILING)
    } else {
        DESIRABILITY_CEILING
    }
}

/// Heuristic term of every ordered edge. Self edges are 0.
pub fn compute_visibility(world: &World, beta: f64) -> SquareMatrix {
    let n = world.num_cities();
    let mut matrix = SquareMatrix::filled(n, 0.0);
    matrix
        .as_mut_slice()
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(i, row)| {
            for (j, value) in row.iter_mut().enumerate() {
                if i != j {
                    *value = visibility(world.distance(i, j), beta);
                }
            }
        });

    let saturated = matrix
        .as_slice()
        .par_iter()
        .filter(|&&v| v >= DESIRABILITY_CEILING)
        .count();
    if saturated > 0 {
        log::warn!(
            "{} edges have zero or near-zero length; their desirability is capped at {:e}",
            saturated,
            DESIRABILITY_CEILING
        );
    }

    matrix
}

/// Rebuild `probabilities` from `pheromones` and the cached visibility.
pub fn compute_probabilities(
    pheromones: &SquareMatrix,
    visibility: &SquareMatrix,
    probabilities: &mut SquareMatrix,
) {
    probabilities
        .as_mut_slice()
        .par_iter_mut()
        .zip(pheromones.as_slice().par_iter())
        .zip(visibility.as_slice().par_iter())
        .for_each(|((p, &tau), &eta)| {
            *p = (tau * eta).min(DESIRABILITY_CEILING);
        });
}

/// Multiply every edge by `1 - rho`.
pub fn evaporate(pheromones: &mut SquareMatrix, rho: f64) {
    let keep = 1.0 - rho;
    pheromones.as_mut_slice().par_iter_mut().for_each(|tau| *tau *= keep);
}

/// Lay `amount` on every edge of a closed tour, in both directions.
pub fn deposit_tour(pheromones: &mut SquareMatrix, tour: &[usize], amount: f64) {
    let m = tour.len();
    if m < 2 {
        return;
    }
    for i in 0..m {
        let from = tour[i];
        let to = tour[(i + 1) % m];
        pheromones.add(from, to, amount);
        pheromones.add(to, from, amount);
    }
}

pub fn clamp_non_negative(pheromones: &mut SquareMatrix) {
    pheromones.as_mut_slice().par_iter_mut().for_each(|tau| {
        if tau.is_nan() || *tau < 0.0 {
            *tau = 0.0;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_saturates() {
        assert_eq!(visibility(0.0, 2.0), DESIRABILITY_CEILING);
        assert_eq!(visibility(1e-200, 5.0), DESIRABILITY_CEILING);
        assert!((visibility(2.0, 2.0) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_probabilities_follow_pheromone_and_distance() {
        let world = World::from_points(&[(0.0, 0.0), (2.0, 0.0), (0.0, 1.0)]).unwrap();
        let vis = compute_visibility(&world, 2.0);
        let mut pher = SquareMatrix::filled(3, 0.5);
        pher.set(0, 2, 2.0);

        let mut prob = SquareMatrix::filled(3, 0.0);
        compute_probabilities(&pher, &vis, &mut prob);

        assert!((prob.get(0, 1) - 0.5 * 0.25).abs() < 1e-15);
        assert!((prob.get(0, 2) - 2.0).abs() < 1e-15);
        assert_eq!(prob.get(1, 1), 0.0);
    }

    #[test]
    fn test_zero_distance_between_cities_stays_finite() {
        let world = World::from_points(&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)]).unwrap();
        let vis = compute_visibility(&world, 3.0);
        let pher = SquareMatrix::filled(3, 10.0);
        let mut prob = SquareMatrix::filled(3, 0.0);
        compute_probabilities(&pher, &vis, &mut prob);
        assert!(prob.as_slice().iter().all(|p| p.is_finite()));
        assert_eq!(prob.get(0, 1), DESIRABILITY_CEILING);
    }

    #[test]
    fn test_evaporate_and_deposit() {
        let mut pher = SquareMatrix::filled(3, 1.0);
        evaporate(&mut pher, 0.25);
        assert!((pher.get(1, 2) - 0.75).abs() < 1e-15);

        deposit_tour(&mut pher, &[0, 1, 2], 0.5);
        assert!((pher.get(0, 1) - 1.25).abs() < 1e-15);
        assert!((pher.get(1, 0) - 1.25).abs() < 1e-15);
        assert!((pher.get(2, 0) - 1.25).abs() < 1e-15);
        assert!((pher.get(0, 0) - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_clamp_non_negative() {
        let mut pher = SquareMatrix::from_flat(2, vec![-1.0, 0.5, f64::NAN, 0.0]).unwrap();
        clamp_non_negative(&mut pher);
        assert_eq!(pher.as_slice(), &[0.0, 0.5, 0.0, 0.0]);
    }
}
