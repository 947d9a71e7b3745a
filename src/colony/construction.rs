//! Parallel tour construction.
//!
//! All ants start at [`START_CITY`] and advance in lockstep for exactly
//! `N - 1` steps. Tours are stored flat, `num_cities` entries per ant.

use super::candidates::CandidateSet;
use super::random::RandomStream;
use crate::world::{SquareMatrix, World};
use rayon::prelude::*;

/// City every tour starts from.
pub const START_CITY: usize = 0;

/// Build one complete tour per ant into `tours`.
///
/// Each step gathers the desirability of every live candidate from the
/// probability field, selects one winner per ant, appends the winners and
/// contracts the candidate set. The draw stream advances once per step.
pub fn construct_tours(
    candidates: &mut CandidateSet,
    draws: &mut RandomStream,
    probabilities: &SquareMatrix,
    tours: &mut [usize],
) {
    let n = probabilities.dim();
    let num_ants = candidates.num_ants();
    debug_assert_eq!(tours.len(), num_ants * n);

    candidates.reset(START_CITY);
    let mut current = vec![START_CITY; num_ants];
    tours.par_chunks_mut(n).for_each(|tour| tour[0] = START_CITY);

    for step in 1..n {
        candidates.gather_weights(&current, probabilities);
        let chosen = candidates.select(draws);

        let set = &*candidates;
        tours
            .par_chunks_mut(n)
            .zip(current.par_iter_mut())
            .zip(chosen.par_iter())
            .for_each(|((tour, city), pick)| {
                if let Some(entry) = pick {
                    *city = set.city(*entry);
                    tour[step] = *city;
                }
            });

        candidates.contract(&chosen);
        draws.advance();
    }
}

/// Closed length of every ant's tour.
pub fn compute_tour_lengths(world: &World, tours: &[usize], lengths: &mut [f64]) {
    let n = world.num_cities();
    lengths
        .par_iter_mut()
        .zip(tours.par_chunks(n))
        .for_each(|(length, tour)| *length = world.tour_length(tour));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_permutation(tour: &[usize], n: usize) -> bool {
        let unique: HashSet<usize> = tour.iter().cloned().collect();
        tour.len() == n && unique.len() == n && tour.iter().all(|&c| c < n)
    }

    #[test]
    fn test_every_ant_gets_a_permutation() {
        let n = 9;
        let m = 5;
        let probabilities = SquareMatrix::filled(n, 1.0);
        let mut candidates = CandidateSet::new(m, n);
        let mut draws = RandomStream::seeded(42, m, n);
        let mut tours = vec![usize::MAX; m * n];

        construct_tours(&mut candidates, &mut draws, &probabilities, &mut tours);

        for tour in tours.chunks(n) {
            assert_eq!(tour[0], START_CITY);
            assert!(is_permutation(tour, n), "bad tour {:?}", tour);
        }
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_two_cities_single_step() {
        let probabilities = SquareMatrix::filled(2, 1.0);
        let mut candidates = CandidateSet::new(3, 2);
        let mut draws = RandomStream::seeded(1, 3, 2);
        let before = draws.clone();
        let mut tours = vec![9; 6];

        construct_tours(&mut candidates, &mut draws, &probabilities, &mut tours);

        assert_eq!(tours, vec![0, 1, 0, 1, 0, 1]);
        let mut once = before;
        once.advance();
        assert_eq!(draws, once);
    }

    #[test]
    fn test_uniform_field_spreads_every_position() {
        let n = 6;
        let m = 8;
        let seeds = 3000;
        let probabilities = SquareMatrix::filled(n, 1.0);
        let mut counts = vec![vec![0usize; n]; n];

        for seed in 0..seeds {
            let mut candidates = CandidateSet::new(m, n);
            let mut draws = RandomStream::seeded(seed, m, n);
            let mut tours = vec![0; m * n];
            construct_tours(&mut candidates, &mut draws, &probabilities, &mut tours);
            for tour in tours.chunks(n) {
                for (position, &city) in tour.iter().enumerate() {
                    counts[position][city] += 1;
                }
            }
        }

        let total = (seeds as usize * m) as f64;
        for position in 1..n {
            assert_eq!(counts[position][START_CITY], 0);
            for city in 1..n {
                let share = counts[position][city] as f64 / total;
                assert!(
                    (share - 1.0 / (n - 1) as f64).abs() < 0.02,
                    "position {} city {}: {:?}",
                    position,
                    city,
                    counts[position]
                );
            }
        }
    }

    #[test]
    fn test_strong_edges_are_followed() {
        // A probability field that only rewards i -> i + 1.
        let n = 6;
        let mut probabilities = SquareMatrix::filled(n, 0.0);
        for i in 0..n - 1 {
            probabilities.set(i, i + 1, 1.0);
        }
        let mut candidates = CandidateSet::new(4, n);
        let mut draws = RandomStream::seeded(99, 4, n);
        let mut tours = vec![0; 4 * n];

        construct_tours(&mut candidates, &mut draws, &probabilities, &mut tours);

        for tour in tours.chunks(n) {
            assert_eq!(tour, &[0, 1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn test_tour_lengths() {
        let world = World::from_points(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap();
        let tours = vec![0, 1, 2, 3, 0, 2, 1, 3];
        let mut lengths = vec![0.0; 2];
        compute_tour_lengths(&world, &tours, &mut lengths);
        assert!((lengths[0] - 4.0).abs() < 1e-12);
        assert!((lengths[1] - (2.0 + 2.0 * 2f64.sqrt())).abs() < 1e-12);
    }
}
