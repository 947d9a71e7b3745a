//! Segmented candidate set engine.
//!
//! Every ant's unvisited cities live in one flat arena of parallel arrays
//! (`ants`, `cities`, `weights`), sorted by ant id and cut into contiguous
//! segments by `offsets`. Each construction step runs two collective
//! operations over the whole arena:
//!
//! * **selection**: a weighted random pick per segment, computed as a
//!   fixed-shape pairwise fold of [`tree_select`];
//! * **contraction**: one stream-compaction pass that drops every segment's
//!   winner, followed by a size count and an exclusive prefix sum that
//!   rebuild the segment boundaries.
//!
//! Neither operation loops over ants sequentially; work is split across
//! segments (and across halves of large segments) with rayon.

use super::random::{RandomStream, DRAW_SCALE};
use crate::world::SquareMatrix;
use rayon::prelude::*;

/// Segments at least this long fold their two halves in parallel.
const PARALLEL_FOLD_THRESHOLD: usize = 4096;

/// Tentative winner of a partial fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick {
    /// Arena index of the surviving candidate.
    pub entry: usize,
    /// Desirability mass of everything folded so far.
    pub mass: f64,
    /// Draw carried forward to the next merge.
    pub draw: u32,
}

/// Merge two partial folds.
///
/// The left draw, scaled into `[0, combined mass)`, is compared against the
/// left mass: below it the left winner survives, otherwise the right one
/// does. The result always carries the right draw, so in a pairwise tree each
/// merge consumes a distinct draw and every candidate wins with probability
/// equal to its share of the segment mass.
#[inline]
pub fn tree_select(left: Pick, right: Pick) -> Pick {
    let mass = left.mass + right.mass;
    let entry = if left.draw as f64 * mass / DRAW_SCALE < left.mass {
        left.entry
    } else {
        right.entry
    };
    Pick { entry, mass, draw: right.draw }
}

/// Exclusive prefix sum; the result has one more element than `sizes` and
/// ends with the total.
pub fn exclusive_scan(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    let mut running = 0;
    offsets.push(0);
    for &size in sizes {
        running += size;
        offsets.push(running);
    }
    offsets
}

/// Flattened ragged array of (ant, city, desirability) triples.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    num_ants: usize,
    num_cities: usize,
    ants: Vec<u32>,
    cities: Vec<u32>,
    weights: Vec<f64>,
    offsets: Vec<usize>,
}

impl CandidateSet {
    pub fn new(num_ants: usize, num_cities: usize) -> Self {
        CandidateSet {
            num_ants,
            num_cities,
            ants: Vec::new(),
            cities: Vec::new(),
            weights: Vec::new(),
            offsets: vec![0; num_ants + 1],
        }
    }

    /// Give every ant all cities except `start`.
    pub fn reset(&mut self, start: usize) {
        let per_ant = self.num_cities.saturating_sub(1);
        let total = self.num_ants * per_ant;

        self.ants = (0..total)
            .into_par_iter()
            .map(|e| (e / per_ant) as u32)
            .collect();
        self.cities = (0..total)
            .into_par_iter()
            .map(|e| {
                let k = e % per_ant;
                (if k >= start { k + 1 } else { k }) as u32
            })
            .collect();
        self.weights = vec![0.0; total];
        self.offsets = exclusive_scan(&vec![per_ant; self.num_ants]);
    }

    /// Total number of live candidates across all ants.
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn num_ants(&self) -> usize {
        self.num_ants
    }

    pub fn segment_len(&self, ant: usize) -> usize {
        self.offsets[ant + 1] - self.offsets[ant]
    }

    /// Remaining cities of one ant, in arena order.
    pub fn segment(&self, ant: usize) -> &[u32] {
        &self.cities[self.offsets[ant]..self.offsets[ant + 1]]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    #[inline]
    pub fn city(&self, entry: usize) -> usize {
        self.cities[entry] as usize
    }

    /// Gather `probabilities(current(ant), city)` for every live candidate.
    pub fn gather_weights(&mut self, current: &[usize], probabilities: &SquareMatrix) {
        let ants = &self.ants;
        let cities = &self.cities;
        self.weights
            .par_iter_mut()
            .enumerate()
            .for_each(|(e, w)| {
                *w = probabilities.get(current[ants[e] as usize], cities[e] as usize);
            });
    }

    /// Overwrite the desirabilities directly, in arena order.
    pub fn set_weights(&mut self, weights: &[f64]) {
        self.weights.copy_from_slice(weights);
    }

    /// Pick one arena entry per ant; `None` only for an empty segment.
    pub fn select(&self, draws: &RandomStream) -> Vec<Option<usize>> {
        (0..self.num_ants)
            .into_par_iter()
            .map(|ant| self.select_in_segment(ant, draws))
            .collect()
    }

    fn select_in_segment(&self, ant: usize, draws: &RandomStream) -> Option<usize> {
        let (lo, hi) = (self.offsets[ant], self.offsets[ant + 1]);
        if lo == hi {
            return None;
        }
        let total: f64 = self.weights[lo..hi].iter().sum();
        let uniform = !(total > 0.0 && total.is_finite());
        if uniform {
            log::warn!("ant {}: segment mass {} is degenerate, picking uniformly", ant, total);
        }
        Some(self.fold(lo, hi, uniform, draws).entry)
    }

    #[inline]
    fn leaf(&self, entry: usize, uniform: bool, draws: &RandomStream) -> Pick {
        Pick {
            entry,
            mass: if uniform { 1.0 } else { self.weights[entry] },
            draw: draws.draw(self.ants[entry] as usize, self.cities[entry] as usize),
        }
    }

    /// Pairwise fold over `lo..hi` (non-empty), always split at the midpoint
    /// so the result does not depend on how the work is scheduled.
    fn fold(&self, lo: usize, hi: usize, uniform: bool, draws: &RandomStream) -> Pick {
        if hi - lo == 1 {
            return self.leaf(lo, uniform, draws);
        }
        let mid = lo + (hi - lo) / 2;
        let (left, right) = if hi - lo >= PARALLEL_FOLD_THRESHOLD {
            rayon::join(
                || self.fold(lo, mid, uniform, draws),
                || self.fold(mid, hi, uniform, draws),
            )
        } else {
            (self.fold(lo, mid, uniform, draws), self.fold(mid, hi, uniform, draws))
        };
        tree_select(left, right)
    }

    /// Remove every chosen entry in one compaction pass and rebuild the
    /// segment boundaries.
    pub fn contract(&mut self, chosen: &[Option<usize>]) {
        let ants = &self.ants;
        let survivors: Vec<usize> = (0..ants.len())
            .into_par_iter()
            .filter(|&e| chosen[ants[e] as usize] != Some(e))
            .collect();

        let offsets = &self.offsets;
        let sizes: Vec<usize> = (0..self.num_ants)
            .into_par_iter()
            .map(|ant| {
                (offsets[ant]..offsets[ant + 1])
                    .filter(|&e| chosen[ant] != Some(e))
                    .count()
            })
            .collect();

        self.ants = survivors.par_iter().map(|&e| self.ants[e]).collect();
        self.cities = survivors.par_iter().map(|&e| self.cities[e]).collect();
        self.weights = survivors.par_iter().map(|&e| self.weights[e]).collect();
        self.offsets = exclusive_scan(&sizes);

        debug_assert_eq!(self.offsets[self.num_ants], self.cities.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(entry: usize, mass: f64, draw: u32) -> Pick {
        Pick { entry, mass, draw }
    }

    #[test]
    fn test_tree_select_rule() {
        // Left draw lands in the first quarter of the combined mass.
        let low = tree_select(pick(0, 1.0, 0), pick(1, 3.0, 99));
        assert_eq!(low, pick(0, 4.0, 99));

        // Half-way through the combined mass falls on the right candidate.
        let high = tree_select(pick(0, 1.0, 1 << 31), pick(1, 3.0, 99));
        assert_eq!(high.entry, 1);
        assert_eq!(high.draw, 99);
    }

    #[test]
    fn test_zero_mass_never_wins() {
        for draw in [0u32, 12345, u32::MAX] {
            assert_eq!(tree_select(pick(0, 0.0, draw), pick(1, 2.0, 7)).entry, 1);
            assert_eq!(tree_select(pick(0, 2.0, draw), pick(1, 0.0, 7)).entry, 0);
        }
    }

    #[test]
    fn test_exclusive_scan() {
        assert_eq!(exclusive_scan(&[3, 0, 2]), vec![0, 3, 3, 5]);
        assert_eq!(exclusive_scan(&[]), vec![0]);
    }

    #[test]
    fn test_reset_layout() {
        let mut set = CandidateSet::new(3, 4);
        set.reset(0);
        assert_eq!(set.len(), 9);
        assert_eq!(set.offsets(), &[0, 3, 6, 9]);
        for ant in 0..3 {
            assert_eq!(set.segment(ant), &[1, 2, 3]);
        }
    }

    #[test]
    fn test_contract_removes_one_per_segment() {
        let mut set = CandidateSet::new(2, 4);
        set.reset(0);
        // Ant 0 takes city 2 (entry 1), ant 1 takes city 3 (entry 5).
        set.contract(&[Some(1), Some(5)]);
        assert_eq!(set.segment(0), &[1, 3]);
        assert_eq!(set.segment(1), &[1, 2]);
        assert_eq!(set.offsets(), &[0, 2, 4]);
    }

    #[test]
    fn test_single_candidate_is_forced() {
        let mut set = CandidateSet::new(2, 2);
        set.reset(0);
        assert_eq!(set.segment_len(0), 1);
        let draws = RandomStream::seeded(3, 2, 2);
        let chosen = set.select(&draws);
        assert_eq!(chosen, vec![Some(0), Some(1)]);
        set.contract(&chosen);
        assert!(set.is_empty());
        assert_eq!(set.select(&draws), vec![None, None]);
    }

    #[test]
    fn test_degenerate_segment_still_picks() {
        let mut set = CandidateSet::new(1, 5);
        set.reset(0);
        let draws = RandomStream::seeded(11, 1, 5);
        for weights in [[0.0; 4], [1.0, f64::INFINITY, 2.0, 0.0], [f64::NAN, 1.0, 1.0, 1.0]] {
            set.set_weights(&weights);
            let chosen = set.select(&draws);
            assert!(matches!(chosen[0], Some(e) if e < 4), "{:?} -> {:?}", weights, chosen);
        }
    }

    #[test]
    fn test_selection_respects_weights() {
        let mut set = CandidateSet::new(1, 4);
        set.reset(0);
        set.set_weights(&[0.0, 1.0, 0.0]);
        let mut draws = RandomStream::seeded(5, 1, 4);
        for _ in 0..50 {
            assert_eq!(set.select(&draws), vec![Some(1)]);
            draws.advance();
        }
    }

    #[test]
    fn test_selection_frequencies_track_mass() {
        let mut set = CandidateSet::new(1, 3);
        set.reset(0);
        set.set_weights(&[1.0, 3.0]);
        let mut draws = RandomStream::seeded(2024, 1, 3);
        let trials = 20_000;
        let mut second = 0;
        for _ in 0..trials {
            if set.select(&draws)[0] == Some(1) {
                second += 1;
            }
            draws.advance();
        }
        let share = second as f64 / trials as f64;
        assert!((share - 0.75).abs() < 0.03, "share was {}", share);
    }
}
