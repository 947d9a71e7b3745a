//! The world a colony forages in: a dense, symmetric distance matrix.
//!
//! The world is immutable once built. Besides plain lookups it offers the
//! nearest-neighbour baseline that pheromone initialization is scaled from.

use crate::error::ColonyError;
use rayon::prelude::*;

/// Dense row-major N x N matrix of edge values.
///
/// Used for distances as well as for the pheromone and probability fields
/// the colony maintains.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SquareMatrix {
    /// Matrix with every entry set to `value`.
    pub fn filled(n: usize, value: f64) -> Self {
        SquareMatrix { n, values: vec![value; n * n] }
    }

    /// Wrap a flat row-major vector of `n * n` values.
    pub fn from_flat(n: usize, values: Vec<f64>) -> Result<Self, ColonyError> {
        if values.len() != n * n {
            return Err(ColonyError::MatrixShape { expected: n * n, actual: values.len() });
        }
        Ok(SquareMatrix { n, values })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.n + j] = value;
    }

    #[inline]
    pub fn add(&mut self, i: usize, j: usize, delta: f64) {
        self.values[i * self.n + j] += delta;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn fill(&mut self, value: f64) {
        self.values.par_iter_mut().for_each(|v| *v = value);
    }
}

/// Distance matrix and city count, validated once at construction.
#[derive(Debug, Clone)]
pub struct World {
    distances: SquareMatrix,
}

impl World {
    /// Build a world from a flat row-major distance array of `n * n` values.
    pub fn new(distances: Vec<f64>, n: usize) -> Result<Self, ColonyError> {
        Self::from_matrix(SquareMatrix::from_flat(n, distances)?)
    }

    /// Rejects fewer than two cities, negative or non-finite entries and
    /// matrices where `d(i, j) != d(j, i)`.
    pub fn from_matrix(distances: SquareMatrix) -> Result<Self, ColonyError> {
        let n = distances.dim();
        if n < 2 {
            return Err(ColonyError::TooFewCities(n));
        }
        for i in 0..n {
            for j in 0..n {
                let value = distances.get(i, j);
                if !value.is_finite() || value < 0.0 {
                    return Err(ColonyError::InvalidDistance { from: i, to: j, value });
                }
            }
        }
        for i in 0..n {
            for j in i + 1..n {
                if distances.get(i, j) != distances.get(j, i) {
                    return Err(ColonyError::AsymmetricDistance { from: i, to: j });
                }
            }
        }
        Ok(World { distances })
    }

    /// Plain Euclidean distances between 2D points.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self, ColonyError> {
        let n = points.len();
        let mut matrix = SquareMatrix::filled(n, 0.0);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = points[i].0 - points[j].0;
                    let dy = points[i].1 - points[j].1;
                    matrix.set(i, j, (dx * dx + dy * dy).sqrt());
                }
            }
        }
        Self::from_matrix(matrix)
    }

    #[inline]
    pub fn num_cities(&self) -> usize {
        self.distances.dim()
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances.get(i, j)
    }

    pub fn distances(&self) -> &SquareMatrix {
        &self.distances
    }

    /// Length of a closed tour given as a sequence of city ids.
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }
        let mut length = 0.0;
        for pair in tour.windows(2) {
            length += self.distance(pair[0], pair[1]);
        }
        length + self.distance(tour[tour.len() - 1], tour[0])
    }

    /// Nearest-neighbour tour from city 0; ties go to the lowest city id.
    pub fn greedy_tour(&self) -> Vec<usize> {
        let n = self.num_cities();
        let mut visited = vec![false; n];
        let mut tour = Vec::with_capacity(n);
        let mut current = 0;
        visited[0] = true;
        tour.push(0);

        while tour.len() < n {
            let mut next = None;
            let mut best = f64::INFINITY;
            for city in 0..n {
                if !visited[city] && self.distance(current, city) < best {
                    best = self.distance(current, city);
                    next = Some(city);
                }
            }
            // Every remaining distance is finite, so a candidate always exists.
            let Some(city) = next else { break };
            visited[city] = true;
            tour.push(city);
            current = city;
        }

        tour
    }

    /// Length of the nearest-neighbour tour, closed back to city 0.
    pub fn greedy_distance(&self) -> f64 {
        self.tour_length(&self.greedy_tour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> World {
        World::from_points(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_greedy_on_unit_square() {
        let world = unit_square();
        assert_eq!(world.greedy_tour(), vec![0, 1, 2, 3]);
        assert!((world.greedy_distance() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_tour_length_closes_cycle() {
        let world = unit_square();
        let crossing = world.tour_length(&[0, 2, 1, 3]);
        assert!((crossing - (2.0 + 2.0 * 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_matrices() {
        assert_eq!(World::new(vec![0.0], 1).unwrap_err(), ColonyError::TooFewCities(1));
        assert!(matches!(
            World::new(vec![0.0, 1.0, 1.0], 2),
            Err(ColonyError::MatrixShape { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            World::new(vec![0.0, -1.0, 1.0, 0.0], 2),
            Err(ColonyError::InvalidDistance { from: 0, to: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_asymmetric_matrix() {
        assert_eq!(
            World::new(vec![0.0, 1.0, 2.0, 0.0], 2).unwrap_err(),
            ColonyError::AsymmetricDistance { from: 0, to: 1 }
        );
        let skewed = vec![0.0, 1.0, 2.0, 1.0, 0.0, 3.0, 2.0, 4.0, 0.0];
        assert_eq!(
            World::new(skewed, 3).unwrap_err(),
            ColonyError::AsymmetricDistance { from: 1, to: 2 }
        );
    }

    #[test]
    fn test_two_cities() {
        let world = World::new(vec![0.0, 3.0, 3.0, 0.0], 2).unwrap();
        assert_eq!(world.num_cities(), 2);
        assert_eq!(world.greedy_distance(), 6.0);
    }
}
