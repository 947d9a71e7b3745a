//! Module for parsing and representing symmetric TSP instances.
//!
//! This module handles TSPLIB files with coordinate sections. It supports the
//! `EUC_2D`, `CEIL_2D` and `ATT` edge weight types and precomputes the dense
//! distance matrix the colony works on.

use crate::error::InstanceError;
use crate::world::{SquareMatrix, World};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A city with its coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    /// City identifier (1-indexed in files, 0-indexed internally)
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

impl City {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        City { id, x, y }
    }
}

/// How edge lengths are derived from coordinates
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EdgeWeightType {
    /// Euclidean distance rounded to the nearest integer
    Euc2d,
    /// Euclidean distance rounded up
    Ceil2d,
    /// Pseudo-Euclidean distance of the `att` instances
    Att,
    /// Unrounded Euclidean distance
    Exact,
}

impl EdgeWeightType {
    fn parse(value: &str) -> Result<Self, InstanceError> {
        match value {
            "EUC_2D" => Ok(EdgeWeightType::Euc2d),
            "CEIL_2D" => Ok(EdgeWeightType::Ceil2d),
            "ATT" => Ok(EdgeWeightType::Att),
            other => Err(InstanceError::UnsupportedWeightType(other.to_string())),
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            EdgeWeightType::Euc2d | EdgeWeightType::Exact => "EUC_2D",
            EdgeWeightType::Ceil2d => "CEIL_2D",
            EdgeWeightType::Att => "ATT",
        }
    }

    /// Distance between two cities under this weight type.
    pub fn distance(&self, a: &City, b: &City) -> f64 {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        match self {
            EdgeWeightType::Euc2d => (dx * dx + dy * dy).sqrt().round(),
            EdgeWeightType::Ceil2d => (dx * dx + dy * dy).sqrt().ceil(),
            EdgeWeightType::Exact => (dx * dx + dy * dy).sqrt(),
            EdgeWeightType::Att => {
                let r = ((dx * dx + dy * dy) / 10.0).sqrt();
                let t = r.round();
                if t < r {
                    t + 1.0
                } else {
                    t
                }
            }
        }
    }
}

/// Represents a complete TSP instance
///
/// Only the coordinates are serialized; deserializing rebuilds the distance
/// matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "InstanceRecord")]
pub struct TspInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Number of cities
    pub dimension: usize,
    pub edge_weight_type: EdgeWeightType,
    pub cities: Vec<City>,
    /// Precomputed distance matrix
    #[serde(skip)]
    pub distance_matrix: Vec<Vec<f64>>,
}

/// Serialized form of a [`TspInstance`]
#[derive(Deserialize)]
struct InstanceRecord {
    name: String,
    #[serde(default)]
    comment: String,
    edge_weight_type: EdgeWeightType,
    cities: Vec<City>,
}

impl From<InstanceRecord> for TspInstance {
    fn from(record: InstanceRecord) -> Self {
        TspInstance::with_cities(record.name, record.comment, record.edge_weight_type, record.cities)
    }
}

impl TspInstance {
    /// Build an instance from raw coordinates with unrounded distances.
    pub fn from_coordinates(name: &str, points: &[(f64, f64)]) -> Self {
        let cities: Vec<City> = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| City::new(i, x, y))
            .collect();
        Self::with_cities(name.to_string(), String::new(), EdgeWeightType::Exact, cities)
    }

    /// Uniformly scattered cities in a `[0, side)` square, reproducible from
    /// the seed.
    pub fn random_uniform(n: usize, side: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cities: Vec<City> = (0..n)
            .map(|i| City::new(i, rng.gen_range(0.0..side).round(), rng.gen_range(0.0..side).round()))
            .collect();
        Self::with_cities(
            format!("rand{}-{}", n, seed),
            format!("{} uniform random cities, seed {}", n, seed),
            EdgeWeightType::Euc2d,
            cities,
        )
    }

    fn with_cities(name: String, comment: String, edge_weight_type: EdgeWeightType, cities: Vec<City>) -> Self {
        let distance_matrix = Self::compute_distance_matrix(&cities, edge_weight_type);
        TspInstance {
            name,
            comment,
            dimension: cities.len(),
            edge_weight_type,
            cities,
            distance_matrix,
        }
    }

    /// Parse a TSP instance from a TSPLIB format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let file = File::open(&path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, InstanceError> {
        let mut name = String::new();
        let mut comment = String::new();
        let mut dimension = 0usize;
        let mut edge_weight_type = EdgeWeightType::Euc2d;
        let mut cities: Vec<City> = Vec::new();
        let mut in_coords = false;

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                let value = value.trim();
                match key {
                    "NAME" => name = value.to_string(),
                    "COMMENT" => comment = value.to_string(),
                    "TYPE" => {
                        if value != "TSP" {
                            log::warn!("instance type {} treated as symmetric TSP", value);
                        }
                    }
                    "DIMENSION" => {
                        dimension = value.parse().map_err(|_| InstanceError::Parse {
                            line: line_no,
                            message: format!("invalid dimension '{}'", value),
                        })?;
                    }
                    "EDGE_WEIGHT_TYPE" => edge_weight_type = EdgeWeightType::parse(value)?,
                    _ => log::debug!("ignoring header field {}", key),
                }
                in_coords = false;
                continue;
            }

            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                continue;
            }
            if line.ends_with("_SECTION") {
                in_coords = false;
                continue;
            }

            if in_coords {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 3 {
                    return Err(InstanceError::Parse {
                        line: line_no,
                        message: "expected 'id x y'".to_string(),
                    });
                }
                let parse_err = |what: &str| InstanceError::Parse {
                    line: line_no,
                    message: format!("invalid {}", what),
                };
                let id: usize = parts[0].parse().map_err(|_| parse_err("city id"))?;
                let x: f64 = parts[1].parse().map_err(|_| parse_err("x coordinate"))?;
                let y: f64 = parts[2].parse().map_err(|_| parse_err("y coordinate"))?;
                cities.push(City::new(id.saturating_sub(1), x, y));
            }
        }

        if dimension == 0 {
            dimension = cities.len();
        }
        if cities.len() < dimension {
            return Err(InstanceError::MissingCoordinates { expected: dimension, found: cities.len() });
        }
        cities.truncate(dimension);

        Ok(Self::with_cities(name, comment, edge_weight_type, cities))
    }

    /// Compute the distance matrix
    fn compute_distance_matrix(cities: &[City], edge_weight_type: EdgeWeightType) -> Vec<Vec<f64>> {
        let n = cities.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    matrix[i][j] = edge_weight_type.distance(&cities[i], &cities[j]);
                }
            }
        }

        matrix
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// The world model a colony forages in.
    pub fn world(&self) -> Result<World, InstanceError> {
        let flat: Vec<f64> = self.distance_matrix.iter().flatten().cloned().collect();
        Ok(World::from_matrix(SquareMatrix::from_flat(self.dimension, flat)?)?)
    }

    /// Serialize as a TSPLIB file.
    pub fn to_tsplib(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "NAME : {}", self.name);
        if !self.comment.is_empty() {
            let _ = writeln!(out, "COMMENT : {}", self.comment);
        }
        let _ = writeln!(out, "TYPE : TSP");
        let _ = writeln!(out, "DIMENSION : {}", self.dimension);
        let _ = writeln!(out, "EDGE_WEIGHT_TYPE : {}", self.edge_weight_type.keyword());
        let _ = writeln!(out, "NODE_COORD_SECTION");
        for city in &self.cities {
            let _ = writeln!(out, "{} {} {}", city.id + 1, city.x, city.y);
        }
        out.push_str("EOF\n");
        out
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.dimension {
            for j in i + 1..self.dimension {
                distances.push(self.distance(i, j));
            }
        }
        let count = distances.len().max(1) as f64;
        let avg_distance = distances.iter().sum::<f64>() / count;
        let min_distance = distances.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            edge_weight_type: self.edge_weight_type,
            avg_distance,
            min_distance,
            max_distance,
        }
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub edge_weight_type: EdgeWeightType,
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(f, "  Edge weights: {:?}", self.edge_weight_type)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "NAME: square4
COMMENT: unit square scaled by 10
TYPE: TSP
DIMENSION: 4
EDGE_WEIGHT_TYPE: EUC_2D
NODE_COORD_SECTION
1 0 0
2 0 10
3 10 10
4 10 0
EOF
";

    #[test]
    fn test_parse_tsplib() {
        let instance = TspInstance::from_reader(SQUARE.as_bytes()).unwrap();
        assert_eq!(instance.name, "square4");
        assert_eq!(instance.dimension, 4);
        assert_eq!(instance.edge_weight_type, EdgeWeightType::Euc2d);
        assert_eq!(instance.distance(0, 1), 10.0);
        assert_eq!(instance.distance(0, 2), 14.0);

        let world = instance.world().unwrap();
        assert_eq!(world.greedy_distance(), 40.0);
    }

    #[test]
    fn test_round_trip_through_tsplib() {
        let instance = TspInstance::random_uniform(12, 1000.0, 3);
        let parsed = TspInstance::from_reader(instance.to_tsplib().as_bytes()).unwrap();
        assert_eq!(parsed.dimension, 12);
        assert_eq!(parsed.distance_matrix, instance.distance_matrix);
    }

    #[test]
    fn test_rejects_bad_input() {
        let short = SQUARE.replace("DIMENSION: 4", "DIMENSION: 5");
        assert!(matches!(
            TspInstance::from_reader(short.as_bytes()),
            Err(InstanceError::MissingCoordinates { expected: 5, found: 4 })
        ));

        let geo = SQUARE.replace("EUC_2D", "GEO");
        assert!(matches!(
            TspInstance::from_reader(geo.as_bytes()),
            Err(InstanceError::UnsupportedWeightType(_))
        ));

        let garbage = SQUARE.replace("2 0 10", "2 zero 10");
        assert!(matches!(
            TspInstance::from_reader(garbage.as_bytes()),
            Err(InstanceError::Parse { line: 8, .. })
        ));
    }

    #[test]
    fn test_json_round_trip_rebuilds_distances() {
        let instance = TspInstance::from_reader(SQUARE.as_bytes()).unwrap();
        let json = serde_json::to_string(&instance).unwrap();
        assert!(!json.contains("distance_matrix"));

        let restored: TspInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.dimension, 4);
        assert_eq!(restored.distance_matrix, instance.distance_matrix);
        assert_eq!(restored.distance(0, 2), 14.0);
        assert_eq!(restored.statistics().max_distance, 14.0);
    }

    #[test]
    fn test_weight_types() {
        let a = City::new(0, 0.0, 0.0);
        let b = City::new(1, 1.0, 1.0);
        assert_eq!(EdgeWeightType::Euc2d.distance(&a, &b), 1.0);
        assert_eq!(EdgeWeightType::Ceil2d.distance(&a, &b), 2.0);
        assert!((EdgeWeightType::Exact.distance(&a, &b) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_statistics() {
        let instance = TspInstance::from_coordinates("tri", &[(0.0, 0.0), (3.0, 0.0), (0.0, 4.0)]);
        let stats = instance.statistics();
        assert_eq!(stats.dimension, 3);
        assert_eq!(stats.min_distance, 3.0);
        assert_eq!(stats.max_distance, 5.0);
        assert!((stats.avg_distance - 4.0).abs() < 1e-12);
    }
}
