//! Error types for the colony engine and instance reader.

use thiserror::Error;

/// Errors raised while configuring or driving a colony.
///
/// Every configuration problem is caught before `initialize()` runs; once a
/// colony is ready, `forage()` only fails if it is called out of order.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColonyError {
    #[error("a tour needs at least 2 cities, got {0}")]
    TooFewCities(usize),

    #[error("distance matrix has {actual} entries, expected {expected} for a square matrix")]
    MatrixShape { expected: usize, actual: usize },

    #[error("distance ({from}, {to}) = {value} is negative or not finite")]
    InvalidDistance { from: usize, to: usize, value: f64 },

    #[error("distance ({from}, {to}) differs from ({to}, {from})")]
    AsymmetricDistance { from: usize, to: usize },

    #[error("ant count must be positive")]
    NoAnts,

    #[error("beta must be positive and finite, got {0}")]
    InvalidBeta(f64),

    #[error("rho must lie in [0, 1], got {0}")]
    InvalidRho(f64),

    #[error("rank window must be at least 1")]
    InvalidRankWindow,

    #[error("stopping policy never stops: set max iterations, max time or max stagnation")]
    UnboundedRun,

    #[error("colony has not been initialized")]
    NotInitialized,
}

/// Errors raised while reading or writing TSPLIB instances.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("cannot read instance: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unsupported edge weight type {0}")]
    UnsupportedWeightType(String),

    #[error("expected {expected} coordinates, found {found}")]
    MissingCoordinates { expected: usize, found: usize },

    #[error(transparent)]
    Colony(#[from] ColonyError),
}
