// Error taxonomy of the estimation core

use super::solver_service::SolverError;

/// Every failure surfaced by formulation, refinement and decomposition
#[derive(Debug, thiserror::Error)]
pub enum FrontierError {
    /// Mismatched or malformed input dimensions
    #[error("Shape error: {0}")]
    Shape(String),

    /// Non-finite or out-of-domain input values
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Illegal combination of configuration axes
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external solver failed or returned a non-optimal status
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// A statistic could not be computed and no clamping policy applies
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

pub type Result<T> = std::result::Result<T, FrontierError>;
