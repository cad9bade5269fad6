// Domain layer: solver boundary, problem model and error taxonomy
pub mod domain;

// Application layer: Use cases and orchestration
pub mod application;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Shape-constrained regression: data contract, configuration, formulation, refinement
pub mod regression;

// Residual decomposition (StoNED)
pub mod stoned;

pub mod stats;

// Re-export commonly used types
pub use domain::{
    FrontierError, OptimizationProblem, Result, Solution, SolutionStatus, SolverBackend,
    SolverConfig, SolverError, SolverService,
};

pub use application::{Estimate, FrontierEstimator, Pruning};

pub use regression::{
    ActivationMatrix, CuttingPlaneRefiner, Direction, DominanceMatrix, ErrorForm, Fit, Loss,
    ModelConfig, NeighborhoodPruner, Observations, Orientation, Penalty, ProblemFormulator,
    RefinerOptions, ReturnsToScale, ShapeMode,
};

pub use solver::SolverFactory;

pub use stoned::{Decomposition, DecompositionMethod, ResidualDecomposer, VarianceComponents};
