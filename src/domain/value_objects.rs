// Domain value objects shared by the formulation stage and the solver adapters

use std::fmt;

/// Comparison used by a linear constraint row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

impl ConstraintType {
    /// Signed gap by which `lhs` violates `lhs <relation> bound` (≤ 0 means satisfied)
    pub fn violation(&self, lhs: f64, bound: f64) -> f64 {
        match self {
            ConstraintType::LessThanOrEqual => lhs - bound,
            ConstraintType::GreaterThanOrEqual => bound - lhs,
            ConstraintType::Equal => (lhs - bound).abs(),
        }
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationType {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Status of the optimization solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Found optimal solution
    Optimal,
    /// Found feasible solution (may not be optimal)
    Feasible,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// Time limit reached
    TimeLimit,
    /// Iteration limit reached
    IterationLimit,
    /// Solver error occurred
    Error,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Feasible => write!(f, "Feasible"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::TimeLimit => write!(f, "Time Limit Reached"),
            SolutionStatus::IterationLimit => write!(f, "Iteration Limit Reached"),
            SolutionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Hardest constraint/objective structure a problem contains.
///
/// Ordered: a backend that handles a class handles every class below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProblemClass {
    /// Linear objective, linear rows
    Linear,
    /// Quadratic objective, linear rows
    Quadratic,
    /// Quadratic objective with norm-bound (second-order cone) rows
    SecondOrderCone,
}

impl fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemClass::Linear => write!(f, "LP"),
            ProblemClass::Quadratic => write!(f, "QP"),
            ProblemClass::SecondOrderCone => write!(f, "SOCP"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    /// Pick the backend from the problem class
    Auto,
    /// Clarabel interior-point (LP, QP, SOCP)
    Clarabel,
    /// microlp simplex through good_lp (LP)
    MicroLp,
    /// COIN-OR CBC through good_lp (LP)
    CoinCbc,
    /// HiGHS (LP)
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::Clarabel => write!(f, "Clarabel"),
            SolverBackend::MicroLp => write!(f, "microlp"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}
