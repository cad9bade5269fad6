// Domain service interface for solving the emitted convex programs
// Defines the contract that any solver implementation must follow (Dependency Inversion Principle)

use super::models::{ConstraintKind, OptimizationProblem, Solution};
use super::value_objects::{ProblemClass, SolutionStatus};

/// Error types for the solver service
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Solver finished with status {status}: {message}")]
    NotOptimal {
        status: SolutionStatus,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Domain service interface for optimization solvers
///
/// The core only builds an [`OptimizationProblem`] and reads back variable values;
/// any backend honouring this trait can be swapped in.
pub trait SolverService: Send + Sync {
    /// Solve an optimization problem
    ///
    /// Infeasible or unbounded problems come back as `Ok` with the matching status.
    fn solve(&self, problem: &OptimizationProblem) -> Result<Solution>;

    /// Solve and turn any non-optimal status into [`SolverError::NotOptimal`]
    fn solve_optimal(&self, problem: &OptimizationProblem) -> Result<Solution> {
        let solution = self.solve(problem)?;
        if solution.is_optimal() {
            Ok(solution)
        } else {
            Err(SolverError::NotOptimal {
                status: solution.status,
                message: solution.message,
            })
        }
    }

    /// Validate a problem without solving it
    fn validate(&self, problem: &OptimizationProblem) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        // Check objective has coefficients
        if problem.objective.coefficients.is_empty() {
            errors.push("Objective must have at least one coefficient".to_string());
        }

        let num_vars = problem.num_variables();

        // Check variables match objective
        if problem.variables.len() != num_vars {
            errors.push(format!(
                "Number of variables ({}) doesn't match objective coefficients ({})",
                problem.variables.len(),
                num_vars
            ));
        }

        for term in &problem.objective.quadratic {
            if term.first >= num_vars || term.second >= num_vars {
                errors.push(format!(
                    "Quadratic objective term ({}, {}) is out of range for {} variables",
                    term.first, term.second, num_vars
                ));
            }
        }

        // Check constraints
        for (i, constraint) in problem.constraints.iter().enumerate() {
            if let Some(max) = constraint.max_variable() {
                if max >= num_vars {
                    errors.push(format!(
                        "Constraint {} '{}' references variable {} but problem has {} variables",
                        i, constraint.name, max, num_vars
                    ));
                }
            }
            match &constraint.kind {
                ConstraintKind::NormBound { radius, .. } if !(*radius >= 0.0) => {
                    errors.push(format!(
                        "Constraint {} '{}' has invalid norm radius {}",
                        i, constraint.name, radius
                    ));
                }
                ConstraintKind::LogLinear { target, .. } if !(*target > 0.0) => {
                    errors.push(format!(
                        "Constraint {} '{}' takes the log of non-positive target {}",
                        i, constraint.name, target
                    ));
                }
                _ => {}
            }
        }

        // Check variable bounds
        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(Vec::new())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Whether this backend accepts problems of the given class
    fn supports(&self, class: ProblemClass) -> bool;
}
