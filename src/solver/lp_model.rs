// Shared translation of a linear domain problem into good_lp building blocks
// Used by every good_lp-backed adapter so they only differ in the solver function they plug in

use crate::domain::{
    models::{ConstraintKind, OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError},
    value_objects::{
        ConstraintType, OptimizationType, ProblemClass, SolutionStatus as DomainSolutionStatus,
    },
};
use good_lp::{
    variable, Constraint as LpConstraint, Expression, ProblemVariables, ResolutionError,
    Solution as GoodLpSolutionTrait, Variable as GoodLpVariable,
};
use std::time::Instant;

/// good_lp variables, objective and rows for one domain problem
pub struct LpModel {
    pub vars: ProblemVariables,
    pub columns: Vec<GoodLpVariable>,
    pub objective: Expression,
    pub rows: Vec<LpConstraint>,
}

impl LpModel {
    /// Translate a linear problem; anything beyond [`ProblemClass::Linear`] is rejected
    pub fn build(problem: &OptimizationProblem, backend: &str) -> Result<Self> {
        if problem.has_log_rows() || problem.class() > ProblemClass::Linear {
            return Err(SolverError::SolverNotAvailable(format!(
                "{} only solves linear programs, got a {} problem",
                backend,
                problem.class()
            )));
        }

        let mut vars = ProblemVariables::new();
        let mut columns = Vec::with_capacity(problem.variables.len());
        for var_def in &problem.variables {
            let mut def = variable();
            if var_def.lower_bound.is_finite() {
                def = def.min(var_def.lower_bound);
            }
            if let Some(upper) = var_def.upper_bound {
                def = def.max(upper);
            }
            columns.push(vars.add(def));
        }

        // good_lp minimises, so negate for maximization
        let is_maximize = problem.objective.optimization_type == OptimizationType::Maximize;
        let mut objective: Expression = 0.into();
        for (i, &coeff) in problem.objective.coefficients.iter().enumerate() {
            if coeff != 0.0 {
                let c = if is_maximize { -coeff } else { coeff };
                objective += c * columns[i];
            }
        }

        let mut rows = Vec::with_capacity(problem.constraints.len());
        for constraint in &problem.constraints {
            if let ConstraintKind::Linear {
                terms,
                constraint_type,
                bound,
            } = &constraint.kind
            {
                let mut lhs: Expression = 0.into();
                for &(var, coeff) in terms {
                    lhs += coeff * columns[var];
                }
                let row = match constraint_type {
                    ConstraintType::LessThanOrEqual => lhs.leq(*bound),
                    ConstraintType::Equal => lhs.eq(*bound),
                    ConstraintType::GreaterThanOrEqual => lhs.geq(*bound),
                };
                rows.push(row);
            }
        }

        Ok(Self {
            vars,
            columns,
            objective,
            rows,
        })
    }
}

/// Map a good_lp resolution result back onto the domain solution
pub fn interpret<S: GoodLpSolutionTrait>(
    problem: &OptimizationProblem,
    columns: &[GoodLpVariable],
    result: std::result::Result<S, ResolutionError>,
    start_time: Instant,
) -> Result<DomainSolution> {
    let statistics = SolverStatistics {
        iterations: 0,
        solve_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
        num_variables: problem.num_variables() as u32,
        num_constraints: problem.num_constraints() as u32,
    };

    match result {
        Ok(sol) => {
            let variable_values: Vec<f64> = columns.iter().map(|&var| sol.value(var)).collect();
            let actual_obj = problem.objective.evaluate(&variable_values);
            let violation = problem.max_violation(&variable_values);

            let mut solution = DomainSolution::optimal(actual_obj, variable_values);
            solution.statistics = statistics;
            solution.quality.max_constraint_violation = violation;
            solution.message = format!("Optimal solution found for '{}'", problem.name);
            Ok(solution)
        }
        Err(ResolutionError::Infeasible) => {
            let mut solution = DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            );
            solution.statistics = statistics;
            Ok(solution)
        }
        Err(ResolutionError::Unbounded) => {
            let mut solution = DomainSolution::new(
                DomainSolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            );
            solution.statistics = statistics;
            Ok(solution)
        }
        Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
    }
}
