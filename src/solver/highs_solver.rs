// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS on linear programs
// This is an adapter pattern - translates our domain models to HiGHS API

use crate::domain::{
    models::{ConstraintKind, OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{
        ConstraintType, OptimizationType, ProblemClass, SolutionStatus as DomainSolutionStatus,
    },
};
use std::time::Instant;

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        // Validate first
        self.validate(problem)?;
        if problem.has_log_rows() || !self.supports(problem.class()) {
            return Err(SolverError::SolverNotAvailable(format!(
                "HiGHS adapter only solves linear programs, got a {} problem",
                problem.class()
            )));
        }

        let start_time = Instant::now();

        // Use HiGHS RowProblem (add variables first, then constraints)
        use highs::{HighsModelStatus, RowProblem, Sense};

        let mut pb = RowProblem::default();
        let mut vars = Vec::with_capacity(problem.variables.len());

        for (i, var_def) in problem.variables.iter().enumerate() {
            let lower = var_def.lower_bound;
            let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);
            let obj_coeff = problem.objective.coefficients[i];
            vars.push(pb.add_column(obj_coeff, lower..upper));
        }

        for constraint in &problem.constraints {
            if let ConstraintKind::Linear {
                terms,
                constraint_type,
                bound,
            } = &constraint.kind
            {
                let row: Vec<_> = terms.iter().map(|&(var, coeff)| (vars[var], coeff)).collect();
                match constraint_type {
                    ConstraintType::LessThanOrEqual => {
                        pb.add_row(..=*bound, &row);
                    }
                    ConstraintType::Equal => {
                        pb.add_row(*bound..=*bound, &row);
                    }
                    ConstraintType::GreaterThanOrEqual => {
                        pb.add_row(*bound.., &row);
                    }
                }
            }
        }

        let sense = if problem.objective.optimization_type == OptimizationType::Maximize {
            Sense::Maximise
        } else {
            Sense::Minimise
        };

        let mut model = pb.optimise(sense);
        if !problem.solver_config.verbose {
            model.set_option("output_flag", false);
        }
        if let Some(limit) = problem.solver_config.time_limit {
            model.set_option("time_limit", limit);
        }
        let solved = model.solve();

        let statistics = SolverStatistics {
            iterations: 0,
            solve_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
            num_variables: problem.num_variables() as u32,
            num_constraints: problem.num_constraints() as u32,
        };

        match solved.status() {
            HighsModelStatus::Optimal => {
                let variable_values = solved.get_solution().columns().to_vec();
                let actual_obj = problem.objective.evaluate(&variable_values);
                let violation = problem.max_violation(&variable_values);

                let mut solution = DomainSolution::optimal(actual_obj, variable_values);
                solution.statistics = statistics;
                solution.quality.max_constraint_violation = violation;
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                Ok(solution)
            }
            HighsModelStatus::Infeasible => {
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Infeasible,
                    "Problem is infeasible: no solution satisfies all constraints",
                );
                solution.statistics = statistics;
                Ok(solution)
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Unbounded,
                    "Problem is unbounded: objective can be improved infinitely",
                );
                solution.statistics = statistics;
                Ok(solution)
            }
            HighsModelStatus::ReachedTimeLimit => {
                let mut solution =
                    DomainSolution::new(DomainSolutionStatus::TimeLimit, "HiGHS hit its time limit");
                solution.statistics = statistics;
                Ok(solution)
            }
            status => Err(SolverError::ExecutionFailed(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports(&self, class: ProblemClass) -> bool {
        class == ProblemClass::Linear
    }
}
