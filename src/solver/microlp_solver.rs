// microlp adapter: pure-Rust simplex through good_lp, used for quantile and L1 problems

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution},
    solver_service::{Result, SolverService},
    value_objects::ProblemClass,
};
use crate::solver::lp_model::{interpret, LpModel};
use good_lp::{solvers::microlp::microlp, SolverModel};
use std::time::Instant;

pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MicroLpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for MicroLpSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();
        let LpModel {
            vars,
            columns,
            objective,
            rows,
        } = LpModel::build(problem, self.name())?;

        let mut lp_model = vars.minimise(objective).using(microlp);
        for row in rows {
            lp_model = lp_model.with(row);
        }

        interpret(problem, &columns, lp_model.solve(), start_time)
    }

    fn name(&self) -> &str {
        "microlp"
    }

    fn supports(&self, class: ProblemClass) -> bool {
        class == ProblemClass::Linear
    }
}
