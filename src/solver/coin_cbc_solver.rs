use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution},
    solver_service::{Result, SolverService},
    value_objects::ProblemClass,
};
use crate::solver::lp_model::{interpret, LpModel};
use good_lp::{solvers::coin_cbc, SolverModel};
use std::time::Instant;

pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        // Validate first
        self.validate(problem)?;

        let start_time = Instant::now();
        let LpModel {
            vars,
            columns,
            objective,
            rows,
        } = LpModel::build(problem, self.name())?;

        let mut lp_model = vars.minimise(objective).using(coin_cbc::coin_cbc);
        if !problem.solver_config.verbose {
            lp_model.set_parameter("log", "0");
        }
        if let Some(limit) = problem.solver_config.time_limit {
            lp_model.set_parameter("sec", &limit.to_string());
        }
        for row in rows {
            lp_model = lp_model.with(row);
        }

        interpret(problem, &columns, lp_model.solve(), start_time)
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn supports(&self, class: ProblemClass) -> bool {
        class == ProblemClass::Linear
    }
}
