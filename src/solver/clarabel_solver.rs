// Clarabel Solver Adapter
// Translates the domain problem into Clarabel's conic form:
//
//   minimize    ½ xᵀPx + qᵀx
//   subject to  Ax + s = b,  s ∈ K
//
// Equalities map to the zero cone, inequalities and variable bounds to the
// nonnegative orthant, norm bounds to second-order cones.

use crate::domain::{
    models::{ConstraintKind, OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{
        ConstraintType, OptimizationType, ProblemClass, SolutionStatus as DomainSolutionStatus,
    },
};
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use std::collections::BTreeMap;
use std::time::Instant;

pub struct ClarabelSolver;

impl ClarabelSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Column-wise triplet accumulator; duplicate entries are summed
struct TripletMatrix {
    rows: usize,
    columns: Vec<BTreeMap<usize, f64>>,
}

impl TripletMatrix {
    fn new(cols: usize) -> Self {
        Self {
            rows: 0,
            columns: vec![BTreeMap::new(); cols],
        }
    }

    fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            *self.columns[col].entry(row).or_insert(0.0) += value;
        }
    }

    fn into_csc(self) -> CscMatrix<f64> {
        let n = self.columns.len();
        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for column in self.columns {
            for (row, value) in column {
                rowval.push(row);
                nzval.push(value);
            }
            colptr.push(rowval.len());
        }
        CscMatrix::new(self.rows, n, colptr, rowval, nzval)
    }
}

/// Conic data assembled from a domain problem
struct ConicForm {
    p: CscMatrix<f64>,
    q: Vec<f64>,
    a: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

fn assemble(problem: &OptimizationProblem) -> ConicForm {
    let n = problem.num_variables();
    let sign = match problem.objective.optimization_type {
        OptimizationType::Minimize => 1.0,
        OptimizationType::Maximize => -1.0,
    };

    // P holds the upper triangle of the Hessian of the objective
    let mut p = TripletMatrix::new(n);
    p.rows = n;
    for term in &problem.objective.quadratic {
        let (r, c) = if term.first <= term.second {
            (term.first, term.second)
        } else {
            (term.second, term.first)
        };
        let scale = if r == c { 2.0 } else { 1.0 };
        p.add(r, c, sign * scale * term.coefficient);
    }
    let q: Vec<f64> = problem
        .objective
        .coefficients
        .iter()
        .map(|c| sign * c)
        .collect();

    let mut a = TripletMatrix::new(n);
    let mut b = Vec::new();
    let mut cones = Vec::new();

    // Zero cone block
    let mut equalities = 0;
    for constraint in &problem.constraints {
        if let ConstraintKind::Linear {
            terms,
            constraint_type: ConstraintType::Equal,
            bound,
        } = &constraint.kind
        {
            for &(var, coeff) in terms {
                a.add(b.len(), var, coeff);
            }
            b.push(*bound);
            equalities += 1;
        }
    }
    if equalities > 0 {
        cones.push(SupportedConeT::ZeroConeT(equalities));
    }

    // Nonnegative orthant block: inequalities then finite bounds
    let start = b.len();
    for constraint in &problem.constraints {
        if let ConstraintKind::Linear {
            terms,
            constraint_type,
            bound,
        } = &constraint.kind
        {
            let flip = match constraint_type {
                ConstraintType::Equal => continue,
                ConstraintType::LessThanOrEqual => 1.0,
                ConstraintType::GreaterThanOrEqual => -1.0,
            };
            for &(var, coeff) in terms {
                a.add(b.len(), var, flip * coeff);
            }
            b.push(flip * bound);
        }
    }
    for (col, var) in problem.variables.iter().enumerate() {
        if var.lower_bound.is_finite() {
            a.add(b.len(), col, -1.0);
            b.push(-var.lower_bound);
        }
        if let Some(upper) = var.upper_bound {
            a.add(b.len(), col, 1.0);
            b.push(upper);
        }
    }
    if b.len() > start {
        cones.push(SupportedConeT::NonnegativeConeT(b.len() - start));
    }

    // One second-order cone per norm bound: s = (radius, x_v...)
    for constraint in &problem.constraints {
        if let ConstraintKind::NormBound { vars, radius } = &constraint.kind {
            b.push(*radius);
            for &var in vars {
                a.add(b.len(), var, -1.0);
                b.push(0.0);
            }
            cones.push(SupportedConeT::SecondOrderConeT(vars.len() + 1));
        }
    }

    a.rows = b.len();
    ConicForm {
        p: p.into_csc(),
        q,
        a: a.into_csc(),
        b,
        cones,
    }
}

impl SolverService for ClarabelSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        // Validate first
        self.validate(problem)?;
        if problem.has_log_rows() {
            return Err(SolverError::SolverNotAvailable(
                "Clarabel needs log rows linearized first".to_string(),
            ));
        }

        let start_time = Instant::now();
        let ConicForm { p, q, a, b, cones } = assemble(problem);

        let config = &problem.solver_config;
        let mut builder = DefaultSettingsBuilder::default();
        builder.verbose(config.verbose);
        if let Some(limit) = config.time_limit {
            builder.time_limit(limit);
        }
        if let Some(limit) = config.iteration_limit {
            builder.max_iter(limit);
        }
        if let Some(gap) = config.gap_tolerance {
            builder.tol_gap_abs(gap);
            builder.tol_gap_rel(gap);
        }
        let settings = builder
            .build()
            .map_err(|e| SolverError::InvalidProblem(format!("Clarabel settings: {}", e)))?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let statistics = SolverStatistics {
            iterations: u64::from(solver.info.iterations),
            solve_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
            num_variables: problem.num_variables() as u32,
            num_constraints: problem.num_constraints() as u32,
        };

        let (status, message) = match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                let variable_values = solver.solution.x.clone();
                let actual_obj = problem.objective.evaluate(&variable_values);
                let violation = problem.max_violation(&variable_values);

                let mut solution = DomainSolution::optimal(actual_obj, variable_values);
                solution.statistics = statistics;
                solution.quality.max_constraint_violation = violation;
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                return Ok(solution);
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => (
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints".to_string(),
            ),
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => (
                DomainSolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely".to_string(),
            ),
            SolverStatus::MaxIterations => (
                DomainSolutionStatus::IterationLimit,
                "Clarabel hit its iteration limit".to_string(),
            ),
            SolverStatus::MaxTime => (
                DomainSolutionStatus::TimeLimit,
                "Clarabel hit its time limit".to_string(),
            ),
            other => (
                DomainSolutionStatus::Error,
                format!("Clarabel returned status: {:?}", other),
            ),
        };

        let mut solution = DomainSolution::new(status, message);
        solution.statistics = statistics;
        Ok(solution)
    }

    fn name(&self) -> &str {
        "Clarabel"
    }

    fn supports(&self, _class: ProblemClass) -> bool {
        true
    }
}
