// Sequential linearization of log-domain regression rows
//
// Each round replaces ln(frontier) by its tangent at the previous frontier value,
// solves the resulting convex program with the inner backend, recomputes the residual
// variables exactly and keeps the step only if the true objective decreases
// (halving towards the previous iterate otherwise).

use crate::domain::{
    models::{
        Constraint, ConstraintKind, LinearExpr, OptimizationProblem, Solution as DomainSolution,
        SolutionQuality, SolverStatistics,
    },
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, ProblemClass},
};
use std::sync::Arc;
use std::time::Instant;

/// Smallest frontier value used as a tangent point
const MIN_ANCHOR: f64 = 1e-8;

pub struct SequentialLinearization {
    inner: Arc<dyn SolverService>,
    max_rounds: usize,
    tolerance: f64,
}

impl SequentialLinearization {
    pub fn new(inner: Arc<dyn SolverService>) -> Self {
        Self {
            inner,
            max_rounds: 100,
            tolerance: 1e-10,
        }
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Tangent-plane copy of `problem` around the given frontier values (one per log row)
fn linearize(problem: &OptimizationProblem, anchors: &[f64]) -> OptimizationProblem {
    let mut anchor = anchors.iter();
    let constraints = problem
        .constraints
        .iter()
        .map(|constraint| match &constraint.kind {
            ConstraintKind::LogLinear {
                target,
                frontier,
                shift,
                residual,
            } => {
                // ln t = ln a + (f - a)/a + s + r
                let a = anchor.next().copied().unwrap_or(1.0);
                let mut expr = LinearExpr::new();
                for &(var, coeff) in &frontier.terms {
                    expr.push(var, coeff / a);
                }
                for &(var, coeff) in shift.terms.iter().chain(&residual.terms) {
                    expr.push(var, coeff);
                }
                expr.constant = frontier.constant / a + shift.constant + residual.constant;
                Constraint::from_expr(ConstraintType::Equal, expr, target.ln() - a.ln() + 1.0)
                    .with_name(format!("{}_linearized", constraint.name))
            }
            _ => constraint.clone(),
        })
        .collect();

    OptimizationProblem {
        name: problem.name.clone(),
        objective: problem.objective.clone(),
        constraints,
        variables: problem.variables.clone(),
        solver_config: problem.solver_config.clone(),
    }
}

/// Overwrite residual variables so every log row holds exactly.
///
/// Returns `false` when some frontier value is not strictly positive.
fn reconcile(problem: &OptimizationProblem, values: &mut [f64]) -> Result<bool> {
    for constraint in &problem.constraints {
        if let ConstraintKind::LogLinear {
            target,
            frontier,
            shift,
            residual,
        } = &constraint.kind
        {
            let f = frontier.evaluate(values);
            if f <= 0.0 {
                return Ok(false);
            }
            let r = target.ln() - f.ln() - shift.evaluate(values) - residual.constant;
            match residual.terms.as_slice() {
                [(var, coeff)] => values[*var] = r / coeff,
                [(plus, cp), (minus, cm)] if *cp > 0.0 && *cm < 0.0 => {
                    values[*plus] = r.max(0.0) / cp;
                    values[*minus] = (-r).max(0.0) / -cm;
                }
                _ => {
                    return Err(SolverError::InvalidProblem(format!(
                        "log row '{}' needs a single residual or a +/- residual pair",
                        constraint.name
                    )))
                }
            }
        }
    }
    Ok(true)
}

fn frontier_values(problem: &OptimizationProblem, values: &[f64]) -> Vec<f64> {
    problem
        .constraints
        .iter()
        .filter_map(|c| match &c.kind {
            ConstraintKind::LogLinear { frontier, .. } => {
                Some(frontier.evaluate(values).max(MIN_ANCHOR))
            }
            _ => None,
        })
        .collect()
}

impl SolverService for SequentialLinearization {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        self.validate(problem)?;
        if !problem.has_log_rows() {
            return self.inner.solve(problem);
        }

        let start_time = Instant::now();
        // First tangent point: the frontier passes through every target
        let mut anchors: Vec<f64> = problem
            .constraints
            .iter()
            .filter_map(|c| match &c.kind {
                ConstraintKind::LogLinear { target, .. } => Some(*target),
                _ => None,
            })
            .collect();

        let mut best: Option<(Vec<f64>, f64)> = None;
        let mut rounds = 0u64;
        for _ in 0..self.max_rounds {
            rounds += 1;
            let solution = self.inner.solve(&linearize(problem, &anchors))?;
            if !solution.is_optimal() {
                return Ok(solution);
            }

            let raw = solution.variable_values;
            let mut candidate = raw.clone();
            let feasible = reconcile(problem, &mut candidate)?;
            let mut value = if feasible {
                problem.objective.evaluate(&candidate)
            } else {
                f64::INFINITY
            };

            let Some((previous, previous_value)) = best.take() else {
                anchors = frontier_values(problem, &candidate);
                best = Some((candidate, value));
                continue;
            };

            let mut step = 1.0;
            while !(value <= previous_value) && step > 1e-4 {
                step *= 0.5;
                candidate = previous
                    .iter()
                    .zip(&raw)
                    .map(|(p, r)| p + step * (r - p))
                    .collect();
                value = if reconcile(problem, &mut candidate)? {
                    problem.objective.evaluate(&candidate)
                } else {
                    f64::INFINITY
                };
            }

            if !(value <= previous_value) {
                best = Some((previous, previous_value));
                break;
            }
            let improvement = previous_value - value;
            log::debug!(
                "log-domain round {}: objective {:.10e} (step {})",
                rounds,
                value,
                step
            );
            anchors = frontier_values(problem, &candidate);
            best = Some((candidate, value));
            if improvement <= self.tolerance * (1.0 + previous_value.abs()) {
                break;
            }
        }

        let (values, value) = best.ok_or_else(|| {
            SolverError::ExecutionFailed("no linearization round was solved".to_string())
        })?;
        if !value.is_finite() {
            return Err(SolverError::ExecutionFailed(
                "log-domain frontier values never became positive".to_string(),
            ));
        }

        let violation = problem.max_violation(&values);
        let mut solution = DomainSolution::optimal(value, values)
            .with_statistics(SolverStatistics {
                iterations: rounds,
                solve_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
                num_variables: problem.num_variables() as u32,
                num_constraints: problem.num_constraints() as u32,
            })
            .with_quality(SolutionQuality {
                max_constraint_violation: violation,
            });
        solution.message = format!(
            "Optimal solution found for '{}' after {} linearization rounds",
            problem.name, rounds
        );
        Ok(solution)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports(&self, class: ProblemClass) -> bool {
        self.inner.supports(class)
    }
}
