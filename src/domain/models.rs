use super::value_objects::{
    ConstraintType, OptimizationType, ProblemClass, SolutionStatus, SolverBackend,
};

/// Column index of a decision variable
pub type VarId = usize;

/// Decision variable in an optimization problem
#[derive(Debug, Clone)]
pub struct Variable {
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    /// Sign-unconstrained variable
    pub fn free(name: impl Into<String>) -> Self {
        Self {
            lower_bound: f64::NEG_INFINITY,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn nonnegative(name: impl Into<String>) -> Self {
        Self {
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    /// Distance by which `value` lies outside the bounds
    pub fn bound_violation(&self, value: f64) -> f64 {
        let below = self.lower_bound - value;
        let above = self.upper_bound.map_or(f64::NEG_INFINITY, |u| value - u);
        below.max(above).max(0.0)
    }
}

/// Sparse affine expression `Σ coeff·x[var] + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.push(var, coefficient);
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    /// Append a term; zero coefficients are dropped
    pub fn push(&mut self, var: VarId, coefficient: f64) {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coeff)| coeff * values[var])
            .sum::<f64>()
            + self.constant
    }
}

/// Term `coefficient · x[first] · x[second]` of a quadratic objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticTerm {
    pub first: VarId,
    pub second: VarId,
    pub coefficient: f64,
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone)]
pub struct ObjectiveFunction {
    pub optimization_type: OptimizationType,
    pub coefficients: Vec<f64>,
    pub quadratic: Vec<QuadraticTerm>,
}

impl ObjectiveFunction {
    pub fn new(optimization_type: OptimizationType, coefficients: Vec<f64>) -> Self {
        Self {
            optimization_type,
            coefficients,
            quadratic: Vec::new(),
        }
    }

    /// All-zero linear part over `num_variables` columns
    pub fn zeros(optimization_type: OptimizationType, num_variables: usize) -> Self {
        Self::new(optimization_type, vec![0.0; num_variables])
    }

    pub fn add_linear(&mut self, var: VarId, coefficient: f64) {
        self.coefficients[var] += coefficient;
    }

    /// Add `weight · x[var]²`
    pub fn add_square(&mut self, var: VarId, weight: f64) {
        if weight != 0.0 {
            self.quadratic.push(QuadraticTerm {
                first: var,
                second: var,
                coefficient: weight,
            });
        }
    }

    pub fn is_quadratic(&self) -> bool {
        !self.quadratic.is_empty()
    }

    pub fn num_variables(&self) -> usize {
        self.coefficients.len()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let linear: f64 = self
            .coefficients
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum();
        let quadratic: f64 = self
            .quadratic
            .iter()
            .map(|t| t.coefficient * values[t.first] * values[t.second])
            .sum();
        linear + quadratic
    }
}

/// Structure of a single constraint row
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// `Σ terms <relation> bound`
    Linear {
        terms: Vec<(VarId, f64)>,
        constraint_type: ConstraintType,
        bound: f64,
    },
    /// `Σ x[v]² ≤ radius²`
    NormBound { vars: Vec<VarId>, radius: f64 },
    /// `ln(target) = ln(frontier) + shift + residual`, with `frontier > 0`.
    ///
    /// Residual variables of a log row must not appear in any other row; shift
    /// variables may be shared.
    LogLinear {
        target: f64,
        frontier: LinearExpr,
        shift: LinearExpr,
        residual: LinearExpr,
    },
}

/// Constraint on the decision variables
#[derive(Debug, Clone)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub name: String,
}

impl Constraint {
    pub fn new(constraint_type: ConstraintType, terms: Vec<(VarId, f64)>, bound: f64) -> Self {
        Self {
            kind: ConstraintKind::Linear {
                terms,
                constraint_type,
                bound,
            },
            name: String::new(),
        }
    }

    /// Linear row from an affine expression; the constant moves to the right-hand side
    pub fn from_expr(constraint_type: ConstraintType, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(constraint_type, expr.terms, rhs - expr.constant)
    }

    pub fn norm_bound(vars: Vec<VarId>, radius: f64) -> Self {
        Self {
            kind: ConstraintKind::NormBound { vars, radius },
            name: String::new(),
        }
    }

    pub fn log_linear(target: f64, frontier: LinearExpr, residual: LinearExpr) -> Self {
        Self {
            kind: ConstraintKind::LogLinear {
                target,
                frontier,
                shift: LinearExpr::new(),
                residual,
            },
            name: String::new(),
        }
    }

    /// Add a linear shift to a log row; other rows are returned unchanged
    pub fn with_log_shift(mut self, expr: LinearExpr) -> Self {
        if let ConstraintKind::LogLinear { shift, .. } = &mut self.kind {
            *shift = expr;
        }
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_linear(&self) -> bool {
        matches!(self.kind, ConstraintKind::Linear { .. })
    }

    /// Largest variable index referenced by the row
    pub fn max_variable(&self) -> Option<VarId> {
        match &self.kind {
            ConstraintKind::Linear { terms, .. } => terms.iter().map(|&(v, _)| v).max(),
            ConstraintKind::NormBound { vars, .. } => vars.iter().copied().max(),
            ConstraintKind::LogLinear {
                frontier,
                shift,
                residual,
                ..
            } => frontier
                .terms
                .iter()
                .chain(shift.terms.iter())
                .chain(residual.terms.iter())
                .map(|&(v, _)| v)
                .max(),
        }
    }

    /// Violation of the row at `values` (≤ 0 means satisfied)
    pub fn violation(&self, values: &[f64]) -> f64 {
        match &self.kind {
            ConstraintKind::Linear {
                terms,
                constraint_type,
                bound,
            } => {
                let lhs: f64 = terms.iter().map(|&(v, c)| c * values[v]).sum();
                constraint_type.violation(lhs, *bound)
            }
            ConstraintKind::NormBound { vars, radius } => {
                let norm = vars.iter().map(|&v| values[v] * values[v]).sum::<f64>().sqrt();
                norm - radius
            }
            ConstraintKind::LogLinear {
                target,
                frontier,
                shift,
                residual,
            } => {
                let f = frontier.evaluate(values);
                if f <= 0.0 {
                    return f64::INFINITY;
                }
                (target.ln() - f.ln() - shift.evaluate(values) - residual.evaluate(values)).abs()
            }
        }
    }
}

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    pub time_limit: Option<f64>,
    pub gap_tolerance: Option<f64>,
    pub iteration_limit: Option<u32>,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit: None,
            gap_tolerance: None,
            iteration_limit: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_gap_tolerance(mut self, tolerance: f64) -> Self {
        self.gap_tolerance = Some(tolerance);
        self
    }
}

/// Complete optimization problem
#[derive(Debug, Clone)]
pub struct OptimizationProblem {
    pub name: String,
    pub objective: ObjectiveFunction,
    pub constraints: Vec<Constraint>,
    pub variables: Vec<Variable>,
    pub solver_config: SolverConfig,
}

impl OptimizationProblem {
    pub fn new(objective: ObjectiveFunction) -> Self {
        Self {
            name: String::new(),
            objective,
            constraints: Vec::new(),
            variables: Vec::new(),
            solver_config: SolverConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn push_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    pub fn num_variables(&self) -> usize {
        self.objective.num_variables()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_log_rows(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::LogLinear { .. }))
    }

    /// Class of the problem once log rows are linearized
    pub fn class(&self) -> ProblemClass {
        let conic = self
            .constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::NormBound { .. }));
        if conic {
            ProblemClass::SecondOrderCone
        } else if self.objective.is_quadratic() {
            ProblemClass::Quadratic
        } else {
            ProblemClass::Linear
        }
    }

    /// Largest row or bound violation of a candidate point
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let rows = self
            .constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0_f64, f64::max);
        let bounds = self
            .variables
            .iter()
            .zip(values)
            .map(|(var, &v)| var.bound_violation(v))
            .fold(0.0_f64, f64::max);
        rows.max(bounds)
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub iterations: u64,
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
}

/// Quality metrics for the solution
#[derive(Debug, Clone, Default)]
pub struct SolutionQuality {
    pub max_constraint_violation: f64,
}

/// Solution to an optimization problem
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub optimal_value: Option<f64>,
    pub variable_values: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
    pub quality: SolutionQuality,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            optimal_value: None,
            variable_values: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
        }
    }

    pub fn optimal(value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            optimal_value: Some(value),
            variable_values,
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_quality(mut self, quality: SolutionQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}
