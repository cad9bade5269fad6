// Convex program emitted for a configured frontier regression

use crate::domain::{
    Constraint, ConstraintType, FrontierError, LinearExpr, ObjectiveFunction, OptimizationProblem,
    OptimizationType, ProblemClass, Result, SolverConfig,
};
use crate::regression::activation::ActivationMatrix;
use crate::regression::config::{ErrorForm, Loss, ModelConfig, Penalty, ShapeMode};
use crate::regression::data::Observations;
use crate::regression::dominance::DominanceMatrix;
use crate::regression::layout::VariableLayout;

/// Number of rows emitted per constraint family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormulationCounts {
    /// One regression equality (or log row) per observation
    pub regression: usize,
    /// `φ_i = α_i + β_i·x_i - 1` rows of the multiplicative form
    pub frontier_links: usize,
    /// Directional normalisation rows
    pub translation: usize,
    /// Afriat inequalities
    pub shape: usize,
    /// Weak-disposability inequalities
    pub disposability: usize,
    /// Per-row slope norm bounds
    pub lipschitz: usize,
}

impl FormulationCounts {
    pub fn total(&self) -> usize {
        self.regression
            + self.frontier_links
            + self.translation
            + self.shape
            + self.disposability
            + self.lipschitz
    }
}

/// A complete program plus the row counts it was built from
#[derive(Debug, Clone)]
pub struct Formulation {
    pub problem: OptimizationProblem,
    pub counts: FormulationCounts,
}

impl Formulation {
    pub fn num_variables(&self) -> usize {
        self.problem.num_variables()
    }

    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }
}

/// Emits the convex program for one data set and configuration.
///
/// Construction validates the configuration against the data, so an illegal
/// combination fails before any variable exists. Afriat pairs are drawn from the
/// candidate set of the shape mode (every ordered pair, or only dominance-ordered
/// pairs for the isotonic mode) and optionally restricted further by an
/// [`ActivationMatrix`].
pub struct ProblemFormulator<'a> {
    data: &'a Observations,
    config: &'a ModelConfig,
    layout: VariableLayout,
    candidates: ActivationMatrix,
    solver_config: SolverConfig,
}

impl<'a> ProblemFormulator<'a> {
    pub fn new(data: &'a Observations, config: &'a ModelConfig) -> Result<Self> {
        config.validate_for(data)?;
        let layout = VariableLayout::new(data, config);
        let candidates = candidate_pairs(data, config);
        Ok(Self {
            data,
            config,
            layout,
            candidates,
            solver_config: SolverConfig::default(),
        })
    }

    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    pub fn data(&self) -> &'a Observations {
        self.data
    }

    pub fn config(&self) -> &'a ModelConfig {
        self.config
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    /// Every Afriat pair the shape mode allows
    pub fn candidates(&self) -> &ActivationMatrix {
        &self.candidates
    }

    /// Class of every program this formulator emits, whatever the activation
    pub fn problem_class(&self) -> ProblemClass {
        match (self.config.penalty, self.config.loss) {
            (Penalty::Lipschitz(_), _) => ProblemClass::SecondOrderCone,
            (Penalty::L2(_), _) | (_, Loss::LeastSquares) | (_, Loss::Expectile(_)) => {
                ProblemClass::Quadratic
            }
            _ => ProblemClass::Linear,
        }
    }

    /// Whether the regression rows are log-domain rows
    pub fn has_log_rows(&self) -> bool {
        self.layout.phi(0).is_some()
    }

    /// Build the program; `None` emits every candidate Afriat pair
    pub fn formulate(&self, activation: Option<&ActivationMatrix>) -> Result<Formulation> {
        let n = self.data.len();
        if let Some(active) = activation {
            if active.len() != n {
                return Err(FrontierError::Shape(format!(
                    "activation matrix covers {} observations, data has {}",
                    active.len(),
                    n
                )));
            }
        }

        let mut problem = OptimizationProblem::new(self.objective())
            .with_name(format!(
                "{}-{}-{}-{}",
                self.config.error_form, self.config.orientation, self.config.loss, self.config.shape
            ))
            .with_variables(self.layout.variables())
            .with_config(self.solver_config.clone());
        let mut counts = FormulationCounts::default();

        for i in 0..n {
            for row in self.regression_rows(i) {
                problem.push_constraint(row);
            }
            counts.regression += 1;
            if self.layout.phi(i).is_some() {
                counts.frontier_links += 1;
            }
        }

        if let Some(direction) = self.config.direction() {
            for i in 0..n {
                let mut expr = LinearExpr::new();
                for (j, g) in direction.gx.iter().enumerate() {
                    expr.push(self.layout.beta(i, j), *g);
                }
                for (j, g) in direction.gy.iter().enumerate() {
                    if let Some(var) = self.layout.gamma(i, j) {
                        expr.push(var, *g);
                    }
                }
                for (j, g) in direction.gb.iter().enumerate() {
                    if let Some(var) = self.layout.delta(i, j) {
                        expr.push(var, *g);
                    }
                }
                problem.push_constraint(
                    Constraint::from_expr(ConstraintType::Equal, expr, 1.0)
                        .with_name(format!("translation[{}]", i)),
                );
                counts.translation += 1;
            }
        }

        let relation = self.config.orientation.afriat_relation();
        let pairs = self
            .candidates
            .pairs()
            .filter(|&(i, h)| activation.map_or(true, |active| active.contains(i, h)));
        for (i, h) in pairs {
            let mut expr = LinearExpr::new();
            self.push_support(&mut expr, i, i, 1.0);
            self.push_support(&mut expr, h, i, -1.0);
            problem.push_constraint(
                Constraint::from_expr(relation, expr, 0.0).with_name(format!("afriat[{}][{}]", i, h)),
            );
            counts.shape += 1;
        }

        if self.config.shape == ShapeMode::WeaklyDisposable {
            for i in 0..n {
                for h in (0..n).filter(|&h| h != i) {
                    problem.push_constraint(
                        Constraint::from_expr(
                            ConstraintType::GreaterThanOrEqual,
                            self.disposal_expr(i, h),
                            0.0,
                        )
                        .with_name(format!("disposability[{}][{}]", i, h)),
                    );
                    counts.disposability += 1;
                }
            }
        }

        if let Penalty::Lipschitz(bound) = self.config.penalty {
            for i in 0..n {
                let slopes = (0..self.layout.num_inputs()).map(|j| self.layout.beta(i, j)).collect();
                problem.push_constraint(
                    Constraint::norm_bound(slopes, bound).with_name(format!("lipschitz[{}]", i)),
                );
                counts.lipschitz += 1;
            }
        }

        log::debug!(
            "formulated '{}': {} variables, {} rows ({} Afriat of {} candidates)",
            problem.name,
            problem.num_variables(),
            problem.num_constraints(),
            counts.shape,
            self.candidates.num_active()
        );
        Ok(Formulation { problem, counts })
    }

    fn objective(&self) -> ObjectiveFunction {
        let layout = &self.layout;
        let mut objective = ObjectiveFunction::zeros(OptimizationType::Minimize, layout.num_variables());

        for i in 0..layout.num_observations() {
            let plus = layout.epsilon(i);
            match (self.config.loss, layout.epsilon_minus(i)) {
                (Loss::Quantile(tau), Some(minus)) => {
                    objective.add_linear(plus, tau);
                    objective.add_linear(minus, 1.0 - tau);
                }
                (Loss::Expectile(tau), Some(minus)) => {
                    objective.add_square(plus, tau);
                    objective.add_square(minus, 1.0 - tau);
                }
                _ => objective.add_square(plus, 1.0),
            }
        }

        let slopes = (0..layout.num_observations())
            .flat_map(|i| (0..layout.num_inputs()).map(move |j| (i, j)))
            .map(|(i, j)| layout.beta(i, j));
        match self.config.penalty {
            Penalty::L1(weight) => slopes.for_each(|var| objective.add_linear(var, weight)),
            Penalty::L2(weight) => slopes.for_each(|var| objective.add_square(var, weight)),
            Penalty::None | Penalty::Lipschitz(_) => {}
        }
        objective
    }

    /// Adds `coefficient · s(owner, at)` where
    /// `s(owner, at) = α_owner + β_owner·x_at - δ_owner·b_at - γ_owner·y_at`
    fn push_support(&self, expr: &mut LinearExpr, owner: usize, at: usize, coefficient: f64) {
        let layout = &self.layout;
        if let Some(alpha) = layout.alpha(owner) {
            expr.push(alpha, coefficient);
        }
        let x = self.data.x();
        for j in 0..layout.num_inputs() {
            expr.push(layout.beta(owner, j), coefficient * x[[at, j]]);
        }
        let y = self.data.y();
        for j in 0..layout.num_gamma() {
            if let Some(gamma) = layout.gamma(owner, j) {
                expr.push(gamma, -coefficient * y[[at, j]]);
            }
        }
        if let Some(b) = self.data.b() {
            for j in 0..layout.num_delta() {
                if let Some(delta) = layout.delta(owner, j) {
                    expr.push(delta, -coefficient * b[[at, j]]);
                }
            }
        }
    }

    /// `α_i + β_i·x_h - δ_i·b_h`
    fn disposal_expr(&self, i: usize, h: usize) -> LinearExpr {
        let layout = &self.layout;
        let mut expr = LinearExpr::new();
        if let Some(alpha) = layout.alpha(i) {
            expr.push(alpha, 1.0);
        }
        let x = self.data.x();
        for j in 0..layout.num_inputs() {
            expr.push(layout.beta(i, j), x[[h, j]]);
        }
        if let Some(b) = self.data.b() {
            for j in 0..layout.num_delta() {
                if let Some(delta) = layout.delta(i, j) {
                    expr.push(delta, -b[[h, j]]);
                }
            }
        }
        expr
    }

    fn contextual_expr(&self, i: usize) -> LinearExpr {
        let mut expr = LinearExpr::new();
        if let Some(z) = self.data.z() {
            for j in 0..self.layout.num_contextual() {
                expr.push(self.layout.lambda(j), z[[i, j]]);
            }
        }
        expr
    }

    fn regression_rows(&self, i: usize) -> Vec<Constraint> {
        let layout = &self.layout;
        let residual = layout.residual_terms(i);

        if self.config.is_directional() {
            // γ_i·y_i = α_i + β_i·x_i - δ_i·b_i - ε_i
            let mut expr = LinearExpr::new();
            self.push_support(&mut expr, i, i, 1.0);
            for &(var, coeff) in &residual {
                expr.push(var, -coeff);
            }
            return vec![Constraint::from_expr(ConstraintType::Equal, expr, 0.0)
                .with_name(format!("regression[{}]", i))];
        }

        let y = self.data.output()[i];
        match (self.config.error_form, layout.phi(i)) {
            (ErrorForm::Multiplicative, Some(phi)) => {
                // φ_i = α_i + β_i·x_i - 1,  ln y_i = ln(φ_i + 1) + λ·z_i + ε_i
                let mut link = LinearExpr::new().with_term(phi, 1.0);
                self.push_support(&mut link, i, i, -1.0);
                let frontier = LinearExpr::new().with_term(phi, 1.0).with_constant(1.0);
                let residual = LinearExpr {
                    terms: residual,
                    constant: 0.0,
                };
                vec![
                    Constraint::from_expr(ConstraintType::Equal, link, -1.0)
                        .with_name(format!("frontier[{}]", i)),
                    Constraint::log_linear(y, frontier, residual)
                        .with_log_shift(self.contextual_expr(i))
                        .with_name(format!("regression[{}]", i)),
                ]
            }
            _ => {
                // y_i = α_i + β_i·x_i + λ·z_i + ε_i
                let mut expr = self.contextual_expr(i);
                self.push_support(&mut expr, i, i, 1.0);
                for &(var, coeff) in &residual {
                    expr.push(var, coeff);
                }
                vec![Constraint::from_expr(ConstraintType::Equal, expr, y)
                    .with_name(format!("regression[{}]", i))]
            }
        }
    }
}

/// Afriat pairs allowed by the shape mode.
///
/// Isotonic fits keep only pairs where the first observation dominates the second, for any
/// number of inputs.
pub fn candidate_pairs(data: &Observations, config: &ModelConfig) -> ActivationMatrix {
    let n = data.len();
    match config.shape {
        ShapeMode::Isotonic => {
            let dominance = DominanceMatrix::from_inputs(data.x());
            ActivationMatrix::from_pairs(n, dominance.pairs())
        }
        ShapeMode::Concave | ShapeMode::WeaklyDisposable => ActivationMatrix::full(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintKind, ProblemClass};
    use crate::regression::config::{Direction, Orientation, ReturnsToScale};

    fn univariate() -> Observations {
        Observations::new(vec![2.0, 3.0, 5.0, 4.0, 6.0], vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
    }

    fn bivariate(n: usize) -> Observations {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![1.0 + i as f64, 2.0 + (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        Observations::new(y, x).unwrap()
    }

    #[test]
    fn least_squares_counts_match_closed_form() {
        let (n, m) = (6, 2);
        let data = bivariate(n);
        let config = ModelConfig::default();
        let formulation = ProblemFormulator::new(&data, &config).unwrap().formulate(None).unwrap();
        assert_eq!(formulation.num_variables(), n * (m + 2));
        assert_eq!(formulation.counts.regression, n);
        assert_eq!(formulation.counts.shape, n * (n - 1));
        assert_eq!(formulation.num_constraints(), n + n * (n - 1));
        assert_eq!(formulation.counts.total(), formulation.num_constraints());
        assert_eq!(formulation.problem.class(), ProblemClass::Quadratic);
    }

    #[test]
    fn activation_restricts_afriat_rows() {
        let data = univariate();
        let config = ModelConfig::default();
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        let active = ActivationMatrix::from_pairs(5, [(0, 1), (1, 0), (4, 3)]);
        let formulation = formulator.formulate(Some(&active)).unwrap();
        assert_eq!(formulation.counts.shape, 3);

        let wrong = ActivationMatrix::empty(4);
        assert!(matches!(formulator.formulate(Some(&wrong)), Err(FrontierError::Shape(_))));
    }

    #[test]
    fn afriat_row_compares_supports_at_first_point() {
        let data = univariate();
        let config = ModelConfig::default();
        let formulation = ProblemFormulator::new(&data, &config)
            .unwrap()
            .formulate(Some(&ActivationMatrix::from_pairs(5, [(1, 3)])))
            .unwrap();
        let row = formulation
            .problem
            .constraints
            .iter()
            .find(|c| c.name == "afriat[1][3]")
            .unwrap();
        match &row.kind {
            ConstraintKind::Linear {
                terms,
                constraint_type,
                bound,
            } => {
                // α_1 + 2β_1 - α_3 - 2β_3 <= 0
                assert_eq!(*constraint_type, ConstraintType::LessThanOrEqual);
                assert_eq!(*bound, 0.0);
                assert_eq!(terms, &vec![(1, 1.0), (6, 2.0), (3, -1.0), (8, -2.0)]);
            }
            other => panic!("unexpected row {:?}", other),
        }
    }

    #[test]
    fn cost_orientation_flips_afriat_relation() {
        let data = univariate();
        let config = ModelConfig::new().with_orientation(Orientation::Cost);
        let formulation = ProblemFormulator::new(&data, &config).unwrap().formulate(None).unwrap();
        let afriat = formulation
            .problem
            .constraints
            .iter()
            .filter(|c| c.name.starts_with("afriat"))
            .all(|c| matches!(c.kind, ConstraintKind::Linear { constraint_type: ConstraintType::GreaterThanOrEqual, .. }));
        assert!(afriat);
    }

    #[test]
    fn quantile_loss_is_linear_and_split() {
        let data = univariate();
        let config = ModelConfig::new().with_loss(Loss::Quantile(0.25));
        let formulation = ProblemFormulator::new(&data, &config).unwrap().formulate(None).unwrap();
        assert_eq!(formulation.num_variables(), 5 * 4);
        assert_eq!(formulation.problem.class(), ProblemClass::Linear);
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        assert_eq!(formulator.problem_class(), ProblemClass::Linear);
        assert!(!formulator.has_log_rows());
        let objective = &formulation.problem.objective;
        assert_eq!(objective.coefficients[10], 0.25);
        assert_eq!(objective.coefficients[15], 0.75);
    }

    #[test]
    fn isotonic_univariate_uses_dominance() {
        let data = Observations::new(vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 3.0]).unwrap();
        let config = ModelConfig::new().with_shape(ShapeMode::Isotonic);
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        // ties dominate each other, row 2 dominates both
        let pairs: Vec<_> = formulator.candidates().pairs().collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0), (2, 0), (2, 1)]);
        assert_eq!(formulator.formulate(None).unwrap().counts.shape, 4);
    }

    #[test]
    fn isotonic_pairs_ignore_a_constant_extra_input() {
        let single = Observations::new(vec![1.0, 1.0, 5.0], vec![1.0, 2.0, 3.0]).unwrap();
        let padded = Observations::new(
            vec![1.0, 1.0, 5.0],
            vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![3.0, 1.0]],
        )
        .unwrap();
        let config = ModelConfig::new().with_shape(ShapeMode::Isotonic);
        let a: Vec<_> = candidate_pairs(&single, &config).pairs().collect();
        let b: Vec<_> = candidate_pairs(&padded, &config).pairs().collect();
        assert_eq!(a, b);
        assert_eq!(a, vec![(1, 0), (2, 0), (2, 1)]);
    }

    #[test]
    fn isotonic_multivariate_uses_dominance() {
        let data = Observations::new(
            vec![1.0, 2.0, 3.0],
            vec![vec![1.0, 1.0], vec![2.0, 0.5], vec![3.0, 2.0]],
        )
        .unwrap();
        let config = ModelConfig::new().with_shape(ShapeMode::Isotonic);
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        let pairs: Vec<_> = formulator.candidates().pairs().collect();
        assert_eq!(pairs, vec![(2, 0), (2, 1)]);
    }

    #[test]
    fn multiplicative_form_emits_links_and_log_rows() {
        let data = univariate().with_contextual(vec![0.1, 0.2, 0.3, 0.4, 0.5]).unwrap();
        let config = ModelConfig::new().with_error_form(ErrorForm::Multiplicative);
        let formulation = ProblemFormulator::new(&data, &config).unwrap().formulate(None).unwrap();
        // α, β, φ, λ, ε
        assert_eq!(formulation.num_variables(), 5 * 4 + 1);
        assert_eq!(formulation.counts.frontier_links, 5);
        assert!(formulation.problem.has_log_rows());
        assert!(ProblemFormulator::new(&data, &config).unwrap().has_log_rows());
        assert_eq!(formulation.num_constraints(), 5 + 5 + 20);
    }

    #[test]
    fn directional_with_weak_disposability() {
        let n = 4;
        let data = bivariate(n).with_undesirable(vec![1.0, 2.0, 1.5, 0.5]).unwrap();
        let config = ModelConfig::new()
            .with_shape(ShapeMode::WeaklyDisposable)
            .with_direction(Direction::new(vec![0.0, 0.0], vec![1.0]).with_undesirable(vec![-1.0]));
        let formulation = ProblemFormulator::new(&data, &config).unwrap().formulate(None).unwrap();
        // α, β (2), γ, δ, ε
        assert_eq!(formulation.num_variables(), n * 6);
        let counts = formulation.counts;
        assert_eq!(counts.translation, n);
        assert_eq!(counts.shape, n * (n - 1));
        assert_eq!(counts.disposability, n * (n - 1));
        assert_eq!(formulation.num_constraints(), 2 * n + 2 * n * (n - 1));
    }

    #[test]
    fn lipschitz_penalty_adds_cone_rows() {
        let data = bivariate(3);
        let config = ModelConfig::new().with_penalty(Penalty::Lipschitz(2.0));
        let formulation = ProblemFormulator::new(&data, &config).unwrap().formulate(None).unwrap();
        assert_eq!(formulation.counts.lipschitz, 3);
        assert_eq!(formulation.problem.class(), ProblemClass::SecondOrderCone);
    }

    #[test]
    fn invalid_configuration_fails_before_formulation() {
        let data = univariate();
        let config = ModelConfig::new().with_returns_to_scale(ReturnsToScale::Constant);
        assert!(matches!(
            ProblemFormulator::new(&data, &config),
            Err(FrontierError::Configuration(_))
        ));
    }
}
