// Fitted shape-constrained regression read back from a solver solution

use crate::domain::{FrontierError, Result, Solution, SolverError, SolverStatistics};
use crate::regression::activation::ActivationMatrix;
use crate::regression::config::{ErrorForm, ModelConfig, Orientation};
use crate::regression::data::{IntoTable, Observations};
use crate::regression::formulation::ProblemFormulator;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Per-observation coefficients and residuals of a solved formulation
#[derive(Debug, Clone)]
pub struct Fit {
    config: ModelConfig,
    data: Observations,
    alpha: Array1<f64>,
    beta: Array2<f64>,
    gamma: Array2<f64>,
    delta: Array2<f64>,
    lambda: Array1<f64>,
    residual: Array1<f64>,
    objective: f64,
    statistics: SolverStatistics,
    shape_pairs: ActivationMatrix,
}

impl Fit {
    /// Map a solution vector back onto the formulator's variable layout
    pub fn from_solution(formulator: &ProblemFormulator<'_>, solution: &Solution) -> Result<Self> {
        let layout = formulator.layout();
        let values = &solution.variable_values;
        if values.len() != layout.num_variables() {
            return Err(FrontierError::Solver(SolverError::ExecutionFailed(format!(
                "solution has {} values, the formulation has {} variables",
                values.len(),
                layout.num_variables()
            ))));
        }

        let n = layout.num_observations();
        let alpha = Array1::from_shape_fn(n, |i| layout.alpha(i).map_or(0.0, |v| values[v]));
        let beta = Array2::from_shape_fn((n, layout.num_inputs()), |(i, j)| values[layout.beta(i, j)]);
        let gamma = Array2::from_shape_fn((n, layout.num_gamma()), |(i, j)| {
            layout.gamma(i, j).map_or(0.0, |v| values[v])
        });
        let delta = Array2::from_shape_fn((n, layout.num_delta()), |(i, j)| {
            layout.delta(i, j).map_or(0.0, |v| values[v])
        });
        let lambda = Array1::from_shape_fn(layout.num_contextual(), |j| values[layout.lambda(j)]);
        let residual = Array1::from_shape_fn(n, |i| {
            layout
                .residual_terms(i)
                .iter()
                .map(|&(var, sign)| sign * values[var])
                .sum()
        });

        Ok(Self {
            config: formulator.config().clone(),
            data: formulator.data().clone(),
            alpha,
            beta,
            gamma,
            delta,
            lambda,
            residual,
            objective: solution.optimal_value.unwrap_or(f64::NAN),
            statistics: solution.statistics.clone(),
            shape_pairs: formulator.candidates().clone(),
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn observations(&self) -> &Observations {
        &self.data
    }

    /// Intercepts; all zero under constant returns to scale
    pub fn alpha(&self) -> &Array1<f64> {
        &self.alpha
    }

    /// Slopes, n × m
    pub fn beta(&self) -> &Array2<f64> {
        &self.beta
    }

    /// Desirable-output multipliers, n × p (empty on the regression form)
    pub fn gamma(&self) -> &Array2<f64> {
        &self.gamma
    }

    /// Undesirable-output multipliers, n × q
    pub fn delta(&self) -> &Array2<f64> {
        &self.delta
    }

    /// Contextual coefficients, k entries
    pub fn lambda(&self) -> &Array1<f64> {
        &self.lambda
    }

    /// Solver residuals (`ε⁺ - ε⁻` for split losses)
    pub fn residuals(&self) -> &Array1<f64> {
        &self.residual
    }

    /// Residuals oriented as "observed minus frontier".
    ///
    /// The directional residual is a distance to the frontier, positive inside the
    /// technology, so its sign is flipped.
    pub fn composite_residuals(&self) -> Array1<f64> {
        if self.config.is_directional() {
            -&self.residual
        } else {
            self.residual.clone()
        }
    }

    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    /// `s(owner, at) = α_owner + β_owner·x_at - δ_owner·b_at - γ_owner·y_at`
    pub fn support(&self, owner: usize, at: usize) -> f64 {
        let mut value = self.alpha[owner] + self.beta.row(owner).dot(&self.data.x().row(at));
        if self.gamma.ncols() > 0 {
            value -= self.gamma.row(owner).dot(&self.data.y().row(at));
        }
        if let Some(b) = self.data.b() {
            if self.delta.ncols() > 0 {
                value -= self.delta.row(owner).dot(&b.row(at));
            }
        }
        value
    }

    /// Signed Afriat gap of pair `(i, h)`; positive means the inequality is violated
    pub fn violation_score(&self, i: usize, h: usize) -> f64 {
        self.config.orientation.sign() * (self.support(i, i) - self.support(h, i))
    }

    /// Largest score of row i over its candidate pairs, with every h attaining it
    pub fn worst_violation(&self, i: usize) -> Option<(f64, Vec<usize>)> {
        let own = self.support(i, i);
        let sign = self.config.orientation.sign();
        let mut best = f64::NEG_INFINITY;
        let mut worst = Vec::new();
        for &h in self.shape_pairs.row(i) {
            let score = sign * (own - self.support(h, i));
            if score > best {
                best = score;
                worst.clear();
                worst.push(h);
            } else if score == best {
                worst.push(h);
            }
        }
        (!worst.is_empty()).then_some((best, worst))
    }

    /// Candidate pairs whose score exceeds `tolerance`
    pub fn afriat_violations(&self, tolerance: f64) -> Vec<(usize, usize, f64)> {
        self.shape_pairs
            .pairs()
            .map(|(i, h)| (i, h, self.violation_score(i, h)))
            .filter(|&(_, _, score)| score > tolerance)
            .collect()
    }

    /// Largest Afriat score over the candidate pairs, 0 when every pair holds
    pub fn max_afriat_violation(&self) -> f64 {
        self.shape_pairs
            .pairs()
            .map(|(i, h)| self.violation_score(i, h))
            .fold(0.0, f64::max)
    }

    /// Frontier value of the first output at each observation.
    ///
    /// Additive: `y - ε`; multiplicative: `y / exp(ε)`; directional: `y₁ + ε·gy₁`. Use
    /// [`Fit::fitted_outputs`] for every output of a directional fit.
    pub fn fitted(&self) -> Array1<f64> {
        if self.config.is_directional() {
            return self.fitted_outputs().column(0).to_owned();
        }
        let y = self.data.output();
        match self.config.error_form {
            ErrorForm::Additive => &y - &self.residual,
            ErrorForm::Multiplicative => &y / &self.residual.mapv(f64::exp),
        }
    }

    /// Frontier projection of every output, n × p.
    ///
    /// Directional: `y_ij + ε_i·gy_j`, so outputs with a zero direction stay where they are.
    /// The regression form has a single output and returns [`Fit::fitted`] as one column.
    pub fn fitted_outputs(&self) -> Array2<f64> {
        match self.config.direction() {
            Some(direction) => {
                let y = self.data.y();
                Array2::from_shape_fn(y.dim(), |(i, j)| {
                    y[[i, j]] + self.residual[i] * direction.gy.get(j).copied().unwrap_or(0.0)
                })
            }
            None => self.fitted().insert_axis(Axis(1)),
        }
    }

    /// Frontier at new input points, as the lower (production) or upper (cost) envelope
    /// of the fitted hyperplanes. Contextual effects are not included.
    pub fn predict(&self, x: impl IntoTable) -> Result<Array1<f64>> {
        if self.config.is_directional() {
            return Err(FrontierError::Configuration(
                "prediction is only defined for the regression form".to_string(),
            ));
        }
        let x = x.into_table("x")?;
        if x.ncols() != self.beta.ncols() {
            return Err(FrontierError::Shape(format!(
                "x has {} columns, the fit has {} inputs",
                x.ncols(),
                self.beta.ncols()
            )));
        }
        Ok(x.axis_iter(Axis(0)).map(|point| self.envelope(point)).collect())
    }

    fn envelope(&self, point: ArrayView1<'_, f64>) -> f64 {
        let planes = self
            .alpha
            .iter()
            .zip(self.beta.axis_iter(Axis(0)))
            .map(|(a, b)| a + b.dot(&point));
        match self.config.orientation {
            Orientation::Production => planes.fold(f64::INFINITY, f64::min),
            Orientation::Cost => planes.fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::config::Loss;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn observations() -> Observations {
        Observations::new(vec![2.1, 2.8, 3.6], vec![1.0, 2.0, 3.0]).unwrap()
    }

    // α = [0, 1, α2], β = [2, 1, 0.5], ε = [0.1, -0.2, 0.1]
    fn fit_with(config: &ModelConfig, alpha2: f64) -> Fit {
        let data = observations();
        let formulator = ProblemFormulator::new(&data, config).unwrap();
        let values = vec![0.0, 1.0, alpha2, 2.0, 1.0, 0.5, 0.1, -0.2, 0.1];
        Fit::from_solution(&formulator, &Solution::optimal(0.06, values)).unwrap()
    }

    #[test]
    fn reads_coefficients_back() {
        let fit = fit_with(&ModelConfig::default(), 2.0);
        assert_eq!(fit.alpha(), &array![0.0, 1.0, 2.0]);
        assert_eq!(fit.beta().column(0).to_vec(), vec![2.0, 1.0, 0.5]);
        assert_eq!(fit.lambda().len(), 0);
        assert_relative_eq!(fit.fitted()[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(fit.objective_value(), 0.06);
    }

    #[test]
    fn concave_envelope_has_no_violation() {
        let fit = fit_with(&ModelConfig::default(), 2.0);
        assert_eq!(fit.max_afriat_violation(), 0.0);
        assert_eq!(fit.worst_violation(0), Some((0.0, vec![1])));
        assert_eq!(fit.worst_violation(2), Some((-0.5, vec![1])));
        assert_eq!(fit.predict(vec![0.0, 2.0]).unwrap(), array![0.0, 3.0]);
    }

    #[test]
    fn lifted_plane_violates_at_its_own_point() {
        let fit = fit_with(&ModelConfig::default(), 3.0);
        assert_eq!(fit.afriat_violations(1e-4), vec![(2, 1, 0.5)]);
        assert_eq!(fit.worst_violation(2), Some((0.5, vec![1])));
    }

    #[test]
    fn cost_orientation_flips_scores() {
        let config = ModelConfig::new().with_orientation(Orientation::Cost);
        let fit = fit_with(&config, 2.0);
        assert_eq!(fit.worst_violation(2), Some((2.5, vec![0])));
        // upper envelope
        assert_eq!(fit.predict(vec![2.0]).unwrap(), array![4.0]);
    }

    #[test]
    fn split_residuals_are_recombined() {
        let data = observations();
        let config = ModelConfig::new().with_loss(Loss::Quantile(0.5));
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        let mut values = vec![0.0; 12];
        values[6] = 0.4; // ε⁺_0
        values[10] = 0.3; // ε⁻_1
        let fit = Fit::from_solution(&formulator, &Solution::optimal(0.35, values)).unwrap();
        assert_eq!(fit.residuals(), &array![0.4, -0.3, 0.0]);
    }

    #[test]
    fn directional_projection_covers_every_output() {
        use crate::regression::config::Direction;
        let data = Observations::new(
            vec![vec![2.0, 1.0], vec![3.0, 4.0], vec![5.0, 2.0]],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        let config = ModelConfig::new().with_direction(Direction::new(vec![0.0], vec![1.0, 0.5]));
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        let layout = formulator.layout();
        let mut values = vec![0.0; layout.num_variables()];
        for (i, e) in [0.2, 0.0, 0.4].into_iter().enumerate() {
            values[layout.epsilon(i)] = e;
        }
        let fit = Fit::from_solution(&formulator, &Solution::optimal(0.2, values)).unwrap();

        let outputs = fit.fitted_outputs();
        assert_eq!(outputs.dim(), (3, 2));
        assert_eq!(outputs, array![[2.2, 1.1], [3.0, 4.0], [5.4, 2.2]]);
        assert_eq!(fit.fitted(), outputs.column(0));
    }

    #[test]
    fn regression_form_has_one_output_column() {
        let fit = fit_with(&ModelConfig::default(), 2.0);
        let outputs = fit.fitted_outputs();
        assert_eq!(outputs.ncols(), 1);
        assert_eq!(outputs.column(0), fit.fitted());
    }

    #[test]
    fn rejects_short_solution_vector() {
        let data = observations();
        let config = ModelConfig::default();
        let formulator = ProblemFormulator::new(&data, &config).unwrap();
        let err = Fit::from_solution(&formulator, &Solution::optimal(0.0, vec![0.0; 4])).unwrap_err();
        assert!(matches!(err, FrontierError::Solver(_)));
    }
}
