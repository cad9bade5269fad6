// Quasi-maximum-likelihood estimate of the signal-to-noise ratio λ = σ_u/σ_v

use crate::domain::{FrontierError, Result};
use crate::regression::config::Orientation;
use crate::stats::ln_normal_cdf;
use crate::stoned::VarianceComponents;
use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::neldermead::NelderMead;
use std::f64::consts::PI;

const MAX_ITERATIONS: u64 = 1000;

/// σ and μ implied by λ for residuals with mean square `mean_square`
fn sigma_and_mu(mean_square: f64, lambda: f64) -> (f64, f64) {
    let l2 = lambda * lambda;
    let sigma = (mean_square / (1.0 - 2.0 * l2 / (PI * (1.0 + l2)))).sqrt();
    let mu = (2.0 / PI).sqrt() * sigma * lambda / (1.0 + l2).sqrt();
    (sigma, mu)
}

/// Concentrated negative log-likelihood of the skew-normal composite error
struct QuasiLikelihood<'a> {
    residuals: &'a [f64],
    mean_square: f64,
}

impl<'a> QuasiLikelihood<'a> {
    fn new(residuals: &'a [f64]) -> Self {
        let mean_square = residuals.iter().map(|e| e * e).sum::<f64>() / residuals.len() as f64;
        Self {
            residuals,
            mean_square,
        }
    }

    fn negative_log_likelihood(&self, lambda: f64) -> f64 {
        let (sigma, mu) = sigma_and_mu(self.mean_square, lambda);
        let n = self.residuals.len() as f64;
        let mut tail = 0.0;
        let mut squares = 0.0;
        for e in self.residuals.iter().map(|e| e - mu) {
            tail += ln_normal_cdf(-e * lambda / sigma);
            squares += e * e;
        }
        n * sigma.ln() - tail + 0.5 * squares / (sigma * sigma)
    }
}

impl CostFunction for QuasiLikelihood<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.negative_log_likelihood(param[0]))
    }
}

/// Maximise the quasi-likelihood over λ with Nelder–Mead from λ = 1.
///
/// Cost residuals are negated first so both orientations share one likelihood.
/// A negative optimum means no inefficiency and is clamped to 0.
pub fn quasi_likelihood(residuals: &[f64], orientation: Orientation) -> Result<VarianceComponents> {
    let oriented: Vec<f64> = match orientation {
        Orientation::Production => residuals.to_vec(),
        Orientation::Cost => residuals.iter().map(|e| -e).collect(),
    };
    let problem = QuasiLikelihood::new(&oriented);
    if !(problem.mean_square > 0.0) {
        return Err(FrontierError::NumericalDegeneracy(
            "quasi-likelihood needs residuals with positive mean square".to_string(),
        ));
    }

    let solver = NelderMead::new(vec![vec![1.0], vec![1.5]])
        .with_sd_tolerance(1e-10)
        .map_err(optimisation_failed)?;
    let mut state = Executor::new(problem, solver)
        .configure(|state| state.max_iters(MAX_ITERATIONS))
        .run()
        .map_err(optimisation_failed)?
        .state()
        .clone();
    log::debug!(
        "quasi-likelihood finished after {} iterations, cost {:.6}",
        state.get_iter(),
        state.get_best_cost()
    );

    let mut lambda = state
        .take_best_param()
        .and_then(|p| p.first().copied())
        .ok_or_else(|| {
            FrontierError::NumericalDegeneracy("quasi-likelihood returned no parameter".to_string())
        })?;
    if lambda < 0.0 {
        log::warn!("quasi-likelihood optimum lambda = {:.4} is negative, clamping to 0", lambda);
        lambda = 0.0;
    }

    let mean_square = oriented.iter().map(|e| e * e).sum::<f64>() / oriented.len() as f64;
    let (sigma, _) = sigma_and_mu(mean_square, lambda);
    let sigma_v = sigma / (1.0 + lambda * lambda).sqrt();
    let sigma_u = sigma_v * lambda;
    Ok(VarianceComponents::from_sigma_u(sigma_u, sigma_v))
}

fn optimisation_failed(err: Error) -> FrontierError {
    FrontierError::NumericalDegeneracy(format!("quasi-likelihood optimisation failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_lambda_is_plain_gaussian() {
        let eps = [-1.0, 0.5, 0.5];
        let (sigma, mu) = sigma_and_mu(0.5, 0.0);
        assert_relative_eq!(sigma, 0.5_f64.sqrt());
        assert_eq!(mu, 0.0);
        let nll = QuasiLikelihood::new(&eps).negative_log_likelihood(0.0);
        let expected = 3.0 * sigma.ln() - 3.0 * 0.5_f64.ln() + 0.5 * 1.5 / 0.5;
        assert_relative_eq!(nll, expected, epsilon = 1e-12);
    }

    #[test]
    fn cost_orientation_mirrors_production() {
        let eps = [0.4, 0.3, 0.35, 0.2, -1.25, 0.1, 0.3, -0.4];
        let mirrored: Vec<f64> = eps.iter().map(|e| -e).collect();
        let prod = quasi_likelihood(&eps, Orientation::Production).unwrap();
        let cost = quasi_likelihood(&mirrored, Orientation::Cost).unwrap();
        assert_relative_eq!(prod.sigma_u, cost.sigma_u, epsilon = 1e-9);
        assert_relative_eq!(prod.sigma_v, cost.sigma_v, epsilon = 1e-9);
    }

    #[test]
    fn all_zero_residuals_are_degenerate() {
        assert!(matches!(
            quasi_likelihood(&[0.0, 0.0, 0.0], Orientation::Production),
            Err(FrontierError::NumericalDegeneracy(_))
        ));
    }
}
