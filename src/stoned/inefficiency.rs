// Conditional inefficiency and frontier reconstruction

use crate::domain::{FrontierError, Result};
use crate::regression::config::{ErrorForm, Orientation};
use crate::stats::{inverse_mills, normal_cdf, normal_pdf};
use ndarray::{Array1, ArrayView1, Zip};

/// Jondrow-type conditional mean `E[u | ε*]` for each adjusted residual.
///
/// With `σ* = σ_u σ_v / √(σ_u² + σ_v²)` and `z = ε* σ_u / (σ_v √(σ_u² + σ_v²))`:
/// production `σ* (φ(z)/(1 - Φ(z)) - z)`, cost `σ* (φ(z)/Φ(z) + z)`.
pub fn conditional_inefficiency(
    adjusted: ArrayView1<'_, f64>,
    sigma_u: f64,
    sigma_v: f64,
    orientation: Orientation,
) -> Result<Array1<f64>> {
    if sigma_u == 0.0 {
        return Ok(Array1::zeros(adjusted.len()));
    }
    if sigma_v == 0.0 {
        return Err(FrontierError::NumericalDegeneracy(
            "sigma_v is 0 while sigma_u is positive, the conditional mean is undefined".to_string(),
        ));
    }

    let total = (sigma_u * sigma_u + sigma_v * sigma_v).sqrt();
    let sigma_star = sigma_u * sigma_v / total;
    let ratio = sigma_u / (sigma_v * total);
    let inefficiency = adjusted.mapv(|e| {
        let z = e * ratio;
        match orientation {
            Orientation::Production => sigma_star * (inverse_mills(z) - z),
            Orientation::Cost => {
                let cdf = normal_cdf(z);
                // φ(z)/Φ(z) = inverse Mills ratio at -z
                if cdf > 1e-300 {
                    sigma_star * (normal_pdf(z) / cdf + z)
                } else {
                    sigma_star * (inverse_mills(-z) + z)
                }
            }
        }
    });
    Ok(inefficiency)
}

/// Technical efficiency scores.
///
/// Additive: `(y - E[u])/y` for production, `(y + E[u])/y` for cost.
/// Multiplicative: `exp(-E[u])` for production, `exp(E[u])` for cost.
pub fn technical_efficiency(
    y: ArrayView1<'_, f64>,
    inefficiency: ArrayView1<'_, f64>,
    orientation: Orientation,
    error_form: ErrorForm,
) -> Array1<f64> {
    let sign = match orientation {
        Orientation::Production => -1.0,
        Orientation::Cost => 1.0,
    };
    match error_form {
        ErrorForm::Additive => Zip::from(&y)
            .and(&inefficiency)
            .map_collect(|&y, &u| (y + sign * u) / y),
        ErrorForm::Multiplicative => inefficiency.mapv(|u| (sign * u).exp()),
    }
}

/// Frontier at the observations shifted by μ.
///
/// Additive: `y - ε + μ` (production) or `y - ε - μ` (cost).
/// Multiplicative: `y / exp(ε) · exp(±μ)`.
pub fn shifted_frontier(
    y: ArrayView1<'_, f64>,
    residuals: ArrayView1<'_, f64>,
    mu: f64,
    orientation: Orientation,
    error_form: ErrorForm,
) -> Array1<f64> {
    let shift = match orientation {
        Orientation::Production => mu,
        Orientation::Cost => -mu,
    };
    match error_form {
        ErrorForm::Additive => Zip::from(&y)
            .and(&residuals)
            .map_collect(|&y, &e| y - e + shift),
        ErrorForm::Multiplicative => Zip::from(&y)
            .and(&residuals)
            .map_collect(|&y, &e| y / e.exp() * shift.exp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn no_inefficiency_component_gives_zero() {
        let u = conditional_inefficiency(array![0.3, -0.2].view(), 0.0, 0.4, Orientation::Production)
            .unwrap();
        assert_eq!(u, array![0.0, 0.0]);
    }

    #[test]
    fn missing_noise_is_degenerate() {
        let err = conditional_inefficiency(array![0.3].view(), 0.5, 0.0, Orientation::Cost).unwrap_err();
        assert!(matches!(err, FrontierError::NumericalDegeneracy(_)));
    }

    #[test]
    fn inefficiency_is_positive_and_monotone() {
        let eps = array![-1.0, -0.2, 0.0, 0.5];
        let u = conditional_inefficiency(eps.view(), 0.6, 0.3, Orientation::Production).unwrap();
        assert!(u.iter().all(|&v| v > 0.0));
        // more negative residuals mean more inefficiency
        assert!(u.windows(2).into_iter().all(|w| w[0] > w[1]));

        let mirrored = conditional_inefficiency((-&eps).view(), 0.6, 0.3, Orientation::Cost).unwrap();
        for (a, b) in u.iter().zip(mirrored.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn extreme_residuals_stay_finite() {
        let u = conditional_inefficiency(array![-60.0, 60.0].view(), 1.0, 0.05, Orientation::Production)
            .unwrap();
        assert!(u.iter().all(|v| v.is_finite()));
        let c = conditional_inefficiency(array![-60.0, 60.0].view(), 1.0, 0.05, Orientation::Cost).unwrap();
        assert!(c.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn efficiency_and_frontier_by_error_form() {
        let y = array![2.0, 4.0];
        let u = array![0.5, 1.0];
        let te = technical_efficiency(y.view(), u.view(), Orientation::Production, ErrorForm::Additive);
        assert_eq!(te, array![0.75, 0.75]);
        let te = technical_efficiency(y.view(), u.view(), Orientation::Cost, ErrorForm::Multiplicative);
        assert_relative_eq!(te[1], 1.0_f64.exp());

        let eps = array![0.5, -1.0];
        let f = shifted_frontier(y.view(), eps.view(), 0.25, Orientation::Production, ErrorForm::Additive);
        assert_eq!(f, array![1.75, 5.25]);
        let f = shifted_frontier(y.view(), eps.view(), 0.25, Orientation::Cost, ErrorForm::Multiplicative);
        assert_relative_eq!(f[0], 2.0 / 0.5_f64.exp() * (-0.25_f64).exp());
    }
}
