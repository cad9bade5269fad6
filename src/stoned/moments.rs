// Method-of-moments split of the composite error

use crate::domain::Result;
use crate::regression::config::Orientation;
use crate::stats::central_moment;
use crate::stoned::VarianceComponents;
use std::f64::consts::PI;

/// Third-moment floor used when a cost residual is skewed the wrong way
pub const COST_THIRD_MOMENT_FLOOR: f64 = 1e-5;

/// `σ_v = √(M2 - ((π - 2)/π) σ_u²)`, clamped to 0 when the inefficiency part exceeds M2
pub(crate) fn noise_from_second_moment(m2: f64, sigma_u: f64) -> f64 {
    let variance = m2 - ((PI - 2.0) / PI) * sigma_u * sigma_u;
    if variance < 0.0 {
        log::warn!(
            "noise variance {:.3e} is negative, clamping sigma_v to 0",
            variance
        );
        0.0
    } else {
        variance.sqrt()
    }
}

/// Estimate σ_u and σ_v from the second and third central moments.
///
/// A production residual should be skewed left; a positive third moment is clamped to 0,
/// which yields σ_u = 0. A cost residual should be skewed right; a negative third moment is
/// replaced by [`COST_THIRD_MOMENT_FLOOR`]. The two clamps are not symmetric.
pub fn method_of_moments(residuals: &[f64], orientation: Orientation) -> Result<VarianceComponents> {
    let m2 = central_moment(residuals, 2);
    let mut m3 = central_moment(residuals, 3);

    let scale = (2.0 / PI).sqrt() * (1.0 - 4.0 / PI);
    let sigma_u = match orientation {
        Orientation::Production => {
            if m3 > 0.0 {
                log::warn!(
                    "third moment {:.3e} is positive for a production frontier, clamping to 0",
                    m3
                );
                m3 = 0.0;
            }
            (m3 / scale).cbrt()
        }
        Orientation::Cost => {
            if m3 < 0.0 {
                log::warn!(
                    "third moment {:.3e} is negative for a cost frontier, clamping to {:e}",
                    m3,
                    COST_THIRD_MOMENT_FLOOR
                );
                m3 = COST_THIRD_MOMENT_FLOOR;
            }
            (-m3 / scale).cbrt()
        }
    };

    let sigma_v = noise_from_second_moment(m2, sigma_u);
    Ok(VarianceComponents::from_sigma_u(sigma_u, sigma_v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn symmetric_residuals_have_no_inefficiency() {
        let eps = [-1.0, -0.5, 0.0, 0.5, 1.0];
        let c = method_of_moments(&eps, Orientation::Production).unwrap();
        assert_eq!(c.sigma_u, 0.0);
        assert_eq!(c.mu, 0.0);
        assert_relative_eq!(c.sigma_v, 0.5_f64.sqrt());
    }

    #[test]
    fn left_skew_gives_production_inefficiency() {
        let eps = [0.3, 0.2, 0.25, 0.1, -0.9];
        let c = method_of_moments(&eps, Orientation::Production).unwrap();
        assert!(c.sigma_u > 0.0);
        assert_relative_eq!(c.mu, c.sigma_u * (2.0 / PI).sqrt());

        // the same skew is out of sign for a cost frontier and hits the floor
        let cost = method_of_moments(&eps, Orientation::Cost).unwrap();
        let floor = (-COST_THIRD_MOMENT_FLOOR / ((2.0 / PI).sqrt() * (1.0 - 4.0 / PI))).cbrt();
        assert_relative_eq!(cost.sigma_u, floor);
    }

    #[test]
    fn mirrored_residuals_swap_orientation() {
        let eps = [0.3, 0.2, 0.25, 0.1, -0.9];
        let mirrored: Vec<f64> = eps.iter().map(|e| -e).collect();
        let prod = method_of_moments(&eps, Orientation::Production).unwrap();
        let cost = method_of_moments(&mirrored, Orientation::Cost).unwrap();
        assert_relative_eq!(prod.sigma_u, cost.sigma_u, epsilon = 1e-12);
        assert_relative_eq!(prod.sigma_v, cost.sigma_v, epsilon = 1e-12);
    }
}
