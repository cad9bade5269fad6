// Kernel deconvolution estimate of the expected inefficiency

use crate::domain::{FrontierError, Result};
use crate::regression::config::Orientation;
use crate::stats::{central_moment, normal_pdf, percentile_sorted, sample_std};
use crate::stoned::moments::noise_from_second_moment;
use crate::stoned::VarianceComponents;

/// Silverman's rule of thumb, `1.06 · min(s, IQR/1.349) · n^(-1/5)`.
///
/// `s` is the sample standard deviation. When one spread measure is zero the other is
/// used; both zero is degenerate.
pub fn silverman_bandwidth(residuals: &[f64]) -> Result<f64> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(f64::total_cmp);
    bandwidth_sorted(&sorted)
}

fn bandwidth_sorted(sorted: &[f64]) -> Result<f64> {
    let n = sorted.len();
    let std = sample_std(sorted);
    let iqr = (percentile_sorted(sorted, 75.0) - percentile_sorted(sorted, 25.0)) / 1.349;
    let spread = match (std > 0.0, iqr > 0.0) {
        (true, true) => std.min(iqr),
        (true, false) => std,
        (false, true) => iqr,
        (false, false) => {
            return Err(FrontierError::NumericalDegeneracy(format!(
                "residuals have zero spread (n = {}), kernel bandwidth is undefined",
                n
            )))
        }
    };
    Ok(1.06 * spread * (n as f64).powf(-1.0 / 5.0))
}

/// Gaussian kernel density of `sample` at `at`
pub fn kernel_density(sample: &[f64], bandwidth: f64, at: f64) -> f64 {
    let n = sample.len() as f64;
    sample
        .iter()
        .map(|e| normal_pdf((at - e) / bandwidth))
        .sum::<f64>()
        / (n * bandwidth)
}

/// Forward-difference derivative of the density over sorted points, located at the
/// interval midpoints; zero-width intervals are skipped.
pub fn density_derivative(sorted: &[f64], bandwidth: f64) -> Vec<(f64, f64)> {
    let density: Vec<f64> = sorted
        .iter()
        .map(|&e| kernel_density(sorted, bandwidth, e))
        .collect();
    sorted
        .windows(2)
        .zip(density.windows(2))
        .filter(|(e, _)| e[1] > e[0])
        .map(|(e, f)| (0.5 * (e[0] + e[1]), (f[1] - f[0]) / (e[1] - e[0])))
        .collect()
}

/// Read μ off the steepest edge of the residual density.
///
/// A production residual falls off fastest at the frontier, so μ is the point of the most
/// negative slope; a cost residual rises fastest there and μ is the negated point of the
/// most positive slope. A negative μ is clamped to 0.
pub fn kernel_deconvolution(residuals: &[f64], orientation: Orientation) -> Result<VarianceComponents> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let bandwidth = bandwidth_sorted(&sorted)?;

    let derivative = density_derivative(&sorted, bandwidth);
    let sign = match orientation {
        Orientation::Production => -1.0,
        Orientation::Cost => 1.0,
    };
    let (location, _) = derivative
        .iter()
        .map(|&(at, slope)| (at, sign * slope))
        .fold((f64::NAN, f64::NEG_INFINITY), |best, current| {
            if current.1 > best.1 {
                current
            } else {
                best
            }
        });
    if location.is_nan() {
        return Err(FrontierError::NumericalDegeneracy(
            "density derivative has no finite point".to_string(),
        ));
    }

    let mut mu = match orientation {
        Orientation::Production => location,
        Orientation::Cost => -location,
    };
    if mu < 0.0 {
        log::warn!("kernel estimate of mu = {:.4e} is negative, clamping to 0", mu);
        mu = 0.0;
    }
    log::debug!("kernel deconvolution: bandwidth {:.4e}, mu {:.4e}", bandwidth, mu);

    let sigma_u = mu * (std::f64::consts::PI / 2.0).sqrt();
    let sigma_v = noise_from_second_moment(central_moment(&sorted, 2), sigma_u);
    Ok(VarianceComponents {
        sigma_u,
        sigma_v,
        mu,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bandwidth_matches_rule_of_thumb_exactly() {
        let eps = [-1.0, -0.5, 0.0, 0.5, 1.0];
        let std = (2.5_f64 / 4.0).sqrt();
        let iqr = (0.5 - -0.5) / 1.349;
        let expected = 1.06 * std.min(iqr) * 5f64.powf(-1.0 / 5.0);
        assert_eq!(silverman_bandwidth(&eps).unwrap(), expected);
    }

    #[test]
    fn bandwidth_is_order_independent() {
        let a = silverman_bandwidth(&[3.0, -1.0, 0.25, 2.0]).unwrap();
        let b = silverman_bandwidth(&[-1.0, 0.25, 2.0, 3.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_spread_is_degenerate() {
        assert!(matches!(
            silverman_bandwidth(&[0.2; 6]),
            Err(FrontierError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn density_integrates_to_one() {
        let sample = [-0.3, 0.1, 0.4];
        let h = 0.2;
        let step = 0.001;
        let total: f64 = (0..4000)
            .map(|k| kernel_density(&sample, h, -2.0 + k as f64 * step) * step)
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn duplicate_points_are_skipped() {
        let derivative = density_derivative(&[0.0, 0.0, 1.0], 0.5);
        assert_eq!(derivative.len(), 1);
        assert_eq!(derivative[0].0, 0.5);
    }

    #[test]
    fn cost_estimate_mirrors_production() {
        let eps = [0.4, 0.3, 0.35, 0.2, -1.25, 0.1, 0.3, -0.4, 0.25, 0.15];
        let mirrored: Vec<f64> = eps.iter().map(|e| -e).collect();
        let prod = kernel_deconvolution(&eps, Orientation::Production).unwrap();
        let cost = kernel_deconvolution(&mirrored, Orientation::Cost).unwrap();
        assert_relative_eq!(prod.mu, cost.mu, epsilon = 1e-12);
        assert!(prod.mu > 0.0);
    }
}
