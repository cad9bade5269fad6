// Small numeric helpers shared by the pruner and the residual decomposer

use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

pub fn normal_pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal cdf through `erfc`, accurate in both tails
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// `ln Φ(x)`, switching to the asymptotic expansion once Φ underflows
pub fn ln_normal_cdf(x: f64) -> f64 {
    let p = normal_cdf(x);
    if p > 0.0 {
        p.ln()
    } else {
        // Φ(x) ~ φ(x)/(-x) for x → -∞
        -0.5 * x * x - (-x).ln() - 0.5 * (2.0 * PI).ln()
    }
}

/// Inverse Mills ratio `φ(z) / (1 - Φ(z))`
pub fn inverse_mills(z: f64) -> f64 {
    let tail = normal_cdf(-z);
    if tail > 1e-300 {
        normal_pdf(z) / tail
    } else {
        // leading terms of the asymptotic series for large z
        z + 1.0 / z
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// `k`-th central moment (population normalisation)
pub fn central_moment(values: &[f64], k: i32) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(k)).sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Percentile `q ∈ [0, 100]` of already sorted values, linear interpolation between order statistics
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let position = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + weight * (sorted[upper] - sorted[lower])
    }
}

/// Percentile of unsorted values; NaNs must be filtered out by the caller
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cdf_matches_known_values() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(normal_cdf(1.959_963_984_540_054), 0.975, epsilon = 1e-12);
        assert_relative_eq!(normal_cdf(-1.0) + normal_cdf(1.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn ln_cdf_is_finite_deep_in_the_tail() {
        let v = ln_normal_cdf(-60.0);
        assert!(v.is_finite());
        assert!(v < -1700.0);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(percentile(&v, 50.0), 2.5);
        assert_relative_eq!(percentile(&v, 0.0), 1.0);
        assert_relative_eq!(percentile(&v, 100.0), 4.0);
        assert_relative_eq!(percentile(&v, 3.0), 1.09, epsilon = 1e-12);
    }

    #[test]
    fn moments_of_symmetric_sample() {
        let v = [-1.0, -0.5, 0.0, 0.5, 1.0];
        assert_relative_eq!(central_moment(&v, 2), 0.5);
        assert_relative_eq!(central_moment(&v, 3), 0.0);
        assert_relative_eq!(sample_std(&v), (2.5_f64 / 4.0).sqrt());
    }
}
