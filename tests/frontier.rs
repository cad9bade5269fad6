#![cfg(feature = "clarabel")]

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use stoned::regression::formulation::candidate_pairs;
use stoned::regression::{Direction, DominanceMatrix, ProblemFormulator};
use stoned::{
    ErrorForm, FrontierEstimator, Loss, ModelConfig, Observations, Orientation, Penalty, Pruning,
    ReturnsToScale, ShapeMode,
};

fn small_sample() -> Observations {
    Observations::new(vec![2.0, 3.0, 5.0, 4.0, 6.0], vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
}

fn cobb_douglas(n: usize, seed: u64) -> Observations {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.1).unwrap();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let x1: f64 = rng.gen_range(1.0..10.0);
        let x2: f64 = rng.gen_range(1.0..10.0);
        y.push(x1.powf(0.4) * x2.powf(0.4) + noise.sample(&mut rng));
        x.push(vec![x1, x2]);
    }
    Observations::new(y, x).unwrap()
}

#[test]
fn concave_least_squares_on_five_points() {
    let data = small_sample();
    let estimate = FrontierEstimator::new(ModelConfig::default()).fit(&data).unwrap();
    let fit = &estimate.fit;

    assert!(estimate.activation.is_none());
    assert!(fit.max_afriat_violation() < 1e-6);
    assert_abs_diff_eq!(fit.residuals().sum(), 0.0, epsilon = 1e-6);

    // slopes of a concave fit are non-increasing in x
    let fitted = fit.fitted();
    let slopes: Vec<f64> = fitted.windows(2).into_iter().map(|w| w[1] - w[0]).collect();
    for pair in slopes.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-6, "slopes {:?}", slopes);
    }
    // the dip at x = 4 is smoothed out
    assert!(fitted[3] > 4.0);
    assert!(fitted[2] < 5.0);
}

#[test]
fn prediction_is_lower_envelope() {
    let data = small_sample();
    let fit = FrontierEstimator::new(ModelConfig::default()).fit(&data).unwrap().fit;
    let at_data = fit.predict(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    for (p, f) in at_data.iter().zip(fit.fitted().iter()) {
        assert_abs_diff_eq!(*p, *f, epsilon = 1e-5);
    }
    assert!(fit.predict(vec![vec![1.0, 2.0]]).is_err());
}

#[test]
fn cost_frontier_is_convex() {
    let data = small_sample();
    let config = ModelConfig::default().with_orientation(Orientation::Cost);
    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;
    assert!(fit.max_afriat_violation() < 1e-6);
    let fitted = fit.fitted();
    let slopes: Vec<f64> = fitted.windows(2).into_iter().map(|w| w[1] - w[0]).collect();
    for pair in slopes.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-6, "slopes {:?}", slopes);
    }
}

#[test]
fn cutting_plane_matches_full_formulation() {
    let data = cobb_douglas(12, 7);
    let exact = FrontierEstimator::new(ModelConfig::default()).fit(&data).unwrap();
    let refined = FrontierEstimator::new(ModelConfig::default())
        .with_pruning(Pruning::SweetSpot { percentile: 3.0 })
        .fit(&data)
        .unwrap();

    for (a, b) in exact.fit.fitted().iter().zip(refined.fit.fitted().iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 5e-3);
    }

    let trace = &refined.trace;
    assert!(!trace.is_empty());
    assert_eq!(trace.last().unwrap().added, 0);
    for round in trace.windows(2) {
        assert!(round[0].added > 0);
        assert_eq!(round[1].active_pairs, round[0].active_pairs + round[0].added);
        assert!(round[1].active_pairs > round[0].active_pairs);
    }
    let activation = refined.activation.unwrap();
    assert!(activation.num_active() <= 12 * 11);
}

#[test]
fn quantile_residual_counts() {
    let data = cobb_douglas(20, 11);
    let tau = 0.3;
    let n = data.len() as f64;
    let config = ModelConfig::default().with_loss(Loss::Quantile(tau));
    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;

    let above = fit.residuals().iter().filter(|&&e| e > 1e-6).count() as f64;
    let below = fit.residuals().iter().filter(|&&e| e < -1e-6).count() as f64;
    assert!(above <= (1.0 - tau) * n + 1.0, "{} positive residuals", above);
    assert!(below <= tau * n + 1.0, "{} negative residuals", below);
    assert!(fit.max_afriat_violation() < 1e-6);
}

#[test]
fn isotonic_uses_dominance_pairs() {
    let x = vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![1.5, 3.0], vec![3.0, 3.0], vec![0.5, 2.0]];
    let data = Observations::new(vec![1.0, 2.2, 2.0, 3.1, 1.2], x).unwrap();
    let config = ModelConfig::default().with_shape(ShapeMode::Isotonic);

    let dominance = DominanceMatrix::from_inputs(data.x());
    let pairs = candidate_pairs(&data, &config);
    assert_eq!(pairs.num_active(), dominance.pairs().count());

    let formulator = ProblemFormulator::new(&data, &config).unwrap();
    let formulation = formulator.formulate(None).unwrap();
    assert_eq!(formulation.counts.shape, dominance.pairs().count());

    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;
    assert!(fit.max_afriat_violation() < 1e-6);
}

#[test]
fn multiplicative_fit_is_positive() {
    let data = cobb_douglas(10, 3);
    let config = ModelConfig::default()
        .with_error_form(ErrorForm::Multiplicative)
        .with_returns_to_scale(ReturnsToScale::Constant);
    let formulator = ProblemFormulator::new(&data, &config).unwrap();
    assert!(formulator.has_log_rows());
    let counts = formulator.formulate(None).unwrap().counts;
    assert_eq!(counts.regression, 10);
    assert_eq!(counts.frontier_links, 10);

    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;
    assert!(fit.fitted().iter().all(|&f| f > 0.0));
    assert!(fit.max_afriat_violation() < 1e-4);
}

#[test]
fn directional_distance_smoke() {
    let data = small_sample();
    let config =
        ModelConfig::default().with_direction(Direction::new(vec![0.0], vec![1.0]));
    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;

    // translation row with gy = 1 pins every output weight to 1
    for g in fit.gamma().iter() {
        assert_abs_diff_eq!(*g, 1.0, epsilon = 1e-6);
    }
    assert!(fit.max_afriat_violation() < 1e-6);
    assert_eq!(fit.composite_residuals(), -fit.residuals());
    assert!(fit.predict(vec![1.0]).is_err());
}

#[test]
fn isotonic_single_input_matches_padded_input() {
    let single = Observations::new(vec![1.0, 1.0, 5.0], vec![1.0, 2.0, 3.0]).unwrap();
    let padded = Observations::new(
        vec![1.0, 1.0, 5.0],
        vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![3.0, 1.0]],
    )
    .unwrap();
    let isotonic = ModelConfig::default().with_shape(ShapeMode::Isotonic);

    let a = FrontierEstimator::new(isotonic.clone()).fit(&single).unwrap().fit.fitted();
    let b = FrontierEstimator::new(isotonic).fit(&padded).unwrap().fit.fitted();
    for ((fa, fb), y) in a.iter().zip(b.iter()).zip([1.0, 1.0, 5.0]) {
        assert_abs_diff_eq!(*fa, *fb, epsilon = 1e-5);
        // monotone but not concave, so the data is fitted exactly
        assert_abs_diff_eq!(*fa, y, epsilon = 1e-5);
    }

    let concave = FrontierEstimator::new(ModelConfig::default()).fit(&single).unwrap().fit.fitted();
    assert!((concave[0] - 1.0).abs() > 0.1);
}

#[test]
fn symmetric_expectile_matches_least_squares() {
    let data = cobb_douglas(12, 5);
    let ls = FrontierEstimator::new(ModelConfig::default()).fit(&data).unwrap().fit;
    let config = ModelConfig::default().with_loss(Loss::Expectile(0.5));
    let expectile = FrontierEstimator::new(config).fit(&data).unwrap().fit;
    for (a, b) in ls.fitted().iter().zip(expectile.fitted().iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
    }
}

fn slope_norms(fit: &stoned::Fit) -> (f64, f64) {
    let l1 = fit.beta().sum();
    let l2 = fit.beta().mapv(|b| b * b).sum();
    (l1, l2)
}

fn squared_error(fit: &stoned::Fit) -> f64 {
    fit.residuals().mapv(|e| e * e).sum()
}

#[test]
fn penalties_shrink_slopes() {
    let data = cobb_douglas(12, 19);
    let plain = FrontierEstimator::new(ModelConfig::default()).fit(&data).unwrap().fit;
    let (plain_l1, plain_l2) = slope_norms(&plain);

    let l2 = FrontierEstimator::new(ModelConfig::default().with_penalty(Penalty::L2(1.0)))
        .fit(&data)
        .unwrap()
        .fit;
    assert!(slope_norms(&l2).1 <= plain_l2 + 1e-6);
    assert!(squared_error(&l2) >= squared_error(&plain) - 1e-6);

    let l1 = FrontierEstimator::new(ModelConfig::default().with_penalty(Penalty::L1(1.0)))
        .fit(&data)
        .unwrap()
        .fit;
    assert!(slope_norms(&l1).0 <= plain_l1 + 1e-6);
    assert!(l1.max_afriat_violation() < 1e-6);
}

#[test]
fn lipschitz_bound_holds_per_row() {
    let data = cobb_douglas(12, 23);
    let bound = 0.1;
    let config = ModelConfig::default().with_penalty(Penalty::Lipschitz(bound));
    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;
    for row in fit.beta().rows() {
        let norm = row.dot(&row).sqrt();
        assert!(norm <= bound + 1e-6, "slope norm {}", norm);
    }
    assert!(fit.max_afriat_violation() < 1e-6);
}

#[test]
fn contextual_effect_is_recovered() {
    let n = 40;
    let mut rng = StdRng::seed_from_u64(31);
    let noise = Normal::new(0.0, 0.05).unwrap();
    let mut x = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let xi: f64 = rng.gen_range(1.0..10.0);
        let zi: f64 = rng.gen_range(0.0..2.0);
        y.push(3.0 * xi.sqrt() + 0.7 * zi + noise.sample(&mut rng));
        x.push(xi);
        z.push(zi);
    }
    let data = Observations::new(y, x).unwrap().with_contextual(z).unwrap();

    let fit = FrontierEstimator::new(ModelConfig::default()).fit(&data).unwrap().fit;
    assert_eq!(fit.lambda().len(), 1);
    assert_abs_diff_eq!(fit.lambda()[0], 0.7, epsilon = 0.1);
}

#[test]
fn weak_disposability_rows_hold() {
    let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let b = vec![0.5, 1.5, 1.0, 2.5, 2.0];
    let data = Observations::new(vec![2.0, 3.0, 5.0, 4.0, 6.0], x.clone())
        .unwrap()
        .with_undesirable(b.clone())
        .unwrap();
    let config = ModelConfig::default()
        .with_shape(ShapeMode::WeaklyDisposable)
        .with_direction(Direction::new(vec![0.0], vec![1.0]).with_undesirable(vec![0.0]));
    let fit = FrontierEstimator::new(config).fit(&data).unwrap().fit;

    for i in 0..x.len() {
        for h in 0..x.len() {
            if i != h {
                let value = fit.alpha()[i] + fit.beta()[[i, 0]] * x[h] - fit.delta()[[i, 0]] * b[h];
                assert!(value >= -1e-6, "disposability[{}][{}] = {}", i, h, value);
            }
        }
        assert!(fit.delta()[[i, 0]] >= -1e-9);
    }
    assert!(fit.max_afriat_violation() < 1e-6);
}
