// Sweet-spot neighbourhood selection for the initial constraint set

use crate::regression::activation::ActivationMatrix;
use crate::stats::percentile_sorted;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Default percentile of each row's distances below which neighbours are activated
pub const DEFAULT_PERCENTILE: f64 = 3.0;

/// Pairwise Euclidean distances; the diagonal is NaN (missing)
pub fn distance_matrix(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = x.nrows();
    Array2::from_shape_fn((n, n), |(i, h)| {
        if i == h {
            f64::NAN
        } else {
            x.row(i)
                .iter()
                .zip(x.row(h).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt()
        }
    })
}

/// Selects, per observation, the neighbours whose distance is within a low percentile of
/// that observation's distances.
#[derive(Debug, Clone, Copy)]
pub struct NeighborhoodPruner {
    percentile: f64,
}

impl Default for NeighborhoodPruner {
    fn default() -> Self {
        Self {
            percentile: DEFAULT_PERCENTILE,
        }
    }
}

impl NeighborhoodPruner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentile in `[0, 100]`; values outside are clamped
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile.clamp(0.0, 100.0);
        self
    }

    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Per-row thresholds of a distance matrix whose diagonal is missing
    pub fn thresholds(&self, distances: &Array2<f64>) -> Vec<f64> {
        let n = distances.nrows();
        (0..n)
            .into_par_iter()
            .map(|i| {
                let mut row: Vec<f64> = (0..n)
                    .filter(|&h| h != i)
                    .map(|h| distances[[i, h]])
                    .collect();
                row.sort_by(f64::total_cmp);
                percentile_sorted(&row, self.percentile)
            })
            .collect()
    }

    /// Activation of the pairs `(i, h)` with `distance(i, h) <= threshold(i)`.
    ///
    /// The nearest neighbour always lies under the threshold, so every row keeps at least
    /// one neighbour, and equal distances are either all in or all out.
    pub fn select(&self, x: ArrayView2<'_, f64>) -> ActivationMatrix {
        let n = x.nrows();
        if n < 2 {
            return ActivationMatrix::empty(n);
        }
        let distances = distance_matrix(x);
        let thresholds = self.thresholds(&distances);
        let pairs = (0..n).flat_map(|i| {
            let distances = &distances;
            let threshold = thresholds[i];
            (0..n)
                .filter(move |&h| h != i && distances[[i, h]] <= threshold)
                .map(move |h| (i, h))
        });
        let activation = ActivationMatrix::from_pairs(n, pairs);
        log::debug!(
            "sweet spot at the {}th percentile keeps {} of {} pairs",
            self.percentile,
            activation.num_active(),
            n * (n - 1)
        );
        activation
    }
}
