// Input dominance relation used by the isotonic shape mode

use ndarray::{Array2, ArrayView2};

/// Binary n × n matrix with `P[i][h] = 1` iff every input of i is at least the matching input of h.
///
/// The comparison is exact. Reflexive by construction, and `P[i][h] = P[h][i] = 1`
/// only for identical input rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominanceMatrix {
    matrix: Array2<u8>,
}

impl DominanceMatrix {
    pub fn from_inputs(x: ArrayView2<'_, f64>) -> Self {
        let n = x.nrows();
        let matrix = Array2::from_shape_fn((n, n), |(i, h)| {
            let dominates = x
                .row(i)
                .iter()
                .zip(x.row(h).iter())
                .all(|(a, b)| a >= b);
            u8::from(dominates)
        });
        Self { matrix }
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dominates(&self, i: usize, h: usize) -> bool {
        self.matrix[[i, h]] == 1
    }

    pub fn as_matrix(&self) -> &Array2<u8> {
        &self.matrix
    }

    /// Ordered pairs `(i, h)`, `i != h`, with `P[i][h] = 1`
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.matrix
            .indexed_iter()
            .filter(|&((i, h), &v)| i != h && v == 1)
            .map(|((i, h), _)| (i, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn tied_rows_dominate_each_other() {
        let x = array![[1.0], [1.0], [3.0]];
        let p = DominanceMatrix::from_inputs(x.view());
        assert_eq!(p.as_matrix(), &array![[1u8, 1, 0], [1, 1, 0], [1, 1, 1]]);
        let pairs: Vec<_> = p.pairs().collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0), (2, 0), (2, 1)]);
    }

    #[test]
    fn incomparable_rows_are_zero_both_ways() {
        let x = array![[1.0, 2.0], [2.0, 1.0]];
        let p = DominanceMatrix::from_inputs(x.view());
        assert!(!p.dominates(0, 1));
        assert!(!p.dominates(1, 0));
    }

    proptest! {
        #[test]
        fn reflexive_and_antisymmetric(
            rows in prop::collection::vec(prop::collection::vec(0u8..4, 2), 2..12)
        ) {
            let n = rows.len();
            let flat: Vec<f64> = rows.iter().flatten().map(|&v| f64::from(v)).collect();
            let x = Array2::from_shape_vec((n, 2), flat).unwrap();
            let p = DominanceMatrix::from_inputs(x.view());
            for i in 0..n {
                prop_assert!(p.dominates(i, i));
                for h in 0..n {
                    let mutual = p.dominates(i, h) && p.dominates(h, i);
                    prop_assert_eq!(mutual, x.row(i) == x.row(h));
                }
            }
        }
    }
}
