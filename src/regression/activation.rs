// Versioned set of active Afriat pairs

use ndarray::Array2;
use std::collections::BTreeSet;

/// Row-indexed arena of active neighbour sets.
///
/// `rows[i]` holds every h whose Afriat inequality against i is emitted. Self pairs are
/// never stored. Each merge consumes the matrix and returns the next version, so a
/// formulation always sees one complete snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationMatrix {
    rows: Vec<BTreeSet<usize>>,
    version: u64,
}

impl ActivationMatrix {
    /// No active pairs
    pub fn empty(n: usize) -> Self {
        Self {
            rows: vec![BTreeSet::new(); n],
            version: 0,
        }
    }

    /// Every ordered pair `i != h`
    pub fn full(n: usize) -> Self {
        let rows = (0..n)
            .map(|i| (0..n).filter(|&h| h != i).collect())
            .collect();
        Self { rows, version: 0 }
    }

    pub fn from_pairs(n: usize, pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut matrix = Self::empty(n);
        for (i, h) in pairs {
            matrix.insert(i, h);
        }
        matrix
    }

    /// Activate the nonzero off-diagonal entries of a dense 0/1 matrix
    pub fn from_dense(dense: &Array2<u8>) -> Self {
        let pairs = dense
            .indexed_iter()
            .filter(|(_, &v)| v != 0)
            .map(|((i, h), _)| (i, h));
        Self::from_pairs(dense.nrows(), pairs)
    }

    fn insert(&mut self, i: usize, h: usize) -> bool {
        i != h && self.rows[i].insert(h)
    }

    /// Add `pairs` and bump the version when anything new was added.
    ///
    /// Returns the next snapshot and the number of newly active pairs.
    pub fn merge(mut self, pairs: impl IntoIterator<Item = (usize, usize)>) -> (Self, usize) {
        let added = pairs
            .into_iter()
            .filter(|&(i, h)| self.insert(i, h))
            .count();
        if added > 0 {
            self.version += 1;
        }
        (self, added)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, i: usize, h: usize) -> bool {
        self.rows[i].contains(&h)
    }

    pub fn row(&self, i: usize) -> &BTreeSet<usize> {
        &self.rows[i]
    }

    /// Number of active ordered pairs
    pub fn num_active(&self) -> usize {
        self.rows.iter().map(BTreeSet::len).sum()
    }

    pub fn is_full(&self) -> bool {
        let n = self.len();
        self.num_active() == n * n.saturating_sub(1)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |&h| (i, h)))
    }

    pub fn to_dense(&self) -> Array2<u8> {
        let n = self.len();
        let mut dense = Array2::zeros((n, n));
        for (i, h) in self.pairs() {
            dense[[i, h]] = 1;
        }
        dense
    }
}
