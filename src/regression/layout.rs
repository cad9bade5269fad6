// Column layout of the decision variables

use crate::domain::{VarId, Variable};
use crate::regression::config::{ErrorForm, FrontierForm, ModelConfig};
use crate::regression::data::Observations;

/// Contiguous blocks of decision variables, row-major within each block:
/// α (n, VRS only), β (n·m), γ (n·p, directional), δ (n·q, directional), φ (n, multiplicative),
/// λ (k, shared), ε or ε⁺/ε⁻ (n each).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableLayout {
    n: usize,
    m: usize,
    p: usize,
    q: usize,
    k: usize,
    alpha: Option<VarId>,
    beta: VarId,
    gamma: Option<VarId>,
    delta: Option<VarId>,
    phi: Option<VarId>,
    lambda: VarId,
    epsilon: VarId,
    epsilon_minus: Option<VarId>,
    total: usize,
}

impl VariableLayout {
    pub fn new(data: &Observations, config: &ModelConfig) -> Self {
        let n = data.len();
        let m = data.num_inputs();
        let k = data.num_contextual();
        let directional = matches!(config.form, FrontierForm::Directional(_));
        let (p, q) = if directional {
            (data.num_outputs(), data.num_undesirable())
        } else {
            (0, 0)
        };

        let mut next = 0;
        let mut block = |len: usize| {
            let start = next;
            next += len;
            start
        };

        let alpha = config.has_intercept().then(|| block(n));
        let beta = block(n * m);
        let gamma = directional.then(|| block(n * p));
        let delta = (directional && q > 0).then(|| block(n * q));
        let phi = (!directional && config.error_form == ErrorForm::Multiplicative).then(|| block(n));
        let lambda = block(k);
        let epsilon = block(n);
        let epsilon_minus = config.loss.splits_residual().then(|| block(n));

        Self {
            n,
            m,
            p,
            q,
            k,
            alpha,
            beta,
            gamma,
            delta,
            phi,
            lambda,
            epsilon,
            epsilon_minus,
            total: next,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.total
    }

    pub fn num_observations(&self) -> usize {
        self.n
    }

    pub fn num_inputs(&self) -> usize {
        self.m
    }

    /// Desirable outputs carrying a γ multiplier (0 on the regression form)
    pub fn num_gamma(&self) -> usize {
        self.p
    }

    /// Undesirable outputs carrying a δ multiplier
    pub fn num_delta(&self) -> usize {
        self.q
    }

    pub fn num_contextual(&self) -> usize {
        self.k
    }

    pub fn has_intercept(&self) -> bool {
        self.alpha.is_some()
    }

    pub fn splits_residual(&self) -> bool {
        self.epsilon_minus.is_some()
    }

    pub fn alpha(&self, i: usize) -> Option<VarId> {
        self.alpha.map(|start| start + i)
    }

    pub fn beta(&self, i: usize, j: usize) -> VarId {
        self.beta + i * self.m + j
    }

    pub fn gamma(&self, i: usize, j: usize) -> Option<VarId> {
        self.gamma.map(|start| start + i * self.p + j)
    }

    pub fn delta(&self, i: usize, j: usize) -> Option<VarId> {
        self.delta.map(|start| start + i * self.q + j)
    }

    pub fn phi(&self, i: usize) -> Option<VarId> {
        self.phi.map(|start| start + i)
    }

    pub fn lambda(&self, j: usize) -> VarId {
        self.lambda + j
    }

    /// ε_i, or ε⁺_i when the residual is split
    pub fn epsilon(&self, i: usize) -> VarId {
        self.epsilon + i
    }

    pub fn epsilon_minus(&self, i: usize) -> Option<VarId> {
        self.epsilon_minus.map(|start| start + i)
    }

    /// Residual of row i as signed terms: `ε_i` or `ε⁺_i - ε⁻_i`
    pub fn residual_terms(&self, i: usize) -> Vec<(VarId, f64)> {
        match self.epsilon_minus(i) {
            Some(minus) => vec![(self.epsilon(i), 1.0), (minus, -1.0)],
            None => vec![(self.epsilon(i), 1.0)],
        }
    }

    /// Variable declarations with names and bounds, in column order
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars = Vec::with_capacity(self.total);
        if self.alpha.is_some() {
            vars.extend((0..self.n).map(|i| Variable::free(format!("alpha[{}]", i))));
        }
        for i in 0..self.n {
            vars.extend((0..self.m).map(|j| Variable::nonnegative(format!("beta[{}][{}]", i, j))));
        }
        if self.gamma.is_some() {
            for i in 0..self.n {
                vars.extend((0..self.p).map(|j| Variable::nonnegative(format!("gamma[{}][{}]", i, j))));
            }
        }
        if self.delta.is_some() {
            for i in 0..self.n {
                vars.extend((0..self.q).map(|j| Variable::nonnegative(format!("delta[{}][{}]", i, j))));
            }
        }
        if self.phi.is_some() {
            vars.extend((0..self.n).map(|i| Variable::nonnegative(format!("phi[{}]", i))));
        }
        vars.extend((0..self.k).map(|j| Variable::free(format!("lambda[{}]", j))));
        match self.epsilon_minus {
            Some(_) => {
                vars.extend((0..self.n).map(|i| Variable::nonnegative(format!("eps_plus[{}]", i))));
                vars.extend((0..self.n).map(|i| Variable::nonnegative(format!("eps_minus[{}]", i))));
            }
            None => vars.extend((0..self.n).map(|i| Variable::free(format!("eps[{}]", i)))),
        }
        vars
    }
}
