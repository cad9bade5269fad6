// Cutting-plane refinement of the Afriat constraint set
//
// Starts from a pruned activation, solves, scans every candidate pair for violations
// and activates the worst pair of each violated row until the fit satisfies the
// whole candidate set within tolerance.

use crate::domain::{FrontierError, Result, SolverService};
use crate::regression::activation::ActivationMatrix;
use crate::regression::fit::Fit;
use crate::regression::formulation::ProblemFormulator;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Default violation tolerance of the check step
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinerState {
    Initial,
    Solving,
    Checking,
    Converged,
    Failed,
}

impl fmt::Display for RefinerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefinerState::Initial => write!(f, "Initial"),
            RefinerState::Solving => write!(f, "Solving"),
            RefinerState::Checking => write!(f, "Checking"),
            RefinerState::Converged => write!(f, "Converged"),
            RefinerState::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RefinerOptions {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RefinerOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: 1000,
        }
    }
}

impl RefinerOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations.max(1);
        self
    }
}

/// One solve-and-check round
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Active Afriat pairs in the solved formulation
    pub active_pairs: usize,
    pub objective: f64,
    /// Largest violation score found by the check
    pub max_violation: f64,
    /// Pairs activated for the next round
    pub added: usize,
}

/// Converged fit with the final activation and the per-round trace
#[derive(Debug, Clone)]
pub struct Refinement {
    pub fit: Fit,
    pub activation: ActivationMatrix,
    pub trace: Vec<IterationRecord>,
}

impl Refinement {
    pub fn iterations(&self) -> usize {
        self.trace.len()
    }
}

pub struct CuttingPlaneRefiner<'f, 'a> {
    formulator: &'f ProblemFormulator<'a>,
    solver: Arc<dyn SolverService>,
    options: RefinerOptions,
    state: RefinerState,
}

impl<'f, 'a> CuttingPlaneRefiner<'f, 'a> {
    pub fn new(formulator: &'f ProblemFormulator<'a>, solver: Arc<dyn SolverService>) -> Self {
        Self {
            formulator,
            solver,
            options: RefinerOptions::default(),
            state: RefinerState::Initial,
        }
    }

    pub fn with_options(mut self, options: RefinerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> RefinerState {
        self.state
    }

    /// Run the loop from `initial` until convergence.
    ///
    /// Solver errors are surfaced as-is and leave the refiner in [`RefinerState::Failed`].
    pub fn run(&mut self, initial: ActivationMatrix) -> Result<Refinement> {
        let result = self.iterate(initial);
        if result.is_err() {
            self.state = RefinerState::Failed;
        }
        result
    }

    fn iterate(&mut self, initial: ActivationMatrix) -> Result<Refinement> {
        let formulator = self.formulator;
        let candidates = formulator.candidates();
        if initial.len() != candidates.len() {
            return Err(FrontierError::Shape(format!(
                "initial activation covers {} observations, data has {}",
                initial.len(),
                candidates.len()
            )));
        }
        // pairs outside the candidate set are never emitted, drop them from the state too
        let mut activation = ActivationMatrix::from_pairs(
            initial.len(),
            initial.pairs().filter(|&(i, h)| candidates.contains(i, h)),
        );
        let mut trace = Vec::new();

        loop {
            if trace.len() >= self.options.max_iterations {
                return Err(FrontierError::NumericalDegeneracy(format!(
                    "cutting-plane loop did not converge within {} iterations",
                    self.options.max_iterations
                )));
            }

            self.state = RefinerState::Solving;
            let formulation = formulator.formulate(Some(&activation))?;
            let solution = self.solver.solve_optimal(&formulation.problem)?;
            let fit = Fit::from_solution(formulator, &solution)?;

            self.state = RefinerState::Checking;
            let worst: Vec<Option<(f64, Vec<usize>)>> = (0..activation.len())
                .into_par_iter()
                .map(|i| fit.worst_violation(i))
                .collect();
            let max_violation = worst
                .iter()
                .flatten()
                .map(|(score, _)| *score)
                .fold(0.0, f64::max);

            let mut record = IterationRecord {
                iteration: trace.len() + 1,
                active_pairs: formulation.counts.shape,
                objective: fit.objective_value(),
                max_violation,
                added: 0,
            };

            if max_violation <= self.options.tolerance {
                trace.push(record);
                self.state = RefinerState::Converged;
                log::info!(
                    "cutting plane converged after {} iterations with {} of {} candidate pairs active",
                    trace.len(),
                    activation.num_active(),
                    candidates.num_active()
                );
                return Ok(Refinement {
                    fit,
                    activation,
                    trace,
                });
            }

            let tolerance = self.options.tolerance;
            let additions = worst.into_iter().enumerate().flat_map(|(i, row)| {
                row.filter(|(score, _)| *score > tolerance)
                    .map(|(_, hs)| hs)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |h| (i, h))
            });
            let (next, added) = activation.merge(additions);
            activation = next;
            record.added = added;
            log::debug!(
                "cutting-plane iteration {}: max violation {:.3e}, {} pairs added (version {})",
                record.iteration,
                max_violation,
                added,
                activation.version()
            );
            trace.push(record);

            if added == 0 {
                return Err(FrontierError::NumericalDegeneracy(format!(
                    "violation {:.3e} remains above tolerance {:.1e} but every worst pair is already active",
                    max_violation, tolerance
                )));
            }
        }
    }
}
