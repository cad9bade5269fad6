// Frontier estimation use case: validate, formulate, solve or refine, decompose

use crate::domain::{Result, SolverConfig, SolverService};
use crate::regression::{
    ActivationMatrix, CuttingPlaneRefiner, Fit, IterationRecord, ModelConfig, NeighborhoodPruner,
    Observations, ProblemFormulator, RefinerOptions,
};
use crate::solver::SolverFactory;
use crate::stoned::{Decomposition, DecompositionMethod, ResidualDecomposer};
use std::sync::Arc;

/// How the Afriat constraint set is built
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Pruning {
    /// Emit every candidate pair and solve once
    #[default]
    Exact,
    /// Start from the sweet-spot neighbourhood at the given percentile and refine by cutting planes
    SweetSpot { percentile: f64 },
}

/// Fitted frontier with the constraint-generation history
#[derive(Debug, Clone)]
pub struct Estimate {
    pub fit: Fit,
    /// Final active Afriat pairs, `None` for an exact solve
    pub activation: Option<ActivationMatrix>,
    /// One record per cutting-plane round (empty for an exact solve)
    pub trace: Vec<IterationRecord>,
    pub solver_name: String,
}

/// Estimates a shape-constrained frontier for a fixed configuration.
///
/// The solver is picked by [`SolverFactory`] from the solver configuration unless one is
/// injected with [`FrontierEstimator::with_solver`].
pub struct FrontierEstimator {
    config: ModelConfig,
    solver_config: SolverConfig,
    pruning: Pruning,
    refiner_options: RefinerOptions,
    solver: Option<Arc<dyn SolverService>>,
}

impl FrontierEstimator {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            solver_config: SolverConfig::default(),
            pruning: Pruning::default(),
            refiner_options: RefinerOptions::default(),
            solver: None,
        }
    }

    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    pub fn with_pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }

    /// Sweet-spot start at the default 3rd percentile
    pub fn with_sweet_spot(self) -> Self {
        let percentile = NeighborhoodPruner::new().percentile();
        self.with_pruning(Pruning::SweetSpot { percentile })
    }

    pub fn with_refiner_options(mut self, options: RefinerOptions) -> Self {
        self.refiner_options = options;
        self
    }

    /// Use this backend instead of the factory's choice
    pub fn with_solver(mut self, solver: Arc<dyn SolverService>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn resolve_solver(&self, formulator: &ProblemFormulator<'_>) -> Result<Arc<dyn SolverService>> {
        let log_rows = formulator.has_log_rows();
        let solver = match &self.solver {
            Some(solver) => SolverFactory::wrap_log_rows(Arc::clone(solver), log_rows),
            None => SolverFactory::create_for(
                self.solver_config.backend,
                formulator.problem_class(),
                log_rows,
            )?,
        };
        Ok(solver)
    }

    pub fn fit(&self, data: &Observations) -> Result<Estimate> {
        let formulator =
            ProblemFormulator::new(data, &self.config)?.with_solver_config(self.solver_config.clone());
        let solver = self.resolve_solver(&formulator)?;
        let solver_name = solver.name().to_string();
        log::debug!(
            "fitting {} observations with {} ({:?})",
            data.len(),
            solver_name,
            self.pruning
        );

        match self.pruning {
            Pruning::Exact => {
                let formulation = formulator.formulate(None)?;
                let solution = solver.solve_optimal(&formulation.problem)?;
                let fit = Fit::from_solution(&formulator, &solution)?;
                Ok(Estimate {
                    fit,
                    activation: None,
                    trace: Vec::new(),
                    solver_name,
                })
            }
            Pruning::SweetSpot { percentile } => {
                let initial = NeighborhoodPruner::new()
                    .with_percentile(percentile)
                    .select(data.x());
                let refinement = CuttingPlaneRefiner::new(&formulator, solver)
                    .with_options(self.refiner_options)
                    .run(initial)?;
                Ok(Estimate {
                    fit: refinement.fit,
                    activation: Some(refinement.activation),
                    trace: refinement.trace,
                    solver_name,
                })
            }
        }
    }

    /// Fit, then split the oriented residuals with `method`
    pub fn fit_and_decompose(
        &self,
        data: &Observations,
        method: DecompositionMethod,
    ) -> Result<(Estimate, Decomposition)> {
        let estimate = self.fit(data)?;
        let decomposition = ResidualDecomposer::for_fit(method, &estimate.fit).decompose_fit(&estimate.fit)?;
        Ok((estimate, decomposition))
    }
}
