use crate::domain::{
    models::OptimizationProblem,
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ProblemClass, SolverBackend},
};
use crate::solver::SequentialLinearization;
#[cfg(feature = "clarabel")]
use crate::solver::ClarabelSolver;
#[cfg(feature = "coin_cbc")]
use crate::solver::CoinCbcSolver;
#[cfg(feature = "highs")]
use crate::solver::HighsSolver;
#[cfg(feature = "microlp")]
use crate::solver::MicroLpSolver;
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver for the problem's configured backend and class.
    ///
    /// Problems carrying log-domain rows get the backend wrapped in
    /// [`SequentialLinearization`].
    pub fn create_solver(problem: &OptimizationProblem) -> Result<Arc<dyn SolverService>> {
        Self::create_for(
            problem.solver_config.backend,
            problem.class(),
            problem.has_log_rows(),
        )
    }

    /// Create a solver for problems of a known class, before any of them is built
    pub fn create_for(
        backend: SolverBackend,
        class: ProblemClass,
        log_rows: bool,
    ) -> Result<Arc<dyn SolverService>> {
        let solver = Self::create_from_backend(backend, class)?;
        Ok(Self::wrap_log_rows(solver, log_rows))
    }

    /// Put a backend behind [`SequentialLinearization`] when the problems carry log rows
    pub fn wrap_log_rows(solver: Arc<dyn SolverService>, log_rows: bool) -> Arc<dyn SolverService> {
        if log_rows {
            Arc::new(SequentialLinearization::new(solver))
        } else {
            solver
        }
    }

    /// Create a solver for a specific backend, refusing one that cannot handle `class`
    pub fn create_from_backend(
        backend: SolverBackend,
        class: ProblemClass,
    ) -> Result<Arc<dyn SolverService>> {
        let solver: Arc<dyn SolverService> = match backend {
            SolverBackend::Auto => return Self::default_solver(class),
            #[cfg(feature = "clarabel")]
            SolverBackend::Clarabel => Arc::new(ClarabelSolver::new()),
            #[cfg(feature = "microlp")]
            SolverBackend::MicroLp => Arc::new(MicroLpSolver::new()),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Arc::new(CoinCbcSolver::new()),
            #[cfg(feature = "highs")]
            SolverBackend::Highs => Arc::new(HighsSolver::new()),
            #[allow(unreachable_patterns)]
            other => {
                return Err(SolverError::SolverNotAvailable(format!(
                    "{} backend is not compiled in (enable its cargo feature)",
                    other
                )))
            }
        };

        if solver.supports(class) {
            Ok(solver)
        } else {
            Err(SolverError::SolverNotAvailable(format!(
                "{} cannot solve {} problems",
                solver.name(),
                class
            )))
        }
    }

    /// Default backend for a problem class: Clarabel, else the first LP backend compiled in
    #[allow(unused_variables, unreachable_code)]
    pub fn default_solver(class: ProblemClass) -> Result<Arc<dyn SolverService>> {
        #[cfg(feature = "clarabel")]
        return Ok(Arc::new(ClarabelSolver::new()));

        if class == ProblemClass::Linear {
            #[cfg(feature = "microlp")]
            return Ok(Arc::new(MicroLpSolver::new()));
            #[cfg(feature = "highs")]
            return Ok(Arc::new(HighsSolver::new()));
            #[cfg(feature = "coin_cbc")]
            return Ok(Arc::new(CoinCbcSolver::new()));
        }
        Err(SolverError::SolverNotAvailable(format!(
            "no compiled-in backend solves {} problems",
            class
        )))
    }
}
