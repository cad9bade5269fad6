// StoNED residual decomposition: noise/inefficiency split and frontier reconstruction

pub mod inefficiency;
pub mod kernel;
pub mod likelihood;
pub mod moments;

use crate::domain::{FrontierError, Result};
use crate::regression::config::{ErrorForm, Orientation};
use crate::regression::data::{IntoTable, Observations};
use crate::regression::fit::Fit;
use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

pub use inefficiency::{conditional_inefficiency, shifted_frontier, technical_efficiency};
pub use kernel::{kernel_deconvolution, silverman_bandwidth};
pub use likelihood::quasi_likelihood;
pub use moments::method_of_moments;

/// Standard deviations of the inefficiency and noise terms and the mean inefficiency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceComponents {
    pub sigma_u: f64,
    pub sigma_v: f64,
    /// `E[u]`
    pub mu: f64,
}

impl VarianceComponents {
    /// Half-normal inefficiency: `μ = σ_u √(2/π)`
    pub fn from_sigma_u(sigma_u: f64, sigma_v: f64) -> Self {
        Self {
            sigma_u,
            sigma_v,
            mu: sigma_u * (2.0 / PI).sqrt(),
        }
    }
}

/// Estimator used to split the composite residual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionMethod {
    MomentMatching,
    QuasiLikelihood,
    KernelDeconvolution,
}

impl FromStr for DecompositionMethod {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mom" => Ok(DecompositionMethod::MomentMatching),
            "qml" => Ok(DecompositionMethod::QuasiLikelihood),
            "kde" | "kernel" => Ok(DecompositionMethod::KernelDeconvolution),
            other => Err(FrontierError::Configuration(format!(
                "unknown decomposition method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DecompositionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompositionMethod::MomentMatching => write!(f, "mom"),
            DecompositionMethod::QuasiLikelihood => write!(f, "qml"),
            DecompositionMethod::KernelDeconvolution => write!(f, "kde"),
        }
    }
}

/// Splits fitted residuals into noise and inefficiency
#[derive(Debug, Clone, Copy)]
pub struct ResidualDecomposer {
    method: DecompositionMethod,
    orientation: Orientation,
    error_form: ErrorForm,
}

impl ResidualDecomposer {
    pub fn new(method: DecompositionMethod, orientation: Orientation, error_form: ErrorForm) -> Self {
        Self {
            method,
            orientation,
            error_form,
        }
    }

    /// Decomposer matching the orientation and error form of a fit
    pub fn for_fit(method: DecompositionMethod, fit: &Fit) -> Self {
        let config = fit.config();
        Self::new(method, config.orientation, config.error_form)
    }

    pub fn method(&self) -> DecompositionMethod {
        self.method
    }

    /// Estimate σ_u, σ_v, μ and the μ-adjusted residuals
    pub fn decompose(&self, residuals: impl IntoTable) -> Result<Decomposition> {
        let table = residuals.into_table("residuals")?;
        if table.ncols() != 1 {
            return Err(FrontierError::Shape(format!(
                "residuals must be a single column, got {}",
                table.ncols()
            )));
        }
        let residuals: Vec<f64> = table.column(0).to_vec();
        if residuals.len() < 2 {
            return Err(FrontierError::Shape(format!(
                "at least 2 residuals are required, got {}",
                residuals.len()
            )));
        }
        if let Some(i) = residuals.iter().position(|e| !e.is_finite()) {
            return Err(FrontierError::InvalidData(format!(
                "residual {} is not finite ({})",
                i, residuals[i]
            )));
        }

        let components = match self.method {
            DecompositionMethod::MomentMatching => method_of_moments(&residuals, self.orientation)?,
            DecompositionMethod::QuasiLikelihood => quasi_likelihood(&residuals, self.orientation)?,
            DecompositionMethod::KernelDeconvolution => {
                kernel_deconvolution(&residuals, self.orientation)?
            }
        };
        log::debug!(
            "{} decomposition: sigma_u {:.4e}, sigma_v {:.4e}, mu {:.4e}",
            self.method,
            components.sigma_u,
            components.sigma_v,
            components.mu
        );

        let shift = match self.orientation {
            Orientation::Production => -components.mu,
            Orientation::Cost => components.mu,
        };
        let residuals = Array1::from(residuals);
        let adjusted = residuals.mapv(|e| e + shift);
        Ok(Decomposition {
            components,
            residuals,
            adjusted,
            orientation: self.orientation,
            error_form: self.error_form,
        })
    }

    /// Decompose the oriented residuals of a fitted regression
    pub fn decompose_fit(&self, fit: &Fit) -> Result<Decomposition> {
        self.decompose(fit.composite_residuals())
    }
}

/// Result of one decomposition call
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub components: VarianceComponents,
    residuals: Array1<f64>,
    adjusted: Array1<f64>,
    orientation: Orientation,
    error_form: ErrorForm,
}

impl Decomposition {
    pub fn sigma_u(&self) -> f64 {
        self.components.sigma_u
    }

    pub fn sigma_v(&self) -> f64 {
        self.components.sigma_v
    }

    pub fn mu(&self) -> f64 {
        self.components.mu
    }

    pub fn residuals(&self) -> &Array1<f64> {
        &self.residuals
    }

    /// `ε - μ` for production, `ε + μ` for cost
    pub fn adjusted_residuals(&self) -> &Array1<f64> {
        &self.adjusted
    }

    /// `E[u | ε*]` per observation
    pub fn inefficiency(&self) -> Result<Array1<f64>> {
        conditional_inefficiency(
            self.adjusted.view(),
            self.components.sigma_u,
            self.components.sigma_v,
            self.orientation,
        )
    }

    /// Technical efficiency of the observed outputs `y`
    pub fn efficiency(&self, y: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_len(y.len())?;
        let inefficiency = self.inefficiency()?;
        Ok(technical_efficiency(
            y,
            inefficiency.view(),
            self.orientation,
            self.error_form,
        ))
    }

    /// Frontier at the observations shifted by μ
    pub fn frontier(&self, y: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_len(y.len())?;
        Ok(shifted_frontier(
            y,
            self.residuals.view(),
            self.components.mu,
            self.orientation,
            self.error_form,
        ))
    }

    /// Intercepts moved onto the shifted frontier: `α + μ` (production) or `α - μ` (cost)
    pub fn adjusted_intercepts(&self, alpha: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if self.error_form == ErrorForm::Multiplicative {
            return Err(FrontierError::Configuration(
                "intercepts shift additively only for the additive error form".to_string(),
            ));
        }
        self.check_len(alpha.len())?;
        let shift = match self.orientation {
            Orientation::Production => self.components.mu,
            Orientation::Cost => -self.components.mu,
        };
        Ok(alpha.mapv(|a| a + shift))
    }

    /// Efficiency scores of the observations a fit was estimated on
    pub fn efficiency_of(&self, data: &Observations) -> Result<Array1<f64>> {
        self.efficiency(data.output())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.residuals.len() {
            return Err(FrontierError::Shape(format!(
                "expected {} values, got {}",
                self.residuals.len(),
                len
            )));
        }
        Ok(())
    }
}
