// Model configuration: one enum per axis, validated once

use crate::domain::{ConstraintType, FrontierError, Result};
use crate::regression::data::Observations;
use std::fmt;
use std::str::FromStr;

/// How the composite error enters the regression row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorForm {
    /// y = f(x) + ε
    Additive,
    /// ln y = ln f(x) + ε
    Multiplicative,
}

/// Frontier orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Concave production frontier, inefficiency below it
    Production,
    /// Convex cost frontier, inefficiency above it
    Cost,
}

impl Orientation {
    /// Relation of the Afriat row `support_i(x_i) <rel> support_h(x_i)`
    pub fn afriat_relation(&self) -> ConstraintType {
        match self {
            Orientation::Production => ConstraintType::LessThanOrEqual,
            Orientation::Cost => ConstraintType::GreaterThanOrEqual,
        }
    }

    /// +1 for production, -1 for cost; turns an Afriat gap into a violation score
    pub fn sign(&self) -> f64 {
        match self {
            Orientation::Production => 1.0,
            Orientation::Cost => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnsToScale {
    /// Free intercept per observation
    Variable,
    /// No intercept
    Constant,
}

/// Loss applied to the residuals
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loss {
    LeastSquares,
    /// Asymmetric absolute loss `τ ε⁺ + (1 - τ) ε⁻`
    Quantile(f64),
    /// Asymmetric squared loss `τ (ε⁺)² + (1 - τ) (ε⁻)²`
    Expectile(f64),
}

impl Loss {
    /// Whether the residual is split into nonnegative ε⁺ and ε⁻
    pub fn splits_residual(&self) -> bool {
        !matches!(self, Loss::LeastSquares)
    }
}

/// Shape restriction emitted as pairwise inequalities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMode {
    /// Afriat inequalities between all ordered pairs
    Concave,
    /// Afriat inequalities only between dominance-ordered pairs
    Isotonic,
    /// Concave plus nonnegativity of every support at other observations (needs undesirable outputs)
    WeaklyDisposable,
}

/// Regularization of the slope coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Penalty {
    None,
    /// `η Σ β`
    L1(f64),
    /// `η Σ β²`
    L2(f64),
    /// `‖β_i‖₂ ≤ L` for every row
    Lipschitz(f64),
}

/// Direction vector of a directional distance function
#[derive(Debug, Clone, PartialEq)]
pub struct Direction {
    /// Input direction (m entries)
    pub gx: Vec<f64>,
    /// Desirable output direction (p entries)
    pub gy: Vec<f64>,
    /// Undesirable output direction (q entries, empty without b)
    pub gb: Vec<f64>,
}

impl Direction {
    pub fn new(gx: Vec<f64>, gy: Vec<f64>) -> Self {
        Self {
            gx,
            gy,
            gb: Vec::new(),
        }
    }

    pub fn with_undesirable(mut self, gb: Vec<f64>) -> Self {
        self.gb = gb;
        self
    }

    fn is_zero(&self) -> bool {
        self.gx
            .iter()
            .chain(&self.gy)
            .chain(&self.gb)
            .all(|g| *g == 0.0)
    }
}

/// Whether the frontier is fitted as a regression on y or as a directional distance function
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FrontierForm {
    #[default]
    Regression,
    Directional(Direction),
}

/// Immutable tuple of configuration axes
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub error_form: ErrorForm,
    pub orientation: Orientation,
    pub returns_to_scale: ReturnsToScale,
    pub loss: Loss,
    pub shape: ShapeMode,
    pub penalty: Penalty,
    pub form: FrontierForm,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            error_form: ErrorForm::Additive,
            orientation: Orientation::Production,
            returns_to_scale: ReturnsToScale::Variable,
            loss: Loss::LeastSquares,
            shape: ShapeMode::Concave,
            penalty: Penalty::None,
            form: FrontierForm::Regression,
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_form(mut self, error_form: ErrorForm) -> Self {
        self.error_form = error_form;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_returns_to_scale(mut self, rts: ReturnsToScale) -> Self {
        self.returns_to_scale = rts;
        self
    }

    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_shape(mut self, shape: ShapeMode) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.form = FrontierForm::Directional(direction);
        self
    }

    pub fn has_intercept(&self) -> bool {
        self.returns_to_scale == ReturnsToScale::Variable
    }

    pub fn is_directional(&self) -> bool {
        matches!(self.form, FrontierForm::Directional(_))
    }

    pub fn direction(&self) -> Option<&Direction> {
        match &self.form {
            FrontierForm::Directional(d) => Some(d),
            FrontierForm::Regression => None,
        }
    }

    /// Reject illegal combinations of axes
    pub fn validate(&self) -> Result<()> {
        let directional = self.is_directional();

        if !directional
            && self.error_form == ErrorForm::Additive
            && self.returns_to_scale == ReturnsToScale::Constant
        {
            return Err(conflict(
                "additive error form",
                "constant returns to scale",
                "the additive regression row needs an intercept",
            ));
        }
        if directional && self.error_form == ErrorForm::Multiplicative {
            return Err(conflict(
                "directional distance form",
                "multiplicative error form",
                "the distance function is fitted in levels",
            ));
        }
        if directional && self.shape == ShapeMode::Isotonic {
            return Err(conflict(
                "directional distance form",
                "isotonic shape mode",
                "dominance is defined over the inputs of a single-output frontier",
            ));
        }
        if self.shape == ShapeMode::WeaklyDisposable && !directional {
            return Err(conflict(
                "weakly-disposable shape mode",
                "regression form",
                "weak disposability needs a directional distance function with undesirable outputs",
            ));
        }

        match self.loss {
            Loss::Quantile(tau) | Loss::Expectile(tau) if !(tau > 0.0 && tau < 1.0) => {
                return Err(FrontierError::Configuration(format!(
                    "asymmetry parameter tau must lie in (0, 1), got {}",
                    tau
                )));
            }
            _ => {}
        }

        match self.penalty {
            Penalty::L1(w) | Penalty::L2(w) if !(w > 0.0 && w.is_finite()) => {
                return Err(FrontierError::Configuration(format!(
                    "penalty weight must be positive and finite, got {}",
                    w
                )));
            }
            Penalty::Lipschitz(l) if !(l > 0.0 && l.is_finite()) => {
                return Err(FrontierError::Configuration(format!(
                    "Lipschitz bound must be positive and finite, got {}",
                    l
                )));
            }
            _ => {}
        }

        if let Some(direction) = self.direction() {
            if direction.is_zero() {
                return Err(FrontierError::Configuration(
                    "direction vector is all zeros, the translation equality cannot hold".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Validate the axes and their compatibility with the observation dimensions
    pub fn validate_for(&self, data: &Observations) -> Result<()> {
        self.validate()?;

        match self.direction() {
            None => {
                if data.num_outputs() > 1 {
                    return Err(FrontierError::Configuration(format!(
                        "{} outputs need a directional distance form",
                        data.num_outputs()
                    )));
                }
                if data.num_undesirable() > 0 {
                    return Err(FrontierError::Configuration(
                        "undesirable outputs need a directional distance form".to_string(),
                    ));
                }
            }
            Some(direction) => {
                let expected = [
                    ("gx", direction.gx.len(), data.num_inputs()),
                    ("gy", direction.gy.len(), data.num_outputs()),
                    ("gb", direction.gb.len(), data.num_undesirable()),
                ];
                for (name, got, want) in expected {
                    if got != want {
                        return Err(FrontierError::Shape(format!(
                            "direction {} has {} entries but the data has {} columns",
                            name, got, want
                        )));
                    }
                }
                if data.num_contextual() > 0 {
                    return Err(FrontierError::Configuration(
                        "contextual variables are only supported on the regression form".to_string(),
                    ));
                }
            }
        }

        if self.shape == ShapeMode::WeaklyDisposable && data.num_undesirable() == 0 {
            return Err(FrontierError::Configuration(
                "weakly-disposable shape mode needs undesirable outputs".to_string(),
            ));
        }

        if self.error_form == ErrorForm::Multiplicative {
            if let Some(i) = data.output().iter().position(|v| *v <= 0.0) {
                return Err(FrontierError::InvalidData(format!(
                    "multiplicative error form needs positive outputs, y[{}] = {}",
                    i,
                    data.output()[i]
                )));
            }
        }
        Ok(())
    }
}

fn conflict(first: &str, second: &str, why: &str) -> FrontierError {
    FrontierError::Configuration(format!("{} cannot be combined with {}: {}", first, second, why))
}

// ---- String constants ----

fn unknown(axis: &str, value: &str) -> FrontierError {
    FrontierError::Configuration(format!("unknown {} '{}'", axis, value))
}

fn parse_parameter(axis: &str, raw: Option<&str>) -> Result<f64> {
    raw.ok_or_else(|| FrontierError::Configuration(format!("{} needs a parameter, e.g. '{}:0.5'", axis, axis)))?
        .trim()
        .parse::<f64>()
        .map_err(|e| FrontierError::Configuration(format!("{} parameter: {}", axis, e)))
}

impl FromStr for ErrorForm {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "addi" | "additive" => Ok(ErrorForm::Additive),
            "mult" | "multiplicative" => Ok(ErrorForm::Multiplicative),
            other => Err(unknown("error form", other)),
        }
    }
}

impl fmt::Display for ErrorForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorForm::Additive => write!(f, "addi"),
            ErrorForm::Multiplicative => write!(f, "mult"),
        }
    }
}

impl FromStr for Orientation {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Orientation::Production),
            "cost" => Ok(Orientation::Cost),
            other => Err(unknown("orientation", other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Production => write!(f, "prod"),
            Orientation::Cost => write!(f, "cost"),
        }
    }
}

impl FromStr for ReturnsToScale {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vrs" => Ok(ReturnsToScale::Variable),
            "crs" => Ok(ReturnsToScale::Constant),
            other => Err(unknown("returns to scale", other)),
        }
    }
}

impl fmt::Display for ReturnsToScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnsToScale::Variable => write!(f, "vrs"),
            ReturnsToScale::Constant => write!(f, "crs"),
        }
    }
}

impl FromStr for ShapeMode {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concave" | "free" => Ok(ShapeMode::Concave),
            "isotonic" => Ok(ShapeMode::Isotonic),
            "weak" | "weakly-disposable" => Ok(ShapeMode::WeaklyDisposable),
            other => Err(unknown("shape mode", other)),
        }
    }
}

impl fmt::Display for ShapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeMode::Concave => write!(f, "concave"),
            ShapeMode::Isotonic => write!(f, "isotonic"),
            ShapeMode::WeaklyDisposable => write!(f, "weak"),
        }
    }
}

/// Parses `ls`, `quantile:<tau>` and `expectile:<tau>`
impl FromStr for Loss {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let (name, parameter) = match lowered.split_once(':') {
            Some((name, p)) => (name, Some(p)),
            None => (lowered.as_str(), None),
        };
        match name {
            "ls" => Ok(Loss::LeastSquares),
            "quantile" => Ok(Loss::Quantile(parse_parameter("quantile", parameter)?)),
            "expectile" => Ok(Loss::Expectile(parse_parameter("expectile", parameter)?)),
            other => Err(unknown("loss", other)),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loss::LeastSquares => write!(f, "ls"),
            Loss::Quantile(tau) => write!(f, "quantile:{}", tau),
            Loss::Expectile(tau) => write!(f, "expectile:{}", tau),
        }
    }
}

/// Parses `none`, `l1:<weight>`, `l2:<weight>` and `lipschitz:<bound>`
impl FromStr for Penalty {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let (name, parameter) = match lowered.split_once(':') {
            Some((name, p)) => (name, Some(p)),
            None => (lowered.as_str(), None),
        };
        match name {
            "none" => Ok(Penalty::None),
            "l1" => Ok(Penalty::L1(parse_parameter("l1", parameter)?)),
            "l2" => Ok(Penalty::L2(parse_parameter("l2", parameter)?)),
            "lipschitz" => Ok(Penalty::Lipschitz(parse_parameter("lipschitz", parameter)?)),
            other => Err(unknown("penalty", other)),
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Penalty::None => write!(f, "none"),
            Penalty::L1(w) => write!(f, "l1:{}", w),
            Penalty::L2(w) => write!(f, "l2:{}", w),
            Penalty::Lipschitz(l) => write!(f, "lipschitz:{}", l),
        }
    }
}
