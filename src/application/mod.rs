// Application layer: estimation use cases

pub mod estimator;

pub use estimator::{Estimate, FrontierEstimator, Pruning};
