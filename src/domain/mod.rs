// Domain module: solver boundary models and the crate error taxonomy

pub mod errors;
pub mod models;
pub mod solver_service;
pub mod value_objects;

pub use errors::*;
pub use models::*;
pub use solver_service::{Result as SolverResult, SolverError, SolverService};
pub use value_objects::*;
