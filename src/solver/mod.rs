// Solver adapters module

#[cfg(feature = "clarabel")]
pub mod clarabel_solver;
#[cfg(feature = "coin_cbc")]
pub mod coin_cbc_solver;
pub mod factory;
#[cfg(feature = "highs")]
pub mod highs_solver;
#[cfg(any(feature = "microlp", feature = "coin_cbc"))]
pub mod lp_model;
#[cfg(feature = "microlp")]
pub mod microlp_solver;
pub mod sequential;

#[cfg(feature = "clarabel")]
pub use clarabel_solver::ClarabelSolver;
#[cfg(feature = "coin_cbc")]
pub use coin_cbc_solver::CoinCbcSolver;
pub use factory::SolverFactory;
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;
#[cfg(feature = "microlp")]
pub use microlp_solver::MicroLpSolver;
pub use sequential::SequentialLinearization;
