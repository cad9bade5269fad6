// Shape-constrained frontier regression: data, configuration, formulation and refinement

pub mod activation;
pub mod config;
pub mod data;
pub mod dominance;
pub mod fit;
pub mod formulation;
pub mod layout;
pub mod refine;
pub mod sweet_spot;

pub use activation::ActivationMatrix;
pub use config::{
    Direction, ErrorForm, FrontierForm, Loss, ModelConfig, Orientation, Penalty, ReturnsToScale,
    ShapeMode,
};
pub use data::{IntoTable, Observations};
pub use dominance::DominanceMatrix;
pub use fit::Fit;
pub use formulation::{Formulation, FormulationCounts, ProblemFormulator};
pub use layout::VariableLayout;
pub use refine::{CuttingPlaneRefiner, IterationRecord, Refinement, RefinerOptions, RefinerState};
pub use sweet_spot::NeighborhoodPruner;
