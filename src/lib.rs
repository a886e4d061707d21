pub mod rng;
pub mod data;
pub mod fit;
pub mod sim;
pub mod player;
pub mod viz;

pub use rng::Lcg;
pub use data::{Sample, GenParams, ParamError, generate, MAX_CLUSTERS, X_DOMAIN};
pub use fit::{Fit, Norm, DegenerateFit, fit_line};
pub use sim::{Simulation, Phase, StepError, reassign};
pub use player::{Player, DEFAULT_CADENCE};
pub use viz::spawn_visualizer;
