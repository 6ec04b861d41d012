pub mod context;
pub mod error;
pub mod factory;
pub mod fitness;
pub mod genetic;
pub mod operators;
pub mod provider;
pub mod rl;
pub mod rng;
pub mod search;
pub mod termination;

pub use context::{Budget, SearchContext};
pub use error::SearchError;
pub use provider::{build, Engine, RunOutcome};
pub use search::{GenerationSummary, SearchAlgorithm, SearchOutcome, StopCause};
