pub mod cache;
pub mod evaluator;
pub mod objective;
pub mod oracle;

pub use cache::FitnessCache;
pub use evaluator::{FitnessError, FitnessEvaluator};
pub use objective::{Direction, Objective};
pub use oracle::{FitnessOracle, NoOracle, OracleError, ScriptedOracle};
