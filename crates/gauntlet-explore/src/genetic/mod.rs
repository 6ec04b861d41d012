pub mod engine;
pub mod mosa;
pub mod ranking;

pub use engine::{GaParams, GeneticAlgorithm, Phase, Strategy};
pub use mosa::{mosa_survivors, MosaArchive};
pub use ranking::{crowding_distance, dominates, non_dominated_sort, nsga2_survivors};
