pub mod crossover;
pub mod mutation;
pub mod selection;

pub use crossover::{CrossoverFunction, MergeCrossover, UniformSuiteCrossover};
pub use mutation::{CutPointMutation, MutationFunction, PrimitiveShuffleMutation, SuiteCutPointMutation};
pub use selection::{
    FitnessSelection, IdentitySelection, RandomSelection, RankSelection, SelectionFunction,
    TournamentSelection,
};
