use std::time::Duration;

use gauntlet_model::{Candidate, Chromosome};
use serde::Serialize;

use crate::context::SearchContext;
use crate::error::SearchError;

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    /// The configured termination condition held.
    ConditionMet,
    /// The run budget ran out or the run was cancelled; results are
    /// the last completed generation.
    BudgetExhausted,
    /// An explorer ran out of targets.
    WorkDrained,
}

/// One row of the per-generation history.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub generation: u64,
    pub population: usize,
    /// Raw value of the first objective for the best member.
    pub best_value: Option<f64>,
    pub covered_objectives: usize,
    pub purged_entries: usize,
}

/// What a finished search hands back.
#[derive(Debug, Clone)]
pub struct SearchOutcome<T> {
    /// Final population, best first.
    pub population: Vec<Chromosome<T>>,
    /// Raw fitness vectors aligned with `population`.
    pub fitness: Vec<Vec<f64>>,
    /// Best chromosome per objective, deduplicated.
    pub archive: Vec<Chromosome<T>>,
    pub objectives: Vec<String>,
    pub generations: u64,
    pub stop: StopCause,
    pub history: Vec<GenerationSummary>,
    pub elapsed: Duration,
}

impl<T> SearchOutcome<T> {
    pub fn best(&self) -> Option<&Chromosome<T>> {
        self.population.first()
    }
}

/// A runnable search strategy over candidates of type `T`.
pub trait SearchAlgorithm<T: Candidate>: Send {
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut SearchContext<'_>) -> Result<SearchOutcome<T>, SearchError>;
}
