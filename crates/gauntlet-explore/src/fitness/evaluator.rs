use std::collections::HashSet;

use gauntlet_model::{Candidate, Chromosome, ChromosomeId};
use tracing::debug;

use super::cache::FitnessCache;
use super::objective::Objective;
use super::oracle::{FitnessOracle, OracleError};

#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("chromosome {0} has an unfinished episode")]
    Unfinished(ChromosomeId),
    #[error("objective {0} is not registered with this evaluator")]
    UnknownObjective(String),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("oracle returned {actual} values for {expected} objectives")]
    OracleShape { expected: usize, actual: usize },
}

/// Computes and caches fitness values for a fixed list of objectives.
///
/// Oracle-backed objectives are measured together: the first miss for a
/// chromosome fills the cache for all of them.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    objectives: Vec<Objective>,
    oracle_objectives: Vec<usize>,
    cache: FitnessCache,
    oracle_calls: u64,
}

impl FitnessEvaluator {
    pub fn new(objectives: Vec<Objective>) -> Self {
        let oracle_objectives = objectives
            .iter()
            .enumerate()
            .filter(|(_, o)| o.needs_oracle())
            .map(|(i, _)| i)
            .collect();
        let cache = FitnessCache::new(objectives.len());
        Self {
            objectives,
            oracle_objectives,
            cache,
            oracle_calls: 0,
        }
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Number of batched oracle requests issued so far.
    pub fn oracle_calls(&self) -> u64 {
        self.oracle_calls
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Raw value of `objective` for `chromosome`.
    pub fn evaluate<T: Candidate>(
        &mut self,
        objective: &Objective,
        chromosome: &Chromosome<T>,
        oracle: &mut dyn FitnessOracle,
    ) -> Result<f64, FitnessError> {
        let index = self
            .objectives
            .iter()
            .position(|o| o == objective)
            .ok_or_else(|| FitnessError::UnknownObjective(objective.to_string()))?;
        self.evaluate_at(index, chromosome, oracle)
    }

    fn evaluate_at<T: Candidate>(
        &mut self,
        index: usize,
        chromosome: &Chromosome<T>,
        oracle: &mut dyn FitnessOracle,
    ) -> Result<f64, FitnessError> {
        let id = chromosome.id();
        if let Some(value) = self.cache.get(index, id) {
            return Ok(value);
        }
        if !chromosome.value().is_finished() {
            return Err(FitnessError::Unfinished(id));
        }

        let candidate = chromosome.value().view();
        if let Some(value) = self.objectives[index].local_value(candidate) {
            self.cache.insert(index, id, value);
            return Ok(value);
        }

        let requested: Vec<Objective> = self
            .oracle_objectives
            .iter()
            .map(|&i| self.objectives[i].clone())
            .collect();
        self.oracle_calls += 1;
        let values = oracle.measure(id, candidate, &requested)?;
        if values.len() != requested.len() {
            return Err(FitnessError::OracleShape {
                expected: requested.len(),
                actual: values.len(),
            });
        }
        for (&objective, value) in self.oracle_objectives.iter().zip(values) {
            self.cache.insert(objective, id, value);
        }
        debug!(chromosome = %id, objectives = requested.len(), "oracle measurement cached");

        self.cache
            .get(index, id)
            .ok_or_else(|| FitnessError::UnknownObjective(self.objectives[index].to_string()))
    }

    /// Raw values for every registered objective, in registration order.
    pub fn vector<T: Candidate>(
        &mut self,
        chromosome: &Chromosome<T>,
        oracle: &mut dyn FitnessOracle,
    ) -> Result<Vec<f64>, FitnessError> {
        (0..self.objectives.len())
            .map(|i| self.evaluate_at(i, chromosome, oracle))
            .collect()
    }

    /// Like [`vector`](Self::vector) but on the lower-is-better scale.
    pub fn losses<T: Candidate>(
        &mut self,
        chromosome: &Chromosome<T>,
        oracle: &mut dyn FitnessOracle,
    ) -> Result<Vec<f64>, FitnessError> {
        let raw = self.vector(chromosome, oracle)?;
        Ok(self.to_losses(&raw))
    }

    pub fn to_losses(&self, raw: &[f64]) -> Vec<f64> {
        self.objectives
            .iter()
            .zip(raw)
            .map(|(o, &v)| o.loss(v))
            .collect()
    }

    /// Forget values for chromosomes outside `alive`.
    pub fn purge(&mut self, alive: &HashSet<ChromosomeId>) -> usize {
        let removed = self.cache.purge(alive);
        if removed > 0 {
            debug!(removed, remaining = self.cache.len(), "fitness cache purged");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
