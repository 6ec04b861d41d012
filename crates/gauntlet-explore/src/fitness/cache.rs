use std::collections::{HashMap, HashSet};

use gauntlet_model::ChromosomeId;

/// Per-objective fitness values keyed by chromosome identity.
///
/// Owned by one evaluator, so values never leak between runs.
#[derive(Debug, Clone, Default)]
pub struct FitnessCache {
    objectives: Vec<HashMap<ChromosomeId, f64>>,
}

impl FitnessCache {
    pub fn new(objective_count: usize) -> Self {
        Self {
            objectives: vec![HashMap::new(); objective_count],
        }
    }

    pub fn get(&self, objective: usize, id: ChromosomeId) -> Option<f64> {
        self.objectives.get(objective)?.get(&id).copied()
    }

    pub fn insert(&mut self, objective: usize, id: ChromosomeId, value: f64) {
        if let Some(values) = self.objectives.get_mut(objective) {
            values.insert(id, value);
        }
    }

    /// Drop every entry whose chromosome is not in `alive`.
    /// Returns the number of removed entries.
    pub fn purge(&mut self, alive: &HashSet<ChromosomeId>) -> usize {
        let mut removed = 0;
        for values in &mut self.objectives {
            let before = values.len();
            values.retain(|id, _| alive.contains(id));
            removed += before - values.len();
        }
        removed
    }

    pub fn clear(&mut self) {
        for values in &mut self.objectives {
            values.clear();
        }
    }

    /// Total number of cached values.
    pub fn len(&self) -> usize {
        self.objectives.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
