//! Many-objective sorting with a per-objective archive.

use std::collections::{BTreeSet, HashSet};

use gauntlet_model::{Candidate, Chromosome, ChromosomeId};
use tracing::info;

use super::ranking::{fill_by_fronts, non_dominated_sort};
use crate::fitness::Objective;

#[derive(Debug, Clone)]
struct ArchiveEntry<T> {
    chromosome: Chromosome<T>,
    loss: f64,
    length: usize,
}

/// Best chromosome seen so far for every objective, plus the set of
/// objectives whose target has been reached.
#[derive(Debug, Clone)]
pub struct MosaArchive<T> {
    best: Vec<Option<ArchiveEntry<T>>>,
    covered: BTreeSet<usize>,
}

impl<T: Candidate> MosaArchive<T> {
    pub fn new(objectives: usize) -> Self {
        Self {
            best: vec![None; objectives],
            covered: BTreeSet::new(),
        }
    }

    /// Offer `chromosome` with its raw values. Per objective it replaces
    /// the archived entry if its loss is lower, or equal with fewer actions.
    /// Returns whether anything changed.
    pub fn update(
        &mut self,
        chromosome: &Chromosome<T>,
        raw: &[f64],
        objectives: &[Objective],
    ) -> bool {
        let length = chromosome.value().total_actions();
        let mut changed = false;

        for (index, (objective, &value)) in objectives.iter().zip(raw).enumerate() {
            let Some(slot) = self.best.get_mut(index) else {
                continue;
            };
            let loss = objective.loss(value);
            let replace = match slot {
                None => true,
                Some(entry) => loss < entry.loss || (loss == entry.loss && length < entry.length),
            };
            if replace {
                *slot = Some(ArchiveEntry {
                    chromosome: chromosome.clone(),
                    loss,
                    length,
                });
                changed = true;
            }
            if objective.is_covered(value) && self.covered.insert(index) {
                info!(objective = %objective, chromosome = %chromosome.id(), "objective covered");
            }
        }
        changed
    }

    pub fn covered(&self) -> &BTreeSet<usize> {
        &self.covered
    }

    pub fn uncovered(&self) -> Vec<usize> {
        (0..self.best.len())
            .filter(|i| !self.covered.contains(i))
            .collect()
    }

    pub fn best_for(&self, objective: usize) -> Option<&Chromosome<T>> {
        self.best.get(objective)?.as_ref().map(|e| &e.chromosome)
    }

    /// Archived chromosomes without duplicates, in objective order.
    pub fn members(&self) -> Vec<Chromosome<T>> {
        let mut seen = HashSet::new();
        self.best
            .iter()
            .flatten()
            .filter(|e| seen.insert(e.chromosome.id()))
            .map(|e| e.chromosome.clone())
            .collect()
    }

    pub fn ids(&self) -> HashSet<ChromosomeId> {
        self.best
            .iter()
            .flatten()
            .map(|e| e.chromosome.id())
            .collect()
    }
}

/// Pick `count` survivors using only the still uncovered objectives.
///
/// The preference front holds, for each uncovered objective, the member
/// with the lowest loss (fewer actions, then first seen, on ties). The
/// remaining members are ranked by Pareto fronts.
pub fn mosa_survivors(
    losses: &[Vec<f64>],
    lengths: &[usize],
    uncovered: &[usize],
    count: usize,
) -> Vec<usize> {
    let targets: Vec<usize> = if uncovered.is_empty() {
        (0..losses.first().map_or(0, Vec::len)).collect()
    } else {
        uncovered.to_vec()
    };
    let projected: Vec<Vec<f64>> = losses
        .iter()
        .map(|l| targets.iter().map(|&m| l[m]).collect())
        .collect();

    let mut preferred = Vec::new();
    for k in 0..targets.len() {
        let best = (0..projected.len()).min_by(|&a, &b| {
            projected[a][k]
                .total_cmp(&projected[b][k])
                .then(lengths[a].cmp(&lengths[b]))
        });
        if let Some(best) = best {
            if !preferred.contains(&best) {
                preferred.push(best);
            }
        }
    }

    let rest: Vec<usize> = (0..projected.len())
        .filter(|i| !preferred.contains(i))
        .collect();
    let rest_losses: Vec<Vec<f64>> = rest.iter().map(|&i| projected[i].clone()).collect();

    let mut fronts = vec![preferred];
    fronts.extend(
        non_dominated_sort(&rest_losses)
            .into_iter()
            .map(|front| front.into_iter().map(|k| rest[k]).collect::<Vec<_>>()),
    );
    fill_by_fronts(fronts, &projected, count)
}
