use std::collections::BTreeMap;

use gauntlet_model::{CandidateRef, ChromosomeId, Episode, EpisodeId, StateId};

use super::objective::Objective;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle cannot measure {0}")]
    Unsupported(String),
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Coverage source for objectives that cannot be derived from the
/// candidate itself.
pub trait FitnessOracle: Send {
    /// Measure all `objectives` for one chromosome in a single batch.
    /// The result is aligned with `objectives`.
    fn measure(
        &mut self,
        chromosome: ChromosomeId,
        candidate: CandidateRef<'_>,
        objectives: &[Objective],
    ) -> Result<Vec<f64>, OracleError>;

    /// Called once for every finished episode, before any measurement
    /// that involves it.
    fn record_episode(&mut self, _episode: &Episode) -> Result<(), OracleError> {
        Ok(())
    }
}

/// Oracle for runs that only use locally computed objectives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

impl FitnessOracle for NoOracle {
    fn measure(
        &mut self,
        _chromosome: ChromosomeId,
        _candidate: CandidateRef<'_>,
        objectives: &[Objective],
    ) -> Result<Vec<f64>, OracleError> {
        match objectives.first() {
            None => Ok(Vec::new()),
            Some(objective) => Err(OracleError::Unsupported(objective.to_string())),
        }
    }
}

/// Deterministic oracle that derives coverage from visited screen states.
///
/// A branch is described by the path of states leading to it; its
/// distance is the fraction of that path never visited. A line is
/// covered when its state was visited.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    branches: BTreeMap<String, Vec<StateId>>,
    lines: BTreeMap<String, StateId>,
    recorded: Vec<EpisodeId>,
    measure_calls: u64,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, name: &str, path: &[&str]) -> Self {
        self.branches
            .insert(name.to_string(), path.iter().map(|s| StateId::new(*s)).collect());
        self
    }

    pub fn with_line(mut self, name: &str, state: &str) -> Self {
        self.lines.insert(name.to_string(), StateId::new(state));
        self
    }

    pub fn measure_calls(&self) -> u64 {
        self.measure_calls
    }

    pub fn recorded_episodes(&self) -> &[EpisodeId] {
        &self.recorded
    }

    fn branch_distance(&self, branch: &str, candidate: CandidateRef<'_>) -> Option<f64> {
        let path = self.branches.get(branch)?;
        if path.is_empty() {
            return Some(0.0);
        }
        let visited = candidate.visited_states();
        let reached = path.iter().take_while(|s| visited.contains(s)).count();
        Some(1.0 - reached as f64 / path.len() as f64)
    }
}

impl FitnessOracle for ScriptedOracle {
    fn measure(
        &mut self,
        _chromosome: ChromosomeId,
        candidate: CandidateRef<'_>,
        objectives: &[Objective],
    ) -> Result<Vec<f64>, OracleError> {
        self.measure_calls += 1;
        let visited = candidate.visited_states();
        objectives
            .iter()
            .map(|objective| match objective {
                Objective::BranchDistance(branch) => self
                    .branch_distance(branch, candidate)
                    .ok_or_else(|| OracleError::Unsupported(objective.to_string())),
                Objective::LineCoverage(line) => self
                    .lines
                    .get(line)
                    .map(|s| if visited.contains(s) { 1.0 } else { 0.0 })
                    .ok_or_else(|| OracleError::Unsupported(objective.to_string())),
                Objective::BranchCoverage => {
                    if self.branches.is_empty() {
                        return Ok(0.0);
                    }
                    let covered = self
                        .branches
                        .keys()
                        .filter(|b| self.branch_distance(b, candidate) == Some(0.0))
                        .count();
                    Ok(covered as f64 / self.branches.len() as f64)
                }
                other => other
                    .local_value(candidate)
                    .ok_or_else(|| OracleError::Unsupported(other.to_string())),
            })
            .collect()
    }

    fn record_episode(&mut self, episode: &Episode) -> Result<(), OracleError> {
        self.recorded.push(episode.id());
        Ok(())
    }
}
