use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use gauntlet_model::{Chromosome, Episode};
use tracing::{debug, info, warn};

use super::qlearning::{exploration_outcome, QPolicy, RlParams};
use crate::context::SearchContext;
use crate::error::SearchError;
use crate::search::{GenerationSummary, SearchAlgorithm, SearchOutcome, StopCause};
use crate::termination::{SearchProgress, TerminationCondition};

#[derive(Debug, Clone)]
pub struct CageParams {
    pub rl: RlParams,
    /// Upper bound on rounds per target, re-openings included.
    pub max_rounds: u32,
    pub main_activity: String,
    pub exported_activities: Vec<String>,
}

/// Explores one activity at a time.
///
/// Targets are launched directly and explored until the app leaves them.
/// A target whose cage turned up a new activity or a new crash gets
/// another round. Targets that cannot be launched are dropped.
pub struct ActivityInsulatedExplorer {
    params: CageParams,
    policy: QPolicy,
    termination: Box<dyn TerminationCondition>,
    queue: VecDeque<String>,
    enqueued: HashSet<String>,
    crash_signatures: HashSet<String>,
    dropped: Vec<String>,
}

impl ActivityInsulatedExplorer {
    pub fn new(params: CageParams, termination: Box<dyn TerminationCondition>) -> Self {
        Self {
            policy: QPolicy::new(params.rl.epsilon, params.rl.discount_factor),
            params,
            termination,
            queue: VecDeque::new(),
            enqueued: HashSet::new(),
            crash_signatures: HashSet::new(),
            dropped: Vec::new(),
        }
    }

    /// Targets given up on because they could not be launched.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn crash_signatures(&self) -> &HashSet<String> {
        &self.crash_signatures
    }

    fn enqueue(&mut self, activity: &str) -> bool {
        if activity.is_empty() || !self.enqueued.insert(activity.to_string()) {
            return false;
        }
        self.queue.push_back(activity.to_string());
        true
    }

    fn seed_queue(&mut self) {
        self.queue.clear();
        self.enqueued.clear();
        self.crash_signatures.clear();
        self.dropped.clear();

        let main = self.params.main_activity.clone();
        self.enqueue(&main);
        let exported = self.params.exported_activities.clone();
        for activity in exported.iter().filter(|a| **a != main) {
            self.enqueue(activity);
        }
    }

    /// One round inside the cage of `target`. `None` if it could not be
    /// launched.
    fn cage_round(
        &mut self,
        ctx: &mut SearchContext<'_>,
        target: &str,
    ) -> Result<Option<Episode>, SearchError> {
        ctx.device.reset_app();
        if !ctx.device.launch_activity(target) {
            return Ok(None);
        }

        let mut episode = Episode::new();
        episode.begin(&mut *ctx.device)?;
        while episode.len() < self.params.rl.max_actions {
            if ctx.is_exhausted() {
                break;
            }
            let Some(result) = self.policy.step(ctx, &mut episode)? else {
                break;
            };
            if !result.should_continue() {
                break;
            }
            if episode.activity_sequence().last().map(String::as_str) != Some(target) {
                debug!(target, "left the cage");
                break;
            }
        }
        ctx.seal(&mut episode);
        Ok(Some(episode))
    }

    /// Whether `episode` found something that justifies another round.
    fn absorb(&mut self, episode: &Episode) -> bool {
        let mut reopen = false;
        for activity in episode.visited_activities() {
            if self.enqueue(activity) {
                info!(activity = %activity, "new activity enqueued");
                reopen = true;
            }
        }
        if let Some(crash) = episode.crash() {
            let signature = crash.signature();
            if self.crash_signatures.insert(signature.clone()) {
                info!(signature = %signature, activity = %crash.activity, "new crash");
                reopen = true;
            }
        }
        reopen
    }
}

impl SearchAlgorithm<Episode> for ActivityInsulatedExplorer {
    fn name(&self) -> &'static str {
        "activity_insulated"
    }

    fn run(&mut self, ctx: &mut SearchContext<'_>) -> Result<SearchOutcome<Episode>, SearchError> {
        let started = Instant::now();
        self.seed_queue();
        let mut episodes = Vec::new();
        let mut history = Vec::new();
        let mut completed = 0u64;

        let stop = 'targets: loop {
            let Some(target) = self.queue.pop_front() else {
                break StopCause::WorkDrained;
            };
            info!(target = %target, pending = self.queue.len(), "cage opened");

            let mut rounds = 0;
            let mut reopen = true;
            while reopen && rounds < self.params.max_rounds {
                let progress = SearchProgress {
                    generation: completed,
                    elapsed: started.elapsed(),
                    uncovered: Some(self.queue.len()),
                };
                if self.termination.is_met(&progress) {
                    break 'targets StopCause::ConditionMet;
                }
                if ctx.is_exhausted() {
                    break 'targets StopCause::BudgetExhausted;
                }

                rounds += 1;
                let Some(episode) = self.cage_round(ctx, &target)? else {
                    warn!(target = %target, "activity cannot be launched, dropping it");
                    self.dropped.push(target.clone());
                    break;
                };
                reopen = self.absorb(&episode);
                debug!(target = %target, round = rounds, reopen, actions = episode.len(), "cage round finished");

                history.push(GenerationSummary {
                    generation: completed,
                    population: 1,
                    best_value: Some(episode.visited_activities().len() as f64),
                    covered_objectives: self.enqueued.len() - self.queue.len(),
                    purged_entries: 0,
                });
                episodes.push(Chromosome::new(episode));
                completed += 1;
            }
            info!(target = %target, rounds, "cage closed");
        };

        info!(
            episodes = completed,
            activities = self.enqueued.len(),
            crashes = self.crash_signatures.len(),
            dropped = self.dropped.len(),
            stop = ?stop,
            "activity-insulated exploration finished"
        );
        Ok(exploration_outcome(episodes, completed, stop, history, started))
    }
}
