use std::time::Instant;

use gauntlet_model::{ActionResult, Candidate, Chromosome, Episode};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::qtable::QTable;
use super::reward::intermediate_reward;
use crate::context::SearchContext;
use crate::error::SearchError;
use crate::fitness::Objective;
use crate::search::{GenerationSummary, SearchAlgorithm, SearchOutcome, StopCause};
use crate::termination::{SearchProgress, TerminationCondition};

#[derive(Debug, Clone, Copy)]
pub struct RlParams {
    /// Probability of a uniformly random action.
    pub epsilon: f64,
    pub discount_factor: f64,
    pub max_actions: usize,
}

/// Epsilon-greedy policy over a [`QTable`] that learns after every step.
#[derive(Debug, Clone)]
pub struct QPolicy {
    table: QTable,
    epsilon: f64,
    gamma: f64,
}

impl QPolicy {
    pub fn new(epsilon: f64, gamma: f64) -> Self {
        Self {
            table: QTable::new(),
            epsilon: epsilon.clamp(0.0, 1.0),
            gamma,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// Pick, execute and learn from one action in the current state.
    /// `None` when the screen offers no executable action.
    pub fn step(
        &mut self,
        ctx: &mut SearchContext<'_>,
        episode: &mut Episode,
    ) -> Result<Option<ActionResult>, SearchError> {
        let pre = ctx.device.current_state();
        if pre.actions.is_empty() {
            debug!(state = %pre.id, "no executable action");
            return Ok(None);
        }
        self.table.ensure_state(&pre.id, &pre.actions);

        let explore = ctx.rng.gen_bool(self.epsilon);
        let chosen = if explore {
            pre.actions.choose(&mut *ctx.rng)
        } else {
            self.table
                .best_actions(&pre.id, &pre.actions)
                .choose(&mut *ctx.rng)
                .copied()
        };
        let Some(action) = chosen.cloned() else {
            return Ok(None);
        };

        let result = episode.apply_action(&mut *ctx.device, action.clone())?;
        let post = ctx.device.current_state();
        let reward = intermediate_reward(&pre, &post);
        let value = self
            .table
            .learn(&pre.id, &action, reward, &post.id, self.gamma);
        debug!(
            from = %pre.id,
            to = %post.id,
            action = %action,
            explore,
            reward,
            value,
            "q-value updated"
        );
        Ok(Some(result))
    }
}

/// Raw activity and state counts, the figures explorers are ranked by.
pub(crate) fn exploration_fitness(episode: &Episode) -> Vec<f64> {
    [Objective::ActivityCount, Objective::StateCount]
        .iter()
        .map(|o| o.local_value(episode.view()).unwrap_or(0.0))
        .collect()
}

/// Package explored episodes as a search outcome, most activities first.
pub(crate) fn exploration_outcome(
    mut episodes: Vec<Chromosome<Episode>>,
    generations: u64,
    stop: StopCause,
    history: Vec<GenerationSummary>,
    started: Instant,
) -> SearchOutcome<Episode> {
    episodes.sort_by_cached_key(|c| {
        let e = c.value();
        std::cmp::Reverse((e.visited_activities().len(), e.visited_states().len()))
    });
    let fitness = episodes.iter().map(|c| exploration_fitness(c.value())).collect();
    SearchOutcome {
        population: episodes,
        fitness,
        archive: Vec::new(),
        objectives: vec![
            Objective::ActivityCount.to_string(),
            Objective::StateCount.to_string(),
        ],
        generations,
        stop,
        history,
        elapsed: started.elapsed(),
    }
}

/// Episodes driven by an epsilon-greedy Q-learning policy.
///
/// The Q-table persists for the whole run. The app is only reset before
/// the first episode and after an episode that left the app or crashed.
pub struct QLearningExplorer {
    params: RlParams,
    policy: QPolicy,
    termination: Box<dyn TerminationCondition>,
}

impl QLearningExplorer {
    pub fn new(params: RlParams, termination: Box<dyn TerminationCondition>) -> Self {
        Self {
            policy: QPolicy::new(params.epsilon, params.discount_factor),
            params,
            termination,
        }
    }

    pub fn policy(&self) -> &QPolicy {
        &self.policy
    }

    /// Run a single episode from the current app state. Returns the last
    /// result so the caller knows whether the app is still usable.
    fn explore(
        &mut self,
        ctx: &mut SearchContext<'_>,
        episode: &mut Episode,
    ) -> Result<Option<ActionResult>, SearchError> {
        let mut last = None;
        while episode.len() < self.params.max_actions {
            if ctx.is_exhausted() {
                break;
            }
            let Some(result) = self.policy.step(ctx, episode)? else {
                break;
            };
            last = Some(result);
            if !result.should_continue() {
                break;
            }
        }
        Ok(last)
    }
}

impl SearchAlgorithm<Episode> for QLearningExplorer {
    fn name(&self) -> &'static str {
        "q_learning"
    }

    fn run(&mut self, ctx: &mut SearchContext<'_>) -> Result<SearchOutcome<Episode>, SearchError> {
        let started = Instant::now();
        let mut episodes = Vec::new();
        let mut history = Vec::new();
        let mut needs_reset = true;
        let mut completed = 0u64;

        let stop = loop {
            let progress = SearchProgress {
                generation: completed,
                elapsed: started.elapsed(),
                uncovered: None,
            };
            if self.termination.is_met(&progress) {
                break StopCause::ConditionMet;
            }
            if ctx.is_exhausted() {
                break StopCause::BudgetExhausted;
            }

            if needs_reset {
                ctx.device.reset_app();
            }
            let mut episode = Episode::new();
            episode.begin(&mut *ctx.device)?;
            let last = self.explore(ctx, &mut episode)?;
            ctx.seal(&mut episode);
            needs_reset = last.is_some_and(|r| !r.should_continue());

            info!(
                episode = %episode.id(),
                actions = episode.len(),
                activities = episode.visited_activities().len(),
                states = self.policy.table().state_count(),
                crashed = episode.has_crashed(),
                "q-learning episode finished"
            );
            history.push(GenerationSummary {
                generation: completed,
                population: 1,
                best_value: Some(episode.visited_activities().len() as f64),
                covered_objectives: 0,
                purged_entries: 0,
            });
            episodes.push(Chromosome::new(episode));
            completed += 1;
        };

        Ok(exploration_outcome(episodes, completed, stop, history, started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Budget;
    use crate::fitness::NoOracle;
    use crate::rng::run_rng;
    use crate::termination::IterationsTermination;
    use gauntlet_model::sim::{screen, SimulatedApp, Transition};
    use gauntlet_model::{StateId, Widget, WidgetAction};

    fn ping_pong() -> SimulatedApp {
        let go = Widget::button("go", "Go", (0, 0, 100, 100));
        let back = Widget::button("back", "Back", (0, 0, 100, 100));
        let mut app = SimulatedApp::new(screen("a", "PingActivity", "pkg", vec![go]));
        app.add_screen(screen("b", "PongActivity", "pkg", vec![back]))
            .on_click("a", "go", Transition::Goto(StateId::new("b")))
            .on_click("b", "back", Transition::Goto(StateId::new("a")));
        app
    }

    #[test]
    fn test_q_values_carry_across_episodes() {
        let mut app = ping_pong();
        let mut rng = run_rng(3);
        let mut oracle = NoOracle;
        let budget = Budget::unlimited();
        let mut ctx = SearchContext::new(&mut app, &mut rng, &mut oracle, &budget);

        let params = RlParams {
            epsilon: 0.0,
            discount_factor: 0.5,
            max_actions: 2,
        };
        let mut explorer = QLearningExplorer::new(params, Box::new(IterationsTermination::new(2)));
        let outcome = explorer.run(&mut ctx).unwrap();
        assert_eq!(outcome.generations, 2);
        assert_eq!(outcome.stop, StopCause::ConditionMet);

        // every hop removes the only widget: reward 1
        // ep1: Q(a,go)=1, Q(b,back)=1+0.5*1
        // ep2: Q(a,go)=1+0.5*1.5, Q(b,back)=1+0.5*1.75
        let table = explorer.policy().table();
        let go = WidgetAction::click(Widget::button("go", "Go", (0, 0, 100, 100)));
        let back = WidgetAction::click(Widget::button("back", "Back", (0, 0, 100, 100)));
        assert_eq!(table.get(&StateId::new("a"), &go), 1.75);
        assert_eq!(table.get(&StateId::new("b"), &back), 1.875);
    }

    #[test]
    fn test_episodes_stop_at_max_actions() {
        let mut app = gauntlet_model::sim::sample_app();
        let mut rng = run_rng(11);
        let mut oracle = NoOracle;
        let budget = Budget::unlimited();
        let mut ctx = SearchContext::new(&mut app, &mut rng, &mut oracle, &budget);

        let params = RlParams {
            epsilon: 0.8,
            discount_factor: 0.9,
            max_actions: 6,
        };
        let mut explorer = QLearningExplorer::new(params, Box::new(IterationsTermination::new(4)));
        let outcome = explorer.run(&mut ctx).unwrap();
        assert_eq!(outcome.population.len(), 4);
        for chromosome in &outcome.population {
            assert!(chromosome.value().len() <= 6);
            assert!(chromosome.value().is_finished());
        }
    }
}
