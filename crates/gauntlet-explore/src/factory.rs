use gauntlet_model::{
    Action, Chromosome, Episode, PrimitiveAction, ScreenState, TestSuite,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::context::SearchContext;
use crate::error::SearchError;

/// Where freshly sampled actions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    /// A random executable action of the current screen.
    Widget,
    /// A random coordinate or key event within the screen bounds.
    Primitive { width: u32, height: u32 },
}

impl ActionSource {
    /// Sample the next action, or `None` if the screen offers nothing.
    pub fn sample<R: Rng + ?Sized>(&self, state: &ScreenState, rng: &mut R) -> Option<Action> {
        match *self {
            Self::Widget => state.actions.choose(rng).cloned(),
            Self::Primitive { width, height } => {
                Some(Action::Primitive(PrimitiveAction::random(rng, width, height)))
            }
        }
    }
}

/// Builds the initial candidates of a search.
pub trait ChromosomeFactory<T>: Send {
    fn create(&mut self, ctx: &mut SearchContext<'_>) -> Result<Chromosome<T>, SearchError>;
}

/// Extend `episode` with sampled actions until it holds `target` actions,
/// the app leaves or crashes, the screen runs dry, or the budget trips.
pub(crate) fn fill_random(
    ctx: &mut SearchContext<'_>,
    episode: &mut Episode,
    source: ActionSource,
    target: usize,
) -> Result<(), SearchError> {
    while episode.len() < target {
        if ctx.is_exhausted() {
            debug!(episode = %episode.id(), "budget exhausted while extending episode");
            break;
        }
        let state = ctx.device.current_state();
        let Some(action) = source.sample(&state, &mut *ctx.rng) else {
            debug!(state = %state.id, "no executable action");
            break;
        };
        if !episode.apply_action(&mut *ctx.device, action)?.should_continue() {
            break;
        }
    }
    Ok(())
}

/// Reset the app and run a fresh random episode.
pub fn random_episode(
    ctx: &mut SearchContext<'_>,
    source: ActionSource,
    max_actions: usize,
) -> Result<Episode, SearchError> {
    ctx.device.reset_app();
    let mut episode = Episode::new();
    episode.begin(&mut *ctx.device)?;
    fill_random(ctx, &mut episode, source, max_actions)?;
    ctx.seal(&mut episode);
    Ok(episode)
}

/// Re-execute `template` on a freshly reset app.
///
/// Template actions run while they are still executable; the first one
/// that is not ends the replayed prefix. The episode is then topped up
/// with sampled actions until it reaches the template's desired size
/// (its own length if unset).
pub fn replay(
    ctx: &mut SearchContext<'_>,
    template: &[Action],
    desired_size: Option<usize>,
    source: ActionSource,
) -> Result<Episode, SearchError> {
    let target = desired_size.unwrap_or(template.len());

    ctx.device.reset_app();
    let mut episode = Episode::new();
    episode.begin(&mut *ctx.device)?;

    let mut stopped = false;
    for action in template.iter().take(target) {
        if ctx.is_exhausted() {
            stopped = true;
            break;
        }
        let state = ctx.device.current_state();
        if !state.can_execute(action) {
            debug!(episode = %episode.id(), index = episode.len(), "template action no longer executable");
            break;
        }
        if !episode
            .apply_action(&mut *ctx.device, action.clone())?
            .should_continue()
        {
            stopped = true;
            break;
        }
    }
    if !stopped {
        fill_random(ctx, &mut episode, source, target)?;
    }

    ctx.seal(&mut episode);
    Ok(episode)
}

/// Random episodes of up to `max_actions` actions, each from a reset app.
#[derive(Debug, Clone)]
pub struct RandomEpisodeFactory {
    source: ActionSource,
    max_actions: usize,
}

impl RandomEpisodeFactory {
    pub fn new(source: ActionSource, max_actions: usize) -> Self {
        Self {
            source,
            max_actions,
        }
    }
}

impl ChromosomeFactory<Episode> for RandomEpisodeFactory {
    fn create(&mut self, ctx: &mut SearchContext<'_>) -> Result<Chromosome<Episode>, SearchError> {
        let episode = random_episode(ctx, self.source, self.max_actions)?;
        Ok(Chromosome::new(episode))
    }
}

/// Suites of `size` random episodes.
#[derive(Debug, Clone)]
pub struct RandomSuiteFactory {
    episodes: RandomEpisodeFactory,
    size: usize,
}

impl RandomSuiteFactory {
    pub fn new(source: ActionSource, max_actions: usize, size: usize) -> Self {
        Self {
            episodes: RandomEpisodeFactory::new(source, max_actions),
            size,
        }
    }
}

impl ChromosomeFactory<TestSuite> for RandomSuiteFactory {
    fn create(&mut self, ctx: &mut SearchContext<'_>) -> Result<Chromosome<TestSuite>, SearchError> {
        let mut suite = TestSuite::new();
        for _ in 0..self.size {
            if ctx.is_exhausted() {
                break;
            }
            suite.push(random_episode(ctx, self.episodes.source, self.episodes.max_actions)?);
        }
        Ok(Chromosome::new(suite))
    }
}
