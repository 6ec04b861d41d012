use gauntlet_model::{Chromosome, Episode, TestSuite};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::context::SearchContext;
use crate::error::SearchError;
use crate::factory::{replay, ActionSource};

/// Produces a new chromosome from an existing one. The input is never
/// modified.
pub trait MutationFunction<T>: Send {
    fn mutate(
        &mut self,
        chromosome: &Chromosome<T>,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Chromosome<T>, SearchError>;
}

/// Keeps the original actions before a random cut point and samples fresh
/// ones after it, up to `max_actions`.
///
/// An original action that is no longer executable ends the mutant
/// right there.
#[derive(Debug, Clone)]
pub struct CutPointMutation {
    source: ActionSource,
    max_actions: usize,
}

impl CutPointMutation {
    pub fn new(source: ActionSource, max_actions: usize) -> Self {
        Self {
            source,
            max_actions,
        }
    }

    pub fn mutate_episode(
        &self,
        original: &Episode,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Episode, SearchError> {
        ctx.device.reset_app();
        let cut = if original.is_empty() {
            warn!(episode = %original.id(), "choosing cut point of an empty episode");
            0
        } else {
            ctx.rng.gen_range(0..original.len())
        };

        let mut mutant = Episode::new();
        mutant.begin(&mut *ctx.device)?;

        for i in 0..self.max_actions {
            if ctx.is_exhausted() {
                break;
            }
            let state = ctx.device.current_state();
            let action = if i < cut {
                original.actions()[i].clone()
            } else {
                match self.source.sample(&state, &mut *ctx.rng) {
                    Some(action) => action,
                    None => break,
                }
            };
            if !state.can_execute(&action) {
                debug!(episode = %mutant.id(), index = i, "original action not executable, truncating");
                break;
            }
            if !mutant
                .apply_action(&mut *ctx.device, action)?
                .should_continue()
            {
                break;
            }
        }

        ctx.seal(&mut mutant);
        Ok(mutant)
    }
}

impl MutationFunction<Episode> for CutPointMutation {
    fn mutate(
        &mut self,
        chromosome: &Chromosome<Episode>,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Chromosome<Episode>, SearchError> {
        let mutant = self.mutate_episode(chromosome.value(), ctx)?;
        Ok(Chromosome::new(mutant))
    }
}

/// Permutes an episode made only of primitive actions and re-executes it.
#[derive(Debug, Clone)]
pub struct PrimitiveShuffleMutation {
    source: ActionSource,
}

impl PrimitiveShuffleMutation {
    pub fn new(source: ActionSource) -> Self {
        Self { source }
    }
}

impl MutationFunction<Episode> for PrimitiveShuffleMutation {
    fn mutate(
        &mut self,
        chromosome: &Chromosome<Episode>,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Chromosome<Episode>, SearchError> {
        let original = chromosome.value();
        if let Some(action) = original.actions().iter().find(|a| !a.is_primitive()) {
            return Err(SearchError::Operator {
                operator: "primitive_shuffle",
                reason: format!("{} action {action}", action.variant_name()),
            });
        }
        let mut actions = original.actions().to_vec();
        actions.shuffle(&mut *ctx.rng);

        let mutant = replay(ctx, &actions, None, self.source)?;
        debug!(
            from = %original.id(),
            to = %mutant.id(),
            crashed = mutant.has_crashed(),
            "shuffled episode"
        );
        Ok(Chromosome::new(mutant))
    }
}

/// Cut-point mutation of exactly one randomly chosen suite member.
#[derive(Debug, Clone)]
pub struct SuiteCutPointMutation {
    inner: CutPointMutation,
}

impl SuiteCutPointMutation {
    pub fn new(source: ActionSource, max_actions: usize) -> Self {
        Self {
            inner: CutPointMutation::new(source, max_actions),
        }
    }
}

impl MutationFunction<TestSuite> for SuiteCutPointMutation {
    fn mutate(
        &mut self,
        chromosome: &Chromosome<TestSuite>,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Chromosome<TestSuite>, SearchError> {
        let members = chromosome.value().episodes();
        if members.is_empty() {
            warn!(chromosome = %chromosome.id(), "mutating an empty suite");
            return Ok(Chromosome::new(TestSuite::new()));
        }
        let target = ctx.rng.gen_range(0..members.len());

        let mut suite = TestSuite::new();
        for (i, episode) in members.iter().enumerate() {
            if i == target {
                suite.push(self.inner.mutate_episode(episode, ctx)?);
            } else {
                suite.push(episode.clone());
            }
        }
        Ok(Chromosome::new(suite))
    }
}
