use gauntlet_model::{Chromosome, Episode, TestSuite};
use rand::Rng;
use tracing::warn;

use crate::context::SearchContext;
use crate::error::SearchError;
use crate::factory::{replay, ActionSource};

/// Recombines parents into offspring.
///
/// With fewer than two parents the first one is handed back unchanged.
pub trait CrossoverFunction<T>: Send {
    fn cross(
        &mut self,
        parents: &[Chromosome<T>],
        ctx: &mut SearchContext<'_>,
    ) -> Result<Vec<Chromosome<T>>, SearchError>;
}

fn degenerate<T>(name: &str, parents: &[Chromosome<T>]) -> Option<Vec<Chromosome<T>>> {
    if parents.len() >= 2 {
        return None;
    }
    warn!(crossover = name, parents = parents.len(), "crossover needs two parents");
    Some(parents.first().cloned().into_iter().collect())
}

/// Concatenates a half-length slice of each parent, taken from
/// independently drawn offsets, and executes the result.
#[derive(Debug, Clone)]
pub struct MergeCrossover {
    source: ActionSource,
}

impl MergeCrossover {
    pub fn new(source: ActionSource) -> Self {
        Self { source }
    }
}

impl CrossoverFunction<Episode> for MergeCrossover {
    fn cross(
        &mut self,
        parents: &[Chromosome<Episode>],
        ctx: &mut SearchContext<'_>,
    ) -> Result<Vec<Chromosome<Episode>>, SearchError> {
        if let Some(unchanged) = degenerate("test_case_merge", parents) {
            return Ok(unchanged);
        }
        let first = parents[0].value().actions();
        let second = parents[1].value().actions();

        let l0 = first.len() / 2;
        let l1 = second.len() / 2;
        let start0 = ctx.rng.gen_range(0..=l0);
        let start1 = ctx.rng.gen_range(0..=l1);

        let mut template = Vec::with_capacity(l0 + l1);
        template.extend_from_slice(&first[start0..start0 + l0]);
        template.extend_from_slice(&second[start1..start1 + l1]);

        let offspring = replay(ctx, &template, None, self.source)?;
        Ok(vec![Chromosome::new(offspring)])
    }
}

/// Builds one suite taking each member position from either parent with
/// equal probability. Members are reused as executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSuiteCrossover;

impl CrossoverFunction<TestSuite> for UniformSuiteCrossover {
    fn cross(
        &mut self,
        parents: &[Chromosome<TestSuite>],
        ctx: &mut SearchContext<'_>,
    ) -> Result<Vec<Chromosome<TestSuite>>, SearchError> {
        if let Some(unchanged) = degenerate("test_suite_uniform", parents) {
            return Ok(unchanged);
        }
        let first = parents[0].value().episodes();
        let second = parents[1].value().episodes();

        let mut suite = TestSuite::new();
        for i in 0..first.len().max(second.len()) {
            let pick_first = ctx.rng.gen_bool(0.5);
            let episode = match (first.get(i), second.get(i)) {
                (Some(a), Some(b)) => {
                    if pick_first {
                        a
                    } else {
                        b
                    }
                }
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => break,
            };
            suite.push(episode.clone());
        }
        Ok(vec![Chromosome::new(suite)])
    }
}
