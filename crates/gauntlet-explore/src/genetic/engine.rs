use std::collections::HashSet;
use std::time::Instant;

use gauntlet_model::{Candidate, Chromosome};
use rand::Rng;
use tracing::{debug, info};

use super::mosa::{mosa_survivors, MosaArchive};
use super::ranking::{non_dominated_sort, nsga2_survivors};
use crate::context::SearchContext;
use crate::error::SearchError;
use crate::factory::ChromosomeFactory;
use crate::fitness::FitnessEvaluator;
use crate::operators::{CrossoverFunction, MutationFunction, SelectionFunction};
use crate::search::{GenerationSummary, SearchAlgorithm, SearchOutcome, StopCause};
use crate::termination::{SearchProgress, TerminationCondition};

/// Survivor policy of the generational loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Elitist: best `population_size` of parents and offspring by the
    /// first objective.
    Standard,
    Nsga2,
    Mosa,
    /// Single parent, single mutant; the mutant wins ties.
    OnePlusOne,
    /// Single fresh candidate per generation; the best seen is kept.
    RandomSearch,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard_ga",
            Self::Nsga2 => "nsga2",
            Self::Mosa => "mosa",
            Self::OnePlusOne => "one_plus_one",
            Self::RandomSearch => "random_search",
        }
    }

    fn is_single(self) -> bool {
        matches!(self, Self::OnePlusOne | Self::RandomSearch)
    }
}

/// Where the engine is in its generational loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Evaluating,
    Ranking,
    Selecting,
    Varying,
    Terminated,
}

#[derive(Debug, Clone, Copy)]
pub struct GaParams {
    pub population_size: usize,
    /// Parents plus offspring per generation.
    pub big_population_size: usize,
    pub p_crossover: f64,
    pub p_mutate: f64,
}

/// Generational search over chromosomes of type `T`.
///
/// The fitness cache lives in the engine and is purged to the live
/// population and archive after every evaluation.
pub struct GeneticAlgorithm<T: Candidate> {
    strategy: Strategy,
    params: GaParams,
    factory: Box<dyn ChromosomeFactory<T>>,
    selection: Box<dyn SelectionFunction>,
    crossover: Option<Box<dyn CrossoverFunction<T>>>,
    mutation: Option<Box<dyn MutationFunction<T>>>,
    termination: Box<dyn TerminationCondition>,
    evaluator: FitnessEvaluator,
    archive: MosaArchive<T>,
    population: Vec<Chromosome<T>>,
    phase: Phase,
    generation: u64,
    history: Vec<GenerationSummary>,
}

impl<T: Candidate> GeneticAlgorithm<T> {
    pub fn new(
        strategy: Strategy,
        params: GaParams,
        factory: Box<dyn ChromosomeFactory<T>>,
        selection: Box<dyn SelectionFunction>,
        termination: Box<dyn TerminationCondition>,
        evaluator: FitnessEvaluator,
    ) -> Self {
        let archive = MosaArchive::new(evaluator.objectives().len());
        Self {
            strategy,
            params,
            factory,
            selection,
            crossover: None,
            mutation: None,
            termination,
            evaluator,
            archive,
            population: Vec::new(),
            phase: Phase::Initializing,
            generation: 0,
            history: Vec::new(),
        }
    }

    pub fn with_crossover(mut self, crossover: Box<dyn CrossoverFunction<T>>) -> Self {
        self.crossover = Some(crossover);
        self
    }

    pub fn with_mutation(mut self, mutation: Box<dyn MutationFunction<T>>) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    pub fn history(&self) -> &[GenerationSummary] {
        &self.history
    }

    fn raw_fitness(
        &mut self,
        chromosome: &Chromosome<T>,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Vec<f64>, SearchError> {
        let raw = self.evaluator.vector(chromosome, &mut *ctx.oracle)?;
        self.archive
            .update(chromosome, &raw, self.evaluator.objectives());
        Ok(raw)
    }

    fn losses_of(
        &mut self,
        chromosome: &Chromosome<T>,
        ctx: &mut SearchContext<'_>,
    ) -> Result<Vec<f64>, SearchError> {
        let raw = self.raw_fitness(chromosome, ctx)?;
        Ok(self.evaluator.to_losses(&raw))
    }

    /// Evaluate the population and drop cache entries for everything
    /// that is no longer alive.
    fn evaluate_population(
        &mut self,
        ctx: &mut SearchContext<'_>,
    ) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), SearchError> {
        self.phase = Phase::Evaluating;
        let members = self.population.clone();
        let mut raw = Vec::with_capacity(members.len());
        for chromosome in &members {
            raw.push(self.raw_fitness(chromosome, ctx)?);
        }
        let losses: Vec<Vec<f64>> = raw.iter().map(|r| self.evaluator.to_losses(r)).collect();

        let mut alive: HashSet<_> = self.population.iter().map(Chromosome::id).collect();
        alive.extend(self.archive.ids());
        let purged = self.evaluator.purge(&alive);

        self.record_generation(&raw, &losses, purged);
        Ok((raw, losses))
    }

    fn record_generation(&mut self, raw: &[Vec<f64>], losses: &[Vec<f64>], purged: usize) {
        let best = (0..losses.len()).min_by(|&a, &b| {
            let la = losses[a].first().copied().unwrap_or(0.0);
            let lb = losses[b].first().copied().unwrap_or(0.0);
            la.total_cmp(&lb)
        });
        let summary = GenerationSummary {
            generation: self.generation,
            population: self.population.len(),
            best_value: best.and_then(|i| raw[i].first().copied()),
            covered_objectives: self.archive.covered().len(),
            purged_entries: purged,
        };
        info!(
            strategy = self.strategy.name(),
            generation = summary.generation,
            population = summary.population,
            best = ?summary.best_value,
            covered = summary.covered_objectives,
            "generation evaluated"
        );
        self.history.push(summary);
    }

    /// Produce `big_population_size - population_size` offspring from
    /// parents in `order`. `None` means the budget ran out mid-way.
    fn breed(
        &mut self,
        ctx: &mut SearchContext<'_>,
        order: &[usize],
    ) -> Result<Option<Vec<Chromosome<T>>>, SearchError> {
        let needed = self
            .params
            .big_population_size
            .saturating_sub(self.params.population_size);
        let mut offspring = Vec::with_capacity(needed);
        if order.is_empty() {
            return Ok(Some(offspring));
        }
        let p_crossover = self.params.p_crossover.clamp(0.0, 1.0);
        let p_mutate = self.params.p_mutate.clamp(0.0, 1.0);

        let mut cursor = 0;
        while offspring.len() < needed {
            if ctx.is_exhausted() {
                return Ok(None);
            }
            let first = self.population[order[cursor % order.len()]].clone();
            let second = self.population[order[(cursor + 1) % order.len()]].clone();
            cursor += 2;

            let children = match self.crossover.as_mut() {
                Some(crossover) if ctx.rng.gen_bool(p_crossover) => {
                    crossover.cross(&[first.clone(), second.clone()], ctx)?
                }
                _ => vec![first.clone()],
            };
            for child in children {
                let unchanged = child.id() == first.id() || child.id() == second.id();
                let child = match self.mutation.as_mut() {
                    Some(mutation) if ctx.rng.gen_bool(p_mutate) || unchanged => {
                        mutation.mutate(&child, ctx)?
                    }
                    _ => child,
                };
                if offspring.len() < needed {
                    offspring.push(child);
                }
            }
        }
        if ctx.is_exhausted() {
            return Ok(None);
        }
        Ok(Some(offspring))
    }

    /// Run one generation of selection, variation and survival.
    fn step(
        &mut self,
        ctx: &mut SearchContext<'_>,
        losses: &[Vec<f64>],
    ) -> Result<Option<Vec<Chromosome<T>>>, SearchError> {
        if self.strategy.is_single() {
            return self.step_single(ctx, losses);
        }

        self.phase = Phase::Selecting;
        let order = self.selection.select(losses, &mut *ctx.rng);
        self.phase = Phase::Varying;
        let Some(offspring) = self.breed(ctx, &order)? else {
            return Ok(None);
        };

        let mut combined = self.population.clone();
        let mut combined_losses = losses.to_vec();
        for child in offspring {
            if combined.iter().any(|c| c.id() == child.id()) {
                continue;
            }
            combined_losses.push(self.losses_of(&child, ctx)?);
            combined.push(child);
        }

        let size = self.params.population_size;
        let survivors = match self.strategy {
            Strategy::Nsga2 => {
                self.phase = Phase::Ranking;
                nsga2_survivors(&combined_losses, size)
            }
            Strategy::Mosa => {
                self.phase = Phase::Ranking;
                let lengths: Vec<usize> = combined.iter().map(|c| c.value().total_actions()).collect();
                mosa_survivors(&combined_losses, &lengths, &self.archive.uncovered(), size)
            }
            _ => {
                self.phase = Phase::Selecting;
                let mut order: Vec<usize> = (0..combined.len()).collect();
                order.sort_by(|&a, &b| {
                    let la = combined_losses[a].first().copied().unwrap_or(0.0);
                    let lb = combined_losses[b].first().copied().unwrap_or(0.0);
                    la.total_cmp(&lb)
                });
                order.truncate(size);
                order
            }
        };
        Ok(Some(survivors.into_iter().map(|i| combined[i].clone()).collect()))
    }

    fn step_single(
        &mut self,
        ctx: &mut SearchContext<'_>,
        losses: &[Vec<f64>],
    ) -> Result<Option<Vec<Chromosome<T>>>, SearchError> {
        let Some(parent) = self.population.first().cloned() else {
            return Ok(Some(Vec::new()));
        };
        self.phase = Phase::Varying;
        let challenger = match self.strategy {
            Strategy::RandomSearch => self.factory.create(ctx)?,
            _ => match self.mutation.as_mut() {
                Some(mutation) => mutation.mutate(&parent, ctx)?,
                None => return Ok(Some(vec![parent])),
            },
        };
        if ctx.is_exhausted() {
            return Ok(None);
        }

        let challenger_loss = self.losses_of(&challenger, ctx)?;
        self.phase = Phase::Selecting;
        let parent_first = losses.first().and_then(|l| l.first()).copied().unwrap_or(f64::INFINITY);
        let challenger_first = challenger_loss.first().copied().unwrap_or(f64::INFINITY);
        if challenger_first <= parent_first {
            debug!(parent = %parent.id(), challenger = %challenger.id(), "challenger accepted");
            Ok(Some(vec![challenger]))
        } else {
            Ok(Some(vec![parent]))
        }
    }

    fn finish(
        &mut self,
        ctx: &mut SearchContext<'_>,
        stop: StopCause,
        started: Instant,
    ) -> Result<SearchOutcome<T>, SearchError> {
        self.phase = Phase::Terminated;

        let members = self.population.clone();
        let mut raw = Vec::with_capacity(members.len());
        for chromosome in &members {
            raw.push(self.raw_fitness(chromosome, ctx)?);
        }
        let losses: Vec<Vec<f64>> = raw.iter().map(|r| self.evaluator.to_losses(r)).collect();

        // best first: Pareto front, then first objective
        let mut order = Vec::with_capacity(members.len());
        for mut front in non_dominated_sort(&losses) {
            front.sort_by(|&a, &b| {
                let la = losses[a].first().copied().unwrap_or(0.0);
                let lb = losses[b].first().copied().unwrap_or(0.0);
                la.total_cmp(&lb)
            });
            order.extend(front);
        }

        info!(
            strategy = self.strategy.name(),
            generations = self.generation,
            stop = ?stop,
            oracle_calls = self.evaluator.oracle_calls(),
            "search finished"
        );

        Ok(SearchOutcome {
            population: order.iter().map(|&i| members[i].clone()).collect(),
            fitness: order.iter().map(|&i| raw[i].clone()).collect(),
            archive: self.archive.members(),
            objectives: self.evaluator.objectives().iter().map(ToString::to_string).collect(),
            generations: self.generation,
            stop,
            history: self.history.clone(),
            elapsed: started.elapsed(),
        })
    }
}

impl<T: Candidate> SearchAlgorithm<T> for GeneticAlgorithm<T> {
    fn name(&self) -> &'static str {
        self.strategy.name()
    }

    fn run(&mut self, ctx: &mut SearchContext<'_>) -> Result<SearchOutcome<T>, SearchError> {
        let started = Instant::now();
        self.population.clear();
        self.history.clear();
        self.generation = 0;
        self.archive = MosaArchive::new(self.evaluator.objectives().len());
        self.evaluator.clear();

        self.phase = Phase::Initializing;
        let initial = if self.strategy.is_single() {
            1
        } else {
            self.params.population_size
        };
        info!(strategy = self.strategy.name(), size = initial, "initializing population");
        while self.population.len() < initial {
            if ctx.is_exhausted() {
                return self.finish(ctx, StopCause::BudgetExhausted, started);
            }
            let chromosome = self.factory.create(ctx)?;
            self.population.push(chromosome);
        }

        loop {
            let (_, losses) = self.evaluate_population(ctx)?;

            let progress = SearchProgress {
                generation: self.generation,
                elapsed: started.elapsed(),
                uncovered: Some(self.archive.uncovered().len()),
            };
            if self.termination.is_met(&progress) {
                return self.finish(ctx, StopCause::ConditionMet, started);
            }
            if ctx.is_exhausted() {
                return self.finish(ctx, StopCause::BudgetExhausted, started);
            }

            match self.step(ctx, &losses)? {
                Some(next) => self.population = next,
                None => {
                    info!(generation = self.generation, "budget exhausted, abandoning generation");
                    return self.finish(ctx, StopCause::BudgetExhausted, started);
                }
            }
            self.generation += 1;
        }
    }
}

impl<T: Candidate> Drop for GeneticAlgorithm<T> {
    fn drop(&mut self) {
        self.evaluator.clear();
    }
}
