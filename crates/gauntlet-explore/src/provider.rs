//! Builds a runnable engine from a validated configuration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use gauntlet_config::{
    AlgorithmKind, CandidateShape, ConfigError, CrossoverKind, FactoryKind, MutationKind,
    SearchConfig, SelectionKind, TerminationSpec,
};
use gauntlet_model::{Episode, TestSuite};
use tracing::info;

use crate::context::SearchContext;
use crate::error::SearchError;
use crate::factory::{ActionSource, RandomEpisodeFactory, RandomSuiteFactory};
use crate::fitness::{FitnessEvaluator, Objective};
use crate::genetic::{GaParams, GeneticAlgorithm, Strategy};
use crate::operators::{
    CrossoverFunction, CutPointMutation, FitnessSelection, IdentitySelection, MergeCrossover,
    MutationFunction, PrimitiveShuffleMutation, RandomSelection, RankSelection,
    SelectionFunction, SuiteCutPointMutation, TournamentSelection, UniformSuiteCrossover,
};
use crate::rl::{ActivityInsulatedExplorer, CageParams, QLearningExplorer, RlParams};
use crate::search::{SearchAlgorithm, SearchOutcome};
use crate::termination::{
    AllObjectivesCoveredTermination, ConditionalTermination, IterationsTermination,
    NeverTermination, TerminationCondition,
};

/// An engine over one of the two candidate shapes.
pub enum Engine {
    Episodes(Box<dyn SearchAlgorithm<Episode>>),
    Suites(Box<dyn SearchAlgorithm<TestSuite>>),
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Episodes(SearchOutcome<Episode>),
    Suites(SearchOutcome<TestSuite>),
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Episodes(engine) => engine.name(),
            Self::Suites(engine) => engine.name(),
        }
    }

    pub fn shape(&self) -> CandidateShape {
        match self {
            Self::Episodes(_) => CandidateShape::Episode,
            Self::Suites(_) => CandidateShape::Suite,
        }
    }

    pub fn run(&mut self, ctx: &mut SearchContext<'_>) -> Result<RunOutcome, SearchError> {
        match self {
            Self::Episodes(engine) => engine.run(ctx).map(RunOutcome::Episodes),
            Self::Suites(engine) => engine.run(ctx).map(RunOutcome::Suites),
        }
    }
}

/// Build the engine described by `config`.
///
/// `stop_flag` is observed by the `conditional` termination condition.
pub fn build(config: &SearchConfig, stop_flag: Option<Arc<AtomicBool>>) -> Result<Engine, SearchError> {
    config.validate()?;
    let termination = termination(config, stop_flag);
    let source = action_source(config);

    let engine = match config.algorithm {
        AlgorithmKind::QLearning => {
            Engine::Episodes(Box::new(QLearningExplorer::new(rl_params(config), termination)))
        }
        AlgorithmKind::ActivityInsulated => {
            let params = CageParams {
                rl: rl_params(config),
                max_rounds: config.reinforcement.max_cage_rounds,
                main_activity: config.reinforcement.main_activity.clone(),
                exported_activities: config.reinforcement.exported_activities.clone(),
            };
            Engine::Episodes(Box::new(ActivityInsulatedExplorer::new(params, termination)))
        }
        algorithm => {
            let strategy = strategy(algorithm)?;
            let params = GaParams {
                population_size: config.population_size,
                big_population_size: config.big_population_size,
                p_crossover: config.p_crossover,
                p_mutate: config.p_mutate,
            };
            let evaluator = FitnessEvaluator::new(
                config.fitness_functions.iter().map(Objective::from_spec).collect(),
            );
            let selection = selection(config.selection, config.tournament_size);

            match config.chromosome_factory.shape() {
                CandidateShape::Episode => {
                    let factory = Box::new(RandomEpisodeFactory::new(source, config.max_actions));
                    let mut ga = GeneticAlgorithm::<Episode>::new(
                        strategy,
                        params,
                        factory,
                        selection,
                        termination,
                        evaluator,
                    );
                    if let Some(kind) = config.crossover {
                        ga = ga.with_crossover(episode_crossover(kind, source)?);
                    }
                    if let Some(kind) = config.mutation {
                        ga = ga.with_mutation(episode_mutation(kind, source, config.max_actions)?);
                    }
                    Engine::Episodes(Box::new(ga))
                }
                CandidateShape::Suite => {
                    let factory = Box::new(RandomSuiteFactory::new(
                        source,
                        config.max_actions,
                        config.num_test_cases,
                    ));
                    let mut ga = GeneticAlgorithm::<TestSuite>::new(
                        strategy,
                        params,
                        factory,
                        selection,
                        termination,
                        evaluator,
                    );
                    if let Some(kind) = config.crossover {
                        ga = ga.with_crossover(suite_crossover(kind)?);
                    }
                    if let Some(kind) = config.mutation {
                        ga = ga.with_mutation(suite_mutation(kind, source, config.max_actions)?);
                    }
                    Engine::Suites(Box::new(ga))
                }
            }
        }
    };

    info!(
        algorithm = %config.algorithm,
        engine = engine.name(),
        shape = ?engine.shape(),
        "engine built"
    );
    Ok(engine)
}

fn strategy(algorithm: AlgorithmKind) -> Result<Strategy, SearchError> {
    match algorithm {
        AlgorithmKind::StandardGa => Ok(Strategy::Standard),
        AlgorithmKind::Nsga2 => Ok(Strategy::Nsga2),
        AlgorithmKind::Mosa => Ok(Strategy::Mosa),
        AlgorithmKind::OnePlusOne => Ok(Strategy::OnePlusOne),
        AlgorithmKind::RandomSearch => Ok(Strategy::RandomSearch),
        other => Err(ConfigError::Invalid(format!("{other} is not a genetic algorithm")).into()),
    }
}

fn action_source(config: &SearchConfig) -> ActionSource {
    match config.chromosome_factory {
        FactoryKind::PrimitiveAndroidRandom => ActionSource::Primitive {
            width: config.screen.width,
            height: config.screen.height,
        },
        FactoryKind::AndroidRandom | FactoryKind::AndroidSuiteRandom => ActionSource::Widget,
    }
}

fn rl_params(config: &SearchConfig) -> RlParams {
    RlParams {
        epsilon: config.reinforcement.epsilon,
        discount_factor: config.reinforcement.discount_factor,
        max_actions: config.max_actions,
    }
}

fn termination(config: &SearchConfig, stop_flag: Option<Arc<AtomicBool>>) -> Box<dyn TerminationCondition> {
    match &config.termination {
        TerminationSpec::Iterations { .. } if config.algorithm.is_reinforcement() => {
            Box::new(IterationsTermination::new(config.reinforcement.episodes))
        }
        TerminationSpec::Iterations { iterations } => Box::new(IterationsTermination::new(*iterations)),
        TerminationSpec::Never => Box::new(NeverTermination),
        TerminationSpec::Conditional { time_budget_secs } => Box::new(ConditionalTermination::new(
            time_budget_secs.map(Duration::from_secs),
            stop_flag,
        )),
        TerminationSpec::AllObjectivesCovered => Box::new(AllObjectivesCoveredTermination),
    }
}

fn selection(kind: SelectionKind, tournament_size: usize) -> Box<dyn SelectionFunction> {
    match kind {
        SelectionKind::Random => Box::new(RandomSelection),
        SelectionKind::Fitness => Box::new(FitnessSelection),
        SelectionKind::Identity => Box::new(IdentitySelection),
        SelectionKind::Rank => Box::new(RankSelection),
        SelectionKind::Tournament => Box::new(TournamentSelection::new(tournament_size)),
    }
}

fn shape_mismatch(operator: impl ToString, expected: CandidateShape, actual: CandidateShape) -> SearchError {
    ConfigError::Incompatible {
        operator: operator.to_string(),
        expected,
        actual,
    }
    .into()
}

fn episode_crossover(
    kind: CrossoverKind,
    source: ActionSource,
) -> Result<Box<dyn CrossoverFunction<Episode>>, SearchError> {
    match kind {
        CrossoverKind::TestCaseMerge => Ok(Box::new(MergeCrossover::new(source))),
        CrossoverKind::TestSuiteUniform => Err(shape_mismatch(kind, kind.shape(), CandidateShape::Episode)),
    }
}

fn suite_crossover(kind: CrossoverKind) -> Result<Box<dyn CrossoverFunction<TestSuite>>, SearchError> {
    match kind {
        CrossoverKind::TestSuiteUniform => Ok(Box::new(UniformSuiteCrossover)),
        CrossoverKind::TestCaseMerge => Err(shape_mismatch(kind, kind.shape(), CandidateShape::Suite)),
    }
}

fn episode_mutation(
    kind: MutationKind,
    source: ActionSource,
    max_actions: usize,
) -> Result<Box<dyn MutationFunction<Episode>>, SearchError> {
    match kind {
        MutationKind::CutPoint => Ok(Box::new(CutPointMutation::new(source, max_actions))),
        MutationKind::PrimitiveShuffle => Ok(Box::new(PrimitiveShuffleMutation::new(source))),
        MutationKind::SuiteCutPoint => Err(shape_mismatch(kind, kind.shape(), CandidateShape::Episode)),
    }
}

fn suite_mutation(
    kind: MutationKind,
    source: ActionSource,
    max_actions: usize,
) -> Result<Box<dyn MutationFunction<TestSuite>>, SearchError> {
    match kind {
        MutationKind::SuiteCutPoint => Ok(Box::new(SuiteCutPointMutation::new(source, max_actions))),
        other => Err(shape_mismatch(other, other.shape(), CandidateShape::Suite)),
    }
}
