use std::collections::HashSet;

use gauntlet_explore::factory::{random_episode, ActionSource};
use gauntlet_explore::fitness::{FitnessError, FitnessEvaluator, Objective, ScriptedOracle};
use gauntlet_explore::rng::run_rng;
use gauntlet_explore::{Budget, SearchContext};
use gauntlet_model::sim::sample_app;
use gauntlet_model::{Chromosome, Episode};

fn oracle() -> ScriptedOracle {
    ScriptedOracle::new()
        .with_branch("open_detail", &["home", "list", "detail"])
        .with_line("settings_toggle", "settings_on")
}

fn objectives() -> Vec<Objective> {
    vec![
        Objective::BranchDistance("open_detail".into()),
        Objective::LineCoverage("settings_toggle".into()),
        Objective::ActivityCount,
    ]
}

fn explored(seed: u64, oracle: &mut ScriptedOracle) -> Chromosome<Episode> {
    let mut app = sample_app();
    let mut rng = run_rng(seed);
    let budget = Budget::unlimited();
    let mut ctx = SearchContext::new(&mut app, &mut rng, oracle, &budget);
    Chromosome::new(random_episode(&mut ctx, ActionSource::Widget, 12).unwrap())
}

#[test]
fn test_evaluate_is_cached_without_second_oracle_call() {
    let mut oracle = oracle();
    let chromosome = explored(7, &mut oracle);
    let mut evaluator = FitnessEvaluator::new(objectives());

    let branch = Objective::BranchDistance("open_detail".into());
    let first = evaluator.evaluate(&branch, &chromosome, &mut oracle).unwrap();
    let second = evaluator.evaluate(&branch, &chromosome, &mut oracle).unwrap();
    assert_eq!(first, second);
    assert_eq!(oracle.measure_calls(), 1);

    // the line objective was filled by the same batched call
    let line = Objective::LineCoverage("settings_toggle".into());
    evaluator.evaluate(&line, &chromosome, &mut oracle).unwrap();
    assert_eq!(oracle.measure_calls(), 1);
    assert_eq!(evaluator.oracle_calls(), 1);
}

#[test]
fn test_local_objectives_never_reach_the_oracle() {
    let mut oracle = oracle();
    let chromosome = explored(3, &mut oracle);
    let mut evaluator = FitnessEvaluator::new(vec![Objective::ActivityCount, Objective::TestLength]);
    let values = evaluator.vector(&chromosome, &mut oracle).unwrap();
    assert_eq!(values.len(), 2);
    assert!(values[0] >= 1.0);
    assert_eq!(oracle.measure_calls(), 0);
}

#[test]
fn test_oracle_capture_precedes_measurement() {
    let mut oracle = oracle();
    let chromosome = explored(9, &mut oracle);
    assert_eq!(oracle.recorded_episodes(), [chromosome.value().id()]);
}

#[test]
fn test_unfinished_chromosome_is_rejected() {
    let mut oracle = oracle();
    let mut evaluator = FitnessEvaluator::new(objectives());
    let chromosome = Chromosome::new(Episode::new());
    let err = evaluator
        .evaluate(&Objective::ActivityCount, &chromosome, &mut oracle)
        .unwrap_err();
    assert!(matches!(err, FitnessError::Unfinished(id) if id == chromosome.id()));
}

#[test]
fn test_unregistered_objective_is_rejected() {
    let mut oracle = oracle();
    let chromosome = explored(1, &mut oracle);
    let mut evaluator = FitnessEvaluator::new(objectives());
    let err = evaluator
        .evaluate(&Objective::CrashCount, &chromosome, &mut oracle)
        .unwrap_err();
    assert!(matches!(err, FitnessError::UnknownObjective(_)));
}

#[test]
fn test_purge_forces_remeasurement() {
    let mut oracle = oracle();
    let chromosome = explored(4, &mut oracle);
    let mut evaluator = FitnessEvaluator::new(objectives());

    evaluator.vector(&chromosome, &mut oracle).unwrap();
    assert_eq!(evaluator.cached_entries(), 3);

    let kept: HashSet<_> = [chromosome.id()].into_iter().collect();
    assert_eq!(evaluator.purge(&kept), 0);
    evaluator.vector(&chromosome, &mut oracle).unwrap();
    assert_eq!(oracle.measure_calls(), 1);

    assert_eq!(evaluator.purge(&HashSet::new()), 3);
    evaluator.vector(&chromosome, &mut oracle).unwrap();
    assert_eq!(oracle.measure_calls(), 2);
}

#[test]
fn test_losses_flip_maximised_objectives() {
    let mut oracle = oracle();
    let chromosome = explored(2, &mut oracle);
    let mut evaluator = FitnessEvaluator::new(objectives());
    let raw = evaluator.vector(&chromosome, &mut oracle).unwrap();
    let losses = evaluator.losses(&chromosome, &mut oracle).unwrap();
    assert_eq!(losses[0], raw[0]);
    assert_eq!(losses[1], -raw[1]);
    assert_eq!(losses[2], -raw[2]);
}
