use gauntlet_config::{
    parse_config, AlgorithmKind, CandidateShape, ConfigError, FactoryKind, FitnessFunctionSpec,
    FitnessKind, LogFormat, MutationKind, SearchConfig, SelectionKind, TerminationSpec,
};

#[test]
fn test_parse_full_nsga2_fixture() {
    let json = include_str!("fixtures/nsga2_suite.json");
    let config = parse_config(json).unwrap();

    assert_eq!(config.algorithm, AlgorithmKind::Nsga2);
    assert_eq!(config.chromosome_factory, FactoryKind::AndroidSuiteRandom);
    assert_eq!(config.chromosome_factory.shape(), CandidateShape::Suite);
    assert_eq!(config.selection, SelectionKind::Tournament);
    assert_eq!(config.mutation, Some(MutationKind::SuiteCutPoint));
    assert_eq!(config.fitness_functions.len(), 4);
    assert_eq!(
        config.fitness_functions[2],
        FitnessFunctionSpec::with_arg(
            FitnessKind::CoveredSpecificActivity,
            "com.example.SettingsActivity"
        )
    );
    assert_eq!(config.fitness_functions[3].arg(), "MainActivity.onCreate#3");
    assert_eq!(
        config.termination,
        TerminationSpec::Iterations { iterations: 25 }
    );
    assert_eq!(config.population_size, 6);
    assert_eq!(config.big_population_size, 12);
    assert_eq!(config.seed, 7);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_parse_reinforcement_fixture() {
    let json = include_str!("fixtures/aimdroid.json");
    let config = parse_config(json).unwrap();

    assert_eq!(config.algorithm, AlgorithmKind::ActivityInsulated);
    assert!(config.fitness_functions.is_empty());
    assert_eq!(config.reinforcement.main_activity, "MainActivity");
    assert_eq!(config.reinforcement.max_cage_rounds, 3);
    assert!((config.reinforcement.epsilon - 0.5).abs() < f64::EPSILON);
    assert_eq!(
        config.termination,
        TerminationSpec::Conditional {
            time_budget_secs: Some(60)
        }
    );
}

#[test]
fn test_defaults_apply_when_fields_missing() {
    let json = r#"{ "algorithm": "one_plus_one", "mutation": "cut_point",
                    "fitness_functions": ["number_of_states"] }"#;
    let config = parse_config(json).unwrap();

    assert_eq!(config.population_size, 4);
    assert_eq!(config.big_population_size, 8);
    assert_eq!(config.max_actions, 50);
    assert_eq!(config.seed, 42);
    assert_eq!(config.selection, SelectionKind::Fitness);
    assert_eq!(config.chromosome_factory, FactoryKind::AndroidRandom);
    assert_eq!(config.termination, TerminationSpec::Iterations { iterations: 10 });
}

#[test]
fn test_missing_algorithm_is_rejected() {
    let result = parse_config(r#"{ "fitness_functions": ["test_length"] }"#);
    assert!(matches!(result, Err(ConfigError::Json(_))));
}

#[test]
fn test_invalid_json_is_rejected() {
    assert!(matches!(parse_config("not json"), Err(ConfigError::Json(_))));
}

#[test]
fn test_unknown_fitness_function_is_rejected() {
    let err = FitnessFunctionSpec::parse("lines_of_code").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownFitnessFunction(ref id) if id == "lines_of_code"));

    let json = r#"{ "algorithm": "standard_ga", "mutation": "cut_point",
                    "fitness_functions": ["lines_of_code"] }"#;
    assert!(parse_config(json).is_err());
}

#[test]
fn test_fitness_function_missing_argument() {
    for id in ["covered_specific_activity", "branch_distance:", "line_percentage_coverage"] {
        let err = FitnessFunctionSpec::parse(id).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingArgument { .. }),
            "expected missing argument for {id}"
        );
    }
}

#[test]
fn test_fitness_spec_display_matches_input() {
    let spec = FitnessFunctionSpec::parse("line_percentage_coverage:Main.java:42").unwrap();
    assert_eq!(spec.kind, FitnessKind::LinePercentageCoverage);
    assert_eq!(spec.args, vec!["Main.java".to_string(), "42".to_string()]);
    assert_eq!(spec.to_string(), "line_percentage_coverage:Main.java:42");
}

#[test]
fn test_probability_out_of_range() {
    let mut config = SearchConfig::new(AlgorithmKind::StandardGa);
    config.mutation = Some(MutationKind::CutPoint);
    config.fitness_functions = vec![FitnessFunctionSpec::new(FitnessKind::NumberOfActivities)];
    config.p_mutate = 1.5;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Probability { ref name, .. }) if name == "p_mutate"
    ));
}

#[test]
fn test_big_population_must_exceed_population() {
    let mut config = SearchConfig::new(AlgorithmKind::Mosa);
    config.mutation = Some(MutationKind::CutPoint);
    config.fitness_functions = vec![FitnessFunctionSpec::new(FitnessKind::NumberOfStates)];
    config.big_population_size = config.population_size;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_suite_operator_with_episode_factory_is_incompatible() {
    let mut config = SearchConfig::new(AlgorithmKind::StandardGa);
    config.mutation = Some(MutationKind::SuiteCutPoint);
    config.fitness_functions = vec![FitnessFunctionSpec::new(FitnessKind::NumberOfCrashes)];
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Incompatible {
            expected: CandidateShape::Suite,
            actual: CandidateShape::Episode,
            ..
        }
    ));
}

#[test]
fn test_genetic_algorithm_without_fitness_is_rejected() {
    let mut config = SearchConfig::new(AlgorithmKind::Nsga2);
    config.mutation = Some(MutationKind::CutPoint);
    assert!(config.validate().is_err());
}

#[test]
fn test_one_plus_one_requires_mutation() {
    let mut config = SearchConfig::new(AlgorithmKind::OnePlusOne);
    config.fitness_functions = vec![FitnessFunctionSpec::new(FitnessKind::TestLength)];
    assert!(config.validate().is_err());
    config.mutation = Some(MutationKind::CutPoint);
    assert!(config.validate().is_ok());
}

#[test]
fn test_primitive_shuffle_rejects_widget_factory() {
    let json = r#"{
        "algorithm": "one_plus_one",
        "chromosome_factory": "android_random",
        "mutation": "primitive_shuffle",
        "fitness_functions": ["number_of_activities"]
    }"#;
    let err = parse_config(json).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("primitive_android_random")));
}

#[test]
fn test_primitive_shuffle_accepts_primitive_factory() {
    let mut config = SearchConfig::new(AlgorithmKind::OnePlusOne);
    config.fitness_functions = vec![FitnessFunctionSpec::new(FitnessKind::TestLength)];
    config.chromosome_factory = FactoryKind::PrimitiveAndroidRandom;
    config.mutation = Some(MutationKind::PrimitiveShuffle);
    assert!(config.validate().is_ok());
}

#[test]
fn test_activity_insulated_requires_main_activity() {
    let config = SearchConfig::new(AlgorithmKind::ActivityInsulated);
    assert!(config.validate().is_err());

    let config = SearchConfig::new(AlgorithmKind::QLearning);
    assert!(config.validate().is_ok());
}

#[test]
fn test_activity_insulated_rejects_zero_cage_rounds() {
    let mut config = SearchConfig::new(AlgorithmKind::ActivityInsulated);
    config.reinforcement.main_activity = "MainActivity".to_string();
    assert!(config.validate().is_ok());

    config.reinforcement.max_cage_rounds = 0;
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("max_cage_rounds")));
}

#[test]
fn test_config_serializes_back_to_parseable_json() {
    let json = include_str!("fixtures/nsga2_suite.json");
    let config = parse_config(json).unwrap();
    let serialized = serde_json::to_string(&config).unwrap();
    let reparsed = parse_config(&serialized).unwrap();
    assert_eq!(reparsed.fitness_functions, config.fitness_functions);
    assert_eq!(reparsed.termination, config.termination);
}
