use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parse::ConfigError;

/// Top-level search configuration consumed by the engine provider.
///
/// Only `algorithm` is mandatory; every other field falls back to a
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub algorithm: AlgorithmKind,
    #[serde(default)]
    pub chromosome_factory: FactoryKind,
    #[serde(default)]
    pub selection: SelectionKind,
    #[serde(default)]
    pub crossover: Option<CrossoverKind>,
    #[serde(default)]
    pub mutation: Option<MutationKind>,
    #[serde(default)]
    pub fitness_functions: Vec<FitnessFunctionSpec>,
    #[serde(default)]
    pub termination: TerminationSpec,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_big_population_size")]
    pub big_population_size: usize,
    /// Maximum number of actions per episode.
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
    /// Number of episodes per suite (suite factories only).
    #[serde(default = "default_num_test_cases")]
    pub num_test_cases: usize,
    #[serde(default = "default_p_crossover")]
    pub p_crossover: f64,
    #[serde(default = "default_p_mutate")]
    pub p_mutate: f64,
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Global wall-clock budget for the whole run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub screen: ScreenBounds,
    #[serde(default)]
    pub reinforcement: ReinforcementConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

fn default_population_size() -> usize {
    4
}

fn default_big_population_size() -> usize {
    8
}

fn default_max_actions() -> usize {
    50
}

fn default_num_test_cases() -> usize {
    5
}

fn default_p_crossover() -> f64 {
    0.7
}

fn default_p_mutate() -> f64 {
    0.3
}

fn default_tournament_size() -> usize {
    2
}

fn default_seed() -> u64 {
    42
}

fn default_timeout_secs() -> u64 {
    30 * 60
}

impl SearchConfig {
    /// A configuration with defaults for everything but the algorithm.
    pub fn new(algorithm: AlgorithmKind) -> Self {
        Self {
            algorithm,
            chromosome_factory: FactoryKind::default(),
            selection: SelectionKind::default(),
            crossover: None,
            mutation: None,
            fitness_functions: Vec::new(),
            termination: TerminationSpec::default(),
            population_size: default_population_size(),
            big_population_size: default_big_population_size(),
            max_actions: default_max_actions(),
            num_test_cases: default_num_test_cases(),
            p_crossover: default_p_crossover(),
            p_mutate: default_p_mutate(),
            tournament_size: default_tournament_size(),
            seed: default_seed(),
            timeout_secs: default_timeout_secs(),
            screen: ScreenBounds::default(),
            reinforcement: ReinforcementConfig::default(),
            logging: LogConfig::default(),
        }
    }

    /// Reject combinations the engine cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::Invalid(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.max_actions == 0 {
            return Err(ConfigError::Invalid(
                "max_actions must be at least 1".to_string(),
            ));
        }
        for (name, p) in [
            ("p_crossover", self.p_crossover),
            ("p_mutate", self.p_mutate),
            ("reinforcement.epsilon", self.reinforcement.epsilon),
            ("reinforcement.discount_factor", self.reinforcement.discount_factor),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Probability {
                    name: name.to_string(),
                    value: p,
                });
            }
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::Invalid(
                "tournament_size must be at least 1".to_string(),
            ));
        }

        if self.algorithm.is_reinforcement() {
            if self.algorithm == AlgorithmKind::ActivityInsulated {
                if self.reinforcement.main_activity.is_empty() {
                    return Err(ConfigError::Invalid(
                        "activity_insulated requires reinforcement.main_activity".to_string(),
                    ));
                }
                if self.reinforcement.max_cage_rounds == 0 {
                    return Err(ConfigError::Invalid(
                        "reinforcement.max_cage_rounds must be at least 1".to_string(),
                    ));
                }
            }
            return Ok(());
        }

        if self.fitness_functions.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{} requires at least one fitness function",
                self.algorithm
            )));
        }

        let shape = self.chromosome_factory.shape();
        if shape == CandidateShape::Suite && self.num_test_cases == 0 {
            return Err(ConfigError::Invalid(
                "num_test_cases must be at least 1 for suite factories".to_string(),
            ));
        }
        if let Some(mutation) = self.mutation {
            if mutation.shape() != shape {
                return Err(ConfigError::Incompatible {
                    operator: mutation.to_string(),
                    expected: mutation.shape(),
                    actual: shape,
                });
            }
            // shuffled actions must not depend on the current screen
            if mutation == MutationKind::PrimitiveShuffle
                && self.chromosome_factory != FactoryKind::PrimitiveAndroidRandom
            {
                return Err(ConfigError::Invalid(format!(
                    "{mutation} requires the {} factory, got {}",
                    FactoryKind::PrimitiveAndroidRandom,
                    self.chromosome_factory
                )));
            }
        }
        if let Some(crossover) = self.crossover {
            if crossover.shape() != shape {
                return Err(ConfigError::Incompatible {
                    operator: crossover.to_string(),
                    expected: crossover.shape(),
                    actual: shape,
                });
            }
        }

        match self.algorithm {
            AlgorithmKind::OnePlusOne => {
                if self.mutation.is_none() {
                    return Err(ConfigError::Invalid(
                        "one_plus_one requires a mutation function".to_string(),
                    ));
                }
            }
            AlgorithmKind::StandardGa | AlgorithmKind::Nsga2 | AlgorithmKind::Mosa => {
                if self.mutation.is_none() && self.crossover.is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "{} requires a crossover or mutation function",
                        self.algorithm
                    )));
                }
                if self.big_population_size <= self.population_size {
                    return Err(ConfigError::Invalid(format!(
                        "big_population_size ({}) must exceed population_size ({})",
                        self.big_population_size, self.population_size
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// Which search strategy drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    StandardGa,
    OnePlusOne,
    RandomSearch,
    Nsga2,
    Mosa,
    QLearning,
    ActivityInsulated,
}

impl AlgorithmKind {
    pub fn is_reinforcement(self) -> bool {
        matches!(self, Self::QLearning | Self::ActivityInsulated)
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StandardGa => "standard_ga",
            Self::OnePlusOne => "one_plus_one",
            Self::RandomSearch => "random_search",
            Self::Nsga2 => "nsga2",
            Self::Mosa => "mosa",
            Self::QLearning => "q_learning",
            Self::ActivityInsulated => "activity_insulated",
        };
        f.write_str(name)
    }
}

/// Whether candidates are single episodes or groups of episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateShape {
    Episode,
    Suite,
}

impl fmt::Display for CandidateShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Episode => f.write_str("episode"),
            Self::Suite => f.write_str("suite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryKind {
    /// Random executable widget actions.
    #[default]
    AndroidRandom,
    /// Random coordinate/key events.
    PrimitiveAndroidRandom,
    /// Groups of `num_test_cases` random episodes.
    AndroidSuiteRandom,
}

impl FactoryKind {
    pub fn shape(self) -> CandidateShape {
        match self {
            Self::AndroidRandom | Self::PrimitiveAndroidRandom => CandidateShape::Episode,
            Self::AndroidSuiteRandom => CandidateShape::Suite,
        }
    }
}

impl fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AndroidRandom => f.write_str("android_random"),
            Self::PrimitiveAndroidRandom => f.write_str("primitive_android_random"),
            Self::AndroidSuiteRandom => f.write_str("android_suite_random"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    Random,
    #[default]
    Fitness,
    Identity,
    Rank,
    Tournament,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    TestCaseMerge,
    TestSuiteUniform,
}

impl CrossoverKind {
    pub fn shape(self) -> CandidateShape {
        match self {
            Self::TestCaseMerge => CandidateShape::Episode,
            Self::TestSuiteUniform => CandidateShape::Suite,
        }
    }
}

impl fmt::Display for CrossoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestCaseMerge => f.write_str("test_case_merge"),
            Self::TestSuiteUniform => f.write_str("test_suite_uniform"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CutPoint,
    PrimitiveShuffle,
    SuiteCutPoint,
}

impl MutationKind {
    pub fn shape(self) -> CandidateShape {
        match self {
            Self::CutPoint | Self::PrimitiveShuffle => CandidateShape::Episode,
            Self::SuiteCutPoint => CandidateShape::Suite,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CutPoint => f.write_str("cut_point"),
            Self::PrimitiveShuffle => f.write_str("primitive_shuffle"),
            Self::SuiteCutPoint => f.write_str("suite_cut_point"),
        }
    }
}

/// Identifier of a fitness function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitnessKind {
    NumberOfActivities,
    NumberOfStates,
    CoveredSpecificActivity,
    NumberOfCrashes,
    TestLength,
    BranchDistance,
    LinePercentageCoverage,
    BranchCoverage,
}

impl FitnessKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::NumberOfActivities => "number_of_activities",
            Self::NumberOfStates => "number_of_states",
            Self::CoveredSpecificActivity => "covered_specific_activity",
            Self::NumberOfCrashes => "number_of_crashes",
            Self::TestLength => "test_length",
            Self::BranchDistance => "branch_distance",
            Self::LinePercentageCoverage => "line_percentage_coverage",
            Self::BranchCoverage => "branch_coverage",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let kind = match id {
            "number_of_activities" => Self::NumberOfActivities,
            "number_of_states" => Self::NumberOfStates,
            "covered_specific_activity" => Self::CoveredSpecificActivity,
            "number_of_crashes" => Self::NumberOfCrashes,
            "test_length" => Self::TestLength,
            "branch_distance" => Self::BranchDistance,
            "line_percentage_coverage" => Self::LinePercentageCoverage,
            "branch_coverage" => Self::BranchCoverage,
            _ => return None,
        };
        Some(kind)
    }

    /// Name of the mandatory argument, if the function takes one.
    pub fn required_arg(self) -> Option<&'static str> {
        match self {
            Self::CoveredSpecificActivity => Some("activity name"),
            Self::BranchDistance => Some("branch"),
            Self::LinePercentageCoverage => Some("line"),
            _ => None,
        }
    }
}

/// Separator between a fitness function id and its arguments.
pub const ARG_SEPARATOR: char = ':';

/// A fitness function id with optional string arguments,
/// written as `id` or `id:arg` in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FitnessFunctionSpec {
    pub kind: FitnessKind,
    pub args: Vec<String>,
}

impl FitnessFunctionSpec {
    pub fn new(kind: FitnessKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
        }
    }

    pub fn with_arg(kind: FitnessKind, arg: impl Into<String>) -> Self {
        Self {
            kind,
            args: vec![arg.into()],
        }
    }

    pub fn parse(serialized: &str) -> Result<Self, ConfigError> {
        let mut parts = serialized.split(ARG_SEPARATOR);
        let id = parts.next().unwrap_or_default().trim();
        let kind = FitnessKind::from_id(id)
            .ok_or_else(|| ConfigError::UnknownFitnessFunction(id.to_string()))?;
        let args: Vec<String> = parts.map(|a| a.to_string()).collect();

        if let Some(arg_name) = kind.required_arg() {
            if args.first().map_or(true, |a| a.is_empty()) {
                return Err(ConfigError::MissingArgument {
                    function: id.to_string(),
                    argument: arg_name.to_string(),
                });
            }
        }

        Ok(Self { kind, args })
    }

    /// First argument, empty if none was given.
    pub fn arg(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }
}

impl TryFrom<String> for FitnessFunctionSpec {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FitnessFunctionSpec> for String {
    fn from(spec: FitnessFunctionSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for FitnessFunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.id())?;
        for arg in &self.args {
            write!(f, "{ARG_SEPARATOR}{arg}")?;
        }
        Ok(())
    }
}

/// When a search stops on its own (the global timeout applies regardless).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationSpec {
    Iterations { iterations: u64 },
    Never,
    Conditional {
        #[serde(default)]
        time_budget_secs: Option<u64>,
    },
    AllObjectivesCovered,
}

impl Default for TerminationSpec {
    fn default() -> Self {
        Self::Iterations { iterations: 10 }
    }
}

/// Screen size used when sampling primitive coordinate events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenBounds {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

/// Parameters of the reinforcement-learning explorers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    /// Probability of picking a random action instead of the greedy one.
    pub epsilon: f64,
    /// Weight of the future reward in the q-value update.
    pub discount_factor: f64,
    /// Episodes run by the q-learning explorer when termination is iteration based.
    pub episodes: u64,
    /// Upper bound on how often a single cage may be re-opened.
    pub max_cage_rounds: u32,
    pub main_activity: String,
    /// Launchable activities enqueued after the main activity.
    pub exported_activities: Vec<String>,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.8,
            discount_factor: 0.9,
            episodes: 10,
            max_cage_rounds: 5,
            main_activity: String::new(),
            exported_activities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
