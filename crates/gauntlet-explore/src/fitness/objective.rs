use std::fmt;

use gauntlet_config::{FitnessFunctionSpec, FitnessKind};
use gauntlet_model::CandidateRef;

/// Whether larger or smaller raw values are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// A single search objective.
///
/// Raw values keep the meaning of the underlying measurement. Ranking
/// code only ever sees [`loss`](Objective::loss), where lower is better.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Objective {
    ActivityCount,
    StateCount,
    /// 1 if the named activity was visited, else 0.
    CoveredActivity(String),
    CrashCount,
    /// Inverse of the total number of actions.
    TestLength,
    /// Normalised distance to the named branch; 0 means covered.
    BranchDistance(String),
    /// Fraction of executions covering the named line.
    LineCoverage(String),
    /// Fraction of branches covered.
    BranchCoverage,
}

impl Objective {
    pub fn from_spec(spec: &FitnessFunctionSpec) -> Self {
        match spec.kind {
            FitnessKind::NumberOfActivities => Self::ActivityCount,
            FitnessKind::NumberOfStates => Self::StateCount,
            FitnessKind::CoveredSpecificActivity => Self::CoveredActivity(spec.arg().to_string()),
            FitnessKind::NumberOfCrashes => Self::CrashCount,
            FitnessKind::TestLength => Self::TestLength,
            FitnessKind::BranchDistance => Self::BranchDistance(spec.arg().to_string()),
            FitnessKind::LinePercentageCoverage => Self::LineCoverage(spec.arg().to_string()),
            FitnessKind::BranchCoverage => Self::BranchCoverage,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::BranchDistance(_) => Direction::Minimize,
            _ => Direction::Maximize,
        }
    }

    /// Whether the value has to come from the coverage oracle.
    pub fn needs_oracle(&self) -> bool {
        matches!(
            self,
            Self::BranchDistance(_) | Self::LineCoverage(_) | Self::BranchCoverage
        )
    }

    /// Compute the value from the candidate alone, if possible.
    pub fn local_value(&self, candidate: CandidateRef<'_>) -> Option<f64> {
        let value = match self {
            Self::ActivityCount => candidate.visited_activities().len() as f64,
            Self::StateCount => candidate.visited_states().len() as f64,
            Self::CoveredActivity(name) => {
                if candidate.visited_activities().contains(name.as_str()) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::CrashCount => candidate.crash_count() as f64,
            Self::TestLength => 1.0 / candidate.total_actions().max(1) as f64,
            Self::BranchDistance(_) | Self::LineCoverage(_) | Self::BranchCoverage => return None,
        };
        Some(value)
    }

    /// Map a raw value onto the lower-is-better scale.
    pub fn loss(&self, raw: f64) -> f64 {
        match self.direction() {
            Direction::Minimize => raw,
            Direction::Maximize => -raw,
        }
    }

    /// Whether the raw value means the objective's target is reached.
    /// Open-ended counts are never covered.
    pub fn is_covered(&self, raw: f64) -> bool {
        match self {
            Self::BranchDistance(_) => raw <= 0.0,
            Self::CoveredActivity(_) | Self::LineCoverage(_) | Self::BranchCoverage => raw >= 1.0,
            Self::ActivityCount | Self::StateCount | Self::CrashCount | Self::TestLength => false,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActivityCount => f.write_str("number_of_activities"),
            Self::StateCount => f.write_str("number_of_states"),
            Self::CoveredActivity(name) => write!(f, "covered_specific_activity:{name}"),
            Self::CrashCount => f.write_str("number_of_crashes"),
            Self::TestLength => f.write_str("test_length"),
            Self::BranchDistance(branch) => write!(f, "branch_distance:{branch}"),
            Self::LineCoverage(line) => write!(f, "line_percentage_coverage:{line}"),
            Self::BranchCoverage => f.write_str("branch_coverage"),
        }
    }
}
