use gauntlet_config::ConfigError;
use gauntlet_model::EpisodeError;

use crate::fitness::FitnessError;

/// Failures that abort a search run.
///
/// App crashes are not errors; they are recorded on the episode.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Episode(#[from] EpisodeError),
    #[error(transparent)]
    Fitness(#[from] FitnessError),
    #[error("{operator} cannot handle this candidate: {reason}")]
    Operator {
        operator: &'static str,
        reason: String,
    },
}
