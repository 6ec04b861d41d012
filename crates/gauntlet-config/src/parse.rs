use crate::types::{CandidateShape, SearchConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown fitness function: {0}")]
    UnknownFitnessFunction(String),
    #[error("fitness function {function} requires an argument ({argument})")]
    MissingArgument { function: String, argument: String },
    #[error("{name} must be within [0, 1], got {value}")]
    Probability { name: String, value: f64 },
    #[error("{operator} works on {expected} candidates but the factory builds {actual} candidates")]
    Incompatible {
        operator: String,
        expected: CandidateShape,
        actual: CandidateShape,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Parse and validate a search configuration.
pub fn parse_config(json: &str) -> Result<SearchConfig, ConfigError> {
    let config: SearchConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}
