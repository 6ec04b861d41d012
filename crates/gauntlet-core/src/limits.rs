//! Run limits and the reasons a campaign stops.
//!
//! Limits never fail a run once it has started: hitting one winds the
//! search down and the campaign reports whatever it has so far.

use std::time::Duration;

use gauntlet_config::SearchConfig;
use gauntlet_explore::StopCause;
use serde::{Deserialize, Serialize};

/// Resource limits for a single campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum wall-clock seconds before forced stop.
    pub max_wall_secs: u64,
    /// Maximum configuration JSON size in bytes.
    pub max_config_bytes: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_wall_secs: 30 * 60,
            max_config_bytes: 1024 * 1024, // 1 MB
        }
    }
}

impl RunLimits {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_wall_secs: config.timeout_secs,
            ..Self::default()
        }
    }

    pub fn wall_time(&self) -> Duration {
        Duration::from_secs(self.max_wall_secs)
    }

    /// Reject a configuration document before parsing it.
    pub fn check_config_size(&self, bytes: usize) -> Result<(), LimitViolation> {
        if bytes > self.max_config_bytes {
            return Err(LimitViolation::ConfigTooLarge {
                size: bytes,
                max: self.max_config_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LimitViolation {
    #[error("configuration too large ({size} bytes, max {max})")]
    ConfigTooLarge { size: usize, max: usize },
}

/// Reason a campaign was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The termination condition held.
    Complete,
    /// An explorer ran out of targets.
    WorkDrained,
    /// Wall-clock time limit exceeded.
    WallTimeExceeded,
    /// Cancelled through the campaign's cancel handle.
    UserAborted,
}

impl StopReason {
    pub fn classify(stop: StopCause, cancelled: bool) -> Self {
        match stop {
            _ if cancelled => Self::UserAborted,
            StopCause::ConditionMet => Self::Complete,
            StopCause::WorkDrained => Self::WorkDrained,
            StopCause::BudgetExhausted => Self::WallTimeExceeded,
        }
    }

    /// Whether the run ended before its own stop condition.
    pub fn is_partial(self) -> bool {
        matches!(self, Self::WallTimeExceeded | Self::UserAborted)
    }
}
