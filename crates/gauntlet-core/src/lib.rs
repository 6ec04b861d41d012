pub mod analytics;
pub mod campaign;
pub mod limits;
pub mod logging;

pub use analytics::RunReport;
pub use campaign::{Campaign, CampaignError, CampaignResult, TimedRun};
pub use limits::{LimitViolation, RunLimits, StopReason};
