use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gauntlet_config::{parse_config, ConfigError, SearchConfig};
use gauntlet_explore::fitness::FitnessOracle;
use gauntlet_explore::rng::run_rng;
use gauntlet_explore::{build, Budget, RunOutcome, SearchContext, SearchError};
use gauntlet_model::Device;
use tracing::{info, warn};

use crate::analytics::RunReport;
use crate::limits::{LimitViolation, RunLimits, StopReason};

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error(transparent)]
    Limit(#[from] LimitViolation),

    #[error("campaign task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a finished campaign hands back.
#[derive(Debug, Clone)]
pub struct CampaignResult {
    pub outcome: RunOutcome,
    pub report: RunReport,
    pub stop_reason: StopReason,
}

/// A timed run also returns the device and oracle it was given.
#[derive(Debug)]
pub struct TimedRun<D, O> {
    pub result: CampaignResult,
    pub device: D,
    pub oracle: O,
}

/// Releases the device on every exit path.
struct ReleaseGuard<'a> {
    device: &'a mut dyn Device,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.device.release();
    }
}

/// One configured search against one app.
#[derive(Debug, Clone)]
pub struct Campaign {
    config: SearchConfig,
    limits: RunLimits,
    cancel: Arc<AtomicBool>,
}

impl Campaign {
    pub fn new(config: SearchConfig) -> Result<Self, CampaignError> {
        config.validate()?;
        Ok(Self {
            limits: RunLimits::from_config(&config),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, CampaignError> {
        RunLimits::default().check_config_size(json.len())?;
        let config = parse_config(json)?;
        Self::new(config)
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn limits(&self) -> &RunLimits {
        &self.limits
    }

    /// Flag that stops a running search when raised. The search winds down
    /// with its best-so-far results. Once raised it stays raised, so later
    /// runs of this campaign stop immediately.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the search to completion on the calling thread.
    pub fn run(
        &self,
        device: &mut dyn Device,
        oracle: &mut dyn FitnessOracle,
    ) -> Result<CampaignResult, CampaignError> {
        self.execute(device, oracle)
    }

    fn execute(
        &self,
        device: &mut dyn Device,
        oracle: &mut dyn FitnessOracle,
    ) -> Result<CampaignResult, CampaignError> {
        let guard = ReleaseGuard { device };
        let budget = Budget::with_timeout(self.limits.wall_time())
            .with_cancel_flag(Arc::clone(&self.cancel));
        let mut engine = build(&self.config, Some(Arc::clone(&self.cancel)))?;
        let mut rng = run_rng(self.config.seed);

        info!(
            algorithm = %self.config.algorithm,
            seed = self.config.seed,
            max_wall_secs = self.limits.max_wall_secs,
            "campaign started"
        );
        let outcome = {
            let mut ctx = SearchContext::new(&mut *guard.device, &mut rng, oracle, &budget);
            engine.run(&mut ctx)?
        };

        let stop = match &outcome {
            RunOutcome::Episodes(o) => o.stop,
            RunOutcome::Suites(o) => o.stop,
        };
        let stop_reason = StopReason::classify(stop, budget.is_cancelled());
        let report = RunReport::from_outcome(engine.name(), &outcome);
        info!(
            stop = ?stop_reason,
            generations = report.generations,
            actions = report.total_actions,
            crashes = report.crashes,
            activities = report.activities.len(),
            "campaign finished"
        );

        Ok(CampaignResult {
            outcome,
            report,
            stop_reason,
        })
    }

    /// Run on the blocking pool under the campaign's wall-clock limit.
    ///
    /// When the limit elapses the search is cancelled and its partial
    /// results are still returned.
    pub async fn run_with_timeout<D, O>(
        &self,
        device: D,
        oracle: O,
    ) -> Result<TimedRun<D, O>, CampaignError>
    where
        D: Device + Send + 'static,
        O: FitnessOracle + 'static,
    {
        let campaign = self.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            let mut device = device;
            let mut oracle = oracle;
            let result = campaign.execute(&mut device, &mut oracle);
            (result, device, oracle)
        });

        let wall_time = self.limits.wall_time();
        let (result, timed_out) = match tokio::time::timeout(wall_time, &mut handle).await {
            Ok(joined) => (joined?, false),
            Err(_) => {
                warn!(
                    max_wall_secs = self.limits.max_wall_secs,
                    "wall-clock limit reached, cancelling search"
                );
                self.cancel.store(true, Ordering::SeqCst);
                (handle.await?, true)
            }
        };

        let (result, device, oracle) = result;
        let mut result = result?;
        if timed_out {
            result.stop_reason = StopReason::WallTimeExceeded;
        }
        Ok(TimedRun {
            result,
            device,
            oracle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_config::AlgorithmKind;

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            Campaign::from_json("not json"),
            Err(CampaignError::Config(ConfigError::Json(_)))
        ));
    }

    #[test]
    fn test_oversized_config_is_rejected() {
        let padding = " ".repeat(RunLimits::default().max_config_bytes);
        let json = format!("{{\"algorithm\": \"q_learning\"}}{padding}");
        assert!(matches!(
            Campaign::from_json(&json),
            Err(CampaignError::Limit(LimitViolation::ConfigTooLarge { .. }))
        ));
    }

    #[test]
    fn test_new_validates() {
        let config = SearchConfig::new(AlgorithmKind::StandardGa);
        // no fitness functions
        assert!(Campaign::new(config).is_err());
    }

    #[test]
    fn test_shuffle_with_widget_factory_fails_before_running() {
        let json = r#"{
            "algorithm": "one_plus_one",
            "chromosome_factory": "android_random",
            "mutation": "primitive_shuffle",
            "fitness_functions": ["number_of_activities"]
        }"#;
        assert!(matches!(
            Campaign::from_json(json),
            Err(CampaignError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_limits_come_from_config() {
        let mut config = SearchConfig::new(AlgorithmKind::QLearning);
        config.timeout_secs = 5;
        let campaign = Campaign::new(config).unwrap();
        assert_eq!(campaign.limits().max_wall_secs, 5);
    }
}
