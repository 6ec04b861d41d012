use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gauntlet_model::{Device, Episode};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::fitness::FitnessOracle;

/// Cooperative wall-clock budget shared between a run and its driver.
///
/// Engines poll [`is_exhausted`](Budget::is_exhausted) between actions and
/// wind down with their best-so-far results once it trips.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned cancel flag.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_exhausted(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Everything a search step needs from the outside world.
///
/// There is a single RNG stream for the whole run and a single live app.
pub struct SearchContext<'a> {
    pub device: &'a mut dyn Device,
    pub rng: &'a mut ChaCha8Rng,
    pub oracle: &'a mut dyn FitnessOracle,
    pub budget: &'a Budget,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        device: &'a mut dyn Device,
        rng: &'a mut ChaCha8Rng,
        oracle: &'a mut dyn FitnessOracle,
        budget: &'a Budget,
    ) -> Self {
        Self {
            device,
            rng,
            oracle,
            budget,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.budget.is_exhausted()
    }

    /// Finish `episode` and let the oracle capture what it covered.
    pub fn seal(&mut self, episode: &mut Episode) {
        episode.finish();
        if let Err(err) = self.oracle.record_episode(episode) {
            warn!(episode = %episode.id(), error = %err, "oracle failed to record episode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_budget_never_exhausts() {
        assert!(!Budget::unlimited().is_exhausted());
    }

    #[test]
    fn test_zero_timeout_exhausts_immediately() {
        let budget = Budget::with_timeout(Duration::ZERO);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let budget = Budget::unlimited();
        let clone = budget.clone();
        clone.cancel();
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_external_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let budget = Budget::with_timeout(Duration::from_secs(3600)).with_cancel_flag(flag.clone());
        assert!(!budget.is_exhausted());
        flag.store(true, Ordering::SeqCst);
        assert!(budget.is_exhausted());
    }
}
