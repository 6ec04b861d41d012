use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Snapshot of a run handed to termination conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchProgress {
    /// Completed generations (or episodes, for the explorers).
    pub generation: u64,
    pub elapsed: Duration,
    /// Objectives without a covering chromosome, if the engine tracks them.
    pub uncovered: Option<usize>,
}

/// Cheap side-effect-free stop predicate, checked once per generation.
pub trait TerminationCondition: Send {
    fn is_met(&self, progress: &SearchProgress) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct IterationsTermination {
    iterations: u64,
}

impl IterationsTermination {
    pub fn new(iterations: u64) -> Self {
        Self { iterations }
    }
}

impl TerminationCondition for IterationsTermination {
    fn is_met(&self, progress: &SearchProgress) -> bool {
        progress.generation >= self.iterations
    }
}

/// Never stops on its own; the run budget ends the search.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTermination;

impl TerminationCondition for NeverTermination {
    fn is_met(&self, _progress: &SearchProgress) -> bool {
        false
    }
}

/// Stops once a time budget is spent or an external flag is raised.
#[derive(Debug, Clone, Default)]
pub struct ConditionalTermination {
    time_budget: Option<Duration>,
    flag: Option<Arc<AtomicBool>>,
}

impl ConditionalTermination {
    pub fn new(time_budget: Option<Duration>, flag: Option<Arc<AtomicBool>>) -> Self {
        Self { time_budget, flag }
    }
}

impl TerminationCondition for ConditionalTermination {
    fn is_met(&self, progress: &SearchProgress) -> bool {
        let out_of_time = self
            .time_budget
            .is_some_and(|budget| progress.elapsed >= budget);
        let raised = self
            .flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst));
        out_of_time || raised
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllObjectivesCoveredTermination;

impl TerminationCondition for AllObjectivesCoveredTermination {
    fn is_met(&self, progress: &SearchProgress) -> bool {
        progress.uncovered == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(generation: u64, secs: u64, uncovered: Option<usize>) -> SearchProgress {
        SearchProgress {
            generation,
            elapsed: Duration::from_secs(secs),
            uncovered,
        }
    }

    #[test]
    fn test_iterations() {
        let t = IterationsTermination::new(3);
        assert!(!t.is_met(&at(2, 0, None)));
        assert!(t.is_met(&at(3, 0, None)));
    }

    #[test]
    fn test_never() {
        assert!(!NeverTermination.is_met(&at(u64::MAX, u64::MAX, Some(0))));
    }

    #[test]
    fn test_conditional_time_and_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let t = ConditionalTermination::new(Some(Duration::from_secs(10)), Some(flag.clone()));
        assert!(!t.is_met(&at(0, 5, None)));
        assert!(t.is_met(&at(0, 10, None)));
        flag.store(true, Ordering::SeqCst);
        assert!(t.is_met(&at(0, 0, None)));
    }

    #[test]
    fn test_all_objectives_covered() {
        let t = AllObjectivesCoveredTermination;
        assert!(!t.is_met(&at(1, 0, None)));
        assert!(!t.is_met(&at(1, 0, Some(2))));
        assert!(t.is_met(&at(1, 0, Some(0))));
    }
}
