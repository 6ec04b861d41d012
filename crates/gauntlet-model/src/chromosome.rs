use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::episode::Episode;
use crate::state::StateId;
use crate::suite::TestSuite;

static NEXT_CHROMOSOME_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a chromosome, used as the fitness cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChromosomeId(pub u64);

impl fmt::Display for ChromosomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity-bearing wrapper around a candidate.
///
/// The value is frozen once wrapped: variation builds new chromosomes
/// rather than editing this one, so a cached fitness never goes stale.
/// Clones share both identity and value.
#[derive(Debug)]
pub struct Chromosome<T> {
    id: ChromosomeId,
    value: Arc<T>,
}

impl<T> Chromosome<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: ChromosomeId(NEXT_CHROMOSOME_ID.fetch_add(1, Ordering::Relaxed)),
            value: Arc::new(value),
        }
    }

    pub fn id(&self) -> ChromosomeId {
        self.id
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Clone for Chromosome<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
        }
    }
}

/// Borrowed view over either candidate shape.
#[derive(Debug, Clone, Copy)]
pub enum CandidateRef<'a> {
    Episode(&'a Episode),
    Suite(&'a TestSuite),
}

impl<'a> CandidateRef<'a> {
    pub fn episodes(self) -> &'a [Episode] {
        match self {
            Self::Episode(episode) => std::slice::from_ref(episode),
            Self::Suite(suite) => suite.episodes(),
        }
    }

    pub fn total_actions(self) -> usize {
        self.episodes().iter().map(Episode::len).sum()
    }

    pub fn crash_count(self) -> usize {
        self.episodes().iter().filter(|e| e.has_crashed()).count()
    }

    pub fn visited_activities(self) -> BTreeSet<&'a str> {
        self.episodes()
            .iter()
            .flat_map(|e| e.visited_activities().iter().map(String::as_str))
            .collect()
    }

    pub fn visited_states(self) -> BTreeSet<&'a StateId> {
        self.episodes()
            .iter()
            .flat_map(|e| e.visited_states().iter())
            .collect()
    }

    pub fn is_finished(self) -> bool {
        self.episodes().iter().all(Episode::is_finished)
    }
}

/// A candidate value the search engines can evaluate and vary.
pub trait Candidate: Clone + fmt::Debug + Send + Sync + 'static {
    fn view(&self) -> CandidateRef<'_>;

    fn is_finished(&self) -> bool {
        self.view().is_finished()
    }

    /// Total number of actions across all episodes.
    fn total_actions(&self) -> usize {
        self.view().total_actions()
    }
}

impl Candidate for Episode {
    fn view(&self) -> CandidateRef<'_> {
        CandidateRef::Episode(self)
    }
}

impl Candidate for TestSuite {
    fn view(&self) -> CandidateRef<'_> {
        CandidateRef::Suite(self)
    }
}
